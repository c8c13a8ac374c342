//! Personality and fortune post generation.

use async_trait::async_trait;
use rand::SeedableRng;
use rand::rngs::StdRng;
use regex::Regex;
use tracing::{info, warn};

use crate::openai::Generator;
use crate::scheduler::cycle::{CategoryCycle, ImageRotation};
use crate::scheduler::{ContentSource, Draft};

/// Free-form musings in the bot's persona.
pub struct PersonalitySource {
    persona: String,
    prompt: String,
}

impl PersonalitySource {
    pub fn new(persona: String, prompt: String) -> Self {
        Self { persona, prompt }
    }
}

#[async_trait]
impl ContentSource for PersonalitySource {
    fn kind(&self) -> &'static str {
        "personality"
    }

    async fn draft(&mut self, generator: &dyn Generator) -> Option<Draft> {
        match generator.generate(&self.persona, Some(&self.prompt), None).await {
            Ok(text) => {
                info!("Generated personality post: {}", text);
                Some(Draft::text(text))
            }
            Err(e) => {
                warn!("Error generating personality post: {e}");
                None
            }
        }
    }
}

/// Per-Quark fortunes with a rotating image.
pub struct FortuneSource {
    persona: String,
    /// Prompt with a `{quark}` placeholder.
    template: String,
    cycle: CategoryCycle,
    images: ImageRotation,
    rng: StdRng,
}

impl FortuneSource {
    pub fn new(persona: String, template: String, cycle: CategoryCycle, images: ImageRotation) -> Self {
        Self::with_rng(persona, template, cycle, images, StdRng::from_entropy())
    }

    pub fn with_rng(
        persona: String,
        template: String,
        cycle: CategoryCycle,
        images: ImageRotation,
        rng: StdRng,
    ) -> Self {
        Self {
            persona,
            template,
            cycle,
            images,
            rng,
        }
    }
}

/// Remove a leading "Quark <name>:" the model sometimes echoes back.
pub fn strip_quark_prefix(text: &str, name: &str) -> String {
    let pattern = format!(r"(?i)^\s*Quark\s+{}\s*[:,]?\s*", regex::escape(name));
    match Regex::new(&pattern) {
        Ok(re) => re.replace(text, "").trim().to_string(),
        Err(_) => text.trim().to_string(),
    }
}

#[async_trait]
impl ContentSource for FortuneSource {
    fn kind(&self) -> &'static str {
        "fortune"
    }

    async fn draft(&mut self, generator: &dyn Generator) -> Option<Draft> {
        let Some(name) = self.cycle.next(&mut self.rng) else {
            warn!("No Quarks configured, skipping fortune");
            return None;
        };
        let prompt = self.template.replace("{quark}", &name);

        let content = match generator.generate(&self.persona, Some(&prompt), None).await {
            Ok(text) => strip_quark_prefix(&text, &name),
            Err(e) => {
                warn!("Error generating fortune for {}: {e}", name);
                return None;
            }
        };
        info!("Generated fortune for {}: {}", name, content);

        let image = self.images.advance();
        if image.is_none() {
            warn!("No images in {}, posting fortune without one", self.images.dir().display());
        }

        Some(Draft {
            text: format!("{name}: {content}"),
            image,
        })
    }
}
