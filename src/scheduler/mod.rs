//! Content scheduler - independent loops that generate and publish posts.

pub mod cycle;
pub mod post_loop;
pub mod sources;

use std::fmt;
use std::path::PathBuf;

use async_trait::async_trait;

use crate::openai::Generator;

pub use cycle::{CategoryCycle, ImageRotation};
pub use post_loop::{LoopHandle, Outcome, Phase, PostLoop};
pub use sources::{FortuneSource, PersonalitySource};

/// A post ready to publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draft {
    pub text: String,
    /// Image to upload and attach.
    pub image: Option<PathBuf>,
}

impl Draft {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            image: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishError {
    /// The platform asked us to back off.
    RateLimited,
    Failed(String),
}

impl fmt::Display for PublishError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublishError::RateLimited => write!(f, "rate limited"),
            PublishError::Failed(e) => write!(f, "publish failed: {e}"),
        }
    }
}

impl std::error::Error for PublishError {}

#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, draft: &Draft) -> Result<(), PublishError>;
}

/// Produces the next post for a loop.
#[async_trait]
pub trait ContentSource: Send {
    /// Short label used in logs.
    fn kind(&self) -> &'static str;

    /// Generate the next draft, or None when generation failed.
    async fn draft(&mut self, generator: &dyn Generator) -> Option<Draft>;
}
