use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::prelude::*;

use gluon::config::{BotConfig, Config};
use gluon::openai::{Client as OpenAiClient, Generator};
use gluon::quark::{ConversationRouter, Quiz, SessionStore};
use gluon::scheduler::{CategoryCycle, FortuneSource, ImageRotation, LoopHandle, PersonalitySource, PostLoop};
use gluon::server::{self, AppState};
use gluon::twitter::TwitterClient;

#[tokio::main]
async fn main() {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "gluon.json".to_string());
    let config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    // Setup logging
    let log_dir = config.data_dir.join("logs");
    std::fs::create_dir_all(&log_dir).ok();
    let file_appender = tracing_appender::rolling::never(&log_dir, "gluon.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .init();

    info!("🚀 Starting gluon...");
    info!("Loaded config from {config_path}");
    info!(
        "{} questions, {} quarks",
        config.questionnaire.len(),
        config.categories.len()
    );
    let missing = config.categories.missing_codes();
    if !missing.is_empty() {
        let codes: Vec<&str> = missing.iter().map(|c| c.as_str()).collect();
        warn!(
            "⚠️ Quark map has no entry for {}; those results resolve to the unknown quark and get no fortunes",
            codes.join(", ")
        );
    }
    if config.openai_api_key.is_empty() {
        warn!("No OpenAI API key configured; generated replies will use fallbacks");
    }

    let generator: Arc<dyn Generator> = Arc::new(OpenAiClient::new(
        config.openai_api_key.clone(),
        config.openai_model.clone(),
    ));

    let quiz = Quiz::new(
        Arc::new(config.questionnaire.clone()),
        Arc::new(config.categories.clone()),
    );
    let sessions = Arc::new(SessionStore::new(config.session_ttl, config.max_sessions));
    let conversation = ConversationRouter::new(quiz, sessions, generator.clone(), config.system_message.clone());

    // Kept alive for the process lifetime; dropping cancels the loops
    let _loops = match config.bot {
        Some(ref bot) => start_bot(bot, &config, generator.clone()),
        None => {
            info!("Posting bot disabled (no bot section)");
            Vec::new()
        }
    };

    let state = Arc::new(AppState {
        conversation,
        generator,
        greeting_instruction: config.greeting_instruction.clone(),
    });
    let app = server::router(state, config.static_dir.clone());

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {addr}: {e}");
            std::process::exit(1);
        }
    };
    info!("Server is running on http://localhost:{}", config.port);

    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {e}");
    }
}

fn start_bot(bot: &BotConfig, config: &Config, generator: Arc<dyn Generator>) -> Vec<LoopHandle> {
    let Some(ref credentials) = bot.twitter else {
        info!("Posting bot disabled (twitter credentials missing)");
        return Vec::new();
    };
    let publisher = Arc::new(TwitterClient::new(credentials.clone()));

    let personality = PostLoop::new(
        Box::new(PersonalitySource::new(bot.persona.clone(), bot.personality_prompt.clone())),
        generator.clone(),
        publisher.clone(),
        bot.personality_interval,
        bot.rate_limit_cooldown,
    );

    let fortune = PostLoop::new(
        Box::new(FortuneSource::new(
            bot.persona.clone(),
            bot.fortune_prompt.clone(),
            CategoryCycle::new(config.categories.names()),
            ImageRotation::new(bot.image_dir.clone()),
        )),
        generator,
        publisher,
        bot.fortune_interval,
        bot.rate_limit_cooldown,
    );

    info!("Bot initialized, post schedules have been set up");
    vec![personality.spawn(), fortune.spawn()]
}
