//! HTTP surface: greeting and chat endpoints.

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::{Json, State};
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::openai::Generator;
use crate::quark::ConversationRouter;

pub const GREETING_FALLBACK: &str = "The path of every particle was chosen at the dawn of the universe, \
this includes the ones that form you.\nTo find out your assigned Quark type 'I want to know my Quark'.";

const GREETING_TEMPERATURE: f32 = 0.7;

pub struct AppState {
    pub conversation: ConversationRouter,
    pub generator: Arc<dyn Generator>,
    pub greeting_instruction: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub prompt: String,
    #[serde(rename = "userId")]
    pub user_id: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReplyBody {
    pub reply: String,
}

pub fn router(state: Arc<AppState>, static_dir: Option<PathBuf>) -> Router {
    let api = Router::new()
        .route("/api/greet", get(greet))
        .route("/api/chat", post(chat))
        .with_state(state);

    let app = match static_dir {
        Some(dir) => api.fallback_service(ServeDir::new(dir)),
        None => api,
    };
    app.layer(TraceLayer::new_for_http())
}

async fn greet(State(state): State<Arc<AppState>>) -> Json<ReplyBody> {
    let reply = match state
        .generator
        .generate(&state.greeting_instruction, None, Some(GREETING_TEMPERATURE))
        .await
    {
        Ok(reply) => reply,
        Err(e) => {
            warn!("Error generating greeting: {e}");
            GREETING_FALLBACK.to_string()
        }
    };
    Json(ReplyBody { reply })
}

async fn chat(State(state): State<Arc<AppState>>, Json(request): Json<ChatRequest>) -> Json<ReplyBody> {
    let reply = state.conversation.handle(&request.user_id, &request.prompt).await;
    Json(ReplyBody { reply })
}
