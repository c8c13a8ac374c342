//! Conversation router: start trigger > active quiz > general chat.

use std::sync::Arc;
use tracing::{error, info, warn};

use crate::openai::Generator;
use crate::quark::quiz::Quiz;
use crate::quark::sessions::SessionStore;

/// Message that (re)starts the quiz, compared case-folded.
pub const START_TRIGGER: &str = "i want to know my quark";

pub const CHAT_FALLBACK_REPLY: &str = "I'm here to chat about whatever's on your mind. What's up?";

const CHAT_TEMPERATURE: f32 = 0.9;

pub struct ConversationRouter {
    quiz: Quiz,
    sessions: Arc<SessionStore>,
    generator: Arc<dyn Generator>,
    system_message: String,
}

impl ConversationRouter {
    pub fn new(
        quiz: Quiz,
        sessions: Arc<SessionStore>,
        generator: Arc<dyn Generator>,
        system_message: String,
    ) -> Self {
        Self {
            quiz,
            sessions,
            generator,
            system_message,
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Produce the reply for one inbound message.
    pub async fn handle(&self, user_id: &str, text: &str) -> String {
        let folded = text.trim().to_lowercase();
        let handle = self.sessions.get_or_create(user_id);
        let mut session = handle.lock().await;

        if folded == START_TRIGGER {
            info!("🔮 Quiz started for {}", user_id);
            return self.quiz.start(&mut session);
        }

        if session.active {
            return match self.quiz.respond(&mut session, &folded) {
                Ok(reply) => {
                    if !session.active {
                        info!("🔮 Quiz ended for {} at question {}", user_id, session.position);
                    }
                    reply
                }
                Err(e) => {
                    error!("Quiz state error for {}: {}", user_id, e);
                    CHAT_FALLBACK_REPLY.to_string()
                }
            };
        }

        // The session lock stays held so a quiz start from the same user
        // waits for this reply.
        match self
            .generator
            .generate(&self.system_message, Some(text), Some(CHAT_TEMPERATURE))
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                warn!("Error generating conversation response: {e}");
                CHAT_FALLBACK_REPLY.to_string()
            }
        }
    }
}
