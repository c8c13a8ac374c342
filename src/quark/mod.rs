//! Quark quiz - sorts a user into one of the 16 Quarks via yes/no questions.

pub mod category;
pub mod questionnaire;
pub mod quiz;
pub mod router;
pub mod sessions;


pub use category::{Category, CategoryMap, Code, Digit, PairGroup};
pub use questionnaire::{Answer, Question, Questionnaire};
pub use quiz::{Quiz, QuizError, Session, Step, Tally};
pub use router::{ConversationRouter, START_TRIGGER};
pub use sessions::SessionStore;
