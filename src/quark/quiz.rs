//! Per-user quiz state machine and scoring.

use std::fmt;
use std::sync::Arc;

use crate::quark::category::{Category, CategoryMap, Code, PairGroup};
use crate::quark::questionnaire::{Answer, Questionnaire};

/// Phrase that exits an in-progress quiz (compared case-folded).
pub const ABORT_PHRASE: &str = "please make it stop mr.gluon";

pub const ABORT_REPLY: &str = "You've exited the questions, we may now speak about whatever you'd like, \
or you can type 'I want to know my Quark' anytime to start the questions again.";

pub const REPRIMAND_REPLY: &str =
    "Please respond with 'yes' or 'no' only, or type 'Please make it stop mr.Gluon' to exit the questions.";

/// Signed accumulator per pair group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally([i32; 4]);

impl Tally {
    pub fn get(&self, group: PairGroup) -> i32 {
        self.0[group.index()]
    }

    fn add(&mut self, group: PairGroup, delta: i32) {
        self.0[group.index()] += delta;
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&v| v == 0)
    }

    /// Odd digit when the group is strictly positive, otherwise the even one.
    pub fn code(&self) -> Code {
        let mut odd = [false; 4];
        for group in PairGroup::ALL {
            odd[group.index()] = self.get(group) > 0;
        }
        Code::from_choices(odd)
    }
}

/// Quiz progress for one user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub active: bool,
    pub position: usize,
    pub tally: Tally,
}

/// Result of applying an answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Text of the next question.
    Next(String),
    /// Quiz finished with the computed code and resolved category.
    Finished { code: Code, category: Category },
}

impl Step {
    pub fn into_reply(self) -> String {
        match self {
            Step::Next(question) => question,
            Step::Finished { category, .. } => completion_message(&category),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizError {
    /// An answer arrived for a session with no quiz in progress.
    NotActive,
}

impl fmt::Display for QuizError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuizError::NotActive => write!(f, "no quiz in progress for this session"),
        }
    }
}

impl std::error::Error for QuizError {}

pub fn completion_message(category: &Category) -> String {
    let name = &category.name;
    format!(
        "Your Quark is: {name}, this means you are {}. If you would like to learn more about {name} \
simply say 'Tell me about the {name} Quark'.",
        category.description
    )
}

/// The quiz over a fixed questionnaire and category map.
#[derive(Debug, Clone)]
pub struct Quiz {
    questions: Arc<Questionnaire>,
    categories: Arc<CategoryMap>,
}

impl Quiz {
    pub fn new(questions: Arc<Questionnaire>, categories: Arc<CategoryMap>) -> Self {
        Self {
            questions,
            categories,
        }
    }

    pub fn questions(&self) -> &Questionnaire {
        &self.questions
    }

    pub fn categories(&self) -> &CategoryMap {
        &self.categories
    }

    /// Reset the session and return the first question.
    pub fn start(&self, session: &mut Session) -> String {
        *session = Session {
            active: true,
            position: 0,
            tally: Tally::default(),
        };
        self.questions.first().prompt.clone()
    }

    /// Record an answer and advance.
    pub fn answer(&self, session: &mut Session, answer: Answer) -> Result<Step, QuizError> {
        if !session.active {
            return Err(QuizError::NotActive);
        }
        let Some(question) = self.questions.get(session.position) else {
            // Position ran off the end while still marked active
            session.active = false;
            return Err(QuizError::NotActive);
        };

        let digit = question.digit_for(answer);
        session.tally.add(digit.group(), digit.delta());
        session.position += 1;

        match self.questions.get(session.position) {
            Some(next) => Ok(Step::Next(next.prompt.clone())),
            None => {
                session.active = false;
                let code = session.tally.code();
                let category = self.categories.resolve(&code);
                Ok(Step::Finished { code, category })
            }
        }
    }

    /// Leave the quiz without touching position or tallies.
    pub fn abort(&self, session: &mut Session) -> &'static str {
        session.active = false;
        ABORT_REPLY
    }

    /// Handle a case-folded message for an active session: answer, abort
    /// or reprimand.
    pub fn respond(&self, session: &mut Session, text: &str) -> Result<String, QuizError> {
        if !session.active {
            return Err(QuizError::NotActive);
        }
        if let Some(answer) = Answer::parse(text) {
            return self.answer(session, answer).map(Step::into_reply);
        }
        if text == ABORT_PHRASE {
            return Ok(self.abort(session).to_string());
        }
        Ok(REPRIMAND_REPLY.to_string())
    }
}
