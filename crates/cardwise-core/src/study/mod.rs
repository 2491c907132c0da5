//! Study Module
//!
//! - [`select_study_cards`]: which cards a session shows
//! - [`StudySession`]: in-session retry queue for failed cards

mod selector;
mod session;

pub use selector::{
    count_due, select_study_cards, StudyLimits, DEFAULT_NEW_CARD_LIMIT, DEFAULT_REVIEW_CARD_LIMIT,
};
pub use session::{
    ExhaustedAttemptPolicy, RateOutcome, Reviewer, SessionConfig, SessionError, SessionSummary,
    StudySession, DEFAULT_MAX_ATTEMPTS,
};
