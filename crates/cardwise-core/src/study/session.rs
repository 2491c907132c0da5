//! Session retry queue
//!
//! Cards failed inside a study session go to the back of the queue and are
//! shown again until they are recalled or their attempts run out. The queue
//! is consumed from the head, so requeuing never skips or repeats the card
//! that follows.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::memory::{CardWithState, Rating};
use crate::service::{ReviewError, ReviewReceipt};

/// Default number of ratings a card may receive in one session
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

// ============================================================================
// CONFIGURATION
// ============================================================================

/// What happens when a card fails its final attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExhaustedAttemptPolicy {
    /// Drop the card without applying the last rating
    #[default]
    Evict,
    /// Apply the last rating, then drop the card
    Schedule,
}

impl ExhaustedAttemptPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExhaustedAttemptPolicy::Evict => "evict",
            ExhaustedAttemptPolicy::Schedule => "schedule",
        }
    }
}

impl std::fmt::Display for ExhaustedAttemptPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ExhaustedAttemptPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "evict" => Ok(ExhaustedAttemptPolicy::Evict),
            "schedule" => Ok(ExhaustedAttemptPolicy::Schedule),
            _ => Err(format!("Unknown exhausted-attempt policy: {}", s)),
        }
    }
}

/// Session retry settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SessionConfig {
    /// Ratings allowed per card (at least 1)
    pub max_attempts: u32,
    pub exhausted_policy: ExhaustedAttemptPolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            exhausted_policy: ExhaustedAttemptPolicy::default(),
        }
    }
}

// ============================================================================
// TYPES
// ============================================================================

/// Applies a rating to a card on behalf of a session
pub trait Reviewer {
    fn review_card(
        &self,
        owner_id: &str,
        card_id: &str,
        rating: Rating,
        time_spent_ms: u64,
        now: DateTime<Utc>,
    ) -> Result<ReviewReceipt, ReviewError>;
}

/// Session errors
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Study session has no pending cards")]
    Empty,
    #[error(transparent)]
    Review(#[from] ReviewError),
}

/// What a rating did to the head of the queue
#[derive(Debug, Clone, PartialEq)]
pub enum RateOutcome {
    /// Recalled; the card left the queue
    Completed {
        card_id: String,
        attempts: u32,
        receipt: ReviewReceipt,
    },
    /// Failed; the card moved to the back of the queue
    Requeued {
        card_id: String,
        attempts: u32,
        receipt: ReviewReceipt,
    },
    /// Failed on the final attempt; the card left the queue.
    /// `receipt` is `None` when the last rating was not applied.
    Exhausted {
        card_id: String,
        attempts: u32,
        receipt: Option<ReviewReceipt>,
    },
}

impl RateOutcome {
    pub fn card_id(&self) -> &str {
        match self {
            RateOutcome::Completed { card_id, .. }
            | RateOutcome::Requeued { card_id, .. }
            | RateOutcome::Exhausted { card_id, .. } => card_id,
        }
    }
}

/// Counters reported when a session ends
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub session_id: Option<String>,
    pub owner_id: String,
    pub deck_id: Option<String>,
    /// Cards that left the queue after being rated
    pub cards_studied: u32,
    /// Cards that left the queue recalled
    pub cards_correct: u32,
    pub attempts_exhausted: u32,
    /// Ratings that reached the scheduler
    pub reviews_applied: u32,
    /// Cards still queued when the session ended
    pub cards_remaining: u32,
    pub abandoned: bool,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}

impl SessionSummary {
    /// Summary of a session that did nothing
    pub fn empty(owner_id: &str, deck_id: Option<&str>, at: DateTime<Utc>) -> Self {
        Self {
            session_id: None,
            owner_id: owner_id.to_string(),
            deck_id: deck_id.map(str::to_string),
            cards_studied: 0,
            cards_correct: 0,
            attempts_exhausted: 0,
            reviews_applied: 0,
            cards_remaining: 0,
            abandoned: false,
            started_at: at,
            ended_at: at,
            elapsed_ms: 0,
        }
    }

    /// Share of studied cards that were recalled, in [0, 1]
    pub fn accuracy(&self) -> f64 {
        if self.cards_studied == 0 {
            return 0.0;
        }
        self.cards_correct as f64 / self.cards_studied as f64
    }
}

// ============================================================================
// SESSION
// ============================================================================

/// An in-progress study session
#[derive(Debug, Clone)]
pub struct StudySession {
    id: Option<String>,
    owner_id: String,
    deck_id: Option<String>,
    config: SessionConfig,
    queue: VecDeque<CardWithState>,
    attempts: HashMap<String, u32>,
    started_at: DateTime<Utc>,
    cards_studied: u32,
    cards_correct: u32,
    attempts_exhausted: u32,
    reviews_applied: u32,
}

impl StudySession {
    /// Start a session over `cards` in the given order
    pub fn new(
        owner_id: &str,
        deck_id: Option<&str>,
        cards: Vec<CardWithState>,
        config: SessionConfig,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: None,
            owner_id: owner_id.to_string(),
            deck_id: deck_id.map(str::to_string),
            config: SessionConfig {
                max_attempts: config.max_attempts.max(1),
                ..config
            },
            queue: cards.into(),
            attempts: HashMap::new(),
            started_at,
            cards_studied: 0,
            cards_correct: 0,
            attempts_exhausted: 0,
            reviews_applied: 0,
        }
    }

    /// Attach the id assigned by a session recorder
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    pub fn deck_id(&self) -> Option<&str> {
        self.deck_id.as_deref()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Card to show next
    pub fn current(&self) -> Option<&CardWithState> {
        self.queue.front()
    }

    /// Cards still queued, including the current one
    pub fn remaining(&self) -> usize {
        self.queue.len()
    }

    pub fn is_finished(&self) -> bool {
        self.queue.is_empty()
    }

    /// Ratings recorded so far for a card
    pub fn attempts_for(&self, card_id: &str) -> u32 {
        self.attempts.get(card_id).copied().unwrap_or(0)
    }

    /// Rate the card at the head of the queue.
    ///
    /// On error the queue and counters are unchanged and the card stays at
    /// the head.
    pub fn rate<R: Reviewer + ?Sized>(
        &mut self,
        reviewer: &R,
        rating: Rating,
        time_spent_ms: u64,
        now: DateTime<Utc>,
    ) -> Result<RateOutcome, SessionError> {
        let card_id = self
            .queue
            .front()
            .map(|entry| entry.id().to_string())
            .ok_or(SessionError::Empty)?;
        let attempt = self.attempts_for(&card_id) + 1;
        let final_attempt = attempt >= self.config.max_attempts;

        if rating.is_lapse()
            && final_attempt
            && self.config.exhausted_policy == ExhaustedAttemptPolicy::Evict
        {
            self.queue.pop_front();
            self.record_exhausted(&card_id, attempt);
            return Ok(RateOutcome::Exhausted {
                card_id,
                attempts: attempt,
                receipt: None,
            });
        }

        let receipt =
            reviewer.review_card(&self.owner_id, &card_id, rating, time_spent_ms, now)?;
        self.reviews_applied += 1;
        self.attempts.insert(card_id.clone(), attempt);

        let Some(mut entry) = self.queue.pop_front() else {
            return Err(SessionError::Empty);
        };
        entry.state = receipt.state.clone();

        if !rating.is_lapse() {
            self.cards_studied += 1;
            self.cards_correct += 1;
            Ok(RateOutcome::Completed {
                card_id,
                attempts: attempt,
                receipt,
            })
        } else if final_attempt {
            self.record_exhausted(&card_id, attempt);
            Ok(RateOutcome::Exhausted {
                card_id,
                attempts: attempt,
                receipt: Some(receipt),
            })
        } else {
            self.queue.push_back(entry);
            Ok(RateOutcome::Requeued {
                card_id,
                attempts: attempt,
                receipt,
            })
        }
    }

    /// End the session, keeping whatever is still queued unreviewed
    pub fn abandon(self, now: DateTime<Utc>) -> SessionSummary {
        self.summarize(now, true)
    }

    /// End the session. Ending with cards still queued counts as abandoning.
    pub fn finish(self, now: DateTime<Utc>) -> SessionSummary {
        let abandoned = !self.queue.is_empty();
        self.summarize(now, abandoned)
    }

    fn record_exhausted(&mut self, card_id: &str, attempt: u32) {
        self.attempts.insert(card_id.to_string(), attempt);
        self.cards_studied += 1;
        self.attempts_exhausted += 1;
        tracing::debug!(card_id, attempts = attempt, "Card exhausted its session attempts");
    }

    fn summarize(self, now: DateTime<Utc>, abandoned: bool) -> SessionSummary {
        let elapsed_ms = (now - self.started_at).num_milliseconds().max(0) as u64;
        SessionSummary {
            session_id: self.id,
            owner_id: self.owner_id,
            deck_id: self.deck_id,
            cards_studied: self.cards_studied,
            cards_correct: self.cards_correct,
            attempts_exhausted: self.attempts_exhausted,
            reviews_applied: self.reviews_applied,
            cards_remaining: self.queue.len() as u32,
            abandoned,
            started_at: self.started_at,
            ended_at: now,
            elapsed_ms,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
