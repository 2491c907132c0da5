//! Scheduling Module
//!
//! Two interchangeable spaced repetition algorithms behind one tagged variant:
//!
//! - **Interval-Multiplier** (SM-2 family): intervals grow by a per-card ease factor
//! - **Forgetting-Curve** (FSRS family): intervals follow an exponential decay model
//!
//! The strategy is chosen once per deployment. Mixing both on the same card
//! across reviews would silently blend incompatible semantics.
//!
//! Every call goes through the same edge:
//! 1. [`sanitize`] the stored state (corrections are reported, not fatal)
//! 2. run the strategy's pure state transition
//! 3. stamp review time, counters, and the due date

mod forgetting_curve;
mod interval_multiplier;
mod validation;

pub use forgetting_curve::{
    ease_factor_from_difficulty, initial_difficulty, initial_stability,
    initial_stability_with_weights, next_difficulty, next_forget_stability, next_interval,
    next_interval_with_retention, next_recall_stability, retrievability, ForgettingCurve,
    ForgettingCurveParameters, HardRatingPolicy, DEFAULT_RETENTION, DEFAULT_WEIGHTS,
    NEW_LAPSE_DIFFICULTY,
};
pub use interval_multiplier::{next_ease_factor, IntervalMultiplier, IntervalMultiplierParameters};
pub use validation::{is_well_formed, sanitize, Correction, StateField};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::memory::{CardMemoryState, Rating, MAX_INTERVAL_DAYS};

// ============================================================================
// STRATEGY SELECTION
// ============================================================================

/// Which algorithm a deployment schedules with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// SM-2 style ease-factor multiplication
    IntervalMultiplier,
    /// FSRS style exponential forgetting curve
    #[default]
    ForgettingCurve,
}

impl StrategyKind {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::IntervalMultiplier => "interval_multiplier",
            StrategyKind::ForgettingCurve => "forgetting_curve",
        }
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "interval_multiplier" | "sm2" => Ok(StrategyKind::IntervalMultiplier),
            "forgetting_curve" | "fsrs" => Ok(StrategyKind::ForgettingCurve),
            _ => Err(format!("Unknown strategy: {}", s)),
        }
    }
}

// ============================================================================
// RESULTS
// ============================================================================

/// Result of scheduling one rating
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleOutcome {
    /// State to persist
    pub state: CardMemoryState,
    /// Days until the card is due again
    pub interval_days: u32,
    /// `reviewed_at + interval_days`
    pub due_at: DateTime<Utc>,
    /// Corrections made to the input before scheduling
    pub corrections: Vec<Correction>,
}

/// Interval each rating would produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewIntervals {
    pub again: u32,
    pub hard: u32,
    pub good: u32,
    pub easy: u32,
}

impl PreviewIntervals {
    /// Interval for one rating
    pub fn get(&self, rating: Rating) -> u32 {
        match rating {
            Rating::Again => self.again,
            Rating::Hard => self.hard,
            Rating::Good => self.good,
            Rating::Easy => self.easy,
        }
    }

    /// `(rating, interval)` pairs in rating order
    pub fn iter(&self) -> impl Iterator<Item = (Rating, u32)> + '_ {
        Rating::ALL.into_iter().map(|rating| (rating, self.get(rating)))
    }
}

/// Preview intervals plus any corrections made to the input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preview {
    pub intervals: PreviewIntervals,
    pub corrections: Vec<Correction>,
}

// ============================================================================
// STRATEGY
// ============================================================================

/// A configured scheduling algorithm
#[derive(Debug, Clone, PartialEq)]
pub enum Strategy {
    IntervalMultiplier(IntervalMultiplier),
    ForgettingCurve(ForgettingCurve),
}

impl Strategy {
    /// Strategy of `kind` with default parameters
    pub fn from_kind(kind: StrategyKind) -> Self {
        match kind {
            StrategyKind::IntervalMultiplier => {
                Strategy::IntervalMultiplier(IntervalMultiplier::default())
            }
            StrategyKind::ForgettingCurve => Strategy::ForgettingCurve(ForgettingCurve::default()),
        }
    }

    /// Which algorithm this is
    pub fn kind(&self) -> StrategyKind {
        match self {
            Strategy::IntervalMultiplier(_) => StrategyKind::IntervalMultiplier,
            Strategy::ForgettingCurve(_) => StrategyKind::ForgettingCurve,
        }
    }

    /// Apply a rating to a stored state.
    ///
    /// Pure: the only time dependence is `now`, which stamps the review and
    /// (for the forgetting curve) fixes the elapsed time since the last review.
    pub fn review(
        &self,
        state: &CardMemoryState,
        rating: Rating,
        now: DateTime<Utc>,
    ) -> ScheduleOutcome {
        let (clean, corrections) = sanitize(state);
        let mut next = self.transition(&clean, rating, now);

        next.interval_days = next.interval_days.min(MAX_INTERVAL_DAYS);
        next.last_reviewed_at = Some(now);
        next.due_at = now + Duration::days(i64::from(next.interval_days));
        next.total_reviews = clean.total_reviews.saturating_add(1);
        next.correct_reviews = clean
            .correct_reviews
            .saturating_add(u32::from(rating.is_recalled()));

        tracing::debug!(
            strategy = %self.kind(),
            rating = rating.as_i32(),
            from = %clean.lifecycle_state,
            to = %next.lifecycle_state,
            interval_days = next.interval_days,
            "Scheduled review"
        );

        ScheduleOutcome {
            interval_days: next.interval_days,
            due_at: next.due_at,
            state: next,
            corrections,
        }
    }

    /// Interval each rating would produce, without touching `state`
    pub fn preview(&self, state: &CardMemoryState, now: DateTime<Utc>) -> Preview {
        let (clean, corrections) = sanitize(state);
        let interval = |rating| {
            self.transition(&clean, rating, now)
                .interval_days
                .min(MAX_INTERVAL_DAYS)
        };

        Preview {
            intervals: PreviewIntervals {
                again: interval(Rating::Again),
                hard: interval(Rating::Hard),
                good: interval(Rating::Good),
                easy: interval(Rating::Easy),
            },
            corrections,
        }
    }

    fn transition(
        &self,
        state: &CardMemoryState,
        rating: Rating,
        now: DateTime<Utc>,
    ) -> CardMemoryState {
        match self {
            Strategy::IntervalMultiplier(scheduler) => scheduler.next_state(state, rating),
            Strategy::ForgettingCurve(scheduler) => scheduler.next_state(state, rating, now),
        }
    }
}

impl Default for Strategy {
    fn default() -> Self {
        Strategy::from_kind(StrategyKind::default())
    }
}

impl From<IntervalMultiplier> for Strategy {
    fn from(scheduler: IntervalMultiplier) -> Self {
        Strategy::IntervalMultiplier(scheduler)
    }
}

impl From<ForgettingCurve> for Strategy {
    fn from(scheduler: ForgettingCurve) -> Self {
        Strategy::ForgettingCurve(scheduler)
    }
}

// ============================================================================
// TESTS
// ============================================================================
