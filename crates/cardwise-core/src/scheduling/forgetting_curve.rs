//! Forgetting-Curve strategy (FSRS family)
//!
//! Models memory as exponential decay and schedules the next review for the
//! moment predicted recall drops to the target retention.
//!
//! ## Core Formulas:
//! - Retrievability: R(t) = e^(-t/S)
//! - Interval: t = -S * ln(target_retention), clamped to [1, 36500]
//! - Recall: S' = S * (1 + e^w1 * D^-w2 * S^-w3 * (1-R)^w4)
//! - Lapse: S' = w8 * S^lapse_exponent, never above S, never below 0.1
//! - Difficulty: D' = D + w5 * (5 - rating - (1 + 3R))

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::memory::{
    CardMemoryState, LifecycleState, Rating, MAX_DIFFICULTY, MAX_EASE_FACTOR, MAX_INTERVAL_DAYS,
    MIN_DIFFICULTY, MIN_EASE_FACTOR, MIN_STABILITY,
};

// ============================================================================
// CONSTANTS
// ============================================================================

/// Target probability of recall at the scheduled review
pub const DEFAULT_RETENTION: f64 = 0.9;

/// Accepted range for a requested retention
pub const MIN_RETENTION: f64 = 0.5;
pub const MAX_RETENTION: f64 = 0.99;

/// Difficulty assigned when a new card is failed outright
pub const NEW_LAPSE_DIFFICULTY: f64 = 7.0;

/// Default weights, indexed from w1:
///
/// | Index | Weight | Role |
/// |-------|--------|------|
/// | 0 | w1 | stability gain scale, e^w1 |
/// | 1 | w2 | difficulty damping, D^-w2 |
/// | 2 | w3 | diminishing returns, S^-w3 |
/// | 3 | w4 | desirable difficulty, (1-R)^w4 |
/// | 4 | w5 | difficulty step |
/// | 5 | w6 | initial stability base |
/// | 6 | w7 | initial stability growth |
/// | 7 | w8 | lapse stability factor |
/// | 8 | -  | lapse stability exponent |
pub const DEFAULT_WEIGHTS: [f64; 9] = [
    0.4072, 1.1829, 3.1262, 15.4722, 0.5846, 1.0, 0.1, 0.9, 0.5,
];

// ============================================================================
// PARAMETERS
// ============================================================================

/// How a Hard rating is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum HardRatingPolicy {
    /// Hard is a successful recall with a shortened interval
    #[default]
    Recall,
    /// Hard is handled like Again
    Lapse,
}

impl std::str::FromStr for HardRatingPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "recall" => Ok(HardRatingPolicy::Recall),
            "lapse" => Ok(HardRatingPolicy::Lapse),
            _ => Err(format!("Unknown hard rating policy: {}", s)),
        }
    }
}

/// Tunable constants of the forgetting-curve strategy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ForgettingCurveParameters {
    /// Model weights, see [`DEFAULT_WEIGHTS`]
    pub weights: [f64; 9],
    /// Target retention in (0, 1)
    pub request_retention: f64,
    /// Upper bound on scheduled intervals
    pub maximum_interval: u32,
    /// Interval multiplier for Easy on a known card
    pub easy_bonus: f64,
    /// Interval multiplier for Hard
    pub hard_factor: f64,
    /// Whether Hard counts as recall or lapse
    pub hard_rating: HardRatingPolicy,
}

impl Default for ForgettingCurveParameters {
    fn default() -> Self {
        Self {
            weights: DEFAULT_WEIGHTS,
            request_retention: DEFAULT_RETENTION,
            maximum_interval: MAX_INTERVAL_DAYS,
            easy_bonus: 1.2,
            hard_factor: 0.5,
            hard_rating: HardRatingPolicy::Recall,
        }
    }
}

// ============================================================================
// CORE FUNCTIONS
// ============================================================================

/// Probability of recall after `elapsed_days` for a memory of `stability`
pub fn retrievability(stability: f64, elapsed_days: f64) -> f64 {
    if stability <= 0.0 || elapsed_days <= 0.0 {
        return 1.0;
    }
    (-elapsed_days / stability).exp().clamp(0.0, 1.0)
}

/// Interval at which recall decays to the default 90% target
pub fn next_interval(stability: f64) -> u32 {
    next_interval_with_retention(stability, DEFAULT_RETENTION, MAX_INTERVAL_DAYS)
}

/// Interval at which recall decays to `request_retention`
///
/// Always at least one day for positive stability, zero otherwise. The
/// retention is clamped to [0.5, 0.99]; a non-finite one falls back to 0.9.
pub fn next_interval_with_retention(
    stability: f64,
    request_retention: f64,
    maximum_interval: u32,
) -> u32 {
    if stability <= 0.0 || !stability.is_finite() {
        return 0;
    }
    let retention = if request_retention.is_finite() {
        request_retention.clamp(MIN_RETENTION, MAX_RETENTION)
    } else {
        DEFAULT_RETENTION
    };
    let days = -stability * retention.ln();
    days.clamp(1.0, maximum_interval.max(1) as f64).round() as u32
}

/// Stability after the first successful review
pub fn initial_stability(rating: Rating) -> f64 {
    initial_stability_with_weights(rating, &DEFAULT_WEIGHTS)
}

/// Stability after the first successful review, custom weights
pub fn initial_stability_with_weights(rating: Rating, w: &[f64; 9]) -> f64 {
    let r = rating.as_f64();
    (w[5] * r.powf(w[6] * r)).max(MIN_STABILITY)
}

/// Difficulty after the first successful review
pub fn initial_difficulty(rating: Rating) -> f64 {
    (5.0 + (4.0 - rating.as_f64()) * 1.5).clamp(MIN_DIFFICULTY, MAX_DIFFICULTY)
}

/// Stability after a successful review of a known card
///
/// The gain shrinks for harder cards and already-stable memories and grows
/// the lower retrievability was at review time.
pub fn next_recall_stability(
    stability: f64,
    difficulty: f64,
    retrievability: f64,
    w: &[f64; 9],
) -> f64 {
    let stability = stability.max(MIN_STABILITY);
    let surprise = (1.0 - retrievability).clamp(0.0, 1.0);

    let gain = w[0].exp()
        * difficulty.powf(-w[1])
        * stability.powf(-w[2])
        * surprise.powf(w[3]);

    (stability * (1.0 + gain)).max(MIN_STABILITY)
}

/// Stability after a lapse; shrinks by a power law but never reaches zero
pub fn next_forget_stability(stability: f64, w: &[f64; 9]) -> f64 {
    let stability = stability.max(MIN_STABILITY);
    (w[7] * stability.powf(w[8])).clamp(MIN_STABILITY, stability)
}

/// Difficulty shifted toward the rating expected at this retrievability
pub fn next_difficulty(difficulty: f64, rating: Rating, retrievability: f64, w: &[f64; 9]) -> f64 {
    let expected_rating = 1.0 + 3.0 * retrievability;
    let delta = w[4] * (5.0 - rating.as_f64() - expected_rating);
    (difficulty + delta).clamp(MIN_DIFFICULTY, MAX_DIFFICULTY)
}

/// Ease factor equivalent of a difficulty, for interval-multiplier consumers
pub fn ease_factor_from_difficulty(difficulty: f64) -> f64 {
    (2.5 - (difficulty - 5.0) * 0.15).clamp(MIN_EASE_FACTOR, MAX_EASE_FACTOR)
}

// ============================================================================
// SCHEDULER
// ============================================================================

/// FSRS style scheduler
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ForgettingCurve {
    params: ForgettingCurveParameters,
}

impl ForgettingCurve {
    /// Create a scheduler with custom parameters
    pub fn new(params: ForgettingCurveParameters) -> Self {
        Self { params }
    }

    /// Current parameters
    pub fn params(&self) -> &ForgettingCurveParameters {
        &self.params
    }

    fn is_lapse(&self, rating: Rating) -> bool {
        match rating {
            Rating::Again => true,
            Rating::Hard => self.params.hard_rating == HardRatingPolicy::Lapse,
            Rating::Good | Rating::Easy => false,
        }
    }

    fn interval(&self, stability: f64) -> u32 {
        next_interval_with_retention(
            stability,
            self.params.request_retention,
            self.params.maximum_interval,
        )
    }

    fn scaled(&self, interval: u32, rating: Rating, known_card: bool) -> u32 {
        match rating {
            Rating::Hard => ((interval as f64 * self.params.hard_factor).round() as u32).max(1),
            Rating::Easy if known_card => (interval as f64 * self.params.easy_bonus).round() as u32,
            _ => interval,
        }
    }

    /// Compute the next state for a rating at `now`.
    ///
    /// Expects a sanitized state; timestamps and counters are stamped by the
    /// caller.
    pub fn next_state(
        &self,
        state: &CardMemoryState,
        rating: Rating,
        now: DateTime<Utc>,
    ) -> CardMemoryState {
        let w = &self.params.weights;
        let mut next = state.clone();
        let lapse = self.is_lapse(rating);

        if state.is_new() {
            next.lifecycle_state = LifecycleState::Learning;
            if lapse {
                next.stability = MIN_STABILITY;
                next.difficulty = NEW_LAPSE_DIFFICULTY;
                next.retrievability = 0.0;
                next.repetition_count = 0;
                next.interval_days = 0;
            } else {
                next.stability = initial_stability_with_weights(rating, w);
                next.difficulty = initial_difficulty(rating);
                next.retrievability = 1.0;
                next.repetition_count = 1;
                next.interval_days = self.scaled(self.interval(next.stability), rating, false);
            }
        } else {
            let current_r = match state.last_reviewed_at {
                Some(_) => retrievability(state.stability, state.elapsed_days(now)),
                None => 1.0,
            };
            next.difficulty = next_difficulty(state.difficulty, rating, current_r, w);

            if lapse {
                next.stability = next_forget_stability(state.stability, w);
                next.retrievability = 0.0;
                next.repetition_count = 0;
                next.lifecycle_state = LifecycleState::Relearning;
                next.interval_days = 0;
            } else {
                next.stability =
                    next_recall_stability(state.stability, state.difficulty, current_r, w);
                next.retrievability = 1.0;
                next.repetition_count = state.repetition_count + 1;
                next.lifecycle_state = if next.repetition_count >= 2 {
                    LifecycleState::Review
                } else {
                    LifecycleState::Learning
                };
                next.interval_days = self.scaled(self.interval(next.stability), rating, true);
            }
        }

        next.stability = next.stability.max(MIN_STABILITY);
        next.difficulty = next.difficulty.clamp(MIN_DIFFICULTY, MAX_DIFFICULTY);
        next.retrievability = next.retrievability.clamp(0.0, 1.0);
        next.interval_days = next.interval_days.min(self.params.maximum_interval.min(MAX_INTERVAL_DAYS));
        next.ease_factor = ease_factor_from_difficulty(next.difficulty);
        next
    }
}
