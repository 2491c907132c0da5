//! Interval-Multiplier strategy (SM-2 family)
//!
//! Each successful review multiplies the previous interval by the card's ease
//! factor. Hard and Again are lapses: they reset the repetition streak and send
//! the card back to (re)learning with a zero-day interval.
//!
//! ## Core Formulas:
//! - Ease: EF' = EF + (0.1 - (5-q) * (0.08 + (5-q) * 0.02)), clamped to [1.3, 2.5]
//! - Interval: 1 (or 4 on Easy), then 6, then round(I * EF')

use serde::{Deserialize, Serialize};

use crate::memory::{
    CardMemoryState, LifecycleState, Rating, DEFAULT_EASE_FACTOR, MAX_EASE_FACTOR,
    MAX_INTERVAL_DAYS, MIN_EASE_FACTOR,
};

/// Tunable constants of the interval-multiplier strategy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct IntervalMultiplierParameters {
    /// Interval after the first success rated Good
    pub first_interval_days: u32,
    /// Interval after the first success rated Easy
    pub first_easy_interval_days: u32,
    /// Interval after the second consecutive success
    pub second_interval_days: u32,
    /// Extra multiplier for Easy from the third success on
    pub easy_bonus: f64,
}

impl Default for IntervalMultiplierParameters {
    fn default() -> Self {
        Self {
            first_interval_days: 1,
            first_easy_interval_days: 4,
            second_interval_days: 6,
            easy_bonus: 1.3,
        }
    }
}

/// SM-2 style scheduler
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IntervalMultiplier {
    params: IntervalMultiplierParameters,
}

impl IntervalMultiplier {
    /// Create a scheduler with custom parameters
    pub fn new(params: IntervalMultiplierParameters) -> Self {
        Self { params }
    }

    /// Current parameters
    pub fn params(&self) -> &IntervalMultiplierParameters {
        &self.params
    }

    /// Compute the next state for a rating.
    ///
    /// Expects a sanitized state; timestamps and counters are stamped by the
    /// caller.
    pub fn next_state(&self, state: &CardMemoryState, rating: Rating) -> CardMemoryState {
        let mut next = state.clone();

        // Repeated same-session failures while relearning do not compound the penalty
        next.ease_factor = if rating.is_lapse() && state.lifecycle_state == LifecycleState::Relearning
        {
            state.ease_factor.max(MIN_EASE_FACTOR)
        } else {
            next_ease_factor(state.ease_factor, rating)
        };

        if rating.is_lapse() {
            next.repetition_count = 0;
            next.interval_days = 0;
            next.lifecycle_state = match state.lifecycle_state {
                LifecycleState::New => LifecycleState::Learning,
                _ => LifecycleState::Relearning,
            };
            return next;
        }

        next.repetition_count = state.repetition_count + 1;
        let interval = match next.repetition_count {
            1 => {
                next.lifecycle_state = LifecycleState::Learning;
                if rating == Rating::Easy {
                    self.params.first_easy_interval_days
                } else {
                    self.params.first_interval_days
                }
            }
            2 => {
                next.lifecycle_state = LifecycleState::Review;
                self.params.second_interval_days
            }
            _ => {
                next.lifecycle_state = LifecycleState::Review;
                let base = (state.interval_days as f64 * next.ease_factor).round();
                let adjusted = if rating == Rating::Easy {
                    (base * self.params.easy_bonus).round()
                } else {
                    base
                };
                adjusted.clamp(1.0, MAX_INTERVAL_DAYS as f64) as u32
            }
        };

        next.interval_days = interval.clamp(1, MAX_INTERVAL_DAYS);
        next
    }
}

/// Apply the SM-2 ease update for a rating.
///
/// The result is always finite and within [1.3, 2.5].
pub fn next_ease_factor(ease_factor: f64, rating: Rating) -> f64 {
    let q = 5.0 - rating.as_f64();
    let updated = ease_factor + (0.1 - q * (0.08 + q * 0.02));

    if !updated.is_finite() {
        return DEFAULT_EASE_FACTOR;
    }
    updated.clamp(MIN_EASE_FACTOR, MAX_EASE_FACTOR)
}
