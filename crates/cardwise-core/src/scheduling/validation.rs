//! Validation boundary for stored memory state
//!
//! Rows coming back from storage may carry NaN, infinite, or out-of-range
//! parameters. Every strategy call passes its input through [`sanitize`] once;
//! the strategies themselves assume clean input.

use serde::{Deserialize, Serialize};

use crate::memory::{
    CardMemoryState, DEFAULT_DIFFICULTY, DEFAULT_EASE_FACTOR, MAX_DIFFICULTY, MAX_EASE_FACTOR,
    MAX_INTERVAL_DAYS, MIN_DIFFICULTY, MIN_EASE_FACTOR, MIN_STABILITY,
};

/// Field of [`CardMemoryState`] that can be corrected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateField {
    EaseFactor,
    Difficulty,
    Stability,
    Retrievability,
    IntervalDays,
}

impl StateField {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            StateField::EaseFactor => "ease_factor",
            StateField::Difficulty => "difficulty",
            StateField::Stability => "stability",
            StateField::Retrievability => "retrievability",
            StateField::IntervalDays => "interval_days",
        }
    }
}

impl std::fmt::Display for StateField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One field that was clamped or reset before scheduling
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Correction {
    pub field: StateField,
    /// Value read from storage
    pub found: f64,
    /// Value used instead
    pub replaced_with: f64,
}

/// Clamp every bounded field into range, resetting non-finite values.
///
/// Returns the cleaned state and the list of corrections applied (empty for a
/// well-formed row).
pub fn sanitize(state: &CardMemoryState) -> (CardMemoryState, Vec<Correction>) {
    let mut clean = state.clone();
    let mut corrections = Vec::new();

    clean.ease_factor = checked(
        StateField::EaseFactor,
        state.ease_factor,
        MIN_EASE_FACTOR,
        MAX_EASE_FACTOR,
        DEFAULT_EASE_FACTOR,
        &mut corrections,
    );
    clean.difficulty = checked(
        StateField::Difficulty,
        state.difficulty,
        MIN_DIFFICULTY,
        MAX_DIFFICULTY,
        DEFAULT_DIFFICULTY,
        &mut corrections,
    );
    clean.stability = checked(
        StateField::Stability,
        state.stability,
        MIN_STABILITY,
        f64::MAX,
        MIN_STABILITY,
        &mut corrections,
    );
    clean.retrievability = checked(
        StateField::Retrievability,
        state.retrievability,
        0.0,
        1.0,
        1.0,
        &mut corrections,
    );

    if state.interval_days > MAX_INTERVAL_DAYS {
        corrections.push(Correction {
            field: StateField::IntervalDays,
            found: state.interval_days as f64,
            replaced_with: MAX_INTERVAL_DAYS as f64,
        });
        clean.interval_days = MAX_INTERVAL_DAYS;
    }

    (clean, corrections)
}

/// Whether a state would pass through [`sanitize`] unchanged
pub fn is_well_formed(state: &CardMemoryState) -> bool {
    sanitize(state).1.is_empty()
}

fn checked(
    field: StateField,
    value: f64,
    min: f64,
    max: f64,
    fallback: f64,
    corrections: &mut Vec<Correction>,
) -> f64 {
    let replaced_with = if !value.is_finite() {
        fallback
    } else {
        value.clamp(min, max)
    };

    // NaN != NaN, so a reset always registers
    if replaced_with != value {
        corrections.push(Correction {
            field,
            found: value,
            replaced_with,
        });
    }
    replaced_with
}
