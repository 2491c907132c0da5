//! Memory module - Core types and data structures
//!
//! Implements the per-card memory model with:
//! - Lifecycle state and recall ratings
//! - Interval-multiplier and forgetting-curve parameters on one record
//! - Append-only review events and daily aggregates

mod record;
mod state;

pub use record::{Card, CardWithState, DailyAggregate, DailyDelta, ReviewEvent};
pub use state::{
    CardMemoryState, LifecycleState, Rating, RatingError, DEFAULT_DIFFICULTY, DEFAULT_EASE_FACTOR,
    MAX_DIFFICULTY, MAX_EASE_FACTOR, MAX_INTERVAL_DAYS, MIN_DIFFICULTY, MIN_EASE_FACTOR,
    MIN_STABILITY,
};
