//! Diagnostics sink
//!
//! The engine reports corrections, committed reviews, exhausted attempts, and
//! finished sessions to an injected [`ReviewObserver`] instead of a global
//! logger. [`TracingObserver`] forwards everything to `tracing`.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::memory::ReviewEvent;
use crate::scheduling::Correction;
use crate::study::SessionSummary;

/// Receiver of engine diagnostics. Every hook defaults to doing nothing.
pub trait ReviewObserver: Send + Sync {
    /// A stored field was clamped or reset before scheduling
    fn state_corrected(&self, _card_id: &str, _owner_id: &str, _correction: &Correction) {}

    /// A review was persisted
    fn review_committed(&self, _event: &ReviewEvent) {}

    /// A card left a session after failing its final attempt
    fn attempts_exhausted(&self, _owner_id: &str, _card_id: &str, _attempts: u32) {}

    /// A session ended
    fn session_finished(&self, _summary: &SessionSummary) {}
}

/// Discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl ReviewObserver for NoopObserver {}

/// Forwards diagnostics to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl ReviewObserver for TracingObserver {
    fn state_corrected(&self, card_id: &str, owner_id: &str, correction: &Correction) {
        tracing::warn!(
            card_id,
            owner_id,
            field = %correction.field,
            found = correction.found,
            replaced_with = correction.replaced_with,
            "Corrected invalid memory state"
        );
    }

    fn review_committed(&self, event: &ReviewEvent) {
        tracing::debug!(
            card_id = %event.card_id,
            owner_id = %event.owner_id,
            rating = event.rating.as_i32(),
            interval_days = event.new_state.interval_days,
            "Review committed"
        );
    }

    fn attempts_exhausted(&self, owner_id: &str, card_id: &str, attempts: u32) {
        tracing::info!(card_id, owner_id, attempts, "Card removed after final failed attempt");
    }

    fn session_finished(&self, summary: &SessionSummary) {
        tracing::info!(
            owner_id = %summary.owner_id,
            studied = summary.cards_studied,
            correct = summary.cards_correct,
            exhausted = summary.attempts_exhausted,
            abandoned = summary.abandoned,
            elapsed_ms = summary.elapsed_ms,
            "Study session finished"
        );
    }
}

/// Totals of each hook, read with [`CountingObserver::counts`]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ObserverCounts {
    pub corrections: u64,
    pub reviews: u64,
    pub exhausted: u64,
    pub sessions: u64,
}

/// Counts hook invocations
#[derive(Debug, Default)]
pub struct CountingObserver {
    corrections: AtomicU64,
    reviews: AtomicU64,
    exhausted: AtomicU64,
    sessions: AtomicU64,
}

impl CountingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counts(&self) -> ObserverCounts {
        ObserverCounts {
            corrections: self.corrections.load(Ordering::Relaxed),
            reviews: self.reviews.load(Ordering::Relaxed),
            exhausted: self.exhausted.load(Ordering::Relaxed),
            sessions: self.sessions.load(Ordering::Relaxed),
        }
    }
}

impl ReviewObserver for CountingObserver {
    fn state_corrected(&self, _card_id: &str, _owner_id: &str, _correction: &Correction) {
        self.corrections.fetch_add(1, Ordering::Relaxed);
    }

    fn review_committed(&self, _event: &ReviewEvent) {
        self.reviews.fetch_add(1, Ordering::Relaxed);
    }

    fn attempts_exhausted(&self, _owner_id: &str, _card_id: &str, _attempts: u32) {
        self.exhausted.fetch_add(1, Ordering::Relaxed);
    }

    fn session_finished(&self, _summary: &SessionSummary) {
        self.sessions.fetch_add(1, Ordering::Relaxed);
    }
}
