//! Storage Module
//!
//! Data contracts for the persistence collaborator:
//! - [`CardStore`]: memory state reads/writes, review log, daily aggregates, due queries
//! - [`SessionRecorder`]: study-session start/finish records
//!
//! The engine never owns a database. [`InMemoryStore`] implements both traits
//! for tests, benches, and the command-line front end.

mod memory;

pub use memory::{InMemoryStore, SessionRecord, StoreSnapshot, StoredState};

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};

use crate::memory::{CardMemoryState, CardWithState, DailyDelta, ReviewEvent};
use crate::study::SessionSummary;

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Storage error type
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Row not found
    #[error("Not found: {0}")]
    NotFound(String),
    /// Write refused by a permission or consistency check
    #[error("Write rejected: {0}")]
    Rejected(String),
    /// Backend failure (connection, timeout, ...)
    #[error("Storage backend error: {0}")]
    Backend(String),
    /// A lock guarding store state was poisoned
    #[error("Store lock poisoned: {0}")]
    LockPoisoned(String),
    /// Undoing a partial review failed; state and log may disagree
    #[error("Rollback failed after {cause}: {rollback}")]
    RollbackFailed {
        cause: Box<StoreError>,
        rollback: Box<StoreError>,
    },
}

/// Storage result type
pub type Result<T> = std::result::Result<T, StoreError>;

// ============================================================================
// CARD STORE
// ============================================================================

/// Persistence collaborator consumed by the engine.
///
/// Implementations are responsible for cross-request race protection on the
/// same (card, owner) row (row locks, compare-and-swap, ...).
pub trait CardStore: Send + Sync {
    /// Read the memory state of a card for an owner
    fn get_card_memory_state(&self, card_id: &str, owner_id: &str)
    -> Result<Option<CardMemoryState>>;

    /// Overwrite the memory state of an existing (card, owner) row
    fn put_card_memory_state(
        &self,
        card_id: &str,
        owner_id: &str,
        state: &CardMemoryState,
    ) -> Result<()>;

    /// Append to the review log
    fn append_review_event(&self, event: &ReviewEvent) -> Result<()>;

    /// Add `delta` to the owner's statistics for `date`, creating the row if needed
    fn upsert_daily_aggregate(&self, owner_id: &str, date: NaiveDate, delta: &DailyDelta)
    -> Result<()>;

    /// Non-new cards with `due_at <= now`, ordered by `due_at` ascending
    fn query_due(
        &self,
        owner_id: &str,
        deck_id: Option<&str>,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<CardWithState>>;

    /// New cards in creation order
    fn query_new(
        &self,
        owner_id: &str,
        deck_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<CardWithState>>;

    /// Number of cards (new included) with `due_at <= now`
    fn count_due(&self, owner_id: &str, deck_id: Option<&str>, now: DateTime<Utc>)
    -> Result<usize>;

    /// Every `(card_id, state)` row of an owner
    fn list_memory_states(&self, owner_id: &str) -> Result<Vec<(String, CardMemoryState)>>;

    /// Apply a computed review as one logical unit.
    ///
    /// Writes the new state, then appends the event. If the append fails the
    /// previous state is written back so no reader sees a state without its
    /// log entry. The daily aggregate is best effort: its failure is logged
    /// and does not undo the review. Backends with real transactions should
    /// override this.
    fn commit_review(&self, event: &ReviewEvent) -> Result<()> {
        self.put_card_memory_state(&event.card_id, &event.owner_id, &event.new_state)?;

        if let Err(cause) = self.append_review_event(event) {
            if let Err(rollback) =
                self.put_card_memory_state(&event.card_id, &event.owner_id, &event.previous_state)
            {
                tracing::error!(
                    card_id = %event.card_id,
                    owner_id = %event.owner_id,
                    "Review log append failed and state rollback failed"
                );
                return Err(StoreError::RollbackFailed {
                    cause: Box::new(cause),
                    rollback: Box::new(rollback),
                });
            }
            return Err(cause);
        }

        if let Err(e) =
            self.upsert_daily_aggregate(&event.owner_id, event.review_date(), &event.daily_delta())
        {
            tracing::warn!(
                card_id = %event.card_id,
                owner_id = %event.owner_id,
                "Failed to update daily aggregate: {}",
                e
            );
        }
        Ok(())
    }
}

impl<T: CardStore + ?Sized> CardStore for Arc<T> {
    fn get_card_memory_state(
        &self,
        card_id: &str,
        owner_id: &str,
    ) -> Result<Option<CardMemoryState>> {
        (**self).get_card_memory_state(card_id, owner_id)
    }

    fn put_card_memory_state(
        &self,
        card_id: &str,
        owner_id: &str,
        state: &CardMemoryState,
    ) -> Result<()> {
        (**self).put_card_memory_state(card_id, owner_id, state)
    }

    fn append_review_event(&self, event: &ReviewEvent) -> Result<()> {
        (**self).append_review_event(event)
    }

    fn upsert_daily_aggregate(
        &self,
        owner_id: &str,
        date: NaiveDate,
        delta: &DailyDelta,
    ) -> Result<()> {
        (**self).upsert_daily_aggregate(owner_id, date, delta)
    }

    fn query_due(
        &self,
        owner_id: &str,
        deck_id: Option<&str>,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<CardWithState>> {
        (**self).query_due(owner_id, deck_id, now, limit)
    }

    fn query_new(
        &self,
        owner_id: &str,
        deck_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<CardWithState>> {
        (**self).query_new(owner_id, deck_id, limit)
    }

    fn count_due(
        &self,
        owner_id: &str,
        deck_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<usize> {
        (**self).count_due(owner_id, deck_id, now)
    }

    fn list_memory_states(&self, owner_id: &str) -> Result<Vec<(String, CardMemoryState)>> {
        (**self).list_memory_states(owner_id)
    }

    fn commit_review(&self, event: &ReviewEvent) -> Result<()> {
        (**self).commit_review(event)
    }
}

// ============================================================================
// SESSION RECORDER
// ============================================================================

/// Collaborator receiving study-session records
pub trait SessionRecorder: Send + Sync {
    /// Open a session record and return its id
    fn start_session(
        &self,
        owner_id: &str,
        deck_id: Option<&str>,
        started_at: DateTime<Utc>,
    ) -> Result<String>;

    /// Close a session record with its summary counters
    fn finish_session(&self, session_id: &str, summary: &SessionSummary) -> Result<()>;
}
