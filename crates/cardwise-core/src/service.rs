//! Review Service
//!
//! The engine's public face. Wires a configured [`Strategy`] to a
//! [`CardStore`], reports diagnostics to a [`ReviewObserver`], and drives
//! study sessions.
//!
//! Every operation has an `_at` form taking an explicit `now`; the plain form
//! uses the current time.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::interval_format::format_interval_in;
use crate::memory::{CardMemoryState, CardWithState, Rating, ReviewEvent};
use crate::observe::{ReviewObserver, TracingObserver};
use crate::scheduling::{sanitize, Correction, PreviewIntervals, Strategy};
use crate::storage::{CardStore, SessionRecorder, StoreError};
use crate::study::{
    self, RateOutcome, Reviewer, SessionError, SessionSummary, StudySession,
};

// ============================================================================
// TYPES
// ============================================================================

/// Review error type
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum ReviewError {
    /// No memory state exists for the (card, owner) pair
    #[error("Card not found: {card_id}")]
    CardNotFound { card_id: String },
    /// The store failed to read or write
    #[error("Persistence failed: {0}")]
    Persistence(#[from] StoreError),
}

/// Result of an applied review
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewReceipt {
    pub card_id: String,
    pub interval_days: u32,
    pub due_at: DateTime<Utc>,
    /// State as persisted
    pub state: CardMemoryState,
}

/// Correction applied to one stored row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardCorrection {
    pub card_id: String,
    pub correction: Correction,
}

/// Outcome of [`ReviewService::repair_memory_states`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairReport {
    /// Rows inspected
    pub scanned: usize,
    /// Rows rewritten
    pub repaired: usize,
    pub corrections: Vec<CardCorrection>,
}

// ============================================================================
// SERVICE
// ============================================================================

/// Scheduling engine bound to a store
pub struct ReviewService<S> {
    store: S,
    strategy: Strategy,
    config: EngineConfig,
    observer: Arc<dyn ReviewObserver>,
    recorder: Option<Arc<dyn SessionRecorder>>,
}

impl<S: CardStore> ReviewService<S> {
    /// Create a service using the configured strategy and a tracing observer
    pub fn new(store: S, config: EngineConfig) -> Self {
        Self {
            store,
            strategy: config.build_strategy(),
            config,
            observer: Arc::new(TracingObserver),
            recorder: None,
        }
    }

    /// Replace the diagnostics sink
    pub fn with_observer(mut self, observer: Arc<dyn ReviewObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Record sessions with `recorder`
    pub fn with_recorder(mut self, recorder: Arc<dyn SessionRecorder>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    /// Schedule with an explicitly built strategy instead of the configured one
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.config.strategy = strategy.kind();
        self.strategy = strategy;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn strategy(&self) -> &Strategy {
        &self.strategy
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ========================================================================
    // REVIEWS
    // ========================================================================

    /// Apply a rating to a card now
    pub fn review(
        &self,
        owner_id: &str,
        card_id: &str,
        rating: Rating,
        time_spent_ms: u64,
    ) -> Result<ReviewReceipt, ReviewError> {
        self.review_at(owner_id, card_id, rating, time_spent_ms, Utc::now())
    }

    /// Apply a rating to a card at `now`.
    ///
    /// On error the stored state is unchanged.
    pub fn review_at(
        &self,
        owner_id: &str,
        card_id: &str,
        rating: Rating,
        time_spent_ms: u64,
        now: DateTime<Utc>,
    ) -> Result<ReviewReceipt, ReviewError> {
        let previous = self.load_state(owner_id, card_id)?;
        let outcome = self.strategy.review(&previous, rating, now);
        self.report_corrections(owner_id, card_id, &outcome.corrections);

        let event = ReviewEvent::new(
            card_id,
            owner_id,
            rating,
            self.strategy.kind(),
            previous,
            outcome.state.clone(),
            now,
            time_spent_ms,
        );
        self.store.commit_review(&event)?;
        self.observer.review_committed(&event);

        Ok(ReviewReceipt {
            card_id: card_id.to_string(),
            interval_days: outcome.interval_days,
            due_at: outcome.due_at,
            state: outcome.state,
        })
    }

    /// Interval each rating would produce now
    pub fn preview_intervals(
        &self,
        owner_id: &str,
        card_id: &str,
    ) -> Result<PreviewIntervals, ReviewError> {
        self.preview_intervals_at(owner_id, card_id, Utc::now())
    }

    /// Interval each rating would produce at `now`. Nothing is written.
    pub fn preview_intervals_at(
        &self,
        owner_id: &str,
        card_id: &str,
        now: DateTime<Utc>,
    ) -> Result<PreviewIntervals, ReviewError> {
        let state = self.load_state(owner_id, card_id)?;
        let preview = self.strategy.preview(&state, now);
        self.report_corrections(owner_id, card_id, &preview.corrections);
        Ok(preview.intervals)
    }

    /// Human-readable label for a day count in the configured locale
    pub fn format_interval(&self, days: u32) -> String {
        format_interval_in(days, self.config.locale)
    }

    // ========================================================================
    // SELECTION
    // ========================================================================

    /// Cards for a session starting now
    pub fn select_study_cards(
        &self,
        owner_id: &str,
        deck_id: Option<&str>,
    ) -> Result<Vec<CardWithState>, ReviewError> {
        self.select_study_cards_at(owner_id, deck_id, Utc::now())
    }

    /// Cards for a session starting at `now`
    pub fn select_study_cards_at(
        &self,
        owner_id: &str,
        deck_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Vec<CardWithState>, ReviewError> {
        self.select_study_cards_with_rng(owner_id, deck_id, now, &mut rand::thread_rng())
    }

    /// Cards for a session, shuffled with `rng`
    pub fn select_study_cards_with_rng<R: Rng + ?Sized>(
        &self,
        owner_id: &str,
        deck_id: Option<&str>,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<Vec<CardWithState>, ReviewError> {
        Ok(study::select_study_cards(
            &self.store,
            owner_id,
            deck_id,
            self.config.limits,
            now,
            rng,
        )?)
    }

    /// Number of cards due now
    pub fn count_due(&self, owner_id: &str, deck_id: Option<&str>) -> Result<usize, ReviewError> {
        self.count_due_at(owner_id, deck_id, Utc::now())
    }

    /// Number of cards due at `now`, new cards included
    pub fn count_due_at(
        &self,
        owner_id: &str,
        deck_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<usize, ReviewError> {
        Ok(study::count_due(&self.store, owner_id, deck_id, now)?)
    }

    // ========================================================================
    // MAINTENANCE
    // ========================================================================

    /// Rewrite every stored row of an owner that fails validation
    pub fn repair_memory_states(&self, owner_id: &str) -> Result<RepairReport, ReviewError> {
        let rows = self.store.list_memory_states(owner_id)?;
        let mut report = RepairReport {
            scanned: rows.len(),
            ..RepairReport::default()
        };

        for (card_id, state) in rows {
            let (clean, corrections) = sanitize(&state);
            if corrections.is_empty() {
                continue;
            }
            self.store.put_card_memory_state(&card_id, owner_id, &clean)?;
            self.report_corrections(owner_id, &card_id, &corrections);
            report.repaired += 1;
            report
                .corrections
                .extend(corrections.into_iter().map(|correction| CardCorrection {
                    card_id: card_id.clone(),
                    correction,
                }));
        }

        tracing::info!(
            owner_id,
            scanned = report.scanned,
            repaired = report.repaired,
            "Memory state repair complete"
        );
        Ok(report)
    }

    // ========================================================================
    // SESSIONS
    // ========================================================================

    /// Select cards and open a session now
    pub fn start_session(
        &self,
        owner_id: &str,
        deck_id: Option<&str>,
    ) -> Result<StudySession, ReviewError> {
        self.start_session_at(owner_id, deck_id, Utc::now())
    }

    /// Select cards and open a session at `now`
    pub fn start_session_at(
        &self,
        owner_id: &str,
        deck_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<StudySession, ReviewError> {
        let cards = self.select_study_cards_at(owner_id, deck_id, now)?;
        self.open_session(owner_id, deck_id, cards, now)
    }

    /// Open a session over an already selected card order
    pub fn open_session(
        &self,
        owner_id: &str,
        deck_id: Option<&str>,
        cards: Vec<CardWithState>,
        now: DateTime<Utc>,
    ) -> Result<StudySession, ReviewError> {
        let session = StudySession::new(owner_id, deck_id, cards, self.config.session, now);
        match &self.recorder {
            Some(recorder) => {
                let id = recorder.start_session(owner_id, deck_id, now)?;
                Ok(session.with_id(id))
            }
            None => Ok(session),
        }
    }

    /// Rate the current card of a session
    pub fn rate_in_session(
        &self,
        session: &mut StudySession,
        rating: Rating,
        time_spent_ms: u64,
        now: DateTime<Utc>,
    ) -> Result<RateOutcome, SessionError> {
        let outcome = session.rate(self, rating, time_spent_ms, now)?;
        if let RateOutcome::Exhausted {
            card_id, attempts, ..
        } = &outcome
        {
            self.observer
                .attempts_exhausted(session.owner_id(), card_id, *attempts);
        }
        Ok(outcome)
    }

    /// Close a session and record its summary
    pub fn finish_session(&self, session: StudySession, now: DateTime<Utc>) -> SessionSummary {
        let summary = session.finish(now);
        self.record_summary(&summary);
        summary
    }

    /// Close a session early and record its summary
    pub fn abandon_session(&self, session: StudySession, now: DateTime<Utc>) -> SessionSummary {
        let summary = session.abandon(now);
        self.record_summary(&summary);
        summary
    }

    // ========================================================================
    // INTERNALS
    // ========================================================================

    fn load_state(&self, owner_id: &str, card_id: &str) -> Result<CardMemoryState, ReviewError> {
        self.store
            .get_card_memory_state(card_id, owner_id)?
            .ok_or_else(|| ReviewError::CardNotFound {
                card_id: card_id.to_string(),
            })
    }

    fn report_corrections(&self, owner_id: &str, card_id: &str, corrections: &[Correction]) {
        for correction in corrections {
            self.observer.state_corrected(card_id, owner_id, correction);
        }
    }

    /// Session records are statistics; a recorder failure does not lose the summary
    fn record_summary(&self, summary: &SessionSummary) {
        if let (Some(recorder), Some(id)) = (&self.recorder, summary.session_id.as_deref()) {
            if let Err(e) = recorder.finish_session(id, summary) {
                tracing::warn!(session_id = id, "Failed to record session summary: {}", e);
            }
        }
        self.observer.session_finished(summary);
    }
}

impl<S: CardStore> Reviewer for ReviewService<S> {
    fn review_card(
        &self,
        owner_id: &str,
        card_id: &str,
        rating: Rating,
        time_spent_ms: u64,
        now: DateTime<Utc>,
    ) -> Result<ReviewReceipt, ReviewError> {
        self.review_at(owner_id, card_id, rating, time_spent_ms, now)
    }
}

// ============================================================================
// TESTS
// ============================================================================
