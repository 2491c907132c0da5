//! Records exchanged with the storage layer
//!
//! Cards, review log events, and daily study aggregates.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::state::{CardMemoryState, Rating};
use crate::scheduling::StrategyKind;

// ============================================================================
// CARDS
// ============================================================================

/// A flashcard as owned by the deck layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    /// Unique identifier
    pub id: String,
    /// Deck the card belongs to
    pub deck_id: String,
    /// Owner of the card
    pub owner_id: String,
    /// Prompt side (already rendered by the deck layer)
    pub front: String,
    /// Answer side
    pub back: String,
    /// Creation time, used to order new cards
    pub created_at: DateTime<Utc>,
}

/// A card paired with its scheduling state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardWithState {
    pub card: Card,
    pub state: CardMemoryState,
}

impl CardWithState {
    /// Card identifier
    pub fn id(&self) -> &str {
        &self.card.id
    }
}

// ============================================================================
// REVIEW EVENTS
// ============================================================================

/// Append-only log record created for every applied rating
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewEvent {
    /// Event identifier (UUID v4)
    pub id: String,
    pub card_id: String,
    pub owner_id: String,
    pub rating: Rating,
    /// Strategy that computed `new_state`
    pub strategy: StrategyKind,
    /// State read before the review
    pub previous_state: CardMemoryState,
    /// State written by the review
    pub new_state: CardMemoryState,
    pub reviewed_at: DateTime<Utc>,
    /// Time the learner spent on the card
    pub time_spent_ms: u64,
}

impl ReviewEvent {
    /// Create a new event with a fresh id
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        card_id: &str,
        owner_id: &str,
        rating: Rating,
        strategy: StrategyKind,
        previous_state: CardMemoryState,
        new_state: CardMemoryState,
        reviewed_at: DateTime<Utc>,
        time_spent_ms: u64,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            card_id: card_id.to_string(),
            owner_id: owner_id.to_string(),
            rating,
            strategy,
            previous_state,
            new_state,
            reviewed_at,
            time_spent_ms,
        }
    }

    /// Calendar day (UTC) the review counts toward
    pub fn review_date(&self) -> NaiveDate {
        self.reviewed_at.date_naive()
    }

    /// Aggregate contribution of this review
    pub fn daily_delta(&self) -> DailyDelta {
        let was_new = self.previous_state.is_new();
        DailyDelta {
            cards_studied: 1,
            cards_correct: u32::from(self.rating.is_recalled()),
            new_cards: u32::from(was_new),
            review_cards: u32::from(!was_new),
            total_time_ms: self.time_spent_ms,
        }
    }
}

// ============================================================================
// DAILY AGGREGATES
// ============================================================================

/// Increment applied to an owner's per-day statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyDelta {
    pub cards_studied: u32,
    pub cards_correct: u32,
    pub new_cards: u32,
    pub review_cards: u32,
    pub total_time_ms: u64,
}

/// Per-owner, per-day study statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyAggregate {
    pub owner_id: String,
    pub date: NaiveDate,
    pub cards_studied: u32,
    pub cards_correct: u32,
    pub new_cards: u32,
    pub review_cards: u32,
    pub total_time_ms: u64,
}

impl DailyAggregate {
    /// Empty aggregate for a day
    pub fn empty(owner_id: &str, date: NaiveDate) -> Self {
        Self {
            owner_id: owner_id.to_string(),
            date,
            cards_studied: 0,
            cards_correct: 0,
            new_cards: 0,
            review_cards: 0,
            total_time_ms: 0,
        }
    }

    /// Add a delta in place
    pub fn apply(&mut self, delta: &DailyDelta) {
        self.cards_studied += delta.cards_studied;
        self.cards_correct += delta.cards_correct;
        self.new_cards += delta.new_cards;
        self.review_cards += delta.review_cards;
        self.total_time_ms += delta.total_time_ms;
    }
}
