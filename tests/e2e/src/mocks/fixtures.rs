//! Test Data Factory
//!
//! Provides utilities for generating realistic test data:
//! - Cards in any deck with predictable creation times
//! - Memory states at each lifecycle stage
//! - Deliberately corrupted rows for validation tests
//! - Pre-built scenarios for common test cases

use std::collections::HashMap;

use cardwise_core::{Card, CardMemoryState, InMemoryStore, LifecycleState, MAX_INTERVAL_DAYS};
use chrono::{DateTime, Duration, Utc};

use crate::harness::TEST_OWNER;

/// Factory for creating test data
///
/// # Example
///
/// ```rust,ignore
/// let card = TestDataFactory::create_card("c1", Utc::now());
/// let state = TestDataFactory::review_state(Utc::now());
/// let ids = TestDataFactory::create_batch(&store, &BatchConfig::default(), Utc::now());
/// ```
pub struct TestDataFactory;

/// Configuration for batch card generation
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Number of cards to create
    pub count: usize,
    /// Deck to put them in
    pub deck_id: String,
    /// Prefix for ids and prompts
    pub prefix: String,
    /// Minutes between consecutive creation times
    pub spacing_minutes: i64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            count: 10,
            deck_id: "default".to_string(),
            prefix: "card".to_string(),
            spacing_minutes: 1,
        }
    }
}

/// Ways a stored row can be broken
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Corruption {
    NanEaseFactor,
    InfiniteStability,
    NegativeDifficulty,
    RetrievabilityAboveOne,
    IntervalOverflow,
}

impl Corruption {
    pub const ALL: [Corruption; 5] = [
        Corruption::NanEaseFactor,
        Corruption::InfiniteStability,
        Corruption::NegativeDifficulty,
        Corruption::RetrievabilityAboveOne,
        Corruption::IntervalOverflow,
    ];
}

/// Scenario containing related test data
#[derive(Debug)]
pub struct TestScenario {
    /// IDs of created cards
    pub card_ids: Vec<String>,
    /// Description of the scenario
    pub description: String,
    /// Metadata for test assertions
    pub metadata: HashMap<String, String>,
}

impl TestDataFactory {
    // ========================================================================
    // CARDS
    // ========================================================================

    /// Card in the default deck owned by the test learner
    pub fn create_card(id: &str, created_at: DateTime<Utc>) -> Card {
        Self::create_card_in(id, "default", created_at)
    }

    /// Card in a specific deck owned by the test learner
    pub fn create_card_in(id: &str, deck_id: &str, created_at: DateTime<Utc>) -> Card {
        Card {
            id: id.to_string(),
            deck_id: deck_id.to_string(),
            owner_id: TEST_OWNER.to_string(),
            front: format!("Prompt for {}", id),
            back: format!("Answer for {}", id),
            created_at,
        }
    }

    /// Insert a batch of new cards, oldest first
    pub fn create_batch(
        store: &InMemoryStore,
        config: &BatchConfig,
        now: DateTime<Utc>,
    ) -> Vec<String> {
        (0..config.count)
            .map(|i| {
                let created_at =
                    now - Duration::minutes(config.spacing_minutes * (config.count - i) as i64);
                let id = format!("{}-{:03}", config.prefix, i);
                store
                    .insert_card(Self::create_card_in(&id, &config.deck_id, created_at))
                    .expect("Failed to insert batch card");
                id
            })
            .collect()
    }

    // ========================================================================
    // STATES
    // ========================================================================

    /// Graduated card due at `due_at`, last seen a week before
    pub fn review_state(due_at: DateTime<Utc>) -> CardMemoryState {
        let mut state = CardMemoryState::new(due_at);
        state.lifecycle_state = LifecycleState::Review;
        state.interval_days = 7;
        state.repetition_count = 3;
        state.ease_factor = 2.36;
        state.stability = 9.5;
        state.difficulty = 5.4;
        state.last_reviewed_at = Some(due_at - Duration::days(7));
        state.total_reviews = 3;
        state.correct_reviews = 3;
        state
    }

    /// Card that lapsed and is waiting to be relearned
    pub fn relearning_state(due_at: DateTime<Utc>) -> CardMemoryState {
        let mut state = Self::review_state(due_at);
        state.lifecycle_state = LifecycleState::Relearning;
        state.interval_days = 0;
        state.repetition_count = 0;
        state.last_reviewed_at = Some(due_at);
        state
    }

    /// Graduated card with one field broken
    pub fn corrupted_state(corruption: Corruption, due_at: DateTime<Utc>) -> CardMemoryState {
        let mut state = Self::review_state(due_at);
        match corruption {
            Corruption::NanEaseFactor => state.ease_factor = f64::NAN,
            Corruption::InfiniteStability => state.stability = f64::INFINITY,
            Corruption::NegativeDifficulty => state.difficulty = -3.0,
            Corruption::RetrievabilityAboveOne => state.retrievability = 1.7,
            Corruption::IntervalOverflow => state.interval_days = MAX_INTERVAL_DAYS * 4,
        }
        state
    }

    // ========================================================================
    // SCENARIOS
    // ========================================================================

    /// Deck with overdue reviews, future reviews, and new cards in two decks
    pub fn create_mixed_due_scenario(store: &InMemoryStore, now: DateTime<Utc>) -> TestScenario {
        let mut card_ids = Vec::new();
        let mut insert = |id: String, deck: &str, state: CardMemoryState| {
            let card = Self::create_card_in(&id, deck, now - Duration::days(60));
            store
                .insert_card_with_state(card, state)
                .expect("Failed to insert scenario card");
            card_ids.push(id);
        };

        for i in 0..6 {
            insert(
                format!("overdue-{}", i),
                if i % 2 == 0 { "verbs" } else { "nouns" },
                Self::review_state(now - Duration::days(i + 1)),
            );
        }
        for i in 0..4 {
            insert(
                format!("upcoming-{}", i),
                "verbs",
                Self::review_state(now + Duration::days(i + 1)),
            );
        }
        for i in 0..5 {
            let created_at = now - Duration::days(10 - i);
            insert(
                format!("fresh-{}", i),
                if i < 3 { "verbs" } else { "nouns" },
                CardMemoryState::new(created_at),
            );
        }

        let mut metadata = HashMap::new();
        metadata.insert("overdue".to_string(), "6".to_string());
        metadata.insert("upcoming".to_string(), "4".to_string());
        metadata.insert("new".to_string(), "5".to_string());
        metadata.insert("verbs_due".to_string(), "6".to_string());

        TestScenario {
            card_ids,
            description: "Six overdue, four upcoming, and five new cards across two decks"
                .to_string(),
            metadata,
        }
    }
}
