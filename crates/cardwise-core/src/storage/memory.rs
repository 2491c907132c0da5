//! In-memory store
//!
//! Reference [`CardStore`] and [`SessionRecorder`] implementation. State is
//! held behind a single mutex so every trait method takes `&self`. The whole
//! store can be exported to and rebuilt from a serializable
//! [`StoreSnapshot`].

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{CardStore, Result, SessionRecorder, StoreError};
use crate::memory::{
    Card, CardMemoryState, CardWithState, DailyAggregate, DailyDelta, ReviewEvent,
};
use crate::study::SessionSummary;

// ============================================================================
// SNAPSHOT TYPES
// ============================================================================

/// Memory state row keyed by (card, owner)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredState {
    pub card_id: String,
    pub owner_id: String,
    pub state: CardMemoryState,
}

/// A study session record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub id: String,
    pub owner_id: String,
    pub deck_id: Option<String>,
    pub started_at: DateTime<Utc>,
    /// Set once the session is finished or abandoned
    pub summary: Option<SessionSummary>,
}

/// Serializable image of a whole store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StoreSnapshot {
    pub cards: Vec<Card>,
    pub states: Vec<StoredState>,
    pub review_events: Vec<ReviewEvent>,
    pub daily_aggregates: Vec<DailyAggregate>,
    pub sessions: Vec<SessionRecord>,
}

// ============================================================================
// STORE
// ============================================================================

#[derive(Default)]
struct Inner {
    cards: BTreeMap<String, Card>,
    states: HashMap<(String, String), CardMemoryState>,
    events: Vec<ReviewEvent>,
    aggregates: BTreeMap<(String, NaiveDate), DailyAggregate>,
    sessions: Vec<SessionRecord>,
}

impl Inner {
    /// Cards of `owner_id` (optionally one deck) joined with their state
    fn owned_cards<'a>(
        &'a self,
        owner_id: &'a str,
        deck_id: Option<&'a str>,
    ) -> impl Iterator<Item = CardWithState> + 'a {
        self.cards
            .values()
            .filter(move |card| deck_id.is_none_or(|deck| card.deck_id == deck))
            .filter_map(move |card| {
                self.states
                    .get(&(card.id.clone(), owner_id.to_string()))
                    .map(|state| CardWithState {
                        card: card.clone(),
                        state: state.clone(),
                    })
            })
    }

    fn put_state(&mut self, card_id: &str, owner_id: &str, state: &CardMemoryState) -> Result<()> {
        match self
            .states
            .get_mut(&(card_id.to_string(), owner_id.to_string()))
        {
            Some(slot) => {
                *slot = state.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(format!(
                "memory state for card {} and owner {}",
                card_id, owner_id
            ))),
        }
    }

    fn add_to_aggregate(&mut self, owner_id: &str, date: NaiveDate, delta: &DailyDelta) {
        self.aggregates
            .entry((owner_id.to_string(), date))
            .or_insert_with(|| DailyAggregate::empty(owner_id, date))
            .apply(delta);
    }
}

/// Mutex-guarded store living entirely in memory
#[derive(Default)]
pub struct InMemoryStore {
    inner: Mutex<Inner>,
}

impl InMemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store from a snapshot
    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        let mut inner = Inner {
            events: snapshot.review_events,
            sessions: snapshot.sessions,
            ..Inner::default()
        };
        for card in snapshot.cards {
            inner.cards.insert(card.id.clone(), card);
        }
        for row in snapshot.states {
            inner.states.insert((row.card_id, row.owner_id), row.state);
        }
        for aggregate in snapshot.daily_aggregates {
            inner
                .aggregates
                .insert((aggregate.owner_id.clone(), aggregate.date), aggregate);
        }
        Self {
            inner: Mutex::new(inner),
        }
    }

    /// Export the full store contents
    pub fn snapshot(&self) -> Result<StoreSnapshot> {
        let inner = self.lock()?;
        let mut states: Vec<StoredState> = inner
            .states
            .iter()
            .map(|((card_id, owner_id), state)| StoredState {
                card_id: card_id.clone(),
                owner_id: owner_id.clone(),
                state: state.clone(),
            })
            .collect();
        states.sort_by(|a, b| (&a.owner_id, &a.card_id).cmp(&(&b.owner_id, &b.card_id)));

        Ok(StoreSnapshot {
            cards: inner.cards.values().cloned().collect(),
            states,
            review_events: inner.events.clone(),
            daily_aggregates: inner.aggregates.values().cloned().collect(),
            sessions: inner.sessions.clone(),
        })
    }

    /// Add a card with a fresh `New` state for its owner
    pub fn insert_card(&self, card: Card) -> Result<()> {
        let state = CardMemoryState::new(card.created_at);
        self.insert_card_with_state(card, state)
    }

    /// Add a card with an explicit state for its owner
    pub fn insert_card_with_state(&self, card: Card, state: CardMemoryState) -> Result<()> {
        let mut inner = self.lock()?;
        if inner.cards.contains_key(&card.id) {
            return Err(StoreError::Rejected(format!("card {} already exists", card.id)));
        }
        inner
            .states
            .insert((card.id.clone(), card.owner_id.clone()), state);
        inner.cards.insert(card.id.clone(), card);
        Ok(())
    }

    /// Look up a card
    pub fn card(&self, card_id: &str) -> Result<Option<Card>> {
        Ok(self.lock()?.cards.get(card_id).cloned())
    }

    /// Review log entries of an owner in append order
    pub fn review_events(&self, owner_id: &str) -> Result<Vec<ReviewEvent>> {
        Ok(self
            .lock()?
            .events
            .iter()
            .filter(|event| event.owner_id == owner_id)
            .cloned()
            .collect())
    }

    /// Statistics of an owner for one day
    pub fn daily_aggregate(&self, owner_id: &str, date: NaiveDate) -> Result<Option<DailyAggregate>> {
        Ok(self
            .lock()?
            .aggregates
            .get(&(owner_id.to_string(), date))
            .cloned())
    }

    /// All session records
    pub fn sessions(&self) -> Result<Vec<SessionRecord>> {
        Ok(self.lock()?.sessions.clone())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }
}

impl CardStore for InMemoryStore {
    fn get_card_memory_state(
        &self,
        card_id: &str,
        owner_id: &str,
    ) -> Result<Option<CardMemoryState>> {
        let inner = self.lock()?;
        Ok(inner
            .states
            .get(&(card_id.to_string(), owner_id.to_string()))
            .cloned())
    }

    fn put_card_memory_state(
        &self,
        card_id: &str,
        owner_id: &str,
        state: &CardMemoryState,
    ) -> Result<()> {
        self.lock()?.put_state(card_id, owner_id, state)
    }

    fn append_review_event(&self, event: &ReviewEvent) -> Result<()> {
        self.lock()?.events.push(event.clone());
        Ok(())
    }

    fn upsert_daily_aggregate(
        &self,
        owner_id: &str,
        date: NaiveDate,
        delta: &DailyDelta,
    ) -> Result<()> {
        self.lock()?.add_to_aggregate(owner_id, date, delta);
        Ok(())
    }

    fn query_due(
        &self,
        owner_id: &str,
        deck_id: Option<&str>,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<CardWithState>> {
        let inner = self.lock()?;
        let mut due: Vec<CardWithState> = inner
            .owned_cards(owner_id, deck_id)
            .filter(|entry| !entry.state.is_new() && entry.state.is_due(now))
            .collect();
        due.sort_by(|a, b| {
            a.state
                .due_at
                .cmp(&b.state.due_at)
                .then_with(|| a.card.id.cmp(&b.card.id))
        });
        due.truncate(limit);
        Ok(due)
    }

    fn query_new(
        &self,
        owner_id: &str,
        deck_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<CardWithState>> {
        let inner = self.lock()?;
        let mut fresh: Vec<CardWithState> = inner
            .owned_cards(owner_id, deck_id)
            .filter(|entry| entry.state.is_new())
            .collect();
        fresh.sort_by(|a, b| {
            a.card
                .created_at
                .cmp(&b.card.created_at)
                .then_with(|| a.card.id.cmp(&b.card.id))
        });
        fresh.truncate(limit);
        Ok(fresh)
    }

    fn count_due(
        &self,
        owner_id: &str,
        deck_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<usize> {
        let inner = self.lock()?;
        Ok(inner
            .owned_cards(owner_id, deck_id)
            .filter(|entry| entry.state.is_due(now))
            .count())
    }

    fn list_memory_states(&self, owner_id: &str) -> Result<Vec<(String, CardMemoryState)>> {
        let inner = self.lock()?;
        let mut rows: Vec<(String, CardMemoryState)> = inner
            .states
            .iter()
            .filter(|((_, owner), _)| owner == owner_id)
            .map(|((card_id, _), state)| (card_id.clone(), state.clone()))
            .collect();
        rows.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(rows)
    }

    /// State, log entry and aggregate are written under one lock, so readers
    /// never see a state without its event.
    fn commit_review(&self, event: &ReviewEvent) -> Result<()> {
        let mut inner = self.lock()?;
        inner.put_state(&event.card_id, &event.owner_id, &event.new_state)?;
        inner.events.push(event.clone());
        inner.add_to_aggregate(&event.owner_id, event.review_date(), &event.daily_delta());
        Ok(())
    }
}

impl SessionRecorder for InMemoryStore {
    fn start_session(
        &self,
        owner_id: &str,
        deck_id: Option<&str>,
        started_at: DateTime<Utc>,
    ) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        self.lock()?.sessions.push(SessionRecord {
            id: id.clone(),
            owner_id: owner_id.to_string(),
            deck_id: deck_id.map(str::to_string),
            started_at,
            summary: None,
        });
        Ok(id)
    }

    fn finish_session(&self, session_id: &str, summary: &SessionSummary) -> Result<()> {
        let mut inner = self.lock()?;
        let record = inner
            .sessions
            .iter_mut()
            .find(|record| record.id == session_id)
            .ok_or_else(|| StoreError::NotFound(format!("session {}", session_id)))?;
        if record.summary.is_some() {
            return Err(StoreError::Rejected(format!(
                "session {} is already finished",
                session_id
            )));
        }
        record.summary = Some(summary.clone());
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
