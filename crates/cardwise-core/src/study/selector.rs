//! Due-set selection
//!
//! Builds the card set for one study session: due reviews first in due
//! order, then new cards in creation order, each group capped by its limit,
//! then shuffled so the learner cannot predict the next card.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::memory::CardWithState;
use crate::storage::{CardStore, Result};

/// Default number of new cards per session
pub const DEFAULT_NEW_CARD_LIMIT: usize = 10;
/// Default number of due reviews per session
pub const DEFAULT_REVIEW_CARD_LIMIT: usize = 20;

/// Per-session caps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StudyLimits {
    pub new_cards: usize,
    pub review_cards: usize,
}

impl Default for StudyLimits {
    fn default() -> Self {
        Self {
            new_cards: DEFAULT_NEW_CARD_LIMIT,
            review_cards: DEFAULT_REVIEW_CARD_LIMIT,
        }
    }
}

/// Select and shuffle the cards for a session.
///
/// No qualifying cards is an empty result, not an error. Store failures
/// propagate.
pub fn select_study_cards<S, R>(
    store: &S,
    owner_id: &str,
    deck_id: Option<&str>,
    limits: StudyLimits,
    now: DateTime<Utc>,
    rng: &mut R,
) -> Result<Vec<CardWithState>>
where
    S: CardStore + ?Sized,
    R: Rng + ?Sized,
{
    let due = store.query_due(owner_id, deck_id, now, limits.review_cards)?;
    let fresh = store.query_new(owner_id, deck_id, limits.new_cards)?;

    // De-duplicate before capping so repeated rows never eat into a limit
    let mut seen = HashSet::new();
    let mut selected: Vec<CardWithState> = due
        .into_iter()
        .filter(|entry| !entry.state.is_new() && entry.state.is_due(now))
        .filter(|entry| seen.insert(entry.card.id.clone()))
        .take(limits.review_cards)
        .collect();
    selected.extend(
        fresh
            .into_iter()
            .filter(|entry| entry.state.is_new())
            .filter(|entry| seen.insert(entry.card.id.clone()))
            .take(limits.new_cards),
    );

    selected.shuffle(rng);

    tracing::debug!(
        owner_id,
        deck_id = deck_id.unwrap_or("*"),
        selected = selected.len(),
        "Selected study cards"
    );
    Ok(selected)
}

/// Number of cards due at `now`, new cards included
pub fn count_due<S: CardStore + ?Sized>(
    store: &S,
    owner_id: &str,
    deck_id: Option<&str>,
    now: DateTime<Utc>,
) -> Result<usize> {
    store.count_due(owner_id, deck_id, now)
}
