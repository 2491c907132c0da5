//! Journey: selecting cards and working through a study session
//!
//! Covers due-set selection limits, the in-session retry queue, and the
//! session record left behind.

use std::collections::HashSet;

use cardwise_core::{
    CardStore, EngineConfig, ExhaustedAttemptPolicy, RateOutcome, Rating, StrategyKind,
    StudyLimits,
};
use cardwise_e2e_tests::{TEST_OWNER, TestClock, TestDataFactory, TestDeckManager};
use rand::SeedableRng;
use rand::rngs::StdRng;

fn sm2() -> EngineConfig {
    EngineConfig::default().with_strategy(StrategyKind::IntervalMultiplier)
}

// ============================================================================
// SELECTION
// ============================================================================

#[test]
fn test_selection_caps_each_group() {
    let clock = TestClock::new();
    let deck = TestDeckManager::with_config(sm2().with_limits(StudyLimits {
        new_cards: 3,
        review_cards: 4,
    }));
    deck.seed_new_cards(8, clock.now());
    deck.seed_due_cards(9, clock.now());
    deck.seed_future_cards(5, clock.now());

    let cards = deck.service.select_study_cards_at(TEST_OWNER, None, clock.now()).unwrap();

    assert_eq!(cards.len(), 7);
    assert_eq!(cards.iter().filter(|c| c.state.is_new()).count(), 3);
    let ids: HashSet<&str> = cards.iter().map(|c| c.id()).collect();
    assert_eq!(ids.len(), 7);
    assert!(ids.iter().all(|id| !id.starts_with("future")));
}

#[test]
fn test_selection_takes_oldest_and_most_overdue_first() {
    let clock = TestClock::new();
    let deck = TestDeckManager::with_config(sm2().with_limits(StudyLimits {
        new_cards: 2,
        review_cards: 2,
    }));
    let fresh = deck.seed_new_cards(5, clock.now());
    let due = deck.seed_due_cards(5, clock.now());

    let mut rng = StdRng::seed_from_u64(99);
    let cards = deck
        .service
        .select_study_cards_with_rng(TEST_OWNER, None, clock.now(), &mut rng)
        .unwrap();
    let ids: HashSet<String> = cards.into_iter().map(|c| c.card.id).collect();

    let expected: HashSet<String> = [&fresh[0], &fresh[1], &due[0], &due[1]]
        .into_iter()
        .cloned()
        .collect();
    assert_eq!(ids, expected);
}

#[test]
fn test_deck_filter_and_due_count() {
    let clock = TestClock::new();
    let deck = TestDeckManager::new_temp(StrategyKind::IntervalMultiplier);
    let scenario = TestDataFactory::create_mixed_due_scenario(&deck.store, clock.now());

    let all_due = deck.service.count_due_at(TEST_OWNER, None, clock.now()).unwrap();
    assert_eq!(all_due, 11);

    let verbs = deck
        .service
        .count_due_at(TEST_OWNER, Some("verbs"), clock.now())
        .unwrap();
    assert_eq!(verbs.to_string(), scenario.metadata["verbs_due"]);

    let selected = deck
        .service
        .select_study_cards_at(TEST_OWNER, Some("verbs"), clock.now())
        .unwrap();
    assert_eq!(selected.len(), verbs);
    assert!(selected.iter().all(|c| c.card.deck_id == "verbs"));
}

#[test]
fn test_nothing_due_is_an_empty_session() {
    let clock = TestClock::new();
    let deck = TestDeckManager::new_temp(StrategyKind::ForgettingCurve);
    deck.seed_future_cards(3, clock.now());

    let session = deck.service.start_session_at(TEST_OWNER, None, clock.now()).unwrap();
    assert!(session.is_finished());

    let summary = deck.service.finish_session(session, clock.now());
    assert_eq!(summary.cards_studied, 0);
    assert!(!summary.abandoned);
}

// ============================================================================
// RETRY QUEUE
// ============================================================================

#[test]
fn test_full_session_with_retries() {
    let mut clock = TestClock::new();
    let deck = TestDeckManager::new_temp(StrategyKind::IntervalMultiplier);
    deck.seed_new_cards(3, clock.now());

    let mut session = deck.service.start_session_at(TEST_OWNER, None, clock.now()).unwrap();
    let first_card = session.current().map(|c| c.id().to_string()).unwrap();

    // Fail the first card once, recall everything else
    let mut failed_once = false;
    while let Some(current) = session.current().map(|c| c.id().to_string()) {
        let rating = if current == first_card && !failed_once {
            failed_once = true;
            Rating::Again
        } else {
            Rating::Good
        };
        deck.service
            .rate_in_session(&mut session, rating, 1_000, clock.advance_minutes(1))
            .unwrap();
    }

    let summary = deck.service.finish_session(session, clock.advance_minutes(1));
    assert_eq!(summary.cards_studied, 3);
    assert_eq!(summary.cards_correct, 3);
    assert_eq!(summary.reviews_applied, 4);
    assert_eq!(summary.attempts_exhausted, 0);
    assert_eq!(summary.elapsed_ms, 5 * 60_000);

    // The failed card was relearned and scheduled like the others
    let state = deck
        .store
        .get_card_memory_state(&first_card, TEST_OWNER)
        .unwrap()
        .unwrap();
    assert_eq!(state.interval_days, 1);
    assert_eq!(state.total_reviews, 2);

    let records = deck.store.sessions().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].summary.as_ref(), Some(&summary));
    assert_eq!(deck.observer.counts().sessions, 1);
}

#[test]
fn test_third_failure_is_not_scheduled() {
    let clock = TestClock::new();
    let deck = TestDeckManager::new_temp(StrategyKind::IntervalMultiplier);
    let id = deck.seed_new_cards(1, clock.now()).remove(0);

    let mut session = deck.service.start_session_at(TEST_OWNER, None, clock.now()).unwrap();
    let outcomes: Vec<RateOutcome> = (0..3)
        .map(|_| {
            deck.service
                .rate_in_session(&mut session, Rating::Again, 0, clock.now())
                .unwrap()
        })
        .collect();

    assert!(matches!(outcomes[0], RateOutcome::Requeued { attempts: 1, .. }));
    assert!(matches!(outcomes[1], RateOutcome::Requeued { attempts: 2, .. }));
    assert!(matches!(
        outcomes[2],
        RateOutcome::Exhausted {
            attempts: 3,
            receipt: None,
            ..
        }
    ));
    assert!(session.is_finished());
    assert_eq!(deck.store.review_events(TEST_OWNER).unwrap().len(), 2);
    assert_eq!(deck.observer.counts().exhausted, 1);

    let state = deck.store.get_card_memory_state(&id, TEST_OWNER).unwrap().unwrap();
    assert_eq!(state.total_reviews, 2);
}

#[test]
fn test_schedule_policy_persists_final_failure() {
    let clock = TestClock::new();
    let deck = TestDeckManager::with_config(
        sm2().with_exhausted_policy(ExhaustedAttemptPolicy::Schedule),
    );
    deck.seed_new_cards(1, clock.now());

    let mut session = deck.service.start_session_at(TEST_OWNER, None, clock.now()).unwrap();
    for _ in 0..3 {
        deck.service
            .rate_in_session(&mut session, Rating::Hard, 0, clock.now())
            .unwrap();
    }

    assert!(session.is_finished());
    assert_eq!(deck.store.review_events(TEST_OWNER).unwrap().len(), 3);
    let summary = deck.service.finish_session(session, clock.now());
    assert_eq!(summary.attempts_exhausted, 1);
    assert_eq!(summary.reviews_applied, 3);
}

#[test]
fn test_abandoned_session_keeps_applied_reviews() {
    let clock = TestClock::new();
    let deck = TestDeckManager::new_temp(StrategyKind::ForgettingCurve);
    deck.seed_due_cards(4, clock.now());

    let mut session = deck.service.start_session_at(TEST_OWNER, None, clock.now()).unwrap();
    deck.service
        .rate_in_session(&mut session, Rating::Easy, 0, clock.now())
        .unwrap();
    let summary = deck.service.abandon_session(session, clock.now());

    assert!(summary.abandoned);
    assert_eq!(summary.cards_remaining, 3);
    assert_eq!(deck.store.review_events(TEST_OWNER).unwrap().len(), 1);
    assert_eq!(
        deck.service.count_due_at(TEST_OWNER, None, clock.now()).unwrap(),
        3
    );
}
