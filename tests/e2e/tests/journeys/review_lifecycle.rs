//! Journey: a card from first sight to long-term review and back
//!
//! Follows single cards across simulated days with both strategies and
//! checks what the learner and the store see after each answer.

use cardwise_core::scheduling::{initial_stability, next_interval};
use cardwise_core::{CardStore, LifecycleState, Rating, StrategyKind};
use cardwise_e2e_tests::{TEST_OWNER, TestClock, TestDeckManager};
use chrono::Duration;

// ============================================================================
// INTERVAL-MULTIPLIER
// ============================================================================

#[test]
fn test_good_answers_graduate_a_new_card() {
    let mut clock = TestClock::new();
    let deck = TestDeckManager::new_temp(StrategyKind::IntervalMultiplier);
    let id = deck.seed_new_cards(1, clock.now()).remove(0);

    let first = deck
        .service
        .review_at(TEST_OWNER, &id, Rating::Good, 3_000, clock.now())
        .unwrap();
    assert_eq!(first.interval_days, 1);
    assert_eq!(first.state.lifecycle_state, LifecycleState::Learning);

    clock.jump_to(first.due_at);
    let second = deck
        .service
        .review_at(TEST_OWNER, &id, Rating::Good, 2_000, clock.now())
        .unwrap();
    assert_eq!(second.interval_days, 6);
    assert_eq!(second.state.lifecycle_state, LifecycleState::Review);

    clock.jump_to(second.due_at);
    let third = deck
        .service
        .review_at(TEST_OWNER, &id, Rating::Good, 1_500, clock.now())
        .unwrap();
    assert_eq!(third.interval_days, 12);
    assert_eq!(third.due_at, clock.now() + Duration::days(12));
    assert_eq!(deck.service.format_interval(third.interval_days), "12 days");

    let events = deck.store.review_events(TEST_OWNER).unwrap();
    assert_eq!(events.len(), 3);
    assert!(events.iter().all(|e| e.strategy == StrategyKind::IntervalMultiplier));
    assert_eq!(events[2].new_state, third.state);
}

#[test]
fn test_lapse_sends_card_back_to_relearning() {
    let mut clock = TestClock::new();
    let deck = TestDeckManager::new_temp(StrategyKind::IntervalMultiplier);
    let id = deck.seed_due_cards(1, clock.now()).remove(0);
    let before = deck.store.get_card_memory_state(&id, TEST_OWNER).unwrap().unwrap();

    let lapse = deck
        .service
        .review_at(TEST_OWNER, &id, Rating::Again, 0, clock.now())
        .unwrap();
    assert_eq!(lapse.interval_days, 0);
    assert_eq!(lapse.due_at, clock.now());
    assert_eq!(lapse.state.lifecycle_state, LifecycleState::Relearning);
    assert_eq!(lapse.state.repetition_count, 0);
    assert!(lapse.state.ease_factor < before.ease_factor);

    // Relearned the same day
    clock.advance_minutes(10);
    let relearned = deck
        .service
        .review_at(TEST_OWNER, &id, Rating::Good, 0, clock.now())
        .unwrap();
    assert_eq!(relearned.interval_days, 1);
    assert_eq!(relearned.state.lifecycle_state, LifecycleState::Learning);
    assert_eq!(relearned.state.total_reviews, before.total_reviews + 2);
    assert_eq!(relearned.state.correct_reviews, before.correct_reviews + 1);
}

#[test]
fn test_preview_agrees_with_the_review_that_follows() {
    let clock = TestClock::new();
    let deck = TestDeckManager::new_temp(StrategyKind::IntervalMultiplier);
    let ids = deck.seed_due_cards(4, clock.now());

    for (id, rating) in ids.iter().zip(Rating::ALL) {
        let preview = deck
            .service
            .preview_intervals_at(TEST_OWNER, id, clock.now())
            .unwrap();
        let receipt = deck
            .service
            .review_at(TEST_OWNER, id, rating, 0, clock.now())
            .unwrap();
        assert_eq!(preview.get(rating), receipt.interval_days, "{}", rating);
    }
}

// ============================================================================
// FORGETTING-CURVE
// ============================================================================

#[test]
fn test_forgetting_curve_first_reviews() {
    let clock = TestClock::new();
    let deck = TestDeckManager::new_temp(StrategyKind::ForgettingCurve);
    let ids = deck.seed_new_cards(2, clock.now());

    let good = deck
        .service
        .review_at(TEST_OWNER, &ids[0], Rating::Good, 0, clock.now())
        .unwrap();
    assert_eq!(good.interval_days, next_interval(initial_stability(Rating::Good)));
    assert!(good.interval_days >= 1);
    assert_eq!(good.state.lifecycle_state, LifecycleState::Learning);

    let again = deck
        .service
        .review_at(TEST_OWNER, &ids[1], Rating::Again, 0, clock.now())
        .unwrap();
    assert_eq!(again.interval_days, 0);
    assert_eq!(again.state.lifecycle_state, LifecycleState::Learning);
}

#[test]
fn test_forgetting_curve_stability_grows_with_success() {
    let mut clock = TestClock::new();
    let deck = TestDeckManager::new_temp(StrategyKind::ForgettingCurve);
    let id = deck.seed_new_cards(1, clock.now()).remove(0);

    let mut previous_stability = 0.0;
    let mut previous_interval = 0;
    for _ in 0..5 {
        let receipt = deck
            .service
            .review_at(TEST_OWNER, &id, Rating::Good, 0, clock.now())
            .unwrap();
        assert!(receipt.state.stability > previous_stability);
        assert!(receipt.interval_days >= previous_interval);
        previous_stability = receipt.state.stability;
        previous_interval = receipt.interval_days;
        clock.jump_to(receipt.due_at);
    }
    assert_eq!(
        deck.store
            .get_card_memory_state(&id, TEST_OWNER)
            .unwrap()
            .unwrap()
            .lifecycle_state,
        LifecycleState::Review
    );
}

#[test]
fn test_forgetting_curve_lapse_shrinks_stability() {
    let clock = TestClock::new();
    let deck = TestDeckManager::new_temp(StrategyKind::ForgettingCurve);
    let id = deck.seed_due_cards(1, clock.now()).remove(0);
    let before = deck.store.get_card_memory_state(&id, TEST_OWNER).unwrap().unwrap();

    let lapse = deck
        .service
        .review_at(TEST_OWNER, &id, Rating::Again, 0, clock.now())
        .unwrap();
    assert_eq!(lapse.interval_days, 0);
    assert_eq!(lapse.state.lifecycle_state, LifecycleState::Relearning);
    assert!(lapse.state.stability < before.stability);
    assert!(lapse.state.stability > 0.0);
}

// ============================================================================
// STATISTICS
// ============================================================================

#[test]
fn test_daily_aggregates_split_by_day() {
    let mut clock = TestClock::new();
    let deck = TestDeckManager::new_temp(StrategyKind::IntervalMultiplier);
    let fresh = deck.seed_new_cards(2, clock.now());
    let due = deck.seed_due_cards(1, clock.now());

    let day_one = clock.now().date_naive();
    deck.service
        .review_at(TEST_OWNER, &fresh[0], Rating::Good, 1_000, clock.now())
        .unwrap();
    deck.service
        .review_at(TEST_OWNER, &due[0], Rating::Again, 2_000, clock.now())
        .unwrap();

    let day_two = clock.advance_days(1).date_naive();
    deck.service
        .review_at(TEST_OWNER, &fresh[1], Rating::Hard, 500, clock.now())
        .unwrap();

    let first = deck.store.daily_aggregate(TEST_OWNER, day_one).unwrap().unwrap();
    assert_eq!(first.cards_studied, 2);
    assert_eq!(first.cards_correct, 1);
    assert_eq!(first.new_cards, 1);
    assert_eq!(first.review_cards, 1);
    assert_eq!(first.total_time_ms, 3_000);

    let second = deck.store.daily_aggregate(TEST_OWNER, day_two).unwrap().unwrap();
    assert_eq!(second.cards_studied, 1);
    assert_eq!(second.cards_correct, 1);
    assert_eq!(deck.observer.counts().reviews, 3);
}
