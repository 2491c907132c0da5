//! Journey: reviewing and repairing rows that storage handed back broken
//!
//! Every corruption must be clamped before scheduling, reported once per
//! field, and never reach the store again after a review or repair.

use cardwise_core::scheduling::is_well_formed;
use cardwise_core::{CardStore, MAX_INTERVAL_DAYS, Rating, StateField, StrategyKind};
use cardwise_e2e_tests::{Corruption, TEST_OWNER, TestClock, TestDataFactory, TestDeckManager};

const STRATEGIES: [StrategyKind; 2] = [
    StrategyKind::IntervalMultiplier,
    StrategyKind::ForgettingCurve,
];

fn field_for(corruption: Corruption) -> StateField {
    match corruption {
        Corruption::NanEaseFactor => StateField::EaseFactor,
        Corruption::InfiniteStability => StateField::Stability,
        Corruption::NegativeDifficulty => StateField::Difficulty,
        Corruption::RetrievabilityAboveOne => StateField::Retrievability,
        Corruption::IntervalOverflow => StateField::IntervalDays,
    }
}

// ============================================================================
// REVIEWS
// ============================================================================

#[test]
fn test_every_corruption_schedules_cleanly() {
    let clock = TestClock::new();

    for strategy in STRATEGIES {
        for corruption in Corruption::ALL {
            for rating in Rating::ALL {
                let deck = TestDeckManager::new_temp(strategy);
                let id = deck.seed_with_state(
                    "broken",
                    TestDataFactory::corrupted_state(corruption, clock.now()),
                );

                let receipt = deck
                    .service
                    .review_at(TEST_OWNER, &id, rating, 0, clock.now())
                    .unwrap_or_else(|e| panic!("{} / {:?} / {}: {}", strategy, corruption, rating, e));

                assert!(
                    is_well_formed(&receipt.state),
                    "{} / {:?} / {} produced {:?}",
                    strategy,
                    corruption,
                    rating,
                    receipt.state
                );
                assert!(receipt.interval_days <= MAX_INTERVAL_DAYS);
                assert!(receipt.due_at >= clock.now());

                let stored = deck
                    .store
                    .get_card_memory_state(&id, TEST_OWNER)
                    .unwrap()
                    .unwrap();
                assert!(is_well_formed(&stored));
                assert_eq!(deck.observer.counts().corrections, 1);
            }
        }
    }
}

#[test]
fn test_corrections_are_logged_on_the_review_event() {
    let clock = TestClock::new();
    let deck = TestDeckManager::new_temp(StrategyKind::ForgettingCurve);
    let id = deck.seed_with_state(
        "broken",
        TestDataFactory::corrupted_state(Corruption::InfiniteStability, clock.now()),
    );

    deck.service
        .review_at(TEST_OWNER, &id, Rating::Good, 0, clock.now())
        .unwrap();

    // The log keeps what was read, the state keeps what was written
    let events = deck.store.review_events(TEST_OWNER).unwrap();
    assert_eq!(events.len(), 1);
    assert!(events[0].previous_state.stability.is_infinite());
    assert!(events[0].new_state.stability.is_finite());
}

#[test]
fn test_preview_of_corrupted_row_does_not_repair_it() {
    let clock = TestClock::new();

    for strategy in STRATEGIES {
        let deck = TestDeckManager::new_temp(strategy);
        let id = deck.seed_with_state(
            "broken",
            TestDataFactory::corrupted_state(Corruption::IntervalOverflow, clock.now()),
        );

        let preview = deck
            .service
            .preview_intervals_at(TEST_OWNER, &id, clock.now())
            .unwrap();
        assert!(preview.iter().all(|(_, days)| days <= MAX_INTERVAL_DAYS));
        assert_eq!(deck.observer.counts().corrections, 1);

        let stored = deck
            .store
            .get_card_memory_state(&id, TEST_OWNER)
            .unwrap()
            .unwrap();
        assert_eq!(stored.interval_days, MAX_INTERVAL_DAYS * 4);
    }
}

// ============================================================================
// REPAIR
// ============================================================================

#[test]
fn test_repair_fixes_every_broken_row() {
    let clock = TestClock::new();
    let deck = TestDeckManager::new_temp(StrategyKind::ForgettingCurve);
    deck.seed_due_cards(2, clock.now());
    for corruption in Corruption::ALL {
        deck.seed_with_state(
            &format!("broken-{:?}", corruption),
            TestDataFactory::corrupted_state(corruption, clock.now()),
        );
    }

    let report = deck.service.repair_memory_states(TEST_OWNER).unwrap();
    assert_eq!(report.scanned, 7);
    assert_eq!(report.repaired, 5);
    assert_eq!(report.corrections.len(), 5);
    for corruption in Corruption::ALL {
        let card_id = format!("broken-{:?}", corruption);
        let correction = report
            .corrections
            .iter()
            .find(|c| c.card_id == card_id)
            .unwrap_or_else(|| panic!("no correction for {}", card_id));
        assert_eq!(correction.correction.field, field_for(corruption));
    }
    assert_eq!(deck.observer.counts().corrections, 5);

    for (card_id, state) in deck.store.list_memory_states(TEST_OWNER).unwrap() {
        assert!(is_well_formed(&state), "{} still broken", card_id);
    }

    // Nothing left to do, and nothing was logged as a review
    let again = deck.service.repair_memory_states(TEST_OWNER).unwrap();
    assert_eq!(again.repaired, 0);
    assert!(deck.store.review_events(TEST_OWNER).unwrap().is_empty());
}
