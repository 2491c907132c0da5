//! # Cardwise Core
//!
//! Scheduling engine for flashcard study. Decides when each card should be
//! shown again from how well the learner recalled it.
//!
//! - **Interval-Multiplier** (SM-2 family): per-card ease factor multiplies the interval
//! - **Forgetting-Curve** (FSRS family): stability/difficulty model targeting 90% recall
//! - **Validation boundary**: corrupted stored parameters are clamped and reported, never fatal
//! - **Due-set selection**: capped, de-duplicated, shuffled cards for a session
//! - **Session retry queue**: failed cards come back until recalled or out of attempts
//! - **Interval labels**: "today", "3 days", "2 months" in English or Brazilian Portuguese
//!
//! Persistence is delegated to a [`CardStore`] collaborator. [`InMemoryStore`]
//! is the reference implementation.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use cardwise_core::{EngineConfig, InMemoryStore, Rating, ReviewService};
//!
//! let store = Arc::new(InMemoryStore::new());
//! store.insert_card(card)?;
//!
//! let service = ReviewService::new(store.clone(), EngineConfig::from_env()?)
//!     .with_recorder(store);
//!
//! // How long would each answer push the card out?
//! let preview = service.preview_intervals("owner-1", "card-1")?;
//! println!("Good: {}", service.format_interval(preview.good));
//!
//! // Apply an answer
//! let receipt = service.review("owner-1", "card-1", Rating::Good, 4_000)?;
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(rustdoc::missing_crate_level_docs)]

// ============================================================================
// MODULES
// ============================================================================

pub mod config;
pub mod interval_format;
pub mod memory;
pub mod observe;
pub mod scheduling;
pub mod service;
pub mod storage;
pub mod study;

// ============================================================================
// PUBLIC API RE-EXPORTS
// ============================================================================

// Memory types
pub use memory::{
    Card, CardMemoryState, CardWithState, DailyAggregate, DailyDelta, LifecycleState, Rating,
    RatingError, ReviewEvent, MAX_INTERVAL_DAYS,
};

// Scheduling strategies
pub use scheduling::{
    sanitize, Correction, ForgettingCurve, ForgettingCurveParameters, HardRatingPolicy,
    IntervalMultiplier, IntervalMultiplierParameters, Preview, PreviewIntervals,
    ScheduleOutcome, StateField, Strategy, StrategyKind,
};

// Storage collaborators
pub use storage::{CardStore, InMemoryStore, SessionRecorder, StoreError, StoreSnapshot};

// Study selection and sessions
pub use study::{
    ExhaustedAttemptPolicy, RateOutcome, SessionConfig, SessionError, SessionSummary,
    StudyLimits, StudySession,
};

pub use config::{ConfigError, EngineConfig};
pub use interval_format::{format_interval, format_interval_in, Locale};
pub use observe::{CountingObserver, NoopObserver, ReviewObserver, TracingObserver};
pub use service::{RepairReport, ReviewError, ReviewReceipt, ReviewService};

// ============================================================================
// VERSION INFO
// ============================================================================

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// PRELUDE
// ============================================================================

/// Convenient imports for common usage
pub mod prelude {
    pub use crate::{
        Card, CardMemoryState, CardStore, EngineConfig, InMemoryStore, LifecycleState, Rating,
        ReviewError, ReviewService, StrategyKind, StudySession,
    };
}
