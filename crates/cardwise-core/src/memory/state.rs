//! Card memory state - the per-(card, owner) scheduling record
//!
//! Holds the fields both scheduling strategies read and write:
//! - Interval-multiplier fields (ease factor)
//! - Forgetting-curve fields (difficulty, stability, retrievability)
//! - Shared fields (lifecycle, interval, repetitions, due date)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

// ============================================================================
// CONSTANTS
// ============================================================================

/// Longest interval any strategy may schedule (~100 years)
pub const MAX_INTERVAL_DAYS: u32 = 36_500;

/// Lower bound of the ease factor
pub const MIN_EASE_FACTOR: f64 = 1.3;

/// Upper bound of the ease factor, also the value assigned to new cards
pub const MAX_EASE_FACTOR: f64 = 2.5;

/// Ease factor used when a stored value is unusable
pub const DEFAULT_EASE_FACTOR: f64 = 2.5;

/// Lower bound of difficulty (easiest)
pub const MIN_DIFFICULTY: f64 = 1.0;

/// Upper bound of difficulty (hardest)
pub const MAX_DIFFICULTY: f64 = 10.0;

/// Difficulty used when a stored value is unusable
pub const DEFAULT_DIFFICULTY: f64 = 5.0;

/// Stability floor in days; stability never reaches zero
pub const MIN_STABILITY: f64 = 0.1;

// ============================================================================
// RATING
// ============================================================================

/// Error returned when an integer is outside the rating domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Rating must be between 1 and 4, got {0}")]
pub struct RatingError(pub i32);

/// Recall rating given by the learner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum Rating {
    /// Complete failure to recall
    Again = 1,
    /// Recalled with serious difficulty
    Hard = 2,
    /// Recalled after some hesitation
    Good = 3,
    /// Perfect recall
    Easy = 4,
}

impl Rating {
    /// All ratings in ascending order
    pub const ALL: [Rating; 4] = [Rating::Again, Rating::Hard, Rating::Good, Rating::Easy];

    /// Convert from the 1-4 integer scale
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            1 => Some(Rating::Again),
            2 => Some(Rating::Hard),
            3 => Some(Rating::Good),
            4 => Some(Rating::Easy),
            _ => None,
        }
    }

    /// Integer value on the 1-4 scale
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Numeric value for formula use
    pub fn as_f64(self) -> f64 {
        self as i32 as f64
    }

    /// A lapse is any rating below Good
    pub fn is_lapse(self) -> bool {
        self < Rating::Good
    }

    /// Anything other than Again counts as recalled in review counters
    pub fn is_recalled(self) -> bool {
        self != Rating::Again
    }

    /// Display name
    pub fn as_str(self) -> &'static str {
        match self {
            Rating::Again => "again",
            Rating::Hard => "hard",
            Rating::Good => "good",
            Rating::Easy => "easy",
        }
    }
}

impl TryFrom<i32> for Rating {
    type Error = RatingError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Rating::from_i32(value).ok_or(RatingError(value))
    }
}

impl From<Rating> for i32 {
    fn from(rating: Rating) -> Self {
        rating.as_i32()
    }
}

impl std::fmt::Display for Rating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Rating {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "1" | "again" => Ok(Rating::Again),
            "2" | "hard" => Ok(Rating::Hard),
            "3" | "good" => Ok(Rating::Good),
            "4" | "easy" => Ok(Rating::Easy),
            _ => Err(format!("Unknown rating: {}", s)),
        }
    }
}

// ============================================================================
// LIFECYCLE STATE
// ============================================================================

/// Where a card sits in its learning lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    /// Never reviewed
    #[default]
    New,
    /// Being learned for the first time
    Learning,
    /// Graduated to long-term review
    Review,
    /// Lapsed after graduating and being relearned
    Relearning,
}

impl LifecycleState {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::New => "new",
            LifecycleState::Learning => "learning",
            LifecycleState::Review => "review",
            LifecycleState::Relearning => "relearning",
        }
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for LifecycleState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "new" => Ok(LifecycleState::New),
            "learning" => Ok(LifecycleState::Learning),
            "review" => Ok(LifecycleState::Review),
            "relearning" => Ok(LifecycleState::Relearning),
            _ => Err(format!("Unknown lifecycle state: {}", s)),
        }
    }
}

// ============================================================================
// CARD MEMORY STATE
// ============================================================================

/// Scheduling state for one card as seen by one owner
///
/// Owned by the storage layer; read and written once per review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardMemoryState {
    /// Which formulas apply
    pub lifecycle_state: LifecycleState,
    /// Days until the next review (0 = due again today)
    pub interval_days: u32,
    /// Consecutive successes (interval-multiplier) or learning reps (forgetting-curve)
    pub repetition_count: u32,
    /// When the card becomes due
    pub due_at: DateTime<Utc>,
    /// Last review time, `None` if never reviewed
    pub last_reviewed_at: Option<DateTime<Utc>>,

    // ========== Interval-Multiplier ==========
    /// Multiplicative interval growth, bounded [1.3, 2.5]
    #[serde(deserialize_with = "deserialize_lossy_f64")]
    pub ease_factor: f64,

    // ========== Forgetting-Curve ==========
    /// Inherent difficulty (1.0 = easy, 10.0 = hard)
    #[serde(deserialize_with = "deserialize_lossy_f64")]
    pub difficulty: f64,
    /// Days until retrievability decays to 1/e
    #[serde(deserialize_with = "deserialize_lossy_f64")]
    pub stability: f64,
    /// Recall probability at the last review, bounded [0, 1]
    #[serde(deserialize_with = "deserialize_lossy_f64")]
    pub retrievability: f64,

    // ========== Counters ==========
    /// Total number of reviews applied
    #[serde(default)]
    pub total_reviews: u32,
    /// Reviews rated anything other than Again
    #[serde(default)]
    pub correct_reviews: u32,
}

/// JSON has no NaN or infinity: serde_json writes them as `null`.
/// Read `null` back as NaN and leave the repair to `sanitize`.
fn deserialize_lossy_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
}

impl CardMemoryState {
    /// State for a card that has never been studied, due immediately
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            lifecycle_state: LifecycleState::New,
            interval_days: 0,
            repetition_count: 0,
            due_at: now,
            last_reviewed_at: None,
            ease_factor: DEFAULT_EASE_FACTOR,
            difficulty: DEFAULT_DIFFICULTY,
            stability: MIN_STABILITY,
            retrievability: 1.0,
            total_reviews: 0,
            correct_reviews: 0,
        }
    }

    /// Whether the card is due at `now`
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.due_at <= now
    }

    /// Whether the card has never been studied
    pub fn is_new(&self) -> bool {
        self.lifecycle_state == LifecycleState::New
    }

    /// Fractional days since the last review, 0.0 if never reviewed
    pub fn elapsed_days(&self, now: DateTime<Utc>) -> f64 {
        match self.last_reviewed_at {
            Some(last) => {
                let millis = now.signed_duration_since(last).num_milliseconds();
                (millis as f64 / 86_400_000.0).max(0.0)
            }
            None => 0.0,
        }
    }
}

impl Default for CardMemoryState {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

// ============================================================================
// TESTS
// ============================================================================
