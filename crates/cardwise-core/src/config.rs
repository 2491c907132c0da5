//! Engine configuration
//!
//! Everything a deployment chooses once: the scheduling strategy and its
//! parameters, study limits, session retry policy, and label locale.
//! Values come from defaults, a serialized config, or `CARDWISE_*`
//! environment variables.

use serde::{Deserialize, Serialize};

use crate::interval_format::Locale;
use crate::scheduling::{
    ForgettingCurve, ForgettingCurveParameters, IntervalMultiplier, IntervalMultiplierParameters,
    Strategy, StrategyKind,
};
use crate::study::{ExhaustedAttemptPolicy, SessionConfig, StudyLimits};

/// Strategy kind override
pub const ENV_STRATEGY: &str = "CARDWISE_STRATEGY";
/// New-card limit override
pub const ENV_NEW_CARD_LIMIT: &str = "CARDWISE_NEW_CARD_LIMIT";
/// Review-card limit override
pub const ENV_REVIEW_CARD_LIMIT: &str = "CARDWISE_REVIEW_CARD_LIMIT";
/// Session attempt limit override
pub const ENV_MAX_ATTEMPTS: &str = "CARDWISE_MAX_ATTEMPTS";
/// Exhausted-attempt policy override
pub const ENV_EXHAUSTED_POLICY: &str = "CARDWISE_EXHAUSTED_POLICY";
/// Label locale override
pub const ENV_LOCALE: &str = "CARDWISE_LOCALE";

/// Configuration error type
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value {value:?} for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    pub strategy: StrategyKind,
    pub limits: StudyLimits,
    pub session: SessionConfig,
    pub locale: Locale,
    pub interval_multiplier: IntervalMultiplierParameters,
    pub forgetting_curve: ForgettingCurveParameters,
}

impl EngineConfig {
    /// Defaults with `CARDWISE_*` overrides applied
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from a key lookup (environment, flags, ...).
    ///
    /// Unset keys keep their current value. Unparseable values are errors.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_STRATEGY) {
            self.strategy = parse(ENV_STRATEGY, &value)?;
        }
        if let Some(value) = lookup(ENV_NEW_CARD_LIMIT) {
            self.limits.new_cards = parse(ENV_NEW_CARD_LIMIT, &value)?;
        }
        if let Some(value) = lookup(ENV_REVIEW_CARD_LIMIT) {
            self.limits.review_cards = parse(ENV_REVIEW_CARD_LIMIT, &value)?;
        }
        if let Some(value) = lookup(ENV_MAX_ATTEMPTS) {
            let attempts: u32 = parse(ENV_MAX_ATTEMPTS, &value)?;
            if attempts == 0 {
                return Err(ConfigError::InvalidValue {
                    key: ENV_MAX_ATTEMPTS.to_string(),
                    value,
                    reason: "must be at least 1".to_string(),
                });
            }
            self.session.max_attempts = attempts;
        }
        if let Some(value) = lookup(ENV_EXHAUSTED_POLICY) {
            self.session.exhausted_policy = parse(ENV_EXHAUSTED_POLICY, &value)?;
        }
        if let Some(value) = lookup(ENV_LOCALE) {
            self.locale = parse(ENV_LOCALE, &value)?;
        }
        Ok(self)
    }

    pub fn with_strategy(mut self, strategy: StrategyKind) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_limits(mut self, limits: StudyLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.session.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_exhausted_policy(mut self, policy: ExhaustedAttemptPolicy) -> Self {
        self.session.exhausted_policy = policy;
        self
    }

    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }

    pub fn with_interval_multiplier(mut self, params: IntervalMultiplierParameters) -> Self {
        self.interval_multiplier = params;
        self
    }

    pub fn with_forgetting_curve(mut self, params: ForgettingCurveParameters) -> Self {
        self.forgetting_curve = params;
        self
    }

    /// Instantiate the configured strategy with its parameters
    pub fn build_strategy(&self) -> Strategy {
        match self.strategy {
            StrategyKind::IntervalMultiplier => {
                IntervalMultiplier::new(self.interval_multiplier.clone()).into()
            }
            StrategyKind::ForgettingCurve => {
                ForgettingCurve::new(self.forgetting_curve.clone()).into()
            }
        }
    }
}

fn parse<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            reason: e.to_string(),
        })
}
