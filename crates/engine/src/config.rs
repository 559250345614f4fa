//! Engine configuration loaded from environment variables.

use std::time::Duration;

use common::LocationCode;
use domain::{Rule, RuleConfigurationError, RuleSet};
use thiserror::Error;

/// Errors raised while loading configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// A variable is present but unusable.
    #[error("Invalid value {value:?} for {var}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: &'static str,
    },

    /// A rule threshold is outside its valid domain.
    #[error(transparent)]
    Rule(#[from] RuleConfigurationError),
}

/// Tuning for the allocation engine.
///
/// Reads from environment variables:
/// - `CROSSDOCK_LEAD_TIME_DAYS` (default: `7`, valid `1..=30`)
/// - `CROSSDOCK_INVENTORY_THRESHOLD_PCT` (default: `60`, valid `0..=100`)
/// - `CROSSDOCK_STORAGE_LOCATION` (default: `"STORAGE-MAIN"`)
/// - `CROSSDOCK_RESERVATION_TIMEOUT_MS` (default: `2000`)
/// - `CROSSDOCK_RESERVATION_ATTEMPTS` (default: `3`, valid `1..=10`)
/// - `CROSSDOCK_FLOW_ALERT_PCT` (default: `60`, valid `0..=100`)
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub lead_time_days: i64,
    pub inventory_threshold_pct: f64,
    pub storage_location: LocationCode,
    pub reservation_timeout: Duration,
    pub reservation_attempts: u32,
    pub flow_alert_pct: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lead_time_days: 7,
            inventory_threshold_pct: 60.0,
            storage_location: LocationCode::new("STORAGE-MAIN"),
            reservation_timeout: Duration::from_millis(2000),
            reservation_attempts: 3,
            flow_alert_pct: 60.0,
        }
    }
}

impl EngineConfig {
    /// Loads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Loads configuration through an arbitrary variable lookup.
    ///
    /// Missing variables fall back to defaults; present but invalid ones
    /// are errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let config = Self {
            lead_time_days: parse(&lookup, "CROSSDOCK_LEAD_TIME_DAYS")?
                .unwrap_or(defaults.lead_time_days),
            inventory_threshold_pct: parse(&lookup, "CROSSDOCK_INVENTORY_THRESHOLD_PCT")?
                .unwrap_or(defaults.inventory_threshold_pct),
            storage_location: lookup("CROSSDOCK_STORAGE_LOCATION")
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .map(LocationCode::new)
                .unwrap_or(defaults.storage_location),
            reservation_timeout: parse::<u64, _>(&lookup, "CROSSDOCK_RESERVATION_TIMEOUT_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.reservation_timeout),
            reservation_attempts: parse(&lookup, "CROSSDOCK_RESERVATION_ATTEMPTS")?
                .unwrap_or(defaults.reservation_attempts),
            flow_alert_pct: parse(&lookup, "CROSSDOCK_FLOW_ALERT_PCT")?
                .unwrap_or(defaults.flow_alert_pct),
        };

        config.validate()?;
        Ok(config)
    }

    /// Checks every bound, including the rule thresholds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.reservation_timeout.is_zero() {
            return Err(ConfigError::Invalid {
                var: "CROSSDOCK_RESERVATION_TIMEOUT_MS",
                value: "0".to_string(),
                reason: "must be greater than zero",
            });
        }
        if !(1..=10).contains(&self.reservation_attempts) {
            return Err(ConfigError::Invalid {
                var: "CROSSDOCK_RESERVATION_ATTEMPTS",
                value: self.reservation_attempts.to_string(),
                reason: "must be between 1 and 10",
            });
        }
        if !(0.0..=100.0).contains(&self.flow_alert_pct) {
            return Err(ConfigError::Invalid {
                var: "CROSSDOCK_FLOW_ALERT_PCT",
                value: self.flow_alert_pct.to_string(),
                reason: "must be between 0 and 100",
            });
        }
        self.rule_set()?;
        Ok(())
    }

    /// Builds the standard rule set from the configured thresholds.
    pub fn rule_set(&self) -> Result<RuleSet, RuleConfigurationError> {
        RuleSet::new(vec![
            Rule::LeadTime {
                days_threshold: self.lead_time_days,
            },
            Rule::InventoryLevel {
                percent_threshold: self.inventory_threshold_pct,
            },
        ])
    }
}

fn parse<T, F>(lookup: &F, var: &'static str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid {
                var,
                value: raw,
                reason: "not a number",
            }),
    }
}
