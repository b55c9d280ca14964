//! Engine configuration.
//!
//! ```toml
//! cache_ttl_ms = 86400000
//! gateway_timeout_ms = 10000
//! computation_timeout_ms = 120000
//!
//! [risk]
//! confidence_levels = [0.95, 0.99]
//! iterations = 10000
//!
//! [risk.concentration_limits]
//! sector = 30.0
//!
//! [retry]
//! max_attempts = 3
//!
//! [[scenarios]]
//! id = "GFC-2008"
//! name = "Global financial crisis"
//! event = "2008"
//! default_shock = -0.38
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use folio_risk::{RiskConfig, RiskError, ScenarioLibrary, Validate, ValidationError};

use crate::runtime::{CallPolicy, RetryConfig};

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The TOML could not be parsed.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// The configuration parsed but is not usable.
    #[error("invalid configuration: {0}")]
    Invalid(String),

    /// A required collaborator was not supplied to the builder.
    #[error("{0} not configured")]
    Missing(&'static str),
}

/// Configuration for [`RiskEngine`](crate::RiskEngine).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Analytics configuration.
    #[serde(default)]
    pub risk: RiskConfig,

    /// Lifetime of cached volatility and correlation entries, in milliseconds.
    #[serde(default = "default_cache_ttl_ms")]
    pub cache_ttl_ms: u64,

    /// Timeout for each market data or holdings call, in milliseconds.
    #[serde(default = "default_gateway_timeout_ms")]
    pub gateway_timeout_ms: u64,

    /// Deadline for a whole VaR or stress computation, in milliseconds.
    #[serde(default = "default_computation_timeout_ms")]
    pub computation_timeout_ms: u64,

    /// Retry policy for collaborator calls.
    #[serde(default)]
    pub retry: RetryConfig,

    /// Valuation date. `None` uses today's date (UTC).
    #[serde(default)]
    pub valuation_date: Option<NaiveDate>,

    /// Stress scenarios available by id.
    #[serde(default)]
    pub scenarios: ScenarioLibrary,
}

fn default_cache_ttl_ms() -> u64 {
    24 * 60 * 60 * 1000
}

fn default_gateway_timeout_ms() -> u64 {
    10_000
}

fn default_computation_timeout_ms() -> u64 {
    120_000
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            risk: RiskConfig::default(),
            cache_ttl_ms: default_cache_ttl_ms(),
            gateway_timeout_ms: default_gateway_timeout_ms(),
            computation_timeout_ms: default_computation_timeout_ms(),
            retry: RetryConfig::default(),
            valuation_date: None,
            scenarios: ScenarioLibrary::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.check()?;
        Ok(config)
    }

    /// Validates and converts the result into a [`ConfigError`].
    pub fn check(&self) -> Result<(), ConfigError> {
        self.validate_or_error().map_err(|e| match e {
            RiskError::InvalidConfig(message) => ConfigError::Invalid(message),
            other => ConfigError::Invalid(other.to_string()),
        })
    }

    /// Sets the analytics configuration.
    #[must_use]
    pub fn with_risk(mut self, risk: RiskConfig) -> Self {
        self.risk = risk;
        self
    }

    /// Sets the scenario library.
    #[must_use]
    pub fn with_scenarios(mut self, scenarios: ScenarioLibrary) -> Self {
        self.scenarios = scenarios;
        self
    }

    /// Sets the valuation date.
    #[must_use]
    pub fn with_valuation_date(mut self, date: NaiveDate) -> Self {
        self.valuation_date = Some(date);
        self
    }

    /// Sets the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Sets the cache lifetime.
    #[must_use]
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl_ms = millis(ttl);
        self
    }

    /// Sets the per-call gateway timeout.
    #[must_use]
    pub fn with_gateway_timeout(mut self, timeout: Duration) -> Self {
        self.gateway_timeout_ms = millis(timeout);
        self
    }

    /// Sets the computation deadline.
    #[must_use]
    pub fn with_computation_timeout(mut self, timeout: Duration) -> Self {
        self.computation_timeout_ms = millis(timeout);
        self
    }

    /// Cache entry lifetime.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }

    /// Computation deadline.
    pub fn computation_timeout(&self) -> Duration {
        Duration::from_millis(self.computation_timeout_ms)
    }

    /// Policy applied to every collaborator call.
    pub fn call_policy(&self) -> CallPolicy {
        CallPolicy::new(Duration::from_millis(self.gateway_timeout_ms), self.retry.clone())
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl Validate for EngineConfig {
    fn validate(&self) -> Vec<ValidationError> {
        let mut errors = self.risk.validate();
        errors.extend(self.scenarios.validate());

        if self.gateway_timeout_ms == 0 {
            errors.push(ValidationError::new(
                "gateway_timeout_ms",
                "Gateway timeout must be positive",
            ));
        }
        if self.cache_ttl_ms == 0 {
            errors.push(ValidationError::new(
                "cache_ttl_ms",
                "Cache lifetime must be positive",
            ));
        }
        if self.computation_timeout_ms == 0 {
            errors.push(ValidationError::new(
                "computation_timeout_ms",
                "Computation timeout must be positive",
            ));
        }
        if self.retry.max_attempts == 0 {
            errors.push(ValidationError::with_rule(
                "retry.max_attempts",
                "At least one attempt is required",
                "positive_attempts",
            ));
        }
        if !(self.retry.backoff_multiplier.is_finite() && self.retry.backoff_multiplier >= 1.0) {
            errors.push(ValidationError::new(
                "retry.backoff_multiplier",
                "Backoff multiplier must be at least 1.0",
            ));
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_core::ScenarioId;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.cache_ttl(), Duration::from_secs(86_400));
        assert_eq!(config.call_policy().timeout, Duration::from_secs(10));
        assert_eq!(config.computation_timeout(), Duration::from_secs(120));
        assert!(config.is_valid());
    }

    #[test]
    fn test_empty_toml_gives_defaults() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_parse_full_toml() {
        let config = EngineConfig::from_toml_str(
            r#"
            cache_ttl_ms = 600000
            valuation_date = "2024-06-28"

            [risk]
            iterations = 50000
            seed = 42
            confidence_levels = [0.95]

            [risk.concentration_limits]
            sector = 25.0

            [retry]
            max_attempts = 5
            jitter = false

            [[scenarios]]
            id = "BLACK-MONDAY-1987"
            name = "Black Monday"
            event = "1987"
            default_shock = -0.226
            recovery_days = 505

            [scenarios.sector_shocks]
            Technology = -0.30
            "#,
        )
        .unwrap();

        assert_eq!(config.cache_ttl(), Duration::from_secs(600));
        assert_eq!(config.risk.iterations, 50_000);
        assert_eq!(config.risk.seed, Some(42));
        assert_eq!(config.risk.concentration_limits.sector, 25.0);
        assert_eq!(config.risk.concentration_limits.issuer, 10.0);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.initial_delay_ms, 100);

        let scenario = config
            .scenarios
            .get(&ScenarioId::new("BLACK-MONDAY-1987"))
            .unwrap();
        assert_eq!(scenario.event.as_deref(), Some("1987"));
        assert_eq!(scenario.sector_shocks["Technology"], -0.30);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = EngineConfig::from_toml_str("[risk]\niterations = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(ref m) if m.contains("iterations")));

        let err = EngineConfig::from_toml_str("gateway_timeout_ms = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        assert!(matches!(
            EngineConfig::from_toml_str("cache_ttl_ms = \"soon\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_sub_second_durations_kept() {
        let config = EngineConfig::default()
            .with_cache_ttl(Duration::from_millis(250))
            .with_computation_timeout(Duration::from_millis(40));
        assert_eq!(config.cache_ttl(), Duration::from_millis(250));
        assert_eq!(config.computation_timeout(), Duration::from_millis(40));
        assert!(config.is_valid());

        let err = EngineConfig::from_toml_str("cache_ttl_ms = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(ref m) if m.contains("cache_ttl_ms")));
    }

    #[test]
    fn test_missing_file() {
        let err = EngineConfig::from_file("/nonexistent/folio.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
