//! Intake configuration.
//!
//! Resolved once when a session is created and then handed to the controller.
//! The core never reads process environment variables itself.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::guards::CoverageChoice;
use crate::models::ConsentForm;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("Configuration parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Tunables for one intake session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IntakeConfig {
    /// Attempts per verification when the payer is unreachable (at least 1)
    pub verification_attempts: u32,
    /// Delay between verification attempts
    pub retry_backoff_ms: u64,
    /// How long to wait for a choice while coverage is pending
    pub pending_coverage_timeout_ms: u64,
    /// Applied when the pending-coverage wait times out
    pub pending_coverage_default: CoverageChoice,
    /// Reject symptoms without a severity at commit time
    pub require_symptom_severity: bool,
    /// Forms installed when the session reaches check-in confirmation
    pub consent_forms: Vec<ConsentForm>,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            verification_attempts: 3,
            retry_backoff_ms: 250,
            pending_coverage_timeout_ms: 120_000,
            pending_coverage_default: CoverageChoice::ProceedWithoutInsurance,
            require_symptom_severity: false,
            consent_forms: Vec::new(),
        }
    }
}

impl IntakeConfig {
    /// Parse and validate a JSON configuration. Missing keys take defaults.
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let config: IntakeConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.verification_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "verification_attempts",
                reason: "must be at least 1".into(),
            });
        }
        if self.pending_coverage_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "pending_coverage_timeout_ms",
                reason: "must be greater than zero".into(),
            });
        }
        let mut seen = std::collections::HashSet::new();
        for form in &self.consent_forms {
            if form.id.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "consent_forms",
                    reason: "form id cannot be empty".into(),
                });
            }
            if !seen.insert(form.id.as_str()) {
                return Err(ConfigError::InvalidValue {
                    field: "consent_forms",
                    reason: format!("duplicate form id {}", form.id),
                });
            }
        }
        Ok(())
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn pending_coverage_timeout(&self) -> Duration {
        Duration::from_millis(self.pending_coverage_timeout_ms)
    }

    /// Replace the consent form set (builder style).
    pub fn with_consent_forms(mut self, forms: Vec<ConsentForm>) -> Self {
        self.consent_forms = forms;
        self
    }
}
