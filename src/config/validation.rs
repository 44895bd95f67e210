//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation of values read from the environment
//! - Required settings (bot token) are present
//! - Value ranges (port, timeouts) and URL syntax
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: BotConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;
use url::Url;

use crate::config::schema::BotConfig;

/// A single semantic problem with the loaded configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("TELE_TOKEN environment variable is not set")]
    MissingToken,

    #[error("METRICS_PORT must be a port number in 1..=65535, got {0:?}")]
    InvalidPort(String),

    #[error("invalid Telegram API URL {0:?}")]
    InvalidApiUrl(String),

    #[error("{0} must be greater than zero")]
    ZeroTimeout(&'static str),
}

/// Validate a loaded configuration, collecting every problem.
pub fn validate_config(config: &BotConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.telegram.token.trim().is_empty() {
        errors.push(ValidationError::MissingToken);
    }

    if config.metrics.port == 0 {
        errors.push(ValidationError::InvalidPort("0".to_string()));
    }

    if Url::parse(&config.telegram.api_url).is_err() {
        errors.push(ValidationError::InvalidApiUrl(config.telegram.api_url.clone()));
    }

    if config.telegram.poll_timeout_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("telegram poll timeout"));
    }

    if config.shutdown.tracer_timeout_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("tracer shutdown timeout"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
