//! Configuration loading from the process environment.

use thiserror::Error;

use crate::config::schema::{BotConfig, LogFormat, LoggingConfig};
use crate::config::validation::{validate_config, ValidationError};

pub const ENV_TOKEN: &str = "TELE_TOKEN";
pub const ENV_METRICS_PORT: &str = "METRICS_PORT";
pub const ENV_OTLP_ENDPOINT: &str = "OTEL_EXPORTER_OTLP_ENDPOINT";
pub const ENV_TRACING_ENABLED: &str = "OTEL_TRACING_ENABLED";
pub const ENV_ENVIRONMENT: &str = "ENVIRONMENT";
pub const ENV_API_URL: &str = "TELEGRAM_API_URL";
pub const ENV_LOG_FORMAT: &str = "LOG_FORMAT";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from the process environment.
pub fn load_from_env() -> Result<BotConfig, ConfigError> {
    load_with(|key| std::env::var(key).ok())
}

/// Load and validate configuration from an arbitrary variable lookup.
///
/// Empty values are treated as unset, matching how the deployment manifests
/// blank out optional variables.
pub fn load_with<F>(lookup: F) -> Result<BotConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|value| !value.is_empty());
    let mut config = BotConfig::default();
    let mut errors = Vec::new();

    if let Some(token) = get(ENV_TOKEN) {
        config.telegram.token = token;
    }
    if let Some(api_url) = get(ENV_API_URL) {
        config.telegram.api_url = api_url;
    }

    if let Some(port) = get(ENV_METRICS_PORT) {
        match port.trim().parse::<u16>() {
            Ok(parsed) => config.metrics.port = parsed,
            Err(_) => errors.push(ValidationError::InvalidPort(port)),
        }
    }

    config.tracing.endpoint = get(ENV_OTLP_ENDPOINT);
    config.tracing.enabled = get(ENV_TRACING_ENABLED).as_deref() == Some("true");
    if let Some(environment) = get(ENV_ENVIRONMENT) {
        config.tracing.environment = environment;
    }

    config.logging = logging_with(&get);

    if let Err(mut found) = validate_config(&config) {
        errors.append(&mut found);
    }

    if errors.is_empty() {
        Ok(config)
    } else {
        Err(ConfigError::Validation(errors))
    }
}

/// Logging settings only.
///
/// Read before the full configuration so config errors can be logged.
pub fn logging_from_env() -> LoggingConfig {
    logging_with(&|key: &str| std::env::var(key).ok())
}

fn logging_with(get: &dyn Fn(&str) -> Option<String>) -> LoggingConfig {
    let format = match get(ENV_LOG_FORMAT).as_deref().map(str::to_ascii_lowercase).as_deref() {
        Some("json") => LogFormat::Json,
        _ => LogFormat::Pretty,
    };
    LoggingConfig {
        format,
        ..LoggingConfig::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_minimal_env_uses_defaults() {
        let config = load_with(lookup(&[(ENV_TOKEN, "123:abc")])).unwrap();
        assert_eq!(config.telegram.token, "123:abc");
        assert_eq!(config.metrics.port, 8080);
        assert_eq!(config.tracing.environment, "development");
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert!(!config.tracing.is_enabled());
    }

    #[test]
    fn test_missing_token_is_rejected() {
        let err = load_with(lookup(&[])).unwrap_err();
        let ConfigError::Validation(errors) = err;
        assert_eq!(errors, vec![ValidationError::MissingToken]);
    }

    #[test]
    fn test_bad_port_is_reported_alongside_other_errors() {
        let err = load_with(lookup(&[(ENV_METRICS_PORT, "eighty")])).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("TELE_TOKEN"));
        assert!(message.contains("eighty"));
    }

    #[test]
    fn test_tracing_settings() {
        let config = load_with(lookup(&[
            (ENV_TOKEN, "t"),
            (ENV_OTLP_ENDPOINT, "collector:4317"),
            (ENV_ENVIRONMENT, "staging"),
            (ENV_METRICS_PORT, "9090"),
            (ENV_LOG_FORMAT, "JSON"),
        ]))
        .unwrap();
        assert!(config.tracing.is_enabled());
        assert_eq!(config.tracing.resolved_endpoint(), "http://collector:4317");
        assert_eq!(config.tracing.environment, "staging");
        assert_eq!(config.metrics.port, 9090);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_tracing_flag_requires_literal_true() {
        let on = load_with(lookup(&[(ENV_TOKEN, "t"), (ENV_TRACING_ENABLED, "true")])).unwrap();
        assert!(on.tracing.is_enabled());

        let off = load_with(lookup(&[(ENV_TOKEN, "t"), (ENV_TRACING_ENABLED, "1")])).unwrap();
        assert!(!off.tracing.is_enabled());
    }

    #[test]
    fn test_empty_values_count_as_unset() {
        let config = load_with(lookup(&[(ENV_TOKEN, "t"), (ENV_OTLP_ENDPOINT, "")])).unwrap();
        assert!(config.tracing.endpoint.is_none());
    }
}
