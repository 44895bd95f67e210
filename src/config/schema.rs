//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the bot.
//! Every section has defaults so only the bot token has to be supplied.

use std::fmt;
use std::time::Duration;

/// Collector address used when tracing is switched on without an endpoint.
pub const DEFAULT_OTLP_ENDPOINT: &str = "otel-collector-collector.monitoring.svc.cluster.local:4317";

/// Root configuration for the bot process.
#[derive(Debug, Clone, Default)]
pub struct BotConfig {
    /// Telegram Bot API settings.
    pub telegram: TelegramConfig,

    /// Scrape server settings.
    pub metrics: MetricsConfig,

    /// OpenTelemetry exporter settings.
    pub tracing: TracingConfig,

    /// Log output settings.
    pub logging: LoggingConfig,

    /// Shutdown deadlines.
    pub shutdown: ShutdownConfig,
}

/// Telegram transport configuration.
#[derive(Clone)]
pub struct TelegramConfig {
    /// Bot auth token (`TELE_TOKEN`). Never logged.
    pub token: String,

    /// Bot API base URL.
    pub api_url: String,

    /// Long-poll timeout passed to `getUpdates`, in seconds.
    pub poll_timeout_secs: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            api_url: "https://api.telegram.org".to_string(),
            poll_timeout_secs: 10,
        }
    }
}

impl fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("token", &"<redacted>")
            .field("api_url", &self.api_url)
            .field("poll_timeout_secs", &self.poll_timeout_secs)
            .finish()
    }
}

impl TelegramConfig {
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_secs(self.poll_timeout_secs)
    }
}

/// Scrape server configuration.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Port for `/metrics`, `/health` and `/ready`.
    pub port: u16,

    /// Per-request timeout on the scrape server, in seconds.
    pub request_timeout_secs: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            request_timeout_secs: 10,
        }
    }
}

impl MetricsConfig {
    pub fn bind_address(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}

/// OpenTelemetry configuration.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Explicit collector endpoint (`OTEL_EXPORTER_OTLP_ENDPOINT`).
    pub endpoint: Option<String>,

    /// Explicit enable flag (`OTEL_TRACING_ENABLED=true`).
    pub enabled: bool,

    /// Deployment environment tag attached to every span.
    pub environment: String,

    /// `service.name` resource attribute.
    pub service_name: String,

    /// Deadline for exporter setup, in seconds.
    pub init_timeout_secs: u64,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            enabled: false,
            environment: "development".to_string(),
            service_name: "kbot".to_string(),
            init_timeout_secs: 10,
        }
    }
}

impl TracingConfig {
    /// Tracing is on when an endpoint is configured or the flag is set.
    pub fn is_enabled(&self) -> bool {
        self.endpoint.is_some() || self.enabled
    }

    /// Collector endpoint with a scheme, falling back to the in-cluster collector.
    pub fn resolved_endpoint(&self) -> String {
        let endpoint = self.endpoint.as_deref().unwrap_or(DEFAULT_OTLP_ENDPOINT);
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            endpoint.to_string()
        } else {
            format!("http://{endpoint}")
        }
    }

    pub fn init_timeout(&self) -> Duration {
        Duration::from_secs(self.init_timeout_secs)
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub format: LogFormat,

    /// Filter used when `RUST_LOG` is not set.
    pub default_filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Pretty,
            default_filter: "kbot=info,tower_http=info".to_string(),
        }
    }
}

/// Shutdown deadlines.
#[derive(Debug, Clone)]
pub struct ShutdownConfig {
    /// Upper bound on the tracer flush, in seconds.
    pub tracer_timeout_secs: u64,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            tracer_timeout_secs: 5,
        }
    }
}

impl ShutdownConfig {
    pub fn tracer_timeout(&self) -> Duration {
        Duration::from_secs(self.tracer_timeout_secs)
    }
}
