//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! process environment (TELE_TOKEN, METRICS_PORT, OTEL_*, ...)
//!     → loader.rs (read & parse)
//!     → validation.rs (semantic checks)
//!     → BotConfig (validated, immutable)
//!     → handed to lifecycle::startup, which splits it per subsystem
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields except the bot token have defaults
//! - Validation separates parsing from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_from_env, ConfigError};
pub use schema::{BotConfig, LogFormat, LoggingConfig, MetricsConfig, TelegramConfig, TracingConfig};
