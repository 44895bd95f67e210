//! kbot: a Telegram bot with metrics and distributed tracing.

pub mod bot;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod transport;

pub use bot::MessagePipeline;
pub use config::BotConfig;
pub use lifecycle::Shutdown;

/// Running version, overridable at build time through `KBOT_VERSION`.
pub const VERSION: &str = match option_env!("KBOT_VERSION") {
    Some(version) => version,
    None => env!("CARGO_PKG_VERSION"),
};
