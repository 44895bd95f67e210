//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Metrics server → Tracer (if enabled) → Telegram poller
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop polling → Drain handlers → Stop server
//!     → Flush tracer (bounded) → Exit
//!
//! Signals (signals.rs):
//!     Handlers registered before startup → SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: telemetry first, then the transport
//! - Ordered shutdown: stop intake, drain, flush
//! - Tracer flush has a timeout: exit after the deadline regardless

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{run, start, RunningBot, StartupError};
