//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Every handled message produces:
//!     → logging.rs (structured log events, trace id when available)
//!     → metrics.rs (counters, histograms)
//!     → tracer.rs (spans correlated by trace id)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape on /metrics)
//!     → Distributed tracing (OTLP collector, optional)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Trace id flows into every log line of a message
//! - Metrics are cheap (atomic increments)
//! - Tracing is optional; disabled tracing turns spans into no-ops

pub mod logging;
pub mod metrics;
pub mod tracer;

pub use self::metrics::{MessageStatus, MetricsRecorder};
pub use tracer::{current_trace_id, TelemetryError, TelemetrySpan, Tracer, TracerHandle};
