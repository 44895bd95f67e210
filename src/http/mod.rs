//! HTTP scrape and probe surface.
//!
//! # Data Flow
//! ```text
//! Prometheus / kubelet
//!     → server.rs (Axum router, trace + timeout layers)
//!     → /metrics renders MetricsRecorder
//!     → /health, /ready answer liveness and readiness probes
//! ```

pub mod server;

pub use server::HttpServer;
