//! Resilience helpers.
//!
//! # Data Flow
//! ```text
//! Bot API poll fails
//!     → backoff.rs (exponential delay with jitter)
//!     → poll again; success resets the delay
//! ```
//!
//! # Design Decisions
//! - Every external call has a deadline (reqwest timeouts)
//! - Reply sends are never retried; the failure is reported instead

pub mod backoff;

pub use backoff::Backoff;
