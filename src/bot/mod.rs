//! Bot request handling.
//!
//! # Data Flow
//! ```text
//! InboundMessage (from transport)
//!     → pipeline.rs (root span, timing, metrics, status)
//!     → dispatcher.rs (command span, response, reply send)
//!     → command.rs (normalize text, select command)
//! ```
//!
//! # Design Decisions
//! - The pipeline owns no mutable state; metrics and spans are the only
//!   shared resources and are concurrency-safe collaborators
//! - Tracing on or off never changes responses or metrics

pub mod command;
pub mod dispatcher;
pub mod pipeline;

pub use command::{normalize, Command};
pub use dispatcher::{CommandResult, Dispatcher, HELP_TEXT};
pub use pipeline::MessagePipeline;
