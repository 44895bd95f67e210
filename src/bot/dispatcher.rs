//! Command dispatch.
//!
//! # Responsibilities
//! - Resolve the command of an inbound message
//! - Produce the response text and send exactly one reply
//! - Wrap command execution and the send in a child span
//!
//! # Design Decisions
//! - Unknown input is a branch of its own, not an error
//! - A failed send is recorded on the command span and returned in the
//!   result; the dispatcher never retries

use chrono::{Local, NaiveDateTime};
use opentelemetry::trace::SpanKind;
use opentelemetry::Context;

use crate::bot::Command;
use crate::observability::Tracer;
use crate::transport::{InboundMessage, ReplySink, TransportError};

/// Reply for anything that is not a known command.
pub const HELP_TEXT: &str = "Hello from Kbot! Try hello or time";

pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Source of the local wall-clock time for the `time` command.
pub type Clock = fn() -> NaiveDateTime;

fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Outcome of one dispatched message.
#[derive(Debug)]
pub struct CommandResult {
    pub command: Command,
    pub response: String,
    /// Set when the reply could not be sent.
    pub error: Option<TransportError>,
}

impl CommandResult {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Maps inbound messages to command actions.
#[derive(Clone)]
pub struct Dispatcher {
    tracer: Tracer,
    version: String,
    clock: Clock,
}

impl Dispatcher {
    pub fn new(tracer: Tracer, version: impl Into<String>) -> Self {
        Self {
            tracer,
            version: version.into(),
            clock: local_now,
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Response text for a command.
    pub fn respond(&self, command: Command) -> String {
        match command {
            Command::Hello => format!("Hello I'm Kbot {}!", self.version),
            Command::Time => format!("Current time is {}", (self.clock)().format(TIME_FORMAT)),
            Command::Unknown => HELP_TEXT.to_string(),
        }
    }

    /// Resolve, execute and reply under a child span of `cx`.
    pub async fn dispatch(
        &self,
        cx: &Context,
        message: &InboundMessage,
        reply: &dyn ReplySink,
    ) -> CommandResult {
        let command = Command::resolve(message);
        let (_cx, span) = self
            .tracer
            .start_span(cx, command.span_name(), SpanKind::Internal, Vec::new());

        let response = self.respond(command);
        let error = reply.send(&response).await.err();

        if let Some(err) = &error {
            span.record_error(err);
            span.set_error(err.to_string());
        }
        span.end();

        CommandResult {
            command,
            response,
            error,
        }
    }
}
