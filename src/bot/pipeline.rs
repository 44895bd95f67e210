//! Per-message request pipeline.
//!
//! Every inbound message runs the same fixed sequence:
//!
//! ```text
//! open root span "handle_message" ─┐
//! log receipt (trace id if any)    │
//! attach sender/message attributes │  strictly sequential,
//! dispatch (child span inside)     │  span writes happen
//! attach command/response          │  before the close
//! record metrics                   │
//! set span status, log completion  │
//! close root span ─────────────────┘
//! ```
//!
//! The send error, if any, is returned to the transport and goes no further.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use opentelemetry::trace::SpanKind;
use opentelemetry::{Context, KeyValue};

use crate::bot::Dispatcher;
use crate::observability::{current_trace_id, MessageStatus, MetricsRecorder, Tracer};
use crate::transport::{InboundMessage, MessageHandler, ReplySink, TransportError};

pub const ROOT_SPAN: &str = "handle_message";

/// Wraps dispatch of one message in a span, a timer and a metric sample.
pub struct MessagePipeline {
    tracer: Tracer,
    dispatcher: Dispatcher,
    metrics: Arc<MetricsRecorder>,
}

impl MessagePipeline {
    pub fn new(tracer: Tracer, dispatcher: Dispatcher, metrics: Arc<MetricsRecorder>) -> Self {
        Self {
            tracer,
            dispatcher,
            metrics,
        }
    }

    pub async fn process(
        &self,
        message: &InboundMessage,
        reply: &dyn ReplySink,
    ) -> Result<(), TransportError> {
        // Dropping `span` on an early exit or unwind still closes it.
        let (cx, span) = self
            .tracer
            .start_span(&Context::new(), ROOT_SPAN, SpanKind::Server, Vec::new());
        let started = Instant::now();

        let trace_id = current_trace_id(&cx);
        if trace_id.is_empty() {
            tracing::info!(
                sender = %message.sender.display_name,
                text = %message.text,
                "Received message"
            );
        } else {
            tracing::info!(
                trace_id = %trace_id,
                sender = %message.sender.display_name,
                text = %message.text,
                "Received message"
            );
        }

        span.set_attributes([
            KeyValue::new("telegram.user_id", message.sender.id),
            KeyValue::new("telegram.username", message.sender.display_name.clone()),
            KeyValue::new("telegram.message", message.text.clone()),
        ]);

        let result = self.dispatcher.dispatch(&cx, message, reply).await;

        span.set_attributes([
            KeyValue::new("command", result.command.as_str()),
            KeyValue::new("response", result.response.clone()),
        ]);

        let elapsed = started.elapsed();
        let status = if result.is_success() {
            MessageStatus::Success
        } else {
            MessageStatus::Error
        };
        self.metrics.record_message(result.command, status, elapsed);

        match &result.error {
            Some(err) => {
                span.record_error(err);
                span.set_error(err.to_string());
            }
            None => span.set_ok(),
        }

        if trace_id.is_empty() {
            tracing::info!(
                command = %result.command,
                duration = ?elapsed,
                status = %status,
                "Processed message"
            );
        } else {
            tracing::info!(
                trace_id = %trace_id,
                command = %result.command,
                duration = ?elapsed,
                status = %status,
                "Processed message"
            );
        }

        span.end();

        match result.error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl MessageHandler for MessagePipeline {
    async fn handle(
        &self,
        message: InboundMessage,
        reply: &dyn ReplySink,
    ) -> Result<(), TransportError> {
        self.process(&message, reply).await
    }
}
