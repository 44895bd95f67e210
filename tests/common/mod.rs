//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use kbot::bot::{Dispatcher, MessagePipeline};
use kbot::observability::{MetricsRecorder, Tracer};
use kbot::transport::{InboundMessage, ReplySink, Sender, TransportError};
use opentelemetry_sdk::trace::{InMemorySpanExporter, SdkTracerProvider};

pub const TEST_VERSION: &str = "v0.0.0-test";

/// Reply sink that records every send attempt and can be told to fail.
#[derive(Default)]
pub struct RecordingReply {
    sent: Mutex<Vec<String>>,
    fail_with: Option<String>,
    delay: Option<Duration>,
}

impl RecordingReply {
    pub fn ok() -> Self {
        Self::default()
    }

    pub fn failing(description: &str) -> Self {
        Self {
            fail_with: Some(description.to_string()),
            ..Self::default()
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReplySink for RecordingReply {
    async fn send(&self, text: &str) -> Result<(), TransportError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.sent.lock().unwrap().push(text.to_string());
        match &self.fail_with {
            Some(description) => Err(TransportError::Api {
                method: "sendMessage",
                description: description.clone(),
            }),
            None => Ok(()),
        }
    }
}

pub fn message(text: &str) -> InboundMessage {
    InboundMessage::new(
        Sender {
            id: 4242,
            display_name: "tester".to_string(),
        },
        text,
    )
}

/// Tracer exporting synchronously into memory.
pub fn in_memory_tracer() -> (Tracer, SdkTracerProvider, InMemorySpanExporter) {
    let exporter = InMemorySpanExporter::default();
    let provider = SdkTracerProvider::builder()
        .with_simple_exporter(exporter.clone())
        .build();
    (Tracer::from_provider(&provider), provider, exporter)
}

pub fn pipeline(tracer: Tracer) -> (MessagePipeline, Arc<MetricsRecorder>) {
    let metrics = Arc::new(MetricsRecorder::new(TEST_VERSION).unwrap());
    let pipeline = MessagePipeline::new(
        tracer.clone(),
        Dispatcher::new(tracer, TEST_VERSION),
        metrics.clone(),
    );
    (pipeline, metrics)
}

/// Value of one exposition line, e.g. `kbot_messages_total{command="hello",status="success"}`.
pub fn sample(exposition: &str, series: &str) -> Option<f64> {
    exposition.lines().find_map(|line| {
        let value = line.strip_prefix(series)?.strip_prefix(' ')?;
        value.trim().parse().ok()
    })
}

/// Sum of every `kbot_messages_total` sample.
pub fn total_messages(exposition: &str) -> f64 {
    exposition
        .lines()
        .filter(|line| line.starts_with("kbot_messages_total{"))
        .filter_map(|line| line.rsplit(' ').next()?.parse::<f64>().ok())
        .sum()
}
