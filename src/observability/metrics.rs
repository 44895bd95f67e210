//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define bot metrics (message count, latency, build info, start time)
//! - Render the Prometheus text exposition for `/metrics`
//!
//! # Metrics
//! - `kbot_messages_total` (counter): messages handled by command, status
//! - `kbot_message_processing_duration_seconds` (histogram): latency by command
//! - `kbot_info` (gauge): constant 1, labelled with the running version
//! - `kbot_start_time_seconds` (gauge): unix timestamp of process start
//!
//! # Design Decisions
//! - The Prometheus recorder is owned, not installed globally, so every
//!   pipeline (and every test) can hold its own registry
//! - Label values come from closed enums to bound cardinality
//! - Low-overhead metric updates (atomic handles inside the exporter)

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use metrics::{Counter, Gauge, Histogram, Key, Label, Level, Metadata, Recorder};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle, PrometheusRecorder};

use crate::bot::Command;

pub const MESSAGES_TOTAL: &str = "kbot_messages_total";
pub const PROCESSING_DURATION: &str = "kbot_message_processing_duration_seconds";
pub const INFO: &str = "kbot_info";
pub const START_TIME: &str = "kbot_start_time_seconds";

/// Histogram bucket boundaries for message latency, in seconds.
pub const LATENCY_BUCKETS: [f64; 9] = [0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0];

/// Outcome label for a handled message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageStatus {
    Success,
    Error,
}

impl MessageStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageStatus::Success => "success",
            MessageStatus::Error => "error",
        }
    }
}

impl std::fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn metadata() -> Metadata<'static> {
    Metadata::new(module_path!(), Level::INFO, Some(module_path!()))
}

/// In-process aggregates for the bot, rendered on scrape.
pub struct MetricsRecorder {
    recorder: PrometheusRecorder,
    handle: PrometheusHandle,
}

impl MetricsRecorder {
    /// Build the registry and write the start-time and info series.
    pub fn new(version: &str) -> Result<Self, BuildError> {
        let recorder = PrometheusBuilder::new()
            .set_buckets_for_metric(Matcher::Full(PROCESSING_DURATION.to_string()), &LATENCY_BUCKETS)?
            .build_recorder();
        let handle = recorder.handle();
        let metrics = Self { recorder, handle };

        metrics.describe();

        let started = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        metrics.gauge(START_TIME, Vec::new()).set(started as f64);
        metrics
            .gauge(INFO, vec![Label::new("version", version.to_string())])
            .set(1.0);

        Ok(metrics)
    }

    fn describe(&self) {
        self.recorder.describe_counter(
            MESSAGES_TOTAL.into(),
            None,
            "Total number of messages received by the bot".into(),
        );
        self.recorder.describe_histogram(
            PROCESSING_DURATION.into(),
            None,
            "Time spent processing messages".into(),
        );
        self.recorder
            .describe_gauge(INFO.into(), None, "Information about kbot instance".into());
        self.recorder.describe_gauge(
            START_TIME.into(),
            None,
            "Start time of the bot in unix timestamp".into(),
        );
    }

    /// Count one handled message and observe its processing time.
    pub fn record_message(&self, command: Command, status: MessageStatus, duration: Duration) {
        self.counter(
            MESSAGES_TOTAL,
            vec![
                Label::new("command", command.as_str()),
                Label::new("status", status.as_str()),
            ],
        )
        .increment(1);

        self.histogram(PROCESSING_DURATION, vec![Label::new("command", command.as_str())])
            .record(duration.as_secs_f64());
    }

    /// Render every series in the Prometheus text format.
    pub fn render(&self) -> String {
        self.handle.render()
    }

    fn counter(&self, name: &'static str, labels: Vec<Label>) -> Counter {
        self.recorder
            .register_counter(&Key::from_parts(name, labels), &metadata())
    }

    fn gauge(&self, name: &'static str, labels: Vec<Label>) -> Gauge {
        self.recorder
            .register_gauge(&Key::from_parts(name, labels), &metadata())
    }

    fn histogram(&self, name: &'static str, labels: Vec<Label>) -> Histogram {
        self.recorder
            .register_histogram(&Key::from_parts(name, labels), &metadata())
    }
}
