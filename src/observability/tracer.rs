//! Distributed tracing support.
//!
//! # Responsibilities
//! - Build the OTLP exporter and tracer provider when tracing is enabled
//! - Create spans under an explicit parent context
//! - Expose the trace id of a context for log correlation
//! - Flush and close the exporter on shutdown, within a deadline
//!
//! # Design Decisions
//! - Optional: with no provider every span is inert, callers never branch
//! - Contexts are passed explicitly; nothing relies on `Context::current()`
//! - Supports W3C Trace Context and Baggage propagation

use std::time::Duration;

use opentelemetry::propagation::TextMapCompositePropagator;
use opentelemetry::trace::{SpanKind, Status, TraceContextExt, Tracer as _, TracerProvider as _};
use opentelemetry::{global, Context, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::propagation::{BaggagePropagator, TraceContextPropagator};
use opentelemetry_sdk::trace::{Sampler, SdkTracer, SdkTracerProvider};
use opentelemetry_sdk::Resource;
use thiserror::Error;

use crate::config::TracingConfig;

/// Instrumentation scope name for every span the bot emits.
pub const INSTRUMENTATION_NAME: &str = "kbot";

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("failed to build OTLP exporter: {0}")]
    Exporter(String),

    #[error("tracer initialization failed: {0}")]
    Init(String),

    #[error("tracer initialization exceeded {0:?}")]
    InitTimeout(Duration),

    #[error("tracer shutdown failed: {0}")]
    Shutdown(String),

    #[error("tracer shutdown exceeded {0:?}")]
    ShutdownTimeout(Duration),
}

/// Span factory handed to the request pipeline.
///
/// Cheap to clone. A disabled tracer hands out inert spans.
#[derive(Clone, Default)]
pub struct Tracer {
    inner: Option<SdkTracer>,
}

impl Tracer {
    /// A tracer whose spans discard every operation.
    pub fn disabled() -> Self {
        Self { inner: None }
    }

    /// A tracer bound to an existing provider.
    pub fn from_provider(provider: &SdkTracerProvider) -> Self {
        Self {
            inner: Some(provider.tracer(INSTRUMENTATION_NAME)),
        }
    }

    pub fn is_active(&self) -> bool {
        self.inner.is_some()
    }

    /// Open a child span of the span active in `parent`.
    ///
    /// Returns the child context (carrying the new span) and a handle used to
    /// annotate and close it. When tracing is disabled the parent context is
    /// returned unchanged with an inert handle.
    pub fn start_span(
        &self,
        parent: &Context,
        name: &'static str,
        kind: SpanKind,
        attributes: Vec<KeyValue>,
    ) -> (Context, TelemetrySpan) {
        match &self.inner {
            Some(tracer) => {
                let span = tracer
                    .span_builder(name)
                    .with_kind(kind)
                    .with_attributes(attributes)
                    .start_with_context(tracer, parent);
                let cx = parent.with_span(span);
                (cx.clone(), TelemetrySpan::active(cx))
            }
            None => (parent.clone(), TelemetrySpan::inert()),
        }
    }
}

/// Trace id of the span active in `cx`, or an empty string.
///
/// For log correlation only.
pub fn current_trace_id(cx: &Context) -> String {
    let span = cx.span();
    let span_context = span.span_context();
    if span_context.is_valid() {
        span_context.trace_id().to_string()
    } else {
        String::new()
    }
}

enum SpanInner {
    Active(Context),
    Inert,
}

/// Handle to one open span.
///
/// Closed by [`TelemetrySpan::end`], or on drop if `end` was never reached,
/// so the span is closed exactly once on every path.
pub struct TelemetrySpan {
    inner: SpanInner,
    ended: bool,
}

impl TelemetrySpan {
    fn active(cx: Context) -> Self {
        Self {
            inner: SpanInner::Active(cx),
            ended: false,
        }
    }

    /// A span that silently discards every operation.
    pub fn inert() -> Self {
        Self {
            inner: SpanInner::Inert,
            ended: false,
        }
    }

    pub fn is_recording(&self) -> bool {
        match &self.inner {
            SpanInner::Active(cx) => !self.ended && cx.span().is_recording(),
            SpanInner::Inert => false,
        }
    }

    pub fn set_attribute(&self, attribute: KeyValue) {
        if let SpanInner::Active(cx) = &self.inner {
            cx.span().set_attribute(attribute);
        }
    }

    pub fn set_attributes(&self, attributes: impl IntoIterator<Item = KeyValue>) {
        if let SpanInner::Active(cx) = &self.inner {
            cx.span().set_attributes(attributes);
        }
    }

    /// Record an error as an `exception` event.
    pub fn record_error(&self, err: &dyn std::error::Error) {
        if let SpanInner::Active(cx) = &self.inner {
            cx.span().record_error(err);
        }
    }

    pub fn set_ok(&self) {
        if let SpanInner::Active(cx) = &self.inner {
            cx.span().set_status(Status::Ok);
        }
    }

    pub fn set_error(&self, message: impl Into<String>) {
        if let SpanInner::Active(cx) = &self.inner {
            cx.span().set_status(Status::error(message.into()));
        }
    }

    /// Close the span.
    pub fn end(mut self) {
        self.close();
    }

    fn close(&mut self) {
        if self.ended {
            return;
        }
        self.ended = true;
        if let SpanInner::Active(cx) = &self.inner {
            cx.span().end();
        }
    }
}

impl Drop for TelemetrySpan {
    fn drop(&mut self) {
        self.close();
    }
}

/// Owns the tracer provider until shutdown.
pub struct TracerHandle {
    provider: SdkTracerProvider,
}

impl TracerHandle {
    /// Wrap an already-built provider.
    pub fn from_provider(provider: SdkTracerProvider) -> Self {
        Self { provider }
    }

    /// Flush buffered spans and close the exporter, giving up after `deadline`.
    pub async fn shutdown(self, deadline: Duration) -> Result<(), TelemetryError> {
        let provider = self.provider;
        run_with_deadline(deadline, move || provider.shutdown().map_err(|e| e.to_string())).await
    }
}

/// Run blocking `work` on a detached thread and wait at most `deadline`.
///
/// The runtime waits for blocking-pool tasks when it is dropped; a detached
/// thread can be abandoned once the deadline passes.
async fn run_with_deadline<F>(deadline: Duration, work: F) -> Result<(), TelemetryError>
where
    F: FnOnce() -> Result<(), String> + Send + 'static,
{
    let (tx, rx) = tokio::sync::oneshot::channel();
    std::thread::Builder::new()
        .name("kbot-tracer-shutdown".to_string())
        .spawn(move || {
            let _ = tx.send(work());
        })
        .map_err(|e| TelemetryError::Shutdown(e.to_string()))?;

    match tokio::time::timeout(deadline, rx).await {
        Ok(Ok(Ok(()))) => Ok(()),
        Ok(Ok(Err(message))) => Err(TelemetryError::Shutdown(message)),
        Ok(Err(_)) => Err(TelemetryError::Shutdown(
            "shutdown thread exited without a result".to_string(),
        )),
        Err(_) => Err(TelemetryError::ShutdownTimeout(deadline)),
    }
}

/// True when the configuration asks for tracing.
pub fn is_enabled(config: &TracingConfig) -> bool {
    config.is_enabled()
}

/// Build the exporter and provider, install them process-wide and return the
/// span factory plus the handle that shuts them down.
pub async fn init(
    config: &TracingConfig,
    version: &str,
    deadline: Duration,
) -> Result<(Tracer, TracerHandle), TelemetryError> {
    let endpoint = config.resolved_endpoint();
    let config = config.clone();
    let version = version.to_string();

    let task = tokio::task::spawn_blocking(move || build_provider(&config, &endpoint, &version));
    let provider = match tokio::time::timeout(deadline, task).await {
        Ok(Ok(built)) => built?,
        Ok(Err(join_err)) => return Err(TelemetryError::Init(join_err.to_string())),
        Err(_) => return Err(TelemetryError::InitTimeout(deadline)),
    };

    global::set_tracer_provider(provider.clone());
    global::set_text_map_propagator(TextMapCompositePropagator::new(vec![
        Box::new(TraceContextPropagator::new()),
        Box::new(BaggagePropagator::new()),
    ]));

    let tracer = Tracer::from_provider(&provider);
    Ok((tracer, TracerHandle { provider }))
}

fn build_provider(
    config: &TracingConfig,
    endpoint: &str,
    version: &str,
) -> Result<SdkTracerProvider, TelemetryError> {
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .with_timeout(config.init_timeout())
        .build()
        .map_err(|e| TelemetryError::Exporter(e.to_string()))?;

    let resource = Resource::builder()
        .with_service_name(config.service_name.clone())
        .with_attributes([
            KeyValue::new("service.version", version.to_string()),
            KeyValue::new("environment", config.environment.clone()),
        ])
        .build();

    tracing::info!(endpoint = %endpoint, "OpenTelemetry tracing initialized");

    Ok(SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(resource)
        .with_sampler(Sampler::AlwaysOn)
        .build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry_sdk::trace::InMemorySpanExporter;

    fn test_tracer() -> (Tracer, SdkTracerProvider, InMemorySpanExporter) {
        let exporter = InMemorySpanExporter::default();
        let provider = SdkTracerProvider::builder()
            .with_simple_exporter(exporter.clone())
            .build();
        (Tracer::from_provider(&provider), provider, exporter)
    }

    #[test]
    fn test_disabled_tracer_returns_inert_span() {
        let tracer = Tracer::disabled();
        let parent = Context::new();
        let (cx, span) = tracer.start_span(&parent, "noop", SpanKind::Internal, vec![]);

        assert!(!tracer.is_active());
        assert!(!span.is_recording());
        assert_eq!(current_trace_id(&cx), "");
        span.set_attribute(KeyValue::new("ignored", true));
        span.set_error("ignored");
        span.end();
    }

    #[test]
    fn test_child_span_shares_trace_id_with_parent() {
        let (tracer, _provider, exporter) = test_tracer();
        let (root_cx, root) = tracer.start_span(&Context::new(), "root", SpanKind::Server, vec![]);
        let (child_cx, child) = tracer.start_span(&root_cx, "child", SpanKind::Internal, vec![]);

        let trace_id = current_trace_id(&root_cx);
        assert_eq!(trace_id.len(), 32);
        assert_eq!(current_trace_id(&child_cx), trace_id);

        child.end();
        root.end();

        let spans = exporter.get_finished_spans().unwrap();
        assert_eq!(spans.len(), 2);
        let root = spans.iter().find(|s| s.name == "root").unwrap();
        let child = spans.iter().find(|s| s.name == "child").unwrap();
        assert_eq!(child.parent_span_id, root.span_context.span_id());
        assert_eq!(root.span_kind, SpanKind::Server);
    }

    #[test]
    fn test_span_closed_exactly_once_when_dropped() {
        let (tracer, _provider, exporter) = test_tracer();
        {
            let (_cx, span) = tracer.start_span(&Context::new(), "dropped", SpanKind::Internal, vec![]);
            span.set_error("boom");
        }
        let (_cx, span) = tracer.start_span(&Context::new(), "ended", SpanKind::Internal, vec![]);
        span.end();

        let spans = exporter.get_finished_spans().unwrap();
        assert_eq!(spans.len(), 2);
        let dropped = spans.iter().find(|s| s.name == "dropped").unwrap();
        assert!(matches!(dropped.status, Status::Error { .. }));
    }

    #[test]
    fn test_attributes_and_errors_are_recorded() {
        let (tracer, _provider, exporter) = test_tracer();
        let (_cx, span) = tracer.start_span(
            &Context::new(),
            "annotated",
            SpanKind::Internal,
            vec![KeyValue::new("initial", 1_i64)],
        );
        span.set_attributes([KeyValue::new("extra", "yes")]);
        let err = std::io::Error::other("send failed");
        span.record_error(&err);
        span.set_error(err.to_string());
        span.end();

        let spans = exporter.get_finished_spans().unwrap();
        let span = &spans[0];
        let keys: Vec<_> = span.attributes.iter().map(|kv| kv.key.as_str()).collect();
        assert!(keys.contains(&"initial"));
        assert!(keys.contains(&"extra"));
        assert!(span.events.events.iter().any(|e| e.name == "exception"));
        assert_eq!(
            span.status,
            Status::Error {
                description: "send failed".into()
            }
        );
    }

    #[tokio::test]
    async fn test_shutdown_within_deadline() {
        let exporter = InMemorySpanExporter::default();
        let provider = SdkTracerProvider::builder()
            .with_simple_exporter(exporter)
            .build();
        let handle = TracerHandle::from_provider(provider);
        assert!(handle.shutdown(Duration::from_secs(5)).await.is_ok());
    }

    #[tokio::test]
    async fn test_shutdown_gives_up_after_deadline() {
        let started = std::time::Instant::now();
        let result = run_with_deadline(Duration::from_millis(50), || {
            std::thread::sleep(Duration::from_secs(2));
            Ok(())
        })
        .await;

        assert!(matches!(result, Err(TelemetryError::ShutdownTimeout(_))));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_shutdown_error_is_reported() {
        let result = run_with_deadline(Duration::from_secs(1), || Err("exporter gone".to_string())).await;
        match result {
            Err(TelemetryError::Shutdown(message)) => assert_eq!(message, "exporter gone"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_is_enabled_follows_config() {
        let mut config = TracingConfig::default();
        assert!(!is_enabled(&config));
        config.enabled = true;
        assert!(is_enabled(&config));
    }
}
