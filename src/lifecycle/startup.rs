//! Startup orchestration.
//!
//! # Responsibilities
//! - Initialize subsystems in dependency order
//! - Start background tasks (metrics server, Telegram poller)
//! - Tear them down in reverse order on termination
//!
//! # Design Decisions
//! - Only a broken transport is fatal; metrics and tracing degrade
//! - The poller starts last (messages only once telemetry is ready)
//! - Tracer shutdown has a deadline: flush never blocks exit

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::bot::{Dispatcher, MessagePipeline};
use crate::config::BotConfig;
use crate::http::HttpServer;
use crate::lifecycle::signals::TerminationSignals;
use crate::lifecycle::Shutdown;
use crate::observability::{tracer, MetricsRecorder, Tracer, TracerHandle};
use crate::transport::{MessageHandler, TelegramClient, TelegramPoller, TransportError};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to build metrics registry: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("failed to create bot: {0}")]
    Transport(#[from] TransportError),

    #[error("failed to install signal handlers: {0}")]
    Signals(std::io::Error),
}

/// Handles to everything started by [`start`].
pub struct RunningBot {
    shutdown: Shutdown,
    metrics: Arc<MetricsRecorder>,
    metrics_addr: Option<SocketAddr>,
    server: Option<JoinHandle<()>>,
    poller: JoinHandle<()>,
    tracer_handle: Option<TracerHandle>,
    tracer_timeout: Duration,
}

/// Bring the bot up: metrics server, tracer, then the Telegram poller.
pub async fn start(config: BotConfig, version: &str) -> Result<RunningBot, StartupError> {
    let shutdown = Shutdown::new();
    let metrics = Arc::new(MetricsRecorder::new(version)?);

    let (server, metrics_addr) = start_metrics_server(&config, metrics.clone(), &shutdown).await;

    let (tracer, tracer_handle) = start_tracer(&config, version).await;

    let client = TelegramClient::new(&config.telegram)?;
    let pipeline: Arc<dyn MessageHandler> = Arc::new(MessagePipeline::new(
        tracer.clone(),
        Dispatcher::new(tracer, version),
        metrics.clone(),
    ));
    let poller = tokio::spawn(TelegramPoller::new(client).run(pipeline, shutdown.subscribe()));

    tracing::info!(version = %version, "kbot started successfully");

    Ok(RunningBot {
        shutdown,
        metrics,
        metrics_addr,
        server,
        poller,
        tracer_handle,
        tracer_timeout: config.shutdown.tracer_timeout(),
    })
}

/// Run until SIGINT/SIGTERM, then shut down in order.
pub async fn run(config: BotConfig, version: &str) -> Result<(), StartupError> {
    // Registered first so a signal during startup still ends in a clean shutdown.
    let mut termination = TerminationSignals::listen().map_err(StartupError::Signals)?;

    let bot = start(config, version).await?;

    let signal = termination.recv().await;
    tracing::info!(signal, "Shutting down");

    bot.shutdown().await;
    tracing::info!("Goodbye!");
    Ok(())
}

async fn start_metrics_server(
    config: &BotConfig,
    metrics: Arc<MetricsRecorder>,
    shutdown: &Shutdown,
) -> (Option<JoinHandle<()>>, Option<SocketAddr>) {
    let bind_address = config.metrics.bind_address();
    let listener = match TcpListener::bind(&bind_address).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(address = %bind_address, error = %e, "Metrics server failed to bind, continuing without it");
            return (None, None);
        }
    };
    let local_addr = listener.local_addr().ok();

    let server = HttpServer::new(
        metrics,
        Duration::from_secs(config.metrics.request_timeout_secs),
    );
    let server_shutdown = shutdown.subscribe();
    let handle = tokio::spawn(async move {
        if let Err(e) = server.run(listener, server_shutdown).await {
            tracing::error!(error = %e, "Metrics server error");
        }
    });

    (Some(handle), local_addr)
}

async fn start_tracer(config: &BotConfig, version: &str) -> (Tracer, Option<TracerHandle>) {
    if !tracer::is_enabled(&config.tracing) {
        tracing::info!("OpenTelemetry tracing disabled (set OTEL_EXPORTER_OTLP_ENDPOINT to enable)");
        return (Tracer::disabled(), None);
    }

    match tracer::init(&config.tracing, version, config.tracing.init_timeout()).await {
        Ok((tracer, handle)) => {
            tracing::info!(environment = %config.tracing.environment, "OpenTelemetry tracing enabled");
            (tracer, Some(handle))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to initialize tracer, running without tracing");
            (Tracer::disabled(), None)
        }
    }
}

impl RunningBot {
    /// Address the metrics server listens on, if it could bind.
    pub fn metrics_addr(&self) -> Option<SocketAddr> {
        self.metrics_addr
    }

    pub fn metrics(&self) -> &Arc<MetricsRecorder> {
        &self.metrics
    }

    /// Stop polling, drain in-flight messages, stop the server, flush traces.
    pub async fn shutdown(self) {
        self.shutdown.trigger();

        if let Err(e) = self.poller.await {
            tracing::error!(error = %e, "Telegram poller task failed");
        }

        if let Some(server) = self.server {
            if let Err(e) = server.await {
                tracing::error!(error = %e, "Metrics server task failed");
            }
        }

        if let Some(handle) = self.tracer_handle {
            match handle.shutdown(self.tracer_timeout).await {
                Ok(()) => tracing::info!("Tracer flushed and shut down"),
                Err(e) => tracing::error!(error = %e, "Error shutting down tracer"),
            }
        }
    }
}
