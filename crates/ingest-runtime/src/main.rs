//! # Analytics Ingestion Runtime
//!
//! Consumes analytics events from the log, indexes them in the search store
//! and streams freshly indexed events to live subscribers.
//!
//! ## Startup Sequence
//!
//! 1. Initialize telemetry (logs, optional OTLP export, metrics)
//! 2. Load and validate configuration from the environment
//! 3. Provision the index and its lifecycle policy
//! 4. Start the live relay, the stats reporter and the HTTP listener
//! 5. Start one pipeline per consumer instance
//!
//! ## Shutdown
//!
//! SIGINT/SIGTERM stops the pipelines after their in-flight batch, closes the
//! live connections, then stops the background tasks and the listener. A pipeline that fails a batch stops the
//! process with a non-zero exit so it is restarted and the broker redelivers
//! from the last commit.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use ev_01_store_writer::ElasticsearchStore;
use ev_03_ingestion::{IngestionApi, KafkaLogConsumer, PipelineError};
use shared_bus::EventFilter;
use stream_telemetry::{init_telemetry, TelemetryConfig};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{error, info, warn};

use ingest_runtime::http::{self, AppState};
use ingest_runtime::wiring::{run_relay, run_reporter};
use ingest_runtime::{IngestConfig, IngestContainer};

/// Upper bound for pipelines to finish their in-flight batch on shutdown.
const PIPELINE_DRAIN_TIMEOUT: Duration = Duration::from_secs(30);
/// Upper bound for background tasks and the listener to stop.
const TASK_STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// The runtime orchestrating pipelines, hub and listener.
struct IngestRuntime {
    container: IngestContainer<ElasticsearchStore>,
    pipelines: Vec<Arc<dyn IngestionApi>>,
    running: JoinSet<Result<(), PipelineError>>,
    tasks: Vec<JoinHandle<()>>,
    /// Shutdown signal sender.
    shutdown_tx: watch::Sender<bool>,
    /// Shutdown signal receiver.
    shutdown_rx: watch::Receiver<bool>,
}

impl IngestRuntime {
    /// Build services and consumers. Nothing is started yet.
    fn new(config: IngestConfig) -> Result<Self> {
        let store = ElasticsearchStore::new(config.elasticsearch_config())
            .context("Failed to create store client")?;

        let consumers = (0..config.broker.consumer_instances)
            .map(|instance| KafkaLogConsumer::new(config.kafka_config(instance)))
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to create log consumer")?;

        let container = IngestContainer::new(config, store);
        let pipelines = container
            .pipelines(consumers)
            .into_iter()
            .map(|pipeline| pipeline as Arc<dyn IngestionApi>)
            .collect();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Ok(Self {
            container,
            pipelines,
            running: JoinSet::new(),
            tasks: Vec::new(),
            shutdown_tx,
            shutdown_rx,
        })
    }

    async fn start(&mut self) -> Result<()> {
        let config = &self.container.config;
        info!(
            brokers = %config.broker.brokers,
            topic = %config.broker.topic,
            group_id = %config.broker.group_id,
            store = %config.store.url,
            index = %config.store.index,
            port = config.server.port,
            consumers = config.broker.consumer_instances,
            "Starting analytics ingestion service"
        );

        self.container
            .writer
            .initialize()
            .await
            .context("Store initialization failed")?;

        let relay = run_relay(
            self.container.bus.subscribe(EventFilter::all()),
            Arc::clone(&self.container.hub),
            self.shutdown_rx.clone(),
        );
        self.tasks.push(tokio::spawn(relay));

        let reporter = run_reporter(
            Arc::clone(&self.container.writer),
            Arc::clone(&self.container.stats),
            Arc::clone(&self.container.hub),
            config.reporting.interval,
            self.shutdown_rx.clone(),
        );
        self.tasks.push(tokio::spawn(reporter));

        let listener = TcpListener::bind(("0.0.0.0", config.server.port))
            .await
            .with_context(|| format!("Failed to bind port {}", config.server.port))?;
        let router = http::router(AppState {
            writer: Arc::clone(&self.container.writer),
            hub: Arc::clone(&self.container.hub),
        });
        let server_shutdown = self.shutdown_rx.clone();
        self.tasks.push(tokio::spawn(async move {
            if let Err(e) = http::serve(listener, router, server_shutdown).await {
                error!(error = %e, "HTTP listener failed");
            }
        }));

        for pipeline in &self.pipelines {
            let pipeline = Arc::clone(pipeline);
            self.running.spawn(async move { pipeline.run().await });
        }

        info!("Analytics ingestion service is running");
        Ok(())
    }

    /// Wait for a shutdown signal or for a pipeline to end.
    async fn wait(&mut self) -> Result<()> {
        loop {
            tokio::select! {
                _ = shutdown_signal() => {
                    info!("Shutdown signal received");
                    return Ok(());
                }
                finished = self.running.join_next() => match finished {
                    Some(Ok(Ok(()))) => {
                        warn!("A pipeline stopped without a shutdown request");
                    }
                    Some(Ok(Err(e))) => {
                        return Err(anyhow!(e).context("Pipeline failed"));
                    }
                    Some(Err(e)) => {
                        return Err(anyhow!(e).context("Pipeline task panicked"));
                    }
                    None => return Err(anyhow!("All pipelines stopped")),
                }
            }
        }
    }

    /// Stop pipelines after their in-flight batch, then everything else.
    async fn shutdown(&mut self) {
        info!("Initiating graceful shutdown...");

        for pipeline in &self.pipelines {
            pipeline.stop();
        }
        let drain = async {
            while let Some(finished) = self.running.join_next().await {
                if let Ok(Err(e)) = finished {
                    warn!(error = %e, "Pipeline ended with error during shutdown");
                }
            }
        };
        if tokio::time::timeout(PIPELINE_DRAIN_TIMEOUT, drain).await.is_err() {
            warn!("Pipelines did not finish their batch in time");
            self.running.abort_all();
        }

        // Each connection writer flushes its outbox and sends a close frame.
        self.container.hub.close_all();

        if let Err(e) = self.shutdown_tx.send(true) {
            error!("Failed to send shutdown signal: {}", e);
        }
        for task in self.tasks.drain(..) {
            if tokio::time::timeout(TASK_STOP_TIMEOUT, task).await.is_err() {
                warn!("Background task did not stop in time");
            }
        }

        let stats = self.container.stats.snapshot();
        info!(
            processed = stats.processed,
            indexed = stats.indexed,
            rejected = stats.rejected,
            errors = stats.errors,
            "Shutdown complete"
        );
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let _telemetry =
        init_telemetry(TelemetryConfig::from_env()).context("Failed to initialize telemetry")?;

    let config = IngestConfig::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    let mut runtime = IngestRuntime::new(config)?;
    if let Err(e) = runtime.start().await {
        error!(error = %format!("{:#}", e), "Failed to start service");
        runtime.shutdown().await;
        return Err(e);
    }

    let outcome = runtime.wait().await;
    if let Err(e) = &outcome {
        error!(error = %format!("{:#}", e), "Stopping after pipeline failure");
    }
    runtime.shutdown().await;

    outcome
}
