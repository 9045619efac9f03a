//! ev-producer: drive and check the analytics ingestion service.

use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use ev_producer::{generate_events, CountClient, EventProducer, UserIdMix};

/// Load generator and verification tool for the analytics ingestion service
#[derive(Parser, Debug)]
#[command(name = "ev-producer")]
struct Args {
    /// Comma-separated bootstrap servers
    #[arg(long, env = "KAFKA_BROKERS", default_value = "localhost:9092", global = true)]
    brokers: String,

    /// Topic to publish to
    #[arg(long, env = "KAFKA_TOPIC", default_value = "analytics-events", global = true)]
    topic: String,

    /// Seed for reproducible event streams
    #[arg(long, global = true)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Publish a fixed number of events every second
    Steady {
        #[arg(long, env = "EVENTS_PER_SECOND", default_value = "10")]
        events_per_second: usize,

        /// Stop after this many seconds (runs until Ctrl+C otherwise)
        #[arg(long)]
        duration_secs: Option<u64>,
    },

    /// Publish a burst of events in producer batches, then report the rate
    Burst {
        #[arg(long, env = "BURST_SIZE", default_value = "1000")]
        total: usize,

        #[arg(long, env = "BATCH_SIZE", default_value = "100")]
        batch_size: usize,
    },

    /// Print the store document count, optionally checking it
    VerifyCount {
        #[arg(long, env = "ES_NODE", default_value = "http://localhost:9200")]
        store: String,

        #[arg(long, env = "ES_INDEX", default_value = "analytics-events")]
        index: String,

        /// Fail unless the count is at least this
        #[arg(long)]
        expect_at_least: Option<u64>,
    },
}

fn rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

async fn steady(
    producer: &EventProducer,
    rng: &mut StdRng,
    events_per_second: usize,
    duration: Option<Duration>,
) -> Result<()> {
    let started = Instant::now();
    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    let mut total = 0usize;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = ticker.tick() => {
                if duration.is_some_and(|d| started.elapsed() >= d) {
                    break;
                }
                let events = generate_events(rng, UserIdMix::Steady, events_per_second);
                match producer.send_batch(&events).await {
                    Ok(sent) => {
                        total += sent;
                        info!(sent, total, "Sent events");
                    }
                    Err(e) => warn!(error = %e, "Send failed"),
                }
            }
        }
    }

    info!(total, elapsed_secs = started.elapsed().as_secs(), "Steady producer stopped");
    Ok(())
}

async fn burst(producer: &EventProducer, rng: &mut StdRng, total: usize, batch_size: usize) -> Result<()> {
    if batch_size == 0 {
        bail!("batch size must be greater than zero");
    }

    info!(total, batch_size, topic = producer.topic(), "Sending burst");
    let started = Instant::now();
    let mut sent = 0usize;
    let mut batch = 0usize;

    while sent < total {
        let count = batch_size.min(total - sent);
        let events = generate_events(rng, UserIdMix::Burst, count);
        sent += producer
            .send_batch(&events)
            .await
            .with_context(|| format!("Batch {} failed", batch + 1))?;
        batch += 1;
        info!(batch, sent, total, "Sent batch");
    }

    let elapsed = started.elapsed();
    let rate = sent as f64 / elapsed.as_secs_f64().max(f64::EPSILON);
    info!(
        sent,
        elapsed_ms = elapsed.as_millis() as u64,
        events_per_second = rate.round() as u64,
        "Burst complete"
    );
    Ok(())
}

async fn verify_count(store: &str, index: &str, expect_at_least: Option<u64>) -> Result<()> {
    let client = CountClient::new(store)?;
    let count = client
        .count(index)
        .await
        .with_context(|| format!("Could not read count from {} (is the store running?)", store))?;

    info!(index, count, "Store document count");
    if let Some(expected) = expect_at_least {
        if count < expected {
            bail!("expected at least {} documents in {}, found {}", expected, index, count);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let mut rng = rng(args.seed);

    match args.command {
        Command::Steady {
            events_per_second,
            duration_secs,
        } => {
            let producer = EventProducer::new(&args.brokers, &args.topic, "event-producer")?;
            steady(&producer, &mut rng, events_per_second, duration_secs.map(Duration::from_secs)).await
        }
        Command::Burst { total, batch_size } => {
            let producer = EventProducer::new(&args.brokers, &args.topic, "burst-producer")?;
            burst(&producer, &mut rng, total, batch_size).await
        }
        Command::VerifyCount {
            store,
            index,
            expect_at_least,
        } => verify_count(&store, &index, expect_at_least).await,
    }
}
