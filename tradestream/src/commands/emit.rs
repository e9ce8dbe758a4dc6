use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::info;

use tradestream_emitter::{
    BackpressureGate, CompletionTracker, Emitter, EmitterStats, GatePolicy, ProgressReporter,
    RecordSink, ThroughputMode, ThroughputScheduler,
};

use crate::sink::HttpRecordSink;
use crate::trades::RandomTradeSource;

use super::common::{create_client, IngestConfig};

#[derive(Debug, Parser)]
#[clap(visible_alias = "e")]
pub(crate) struct Config {
    /// Common ingestion server config
    #[clap(flatten)]
    ingest_config: IngestConfig,

    /// The throughput mode governing the backpressure gate.
    ///
    /// In `manual` (0) mode the gate keeps the operator-supplied
    /// `--max-outstanding`/`--backpressure-delay` pair for the whole run. The
    /// `slow-cycle` (1) and `fast-cycle` (2) modes alternate between two
    /// built-in presets on every retune interval.
    #[clap(
        short = 'm',
        long = "throughput-mode",
        env = "TRADESTREAM_THROUGHPUT_MODE",
        default_value = "manual"
    )]
    throughput_mode: ThroughputMode,

    /// Suspend dispatch while the sink reports this many outstanding
    /// submissions. Required in manual mode.
    #[clap(
        short = 'o',
        long = "max-outstanding",
        env = "TRADESTREAM_MAX_OUTSTANDING"
    )]
    max_outstanding: Option<usize>,

    /// How long to sleep between outstanding-count polls while suspended,
    /// e.g., `100ms`. Required in manual mode.
    #[clap(
        short = 'd',
        long = "backpressure-delay",
        env = "TRADESTREAM_BACKPRESSURE_DELAY"
    )]
    backpressure_delay: Option<humantime::Duration>,

    /// How often the cycling throughput modes retune the gate
    #[clap(
        long = "retune-interval",
        env = "TRADESTREAM_RETUNE_INTERVAL",
        default_value = "300s"
    )]
    retune_interval: humantime::Duration,

    /// How often to log emission progress
    #[clap(
        long = "report-interval",
        env = "TRADESTREAM_REPORT_INTERVAL",
        default_value = "1s"
    )]
    report_interval: humantime::Duration,

    /// How long shutdown waits for outstanding submissions to resolve
    #[clap(
        long = "drain-timeout",
        env = "TRADESTREAM_DRAIN_TIMEOUT",
        default_value = "10s"
    )]
    drain_timeout: humantime::Duration,
}

pub(crate) async fn command(config: Config) -> Result<(), anyhow::Error> {
    let IngestConfig {
        host_url,
        stream_name,
        auth_token,
    } = config.ingest_config;

    let initial_policy = initial_gate_policy(
        config.throughput_mode,
        config.max_outstanding,
        config.backpressure_delay.map(Into::into),
    )?;

    let client = create_client(host_url, auth_token).context("unable to create client")?;
    let ping = client
        .ping()
        .await
        .context("ingestion server did not respond to ping request")?;
    info!(
        version = ping.version(),
        revision = ping.revision(),
        stream_name,
        mode = %config.throughput_mode,
        "connected to ingestion server"
    );

    let gate = Arc::new(BackpressureGate::new(initial_policy)?);
    let stats = Arc::new(EmitterStats::new());
    let tracker = Arc::new(CompletionTracker::new(Arc::clone(&stats)));
    let shutdown = CancellationToken::new();

    let scheduler = ThroughputScheduler::new(Arc::clone(&gate), config.throughput_mode);
    tokio::spawn(scheduler.run(config.retune_interval.into(), shutdown.clone()));

    let reporter = ProgressReporter::new(Arc::clone(&stats));
    tokio::spawn(reporter.run(config.report_interval.into(), shutdown.clone()));

    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        wait_for_signal().await;
        signal_shutdown.cancel();
    });

    let sink = Arc::new(HttpRecordSink::new(client)) as Arc<dyn RecordSink>;
    let emitter = Emitter::new(
        RandomTradeSource::new(),
        sink,
        gate,
        stats,
        tracker,
        stream_name,
    )
    .with_shutdown(shutdown)
    .with_drain_timeout(config.drain_timeout.into());

    emitter.run().await?;
    Ok(())
}

/// Resolve the gate policy the process starts with
///
/// Manual mode requires both operator-supplied values; a missing one is a fatal
/// configuration error. The cycling modes start from their wide-open preset,
/// which the scheduler's immediate first tick rewrites anyway.
fn initial_gate_policy(
    mode: ThroughputMode,
    max_outstanding: Option<usize>,
    backpressure_delay: Option<Duration>,
) -> Result<GatePolicy, anyhow::Error> {
    match mode {
        ThroughputMode::Manual => Ok(GatePolicy {
            max_outstanding: max_outstanding
                .context("you must provide --max-outstanding when the throughput mode is manual")?,
            delay: backpressure_delay.context(
                "you must provide --backpressure-delay when the throughput mode is manual",
            )?,
        }),
        ThroughputMode::SlowCycle => Ok(GatePolicy {
            max_outstanding: 300_000,
            delay: Duration::from_millis(100),
        }),
        ThroughputMode::FastCycle => Ok(GatePolicy {
            max_outstanding: 300_000,
            delay: Duration::from_millis(10),
        }),
    }
}

/// Wait for a `SIGTERM` or `SIGINT` to stop the process on UNIX systems
#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut term = signal(SignalKind::terminate()).expect("failed to register signal handler");
    let mut int = signal(SignalKind::interrupt()).expect("failed to register signal handler");

    tokio::select! {
        _ = term.recv() => info!("Received SIGTERM"),
        _ = int.recv() => info!("Received SIGINT"),
    }
}

/// Wait for a `ctrl+c` to stop the process on Windows systems
#[cfg(windows)]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("Received SIGINT");
}
