//! Butterbot - liveness monitoring daemon
//!
#![doc = "Butterbot - liveness monitoring daemon"]
#![doc = "Main entry point for the butterbot binary."]

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;

use butterbot::checks::{JsonDecoder, ReqwestTransport};
use butterbot::cli::{Cli, Commands};
use butterbot::config::Config;
use butterbot::kafka::KafkaConnector;
use butterbot::logging::init_logging;
use butterbot::monitor::{Collaborators, FixedTicks, IntervalTicker, Monitor};
use butterbot::notify::ReqwestSink;
use butterbot::{telemetry, SystemClock};

/// Timeout of a single webhook POST
const NOTIFY_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Load configuration
    let config = Config::load(&cli.config_file, &cli)?;

    init_logging(&config.logging)?;

    // Validate configuration
    config.validate()?;

    match cli.command() {
        Commands::Validate => {
            println!("{}", config.summary());
            Ok(())
        }
        Commands::Run { once } => run(config, once).await,
    }
}

async fn run(config: Config, once: bool) -> Result<()> {
    telemetry::init_metrics_exporter(config.daemon.metrics_listen.as_deref());

    let collaborators = Collaborators {
        http: Arc::new(ReqwestTransport::new()?),
        streams: Arc::new(KafkaConnector::new()),
        decoder: Arc::new(JsonDecoder),
        sink: Arc::new(ReqwestSink::new(NOTIFY_TIMEOUT)?),
        clock: Arc::new(SystemClock),
    };
    let mut monitor = Monitor::new(&config, collaborators);

    tracing::info!(
        http_checks = config.butterbot.http_checks.len(),
        topic_checks = config.butterbot.kafka_topic_checks.len(),
        event_watches = config.butterbot.kafka_events.len(),
        poll_interval_secs = config.daemon.poll_interval_secs,
        "Starting butterbot"
    );

    if once {
        monitor.run(&mut FixedTicks::new(1)).await;
        return Ok(());
    }

    let mut ticker = IntervalTicker::new(config.daemon.poll_interval());
    tokio::select! {
        cycles = monitor.run(&mut ticker) => {
            tracing::warn!(cycles, "Poll loop ended");
        }
        signal = tokio::signal::ctrl_c() => {
            signal?;
            tracing::info!("Received interrupt, shutting down");
        }
    }

    Ok(())
}
