//! `p1meter`, the DSMR P1 smart-meter exporter daemon.
//!
//! Reads the meter (or a recorded capture when no device is configured),
//! keeps the latest readings in memory, and serves them to Prometheus.
//! When ingestion stops the process exits nonzero: restarting is the
//! supervisor's job, nothing here reconnects.

use std::process;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::Parser;

use p1meter_core::{LineSource, MeterState, ingest};

/// Head start given to ingestion before the endpoint binds, so the first
/// scrape does not see an all-empty snapshot.
const STARTUP_GRACE: Duration = Duration::from_secs(10);

#[derive(Parser)]
#[command(name = "p1meter")]
#[command(about = "Prometheus exporter for DSMR P1 smart-meter telegrams")]
#[command(version = p1meter_core::VERSION)]
struct Cli {
    /// Address to listen on for web interface and telemetry.
    #[arg(long = "web.listen-address", default_value = ":9357")]
    listen_address: String,

    /// Path under which to expose metrics.
    #[arg(long = "web.telemetry-path", default_value = "/metrics")]
    telemetry_path: String,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let source = match LineSource::from_env() {
        Ok(source) => source,
        Err(err) => {
            log::error!("{err}");
            process::exit(1);
        }
    };

    let state = Arc::new(MeterState::new());

    let ingest_state = Arc::clone(&state);
    thread::spawn(move || {
        let err = ingest::run(source, &ingest_state);
        log::error!("ingestion stopped: {err}");
        process::exit(1);
    });

    thread::sleep(STARTUP_GRACE);

    log::info!("now serving metrics");
    let runtime = tokio::runtime::Runtime::new().expect("tokio runtime");
    if let Err(err) = runtime.block_on(p1meter_server::run_server(
        state,
        &cli.listen_address,
        &cli.telemetry_path,
    )) {
        log::error!("metrics server failed: {err}");
        process::exit(1);
    }
}
