//! Seastate CLI - command-line interface.
//!
//! Runs the refresh-and-caching core as a long-lived service, or executes
//! one-shot operational commands against a fresh service instance.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use seastate::config::CoreConfig;
use seastate::service::CoreServices;
use seastate::station::StationCatalog;

#[derive(Parser)]
#[command(name = "seastate")]
#[command(version = seastate::VERSION)]
#[command(about = "Marine conditions aggregation service", long_about = None)]
struct Cli {
    /// Path to the station catalogue GeoJSON file
    #[arg(long, global = true, default_value = "stations.geojson")]
    catalog: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the service: cold-fill prefetch, then refresh on the model cadence
    Run {
        /// Log upstream fetches and cache fills (same as RUST_LOG=seastate=debug)
        #[arg(long)]
        verbose: bool,
    },

    /// Run a single prefetch cycle and print the status snapshot
    Prefetch,

    /// Print the station catalogue as GeoJSON
    Stations,

    /// Print the station nearest to a point
    Nearest {
        #[arg(long)]
        lat: f64,
        #[arg(long)]
        lon: f64,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn build_services(catalog_path: &std::path::Path) -> Result<CoreServices, String> {
    let catalog = StationCatalog::load(catalog_path).map_err(|e| e.to_string())?;
    CoreServices::new(CoreConfig::default(), catalog).map_err(|e| e.to_string())
}

/// Install the stdout subscriber for service mode.
///
/// Dependencies (reqwest, hyper) stay at warn; the core logs at info, or
/// debug with `--verbose`. Setting `RUST_LOG` replaces this spec entirely.
fn init_tracing(verbose: bool) {
    let core_level = if verbose { "debug" } else { "info" };
    let filter = match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(spec) => EnvFilter::new(spec),
        Err(_) => EnvFilter::new(format!("warn,seastate={core_level}")),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<(), String> {
    match cli.command {
        Commands::Run { verbose } => {
            init_tracing(verbose);
            info!(version = seastate::VERSION, "seastate starting");

            let services = build_services(&cli.catalog)?;
            let shutdown = CancellationToken::new();
            let scheduler = tokio::spawn(services.scheduler().run(shutdown.clone()));

            tokio::signal::ctrl_c()
                .await
                .map_err(|e| format!("failed to listen for shutdown signal: {e}"))?;
            info!("shutdown signal received");
            shutdown.cancel();

            if let Err(e) = scheduler.await {
                error!(error = %e, "scheduler task failed");
            }
            Ok(())
        }

        Commands::Prefetch => {
            let services = build_services(&cli.catalog)?;
            let snapshot = services
                .run_prefetch_cycle()
                .await
                .map_err(|e| e.to_string())?;
            println!(
                "{}",
                serde_json::to_string_pretty(&snapshot).map_err(|e| e.to_string())?
            );
            Ok(())
        }

        Commands::Stations => {
            let services = build_services(&cli.catalog)?;
            println!(
                "{}",
                serde_json::to_string_pretty(&services.stations_geojson())
                    .map_err(|e| e.to_string())?
            );
            Ok(())
        }

        Commands::Nearest { lat, lon } => {
            let services = build_services(&cli.catalog)?;
            match services.nearest_station(lat, lon) {
                Some((station, km)) => {
                    println!("{} ({}) - {:.1} km", station.id, station.name, km);
                    Ok(())
                }
                None => Err("catalogue is empty".to_string()),
            }
        }
    }
}
