// geosync - sync geolocated event data into a persistent store

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use clap::{Parser, Subcommand};
use log::info;

use geosync_cli::sync;
use geosync_config::Config;

const EXIT_SUCCESS: u8 = 0;
const EXIT_ERROR: u8 = 1;
const EXIT_USAGE: u8 = 2;

#[derive(Parser)]
#[command(name = "geosync")]
#[command(about = "Sync geolocated event data from heterogeneous sources into a store")]
#[command(version)]
struct Cli {
    /// Path to the run configuration
    #[arg(short, long, default_value = "geosync.toml", env = "GEOSYNC_CONFIG")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full sync workflow (default)
    Sync,
    /// Parse and validate the configuration, then exit
    Check,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Config::from_file(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(EXIT_USAGE);
        }
    };

    init_logging(&config.logs.level);

    match cli.command.unwrap_or(Commands::Sync) {
        Commands::Check => {
            println!(
                "configuration ok: {} sources, {} apis, {} scrapers, {} store at {}",
                config.sources.len(),
                config.apis.len(),
                config.scrapers.len(),
                config.store.backend,
                config.store.path.display()
            );
            ExitCode::from(EXIT_SUCCESS)
        }
        Commands::Sync => {
            let started = Instant::now();
            info!("starting sync run");
            let summary = sync::run(&config);
            report(&summary);
            info!("run finished in {:.1?}", started.elapsed());

            if summary.succeeded() {
                ExitCode::from(EXIT_SUCCESS)
            } else {
                ExitCode::from(EXIT_ERROR)
            }
        }
    }
}

fn init_logging(level: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn report(summary: &sync::RunSummary) {
    eprintln!(
        "sync: {} units completed, {} failed",
        summary.completed.len(),
        summary.failed.len()
    );
    for outcome in &summary.completed {
        eprintln!(
            "  {}: {} inserted, {} updated, {} dropped",
            outcome.unit, outcome.inserted, outcome.updated, outcome.dropped
        );
    }
    for failure in &summary.failed {
        eprintln!("  warning: {} failed: {}", failure.unit, failure.reason);
    }
}
