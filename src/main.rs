mod config;
mod replay;
mod tracker;
mod web;

use clap::{Parser, Subcommand};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{Config, ConfigError};
use crate::replay::Route;
use crate::tracker::{AnimatedMarker, HttpLocationSource, LiveTracker, LogObserver, Tracker};

#[derive(Parser)]
#[command(name = "vehicle-tracker")]
#[command(about = "Poll a vehicle location endpoint and follow it on a map marker")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct TrackerArgs {
    /// YAML configuration file
    #[arg(short, long)]
    config: Option<String>,
    /// Base URL of the location endpoint
    #[arg(long, env = "API_URL")]
    api_url: Option<String>,
    /// Vehicle to track
    #[arg(long)]
    vehicle_id: Option<String>,
    /// Poll interval, e.g. "3s"
    #[arg(long, value_parser = parse_interval)]
    interval: Option<Duration>,
}

fn parse_interval(s: &str) -> Result<Duration, String> {
    let interval = humantime::parse_duration(s).map_err(|e| e.to_string())?;
    if interval.is_zero() {
        return Err("interval must be greater than zero".to_string());
    }
    Ok(interval)
}

#[derive(Subcommand)]
enum Commands {
    /// Run one tracking session until all pages are fetched
    Track {
        #[command(flatten)]
        args: TrackerArgs,
    },
    /// Serve the tracking toggle and status over HTTP
    Serve {
        #[command(flatten)]
        args: TrackerArgs,
        /// Address to listen on (overrides web.bind)
        #[arg(long)]
        bind: Option<String>,
    },
    /// Serve a recorded route as a location endpoint
    Replay {
        route: String,
        #[arg(long, default_value = "0.0.0.0:8090")]
        bind: String,
    },
    /// Validate a route file
    Validate { route: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Track { args } => track(args).await,
        Commands::Serve { args, bind } => serve(args, bind).await,
        Commands::Replay { route, bind } => replay(&route, &bind).await,
        Commands::Validate { route } => validate(&route),
    }
}

fn load_config(args: TrackerArgs) -> Result<Config, String> {
    Config::load(args.config.as_deref())
        .and_then(|config| apply_overrides(config, args))
        .map_err(|e| e.to_string())
}

/// Command-line flags and `API_URL` win over the config file.
fn apply_overrides(mut config: Config, args: TrackerArgs) -> Result<Config, ConfigError> {
    if let Some(url) = args.api_url {
        config.api_url = Some(url);
    }
    if let Some(vehicle_id) = args.vehicle_id {
        config.vehicle_id = vehicle_id;
    }
    if let Some(interval) = args.interval {
        config.interval = interval;
    }
    config.validate()?;
    Ok(config)
}

fn build_tracker(config: &Config) -> Result<LiveTracker, String> {
    let api_url = config.api_url().map_err(|e| e.to_string())?;
    let source =
        HttpLocationSource::new(api_url, config.request_timeout).map_err(|e| e.to_string())?;
    let settings = config.tracker_settings();
    let display = Arc::new(AnimatedMarker::new(settings.initial_region));

    log::info!("Polling {} every {:?}", source.endpoint(), settings.interval);
    Ok(Tracker::new(source, display, Arc::new(LogObserver), settings))
}

async fn track(args: TrackerArgs) -> ExitCode {
    let mut tracker = match load_config(args).and_then(|c| build_tracker(&c)) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = tracker.start().await {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    tokio::select! {
        _ = tracker.wait_idle() => {}
        _ = tokio::signal::ctrl_c() => log::info!("Interrupted"),
    }

    let status = tracker.stop().await;
    println!(
        "{}: {:.6}, {:.6} ({} fetches, {} failed)",
        status.vehicle_id,
        status.region.latitude,
        status.region.longitude,
        status.fetches,
        status.failures
    );
    ExitCode::SUCCESS
}

async fn serve(args: TrackerArgs, bind: Option<String>) -> ExitCode {
    let config = match load_config(args) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let tracker = match build_tracker(&config) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let bind_addr = bind.unwrap_or_else(|| config.web.bind.clone());
    match web::run_server(tracker, &bind_addr).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Server error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn replay(path: &str, bind: &str) -> ExitCode {
    let route = match Route::from_file(path) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Route error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match replay::run_replay(route, bind).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Server error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn validate(path: &str) -> ExitCode {
    match Route::from_file(path) {
        Ok(route) => {
            println!("Route is valid ({} vehicles)", route.vehicles.len());
            for (vehicle, points) in &route.vehicles {
                println!("  {}: {} pages", vehicle, points.len());
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Route error: {}", e);
            ExitCode::FAILURE
        }
    }
}
