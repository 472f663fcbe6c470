//! runscout - find nearby weekly community running events.
//!
//! Suggests recurring Saturday events near a location, annotated with the
//! estimated upcoming occurrence number, the current cancellation status,
//! and (optionally) whether you have already completed them. Milestone
//! occurrences can be exported to CSV.

mod api;
mod app;
mod cache;
mod config;
mod geo;
mod models;
mod reconcile;
mod report;

use std::io;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use api::HttpClient;
use app::{App, Providers, SearchRequest};
use cache::{Populator, RefreshPolicy, SystemClock};
use config::Config;

#[derive(Debug, Parser)]
#[command(name = "runscout", version, about = "Find nearby weekly running events")]
struct Args {
    /// Free-text location to search around (postcode, town, address)
    location: String,

    /// Search radius in kilometers
    #[arg(long, default_value_t = 10.0)]
    radius: f64,

    /// Person identifier; enables completion markers
    #[arg(long)]
    athlete: Option<String>,

    /// Only show events you have not completed yet (requires --athlete)
    #[arg(long, requires = "athlete")]
    unvisited_only: bool,

    /// Write milestone matches to this CSV file
    #[arg(long, value_name = "PATH")]
    milestones_csv: Option<PathBuf>,
}

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();

    let args = Args::parse();
    let config = Config::load()?;
    info!(base_url = %config.base_url, "runscout starting");

    let client = HttpClient::new(&config.base_url)?;
    let providers = Providers {
        location: Box::new(client.clone()),
        feed: Box::new(client.clone()),
        counts: Box::new(client.clone()),
        completions: Box::new(client.clone()),
        cancellations: Box::new(client),
    };

    let app = App::new(
        providers,
        config.cache_dir()?,
        config.base_url.clone(),
        RefreshPolicy::uk_weekly(),
        Populator::new(config.min_delay_ms, config.max_delay_ms),
        Box::new(SystemClock),
    );

    let request = SearchRequest {
        location: args.location,
        radius_km: args.radius,
        person_id: args.athlete,
        unvisited_only: args.unvisited_only,
    };

    let rows = app.run(&request).await?;

    if rows.is_empty() {
        println!("No events found within {} km.", request.radius_km);
    }
    for row in &rows {
        println!("{}", row.display_line());
    }

    if let Some(ref path) = args.milestones_csv {
        let written = report::export_milestones(&rows, config.milestone_interval, path)?;
        println!(
            "Wrote {} milestone event(s) to {}",
            written,
            path.display()
        );
    }

    Ok(())
}
