//! photo-grid - random Flickr photo grid
//!
//! Prints one grid to stdout, or serves `/grid` over HTTP with `--listen`.

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use photo_grid::{config::Args, server, GridService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    // Logs go to stderr so printed markup stays clean
    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("photo_grid={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let settings = match args.settings() {
        Ok(settings) => settings,
        Err(e) => {
            error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    info!(
        rows = settings.dimensions.rows(),
        cols = settings.dimensions.cols(),
        endpoint = %settings.flickr_endpoint,
        cache_enabled = settings.cache.enabled,
        cache_backend = ?settings.cache.backend,
        cache_ttl_secs = settings.cache.ttl_secs,
        "photo-grid starting"
    );

    let grid = match GridService::from_settings(&settings) {
        Ok(grid) => grid,
        Err(e) => {
            error!("Startup error: {}", e);
            std::process::exit(1);
        }
    };

    match args.listen {
        Some(listen) => {
            let state = Arc::new(server::AppState::new(grid));
            server::run(state, listen).await?;
        }
        None => {
            println!("{}", grid.grid_markup_or_empty().await);
        }
    }

    Ok(())
}
