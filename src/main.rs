// SPDX-License-Identifier: MIT

//! Oura-Tracker CLI
//!
//! Minimal external caller for the aggregation core: runs the OAuth flow
//! when needed, fetches the latest daily scores once and prints them.

use std::sync::Arc;

use oura_tracker::{
    config::Config,
    services::{AuthManager, ScoreAggregator},
    store::{JsonFileStore, SettingsStore},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = Config::from_env().expect("Failed to load configuration");

    let store_path = std::env::var("OURA_CREDENTIALS_PATH")
        .unwrap_or_else(|_| "oura-credentials.json".to_string());
    let store: Arc<dyn SettingsStore> = Arc::new(JsonFileStore::new(&store_path));

    let auth = AuthManager::new(config.clone(), store.clone())?;

    if args.iter().any(|a| a == "--logout") {
        store.clear_credentials()?;
        tracing::info!("stored credentials cleared");
        return Ok(());
    }

    if args.iter().any(|a| a == "--login") || !auth.is_authorized()? {
        tracing::info!("starting authorization flow");
        auth.authorize().await?;
        tracing::info!("authorization complete");
    }

    let aggregator = ScoreAggregator::new(&config, auth)?;
    match aggregator.latest_scores().await {
        Ok(summary) if summary.is_empty() => {
            println!("No data found in the last 7 days.");
        }
        Ok(summary) => {
            println!(
                "{} ({}): sleep {} / readiness {} / activity {}",
                summary.date.map(|d| d.to_string()).unwrap_or_default(),
                summary.freshness_label(),
                fmt_score(summary.sleep),
                fmt_score(summary.readiness),
                fmt_score(summary.activity),
            );
        }
        Err(e) if e.needs_reauthorization() => {
            eprintln!("Authentication expired; run again with --login to re-authorize.");
            return Err(e.into());
        }
        Err(e) => return Err(e.into()),
    }

    Ok(())
}

fn fmt_score(score: Option<u8>) -> String {
    score.map(|s| s.to_string()).unwrap_or_else(|| "--".to_string())
}

/// Initialize structured logging; verbosity via `RUST_LOG`.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer().with_target(false);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("oura_tracker=info".parse().unwrap())
                .add_directive("warn".parse().unwrap()),
        )
        .with(format)
        .init();
}
