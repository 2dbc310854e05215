//! Standalone REST API server binary.
//!
//! ## Purpose
//! Runs the REST API server on its own.
//!
//! ## Intended use
//! Useful for development and debugging. The workspace's main `proms-run` binary serves the
//! same router and additionally checks the data directory before starting.

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::AppState;
use proms_core::CoreConfig;

/// Main entry point for the PROMs REST API server
///
/// # Environment Variables
/// - `PROMS_REST_ADDR`: Server address (default: "0.0.0.0:3000")
/// - `PROMS_DATA_DIR`: Followup action storage root (default: "proms_data")
/// - `PROMS_ANSWER_POLICY`: `truthy` or `present` (default: "truthy")
/// - `PROMS_EVENT_CAPACITY`: Event/alert channel capacity (default: 64)
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - the configuration values are invalid,
/// - the server address cannot be bound, or
/// - the HTTP server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr = std::env::var("PROMS_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());

    let cfg = CoreConfig::from_values(
        std::env::var("PROMS_DATA_DIR").ok(),
        std::env::var("PROMS_ANSWER_POLICY").ok(),
        std::env::var("PROMS_EVENT_CAPACITY").ok(),
    )?;

    tracing::info!(
        data_dir = %cfg.data_dir().display(),
        answer_policy = cfg.answer_policy().as_str(),
        "-- Starting PROMs REST API on {}",
        addr
    );

    api_rest::serve(&addr, AppState::new(Arc::new(cfg))).await
}
