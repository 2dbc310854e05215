use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::AppState;
use proms_core::CoreConfig;

/// Main entry point for the PROMs application
///
/// Resolves configuration once, makes sure the data directory exists and serves the REST API.
/// Every saved followup action and every user-facing alert is logged.
///
/// # Environment Variables
/// - `PROMS_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `PROMS_DATA_DIR`: Followup action storage root (default: "proms_data")
/// - `PROMS_ANSWER_POLICY`: `truthy` drops every falsy answer, `present` keeps 0 and false
/// - `PROMS_EVENT_CAPACITY`: Event/alert channel capacity (default: 64)
///
/// # Returns
/// * `Ok(())` - If the server starts and runs successfully
/// * `Err(anyhow::Error)` - If configuration, startup or the server fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("proms_run=info".parse()?)
                .add_directive("proms_core=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = std::env::var("PROMS_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());

    let cfg = CoreConfig::from_values(
        std::env::var("PROMS_DATA_DIR").ok(),
        std::env::var("PROMS_ANSWER_POLICY").ok(),
        std::env::var("PROMS_EVENT_CAPACITY").ok(),
    )?;

    let data_dir: &Path = cfg.data_dir();
    if !data_dir.exists() {
        tracing::info!("creating data directory {}", data_dir.display());
        std::fs::create_dir_all(data_dir)?;
    }

    tracing::info!("++ Starting PROMs REST on {}", rest_addr);

    api_rest::serve(&rest_addr, AppState::new(Arc::new(cfg))).await
}
