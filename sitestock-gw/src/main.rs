//! sitestock-gw - Construction-site stock gateway service
//!
//! Serves the telephony gateway's callbacks: USSD session steps for the
//! menu-driven stock flows, and inbound SMS for free-text stock questions
//! answered by the completion collaborator grounded in the live snapshot.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use sitestock_common::config::{self, GatewayConfig};
use sitestock_gw::clients::{AtSmsClient, GeminiClient};
use sitestock_gw::{build_router, AppState};

/// Command-line arguments for sitestock-gw
#[derive(Parser, Debug)]
#[command(name = "sitestock-gw")]
#[command(about = "USSD/SMS gateway service for SiteStock")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "5000", env = "SITESTOCK_PORT")]
    port: u16,

    /// Root folder holding the database and config file
    #[arg(short, long, env = "SITESTOCK_ROOT")]
    root_folder: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();

    info!(
        "Starting SiteStock gateway (sitestock-gw) v{}",
        env!("CARGO_PKG_VERSION")
    );

    let root_folder = config::resolve_root_folder(args.root_folder);
    config::ensure_root_folder(&root_folder).context("Failed to initialize root folder")?;
    info!("Root folder: {}", root_folder.display());

    let db_path = config::database_path(&root_folder);
    let pool = sitestock_common::db::init_database(&db_path)
        .await
        .context("Failed to initialize database")?;

    let gateway = GatewayConfig::load(&root_folder).context("Failed to load configuration")?;
    if gateway.at_api_key.is_none() {
        warn!("No SMS API key configured; outbound messages are disabled");
    }
    if gateway.gemini_api_key.is_none() {
        warn!("No completion API key configured; free-text replies will use the fallback");
    }

    let sms = Arc::new(
        AtSmsClient::new(gateway.at_username, gateway.at_api_key, gateway.at_sender)
            .context("Failed to build SMS client")?,
    );
    let completion = Arc::new(
        GeminiClient::new(gateway.gemini_api_key).context("Failed to build completion client")?,
    );

    let state = AppState::new(pool, sms, completion);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", args.port)).await?;
    info!("sitestock-gw listening on http://0.0.0.0:{}", args.port);
    info!("Health check: http://127.0.0.1:{}/health", args.port);

    axum::serve(listener, app).await?;

    Ok(())
}
