// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Reportforge Server - HTTP API for report generation
//!
//! Serves the report pipeline: AI-generated LaTeX source, pdflatex
//! compilation and artifact archiving, with report records kept in
//! PostgreSQL or SQLite.

use tokio::net::TcpListener;
use tracing::{info, warn};

use reportforge_server::config::Config;
use reportforge_server::{AppState, build_service, serve};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "reportforge_server=info,reportforge_core=info,tower_http=info".into()
            }),
        )
        .init();

    // Load .env file if present
    if let Err(e) = dotenvy::dotenv() {
        warn!("No .env file loaded: {}", e);
    }

    let config = Config::from_env()?;

    info!(
        http_addr = %config.http_addr,
        output_dir = %config.output_dir.display(),
        latex = %config.latex.program.display(),
        model = %config.ai.model,
        "Starting Reportforge Server"
    );

    let service = build_service(&config).await?;

    let listener = TcpListener::bind(config.http_addr).await?;
    info!(addr = %config.http_addr, "HTTP server ready");

    serve(
        listener,
        AppState {
            service,
            output_dir: config.output_dir.clone(),
        },
    )
    .await?;

    info!("Reportforge Server shut down");

    Ok(())
}
