// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Service wiring and the HTTP server loop.

use std::sync::Arc;
use std::time::Duration;

use reportforge_core::ReportService;
use reportforge_core::archive::{
    ArchiveError, Archiver, FsObjectStore, ObjectStore, S3Config, S3ObjectStore,
};
use reportforge_core::compiler::{LatexCompiler, LatexCompilerConfig};
use reportforge_core::generator::{
    GenerationError, GeneratorConfig, OpenAiBackend, OpenAiConfig, SourceGenerator,
};
use reportforge_core::store::{StoreError, connect_store};
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::api::{AppState, router};
use crate::config::{Config, StorageBackend, StorageConfig};

/// Errors while assembling the service.
#[derive(Debug, Error)]
pub enum StartupError {
    /// The report store could not be opened.
    #[error("Report store: {0}")]
    Store(#[from] StoreError),

    /// The object store could not be configured.
    #[error("Object store: {0}")]
    Archive(#[from] ArchiveError),

    /// The text backend could not be configured.
    #[error("Text backend: {0}")]
    Backend(#[from] GenerationError),

    /// The output directory could not be prepared.
    #[error("Output directory: {0}")]
    Io(#[from] std::io::Error),
}

/// Per-request bound for S3 uploads and downloads.
const STORAGE_TIMEOUT: Duration = Duration::from_secs(60);

/// Build the object store described by `storage`.
pub fn object_store(storage: &StorageConfig) -> Result<Arc<dyn ObjectStore>, ArchiveError> {
    Ok(match &storage.backend {
        StorageBackend::Fs { root } => Arc::new(FsObjectStore::new(root, &storage.bucket)),
        StorageBackend::S3 {
            endpoint,
            region,
            access_key_id,
            secret_access_key,
        } => Arc::new(S3ObjectStore::new(S3Config {
            endpoint: endpoint.clone(),
            region: region.clone(),
            bucket: storage.bucket.clone(),
            access_key_id: access_key_id.clone(),
            secret_access_key: secret_access_key.clone(),
            timeout: STORAGE_TIMEOUT,
        })?),
    })
}

/// Connect every collaborator named by `config` and assemble the service.
pub async fn build_service(config: &Config) -> Result<ReportService, StartupError> {
    tokio::fs::create_dir_all(&config.output_dir).await?;

    let store = connect_store(&config.database_url).await?;

    if config.ai.api_key.is_none() {
        warn!("OPENAI_API_KEY is not set, report generation will fail until it is");
    }
    let backend = OpenAiBackend::new(OpenAiConfig {
        base_url: config.ai.base_url.clone(),
        model: config.ai.model.clone(),
        api_key: config.ai.api_key.clone(),
        timeout: config.ai.timeout,
    })?;
    let generator = SourceGenerator::new(
        Arc::new(backend),
        GeneratorConfig {
            timeout: config.ai.timeout,
            ..Default::default()
        },
    );

    let compiler = LatexCompiler::new(LatexCompilerConfig {
        program: config.latex.program.clone(),
        passes: config.latex.passes,
        timeout: config.latex.timeout,
        ..LatexCompilerConfig::new(&config.output_dir)
    });

    let objects = object_store(&config.storage)?;
    info!(
        scheme = objects.scheme(),
        bucket = objects.bucket(),
        prefix = %config.storage.prefix,
        "Object store configured"
    );
    let archiver = Archiver::new(objects, &config.storage.prefix);

    Ok(ReportService::new(
        store,
        generator,
        Arc::new(compiler),
        archiver,
    ))
}

/// Serve the API on `listener` until Ctrl+C or SIGTERM.
pub async fn serve(listener: TcpListener, state: AppState) -> std::io::Result<()> {
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
