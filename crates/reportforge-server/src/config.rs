// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Configuration loading from environment variables.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use reportforge_core::generator::openai::{DEFAULT_BASE_URL, DEFAULT_MODEL};

const DEFAULT_DATABASE_URL: &str = "sqlite://reports_local.db?mode=rwc";

/// reportforge server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL or SQLite connection URL
    pub database_url: String,
    /// HTTP listen address
    pub http_addr: SocketAddr,
    /// Local directory for compiled files
    pub output_dir: PathBuf,
    /// Text backend settings
    pub ai: AiConfig,
    /// Toolchain settings
    pub latex: LatexConfig,
    /// Artifact storage settings
    pub storage: StorageConfig,
}

/// Text backend settings.
#[derive(Debug, Clone)]
pub struct AiConfig {
    /// API key, requests fail without one
    pub api_key: Option<String>,
    /// OpenAI-compatible base URL
    pub base_url: String,
    /// Model name
    pub model: String,
    /// Bound on one backend call
    pub timeout: Duration,
}

/// Toolchain settings.
#[derive(Debug, Clone)]
pub struct LatexConfig {
    /// pdflatex (or compatible) program
    pub program: PathBuf,
    /// Number of passes
    pub passes: u32,
    /// Bound on one compilation
    pub timeout: Duration,
}

/// Artifact storage settings.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Bucket name
    pub bucket: String,
    /// Key prefix
    pub prefix: String,
    /// Backend-specific settings
    pub backend: StorageBackend,
}

/// Where artifacts are archived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    /// Buckets are directories under `root`.
    Fs {
        /// Storage root
        root: PathBuf,
    },
    /// S3-compatible service.
    S3 {
        /// Endpoint base URL
        endpoint: String,
        /// Signing region
        region: String,
        /// Access key id
        access_key_id: String,
        /// Secret access key
        secret_access_key: String,
    },
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Everything has a default except the S3 credentials, which are required
    /// when `REPORTS_STORAGE_BACKEND=s3`, and the PostgreSQL parts, which are
    /// required once `DB_HOST` is set.
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = database_url()?;

        let http_addr: SocketAddr = var("REPORTS_HTTP_ADDR")
            .unwrap_or_else(|| "0.0.0.0:8000".to_string())
            .parse()
            .map_err(|_| {
                ConfigError::Invalid("REPORTS_HTTP_ADDR", "must be a socket address")
            })?;

        let output_dir = PathBuf::from(
            var("REPORTS_OUTPUT_DIR").unwrap_or_else(|| "./output_reports".to_string()),
        );

        let ai = AiConfig {
            api_key: var("OPENAI_API_KEY"),
            base_url: var("OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model: var("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            timeout: seconds("REPORTS_AI_TIMEOUT_SECS", 60)?,
        };

        let passes: u32 = var("REPORTS_LATEX_PASSES")
            .unwrap_or_else(|| "1".to_string())
            .parse()
            .ok()
            .filter(|p| *p >= 1)
            .ok_or(ConfigError::Invalid(
                "REPORTS_LATEX_PASSES",
                "must be a positive integer",
            ))?;

        let latex = LatexConfig {
            program: var("REPORTS_LATEX_BIN")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("pdflatex")),
            passes,
            timeout: seconds("REPORTS_COMPILE_TIMEOUT_SECS", 60)?,
        };

        let storage = storage(&output_dir)?;

        Ok(Self {
            database_url,
            http_addr,
            output_dir,
            ai,
            latex,
            storage,
        })
    }
}

/// Non-empty value of an environment variable.
fn var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn seconds(key: &'static str, default: u64) -> Result<Duration, ConfigError> {
    match var(key) {
        None => Ok(Duration::from_secs(default)),
        Some(raw) => raw
            .parse::<u64>()
            .ok()
            .filter(|s| *s > 0)
            .map(Duration::from_secs)
            .ok_or(ConfigError::Invalid(key, "must be a positive number of seconds")),
    }
}

fn database_url() -> Result<String, ConfigError> {
    if let Some(url) = var("REPORTS_DATABASE_URL").or_else(|| var("DATABASE_URL")) {
        return Ok(url);
    }

    let Some(host) = var("DB_HOST") else {
        return Ok(DEFAULT_DATABASE_URL.to_string());
    };
    let port: u16 = var("DB_PORT")
        .unwrap_or_else(|| "5432".to_string())
        .parse()
        .map_err(|_| ConfigError::Invalid("DB_PORT", "must be a valid port number"))?;
    let name = var("DB_NAME").ok_or(ConfigError::Missing("DB_NAME"))?;
    let user = var("DB_USER").ok_or(ConfigError::Missing("DB_USER"))?;
    let password = var("DB_PASSWORD").ok_or(ConfigError::Missing("DB_PASSWORD"))?;

    Ok(format!(
        "postgres://{}:{}@{}:{}/{}",
        urlencoding::encode(&user),
        urlencoding::encode(&password),
        host,
        port,
        name
    ))
}

fn storage(output_dir: &std::path::Path) -> Result<StorageConfig, ConfigError> {
    let bucket = var("REPORTS_STORAGE_BUCKET").unwrap_or_else(|| "reports".to_string());
    // An explicitly empty prefix is allowed.
    let prefix =
        std::env::var("REPORTS_STORAGE_PREFIX").unwrap_or_else(|_| "reports/".to_string());

    let backend = match var("REPORTS_STORAGE_BACKEND").as_deref().unwrap_or("fs") {
        "fs" => StorageBackend::Fs {
            root: var("REPORTS_STORAGE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| output_dir.join("storage")),
        },
        "s3" => {
            let region = var("REPORTS_S3_REGION")
                .or_else(|| var("AWS_REGION"))
                .unwrap_or_else(|| "us-east-1".to_string());
            StorageBackend::S3 {
                endpoint: var("REPORTS_S3_ENDPOINT")
                    .unwrap_or_else(|| format!("https://s3.{region}.amazonaws.com")),
                region,
                access_key_id: var("AWS_ACCESS_KEY_ID")
                    .ok_or(ConfigError::Missing("AWS_ACCESS_KEY_ID"))?,
                secret_access_key: var("AWS_SECRET_ACCESS_KEY")
                    .ok_or(ConfigError::Missing("AWS_SECRET_ACCESS_KEY"))?,
            }
        }
        _ => {
            return Err(ConfigError::Invalid(
                "REPORTS_STORAGE_BACKEND",
                "must be 'fs' or 's3'",
            ));
        }
    };

    Ok(StorageConfig {
        bucket,
        prefix,
        backend,
    })
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    Missing(&'static str),

    /// An environment variable has an invalid value.
    #[error("invalid value for {0}: {1}")]
    Invalid(&'static str, &'static str),
}
