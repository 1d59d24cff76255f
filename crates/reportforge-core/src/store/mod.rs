// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Report persistence.
//!
//! A [`ReportRecord`] is created once per generate request in the
//! `processing` state and moved to `ready` or `error` by exactly one guarded
//! update. Backends: [`PostgresReportStore`] and [`SqliteReportStore`].

pub mod postgres;
pub mod sqlite;

pub use self::postgres::PostgresReportStore;
pub use self::sqlite::SqliteReportStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

/// Errors from the persistence layer.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration error.
    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    /// Stored params could not be encoded or decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A stored row does not map to a valid record.
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    /// The database URL names no supported backend.
    #[error("Unsupported database URL: {0}")]
    UnsupportedUrl(String),
}

/// Lifecycle state of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    /// Pipeline in flight.
    Processing,
    /// Artifacts archived.
    Ready,
    /// Pipeline failed.
    Error,
}

impl ReportStatus {
    /// Whether no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ReportStatus::Processing)
    }

    /// Stored representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Processing => "processing",
            ReportStatus::Ready => "ready",
            ReportStatus::Error => "error",
        }
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "processing" => Ok(ReportStatus::Processing),
            "ready" => Ok(ReportStatus::Ready),
            "error" => Ok(ReportStatus::Error),
            _ => Err(format!("Unknown report status: {}", s)),
        }
    }
}

/// A report and its audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRecord {
    /// Report identifier.
    pub id: Uuid,
    /// Owning tenant.
    pub tenant_id: Uuid,
    /// Caller-supplied classification.
    #[serde(rename = "type")]
    pub report_type: String,
    /// Caller-supplied period label.
    pub period: String,
    /// Caller-supplied parameters, stored verbatim.
    pub params: Map<String, Value>,
    /// Current state.
    pub status: ReportStatus,
    /// Locator of the compiled document, set when ready.
    pub storage_key_pdf: Option<String>,
    /// Locator of the document source, set when ready.
    pub storage_key_tex: Option<String>,
    /// Stage that failed, set on error.
    pub failure_stage: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last transition time.
    pub updated_at: DateTime<Utc>,
}

impl ReportRecord {
    /// A fresh record in the `processing` state.
    pub fn new(
        tenant_id: Uuid,
        report_type: impl Into<String>,
        period: impl Into<String>,
        params: Map<String, Value>,
    ) -> Self {
        // Microsecond precision, as stored by Postgres.
        let now = DateTime::from_timestamp_micros(Utc::now().timestamp_micros())
            .unwrap_or_else(Utc::now);
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            report_type: report_type.into(),
            period: period.into(),
            params,
            status: ReportStatus::Processing,
            storage_key_pdf: None,
            storage_key_tex: None,
            failure_stage: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Row shape shared by both backends.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ReportRow {
    pub id: String,
    pub tenant_id: String,
    pub report_type: String,
    pub period: String,
    pub params: String,
    pub status: String,
    pub storage_key_pdf: Option<String>,
    pub storage_key_tex: Option<String>,
    pub failure_stage: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<ReportRow> for ReportRecord {
    type Error = StoreError;

    fn try_from(row: ReportRow) -> Result<Self, Self::Error> {
        let id = Uuid::parse_str(&row.id)
            .map_err(|e| StoreError::InvalidRecord(format!("id {}: {}", row.id, e)))?;
        let tenant_id = Uuid::parse_str(&row.tenant_id)
            .map_err(|e| StoreError::InvalidRecord(format!("tenant_id {}: {}", row.tenant_id, e)))?;
        let status = row.status.parse().map_err(StoreError::InvalidRecord)?;
        let params = match serde_json::from_str(&row.params)? {
            Value::Object(map) => map,
            other => {
                return Err(StoreError::InvalidRecord(format!(
                    "params of {} is not an object: {}",
                    row.id, other
                )));
            }
        };

        Ok(ReportRecord {
            id,
            tenant_id,
            report_type: row.report_type,
            period: row.period,
            params,
            status,
            storage_key_pdf: row.storage_key_pdf,
            storage_key_tex: row.storage_key_tex,
            failure_stage: row.failure_stage,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Persistence interface for report records.
#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Backend name (e.g., "postgres", "sqlite").
    fn backend_name(&self) -> &'static str;

    /// Persist a new record.
    async fn insert(&self, record: &ReportRecord) -> Result<(), StoreError>;

    /// Fetch a record, `None` if absent.
    async fn get(&self, id: Uuid) -> Result<Option<ReportRecord>, StoreError>;

    /// Move a `processing` record to `ready` with both locators.
    ///
    /// Returns `false` when the record is missing or already terminal.
    async fn mark_ready(&self, id: Uuid, pdf: &str, tex: &str) -> Result<bool, StoreError>;

    /// Move a `processing` record to `error`, recording the failed stage.
    ///
    /// Returns `false` when the record is missing or already terminal.
    async fn mark_failed(&self, id: Uuid, stage: &str) -> Result<bool, StoreError>;

    /// Whether the database answers.
    async fn health_check(&self) -> Result<bool, StoreError>;
}

/// Connect to the store named by `url` and run its migrations.
///
/// `postgres://` and `postgresql://` select PostgreSQL, `sqlite:` selects
/// SQLite.
pub async fn connect_store(url: &str) -> Result<Arc<dyn ReportStore>, StoreError> {
    let store: Arc<dyn ReportStore> =
        if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            Arc::new(PostgresReportStore::connect(url).await?)
        } else if url.starts_with("sqlite:") {
            Arc::new(SqliteReportStore::connect(url).await?)
        } else {
            return Err(StoreError::UnsupportedUrl(redact(url)));
        };

    info!(backend = store.backend_name(), "Report store ready");
    Ok(store)
}

/// Drop everything before `://` and any credentials.
fn redact(url: &str) -> String {
    match url.split_once("://") {
        Some((scheme, _)) => format!("{scheme}://..."),
        None => "<unrecognized>".to_string(),
    }
}
