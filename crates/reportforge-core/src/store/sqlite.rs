// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! SQLite-backed report store.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;
use uuid::Uuid;

use super::{ReportRecord, ReportRow, ReportStatus, ReportStore, StoreError};

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations/sqlite");

/// SQLite-backed report store.
#[derive(Clone)]
pub struct SqliteReportStore {
    pool: SqlitePool,
}

impl SqliteReportStore {
    /// Wrap an existing pool. Migrations are not run.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to `url`, creating the database file if needed, and run
    /// migrations.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        // An in-memory database lives and dies with its connection.
        let in_memory = url.contains(":memory:") || url.contains("mode=memory");
        let max_connections = if in_memory { 1 } else { 5 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;
        MIGRATOR.run(&pool).await?;
        Ok(Self { pool })
    }

    /// A migrated in-memory store.
    pub async fn in_memory() -> Result<Self, StoreError> {
        Self::connect("sqlite::memory:").await
    }
}

#[async_trait]
impl ReportStore for SqliteReportStore {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    async fn insert(&self, record: &ReportRecord) -> Result<(), StoreError> {
        let params = serde_json::to_string(&record.params)?;
        sqlx::query(
            r#"
            INSERT INTO reports (id, tenant_id, report_type, period, params, status,
                                 storage_key_pdf, storage_key_tex, failure_stage,
                                 created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(record.id.to_string())
        .bind(record.tenant_id.to_string())
        .bind(&record.report_type)
        .bind(&record.period)
        .bind(params)
        .bind(record.status.as_str())
        .bind(&record.storage_key_pdf)
        .bind(&record.storage_key_tex)
        .bind(&record.failure_stage)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<ReportRecord>, StoreError> {
        let row = sqlx::query_as::<_, ReportRow>(
            r#"
            SELECT id, tenant_id, report_type, period, params, status,
                   storage_key_pdf, storage_key_tex, failure_stage,
                   created_at, updated_at
            FROM reports
            WHERE id = ?1
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(ReportRecord::try_from).transpose()
    }

    async fn mark_ready(&self, id: Uuid, pdf: &str, tex: &str) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE reports
            SET status = ?1,
                storage_key_pdf = ?2,
                storage_key_tex = ?3,
                updated_at = ?4
            WHERE id = ?5
              AND status = 'processing'
            "#,
        )
        .bind(ReportStatus::Ready.as_str())
        .bind(pdf)
        .bind(tex)
        .bind(Utc::now())
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn mark_failed(&self, id: Uuid, stage: &str) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE reports
            SET status = ?1,
                failure_stage = ?2,
                updated_at = ?3
            WHERE id = ?4
              AND status = 'processing'
            "#,
        )
        .bind(ReportStatus::Error.as_str())
        .bind(stage)
        .bind(Utc::now())
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn health_check(&self) -> Result<bool, StoreError> {
        let result: Result<(i32,), _> = sqlx::query_as("SELECT 1").fetch_one(&self.pool).await;
        Ok(result.is_ok())
    }
}
