// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! PostgreSQL-backed report store.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;
use uuid::Uuid;

use super::{ReportRecord, ReportRow, ReportStatus, ReportStore, StoreError};

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations/postgres");

/// PostgreSQL-backed report store.
#[derive(Clone)]
pub struct PostgresReportStore {
    pool: PgPool,
}

impl PostgresReportStore {
    /// Wrap an existing pool. Migrations are not run.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect to `url` and run migrations.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(10))
            .connect(url)
            .await?;
        MIGRATOR.run(&pool).await?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl ReportStore for PostgresReportStore {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    async fn insert(&self, record: &ReportRecord) -> Result<(), StoreError> {
        let params = serde_json::to_string(&record.params)?;
        sqlx::query(
            r#"
            INSERT INTO reports (id, tenant_id, report_type, period, params, status,
                                 storage_key_pdf, storage_key_tex, failure_stage,
                                 created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5::jsonb, $6, $7, $8, $9, $10, $11)
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
            SELECT id, tenant_id, report_type, period, params::text AS params, status,
                   storage_key_pdf, storage_key_tex, failure_stage,
                   created_at, updated_at
            FROM reports
            WHERE id = $1
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
            SET status = $2,
                storage_key_pdf = $3,
                storage_key_tex = $4,
                updated_at = $5
            WHERE id = $1
              AND status = 'processing'
            "#,
        )
        .bind(id.to_string())
        .bind(ReportStatus::Ready.as_str())
        .bind(pdf)
        .bind(tex)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn mark_failed(&self, id: Uuid, stage: &str) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE reports
            SET status = $2,
                failure_stage = $3,
                updated_at = $4
            WHERE id = $1
              AND status = 'processing'
            "#,
        )
        .bind(id.to_string())
        .bind(ReportStatus::Error.as_str())
        .bind(stage)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn health_check(&self) -> Result<bool, StoreError> {
        let result: Result<(i32,), _> = sqlx::query_as("SELECT 1").fetch_one(&self.pool).await;
        Ok(result.is_ok())
    }
}
