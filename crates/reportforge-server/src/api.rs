// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! HTTP routes.
//!
//! | Method | Path | |
//! |--------|------|---|
//! | POST | `/reports/generate` | run the pipeline, answer with id, status and PDF locator |
//! | GET | `/reports/{report_id}` | full report record |
//! | GET | `/reports/download/{report_id}` | compiled PDF |
//! | GET | `/healthz` | liveness |

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use reportforge_core::{GenerateReport, ReportRecord, ReportService, ReportStatus};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::path::PathBuf;
use tower_http::trace::TraceLayer;
use tracing::debug;
use uuid::Uuid;

use crate::error::ApiError;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    /// The report pipeline.
    pub service: ReportService,
    /// Local output directory, reported by the health check.
    pub output_dir: PathBuf,
}

/// Body of `POST /reports/generate`.
#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    /// Owning tenant.
    pub tenant_id: Uuid,
    /// Report classification.
    #[serde(rename = "type")]
    pub report_type: String,
    /// Period label.
    pub period: String,
    /// Data to summarize.
    pub params: Map<String, Value>,
    /// Optional instruction for the text backend.
    #[serde(default)]
    pub ai_prompt: Option<String>,
}

/// Answer of `POST /reports/generate`.
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerateResponse {
    /// Report id.
    pub id: Uuid,
    /// Report status.
    pub status: ReportStatus,
    /// Locator of the compiled PDF.
    pub pdf_path: Option<String>,
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/reports/generate", post(generate_report))
        .route("/reports/{report_id}", get(get_report))
        .route("/reports/download/{report_id}", get(download_report))
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn generate_report(
    State(state): State<AppState>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let Json(req) = payload?;
    debug!(tenant_id = %req.tenant_id, report_type = %req.report_type, "Generate request");

    let record = state
        .service
        .generate(GenerateReport {
            tenant_id: req.tenant_id,
            report_type: req.report_type,
            period: req.period,
            params: req.params,
            ai_prompt: req.ai_prompt,
        })
        .await?;

    Ok(Json(GenerateResponse {
        id: record.id,
        status: record.status,
        pdf_path: record.storage_key_pdf,
    }))
}

async fn get_report(
    State(state): State<AppState>,
    Path(report_id): Path<String>,
) -> Result<Json<ReportRecord>, ApiError> {
    let id = parse_id(&report_id)?;
    Ok(Json(state.service.get(id).await?))
}

async fn download_report(
    State(state): State<AppState>,
    Path(report_id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_id(&report_id)?;
    let artifact = state.service.download(id).await?;

    let headers = [
        (header::CONTENT_TYPE, "application/pdf".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", artifact.file_name),
        ),
    ];
    Ok((headers, artifact.bytes).into_response())
}

async fn healthz(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "output_dir": state.output_dir.display().to_string(),
    }))
}

/// Ids that are not UUIDs name no report.
fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::NotFound("Report not found".to_string()))
}
