// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! HTTP error responses.
//!
//! Pipeline diagnostics are logged server-side and never returned to
//! clients; a failed generation answers with an opaque message and the
//! report id.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use reportforge_core::Error as CoreError;
use serde::Serialize;
use thiserror::Error;
use tracing::error;
use uuid::Uuid;

/// Errors returned by HTTP handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed or invalid request.
    #[error("{0}")]
    Validation(String),

    /// Record or artifact absent.
    #[error("{0}")]
    NotFound(String),

    /// Generation failed after the report was created.
    #[error("Report generation failed")]
    GenerationFailed {
        /// The report, now in `error`.
        report_id: Uuid,
    },

    /// Anything else.
    #[error("Internal server error")]
    Internal,
}

#[derive(Serialize)]
struct ErrorBody {
    detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<Uuid>,
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(msg) => ApiError::Validation(msg),
            CoreError::NotFound(_) => ApiError::NotFound("Report not found".to_string()),
            // Already logged with its full diagnostics by the service.
            CoreError::Pipeline { report_id, .. } => ApiError::GenerationFailed { report_id },
            other => {
                error!(error = %other, "Request failed");
                ApiError::Internal
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::GenerationFailed { .. } | ApiError::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let id = match &self {
            ApiError::GenerationFailed { report_id } => Some(*report_id),
            _ => None,
        };
        let body = ErrorBody {
            detail: self.to_string(),
            id,
        };
        (status, Json(body)).into_response()
    }
}
