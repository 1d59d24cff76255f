// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for reportforge-core.

use thiserror::Error;
use uuid::Uuid;

use crate::archive::ArchiveError;
use crate::compiler::CompilationError;
use crate::generator::GenerationError;
use crate::store::StoreError;

/// Failure of one pipeline stage.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PipelineError {
    /// The generative-text backend call failed.
    #[error("Source generation failed: {0}")]
    Generation(#[from] GenerationError),

    /// The toolchain produced no artifact.
    #[error("Compilation failed: {0}")]
    Compilation(#[from] CompilationError),

    /// Publishing to object storage failed.
    #[error("Archiving failed: {0}")]
    Archive(#[from] ArchiveError),
}

impl PipelineError {
    /// Stage name recorded on the failed report.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Generation(_) => "generation",
            Self::Compilation(_) => "compilation",
            Self::Archive(_) => "archive",
        }
    }
}

/// Report service errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Request validation failed.
    #[error("Invalid request: {0}")]
    Validation(String),

    /// Report or artifact was not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A pipeline stage failed; the report has been moved to `error`.
    #[error("Report {report_id} failed during {}", source.stage())]
    Pipeline {
        /// Report that failed.
        report_id: Uuid,
        /// Stage failure with its diagnostic chain.
        #[source]
        source: PipelineError,
    },

    /// Persistence operation failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Reading an archived artifact failed.
    #[error("Artifact error: {0}")]
    Artifact(#[from] ArchiveError),

    /// The detached pipeline task ended without an outcome.
    #[error("Pipeline task failed: {0}")]
    Task(String),
}

/// Result type using the reportforge-core [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
