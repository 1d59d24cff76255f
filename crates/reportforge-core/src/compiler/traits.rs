// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Compiler trait definitions.
//!
//! Defines the abstract interface for document compilers.

use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Errors from compiler operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CompilationError {
    /// The toolchain ran but produced no artifact.
    #[error("No artifact produced:\n{diagnostics}")]
    NoArtifact {
        /// Captured stdout/stderr of the toolchain.
        diagnostics: String,
    },

    /// The toolchain did not finish within the configured bound.
    #[error("Compilation timed out after {0:?}")]
    Timeout(Duration),

    /// The toolchain could not be started.
    #[error("Failed to start {program}: {source}")]
    Spawn {
        /// Program that failed to start.
        program: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Preparing the work directory or relocating outputs failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for compiler operations.
pub type Result<T> = std::result::Result<T, CompilationError>;

/// Compiled files, relocated out of the ephemeral work area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledArtifact {
    /// Source file (`<id>.tex`).
    pub source_path: PathBuf,
    /// Compiled document (`<id>.pdf`).
    pub artifact_path: PathBuf,
}

/// Trait for document compilers.
///
/// Implementations only turn source into files. Report records are owned by
/// the lifecycle manager.
#[async_trait]
pub trait Compiler: Send + Sync {
    /// Compiler type identifier (e.g., "pdflatex").
    fn compiler_type(&self) -> &'static str;

    /// Compile `source` for report `report_id`.
    ///
    /// Success is defined by the presence of the artifact, not by the
    /// toolchain's exit status.
    async fn compile(&self, source: &str, report_id: Uuid) -> Result<CompiledArtifact>;
}
