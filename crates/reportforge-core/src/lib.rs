// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Reportforge Core - Report Generation Pipeline
//!
//! This crate turns a structured data payload into a compiled PDF report. It owns
//! the report lifecycle state machine and the pipeline stages it coordinates.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         reportforge-server                               │
//! │                  (HTTP API, configuration, bootstrap)                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//!                                    │
//!                                    ▼
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    ReportService (lifecycle manager)                     │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────┐  ┌─────────────┐     │
//! │  │   Source    │  │  Compiler   │  │  Archiver   │  │   Report    │     │
//! │  │  Generator  │─▶│  (pdflatex) │─▶│  (objects)  │─▶│    Store    │     │
//! │  └─────────────┘  └─────────────┘  └─────────────┘  └─────────────┘     │
//! └─────────────────────────────────────────────────────────────────────────┘
//!           │                 │                 │                 │
//!           ▼                 ▼                 ▼                 ▼
//!    OpenAI-compatible   ephemeral work    fs / S3 bucket   PostgreSQL / SQLite
//!       endpoint            directory
//! ```
//!
//! # Report Status State Machine
//!
//! ```text
//!                 ┌────────────┐
//!                 │ PROCESSING │
//!                 └─────┬──────┘
//!                       │
//!          ┌────────────┴────────────┐
//!   archived│                        │any stage failed
//!          ▼                         ▼
//!     ┌─────────┐               ┌─────────┐
//!     │  READY  │               │  ERROR  │
//!     └─────────┘               └─────────┘
//! ```
//!
//! Both terminal states are final. A failed report is never retried; a new
//! request creates a new record.
//!
//! # Pipeline Stages
//!
//! | Stage | Seam | Production adapter | Failure |
//! |-------|------|--------------------|---------|
//! | Generation | [`generator::TextBackend`] | [`generator::OpenAiBackend`] | [`generator::GenerationError`] |
//! | Compilation | [`compiler::Compiler`] | [`compiler::LatexCompiler`] | [`compiler::CompilationError`] |
//! | Archiving | [`archive::ObjectStore`] | [`archive::FsObjectStore`], [`archive::S3ObjectStore`] | [`archive::ArchiveError`] |
//! | Persistence | [`store::ReportStore`] | [`store::PostgresReportStore`], [`store::SqliteReportStore`] | [`store::StoreError`] |
//!
//! # Modules
//!
//! - [`archive`]: Publishing artifacts to object storage
//! - [`compiler`]: Compiling LaTeX source into PDF artifacts
//! - [`error`]: Crate-level error type
//! - [`generator`]: AI-assisted LaTeX source generation
//! - [`lifecycle`]: Report lifecycle manager
//! - [`sanitize`]: LaTeX escaping for literal values
//! - [`store`]: Report record persistence

#![deny(missing_docs)]

/// Publishing compiled artifacts and their source to object storage.
pub mod archive;

/// Compiling LaTeX source into PDF artifacts.
pub mod compiler;

/// Crate-level error type.
pub mod error;

/// AI-assisted LaTeX source generation.
pub mod generator;

/// Report lifecycle manager.
pub mod lifecycle;

/// LaTeX escaping for literal values.
pub mod sanitize;

/// Report record persistence.
pub mod store;

pub use error::{Error, PipelineError, Result};
pub use lifecycle::{Artifact, GenerateReport, ReportService};
pub use store::{ReportRecord, ReportStatus};
