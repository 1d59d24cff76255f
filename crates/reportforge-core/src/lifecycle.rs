// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Report lifecycle manager.
//!
//! Owns every status transition of a report:
//!
//! ```text
//! processing ──► ready   (source generated, compiled and archived)
//!      │
//!      └──────► error   (first failing stage recorded)
//! ```
//!
//! The record is persisted before any pipeline work starts, and the terminal
//! transition is a single guarded update, so readers only ever observe
//! `processing` or a complete terminal state.

use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::archive::{Archiver, ArtifactRefs};
use crate::compiler::Compiler;
use crate::error::{Error, PipelineError, Result};
use crate::generator::SourceGenerator;
use crate::store::{ReportRecord, ReportStore};

/// Stage recorded when the ready update itself could not be written.
pub const PERSISTENCE_STAGE: &str = "persistence";

/// Stage recorded when the pipeline task died without an outcome.
pub const INTERNAL_STAGE: &str = "internal";

/// Instruction used when a request carries no prompt of its own.
pub const DEFAULT_PROMPT: &str =
    "Genera un documento en LaTeX que resuma los datos financieros proporcionados.";

/// A request to generate one report.
#[derive(Debug, Clone)]
pub struct GenerateReport {
    /// Owning tenant.
    pub tenant_id: Uuid,
    /// Report classification.
    pub report_type: String,
    /// Period label.
    pub period: String,
    /// Data the document summarizes.
    pub params: Map<String, Value>,
    /// Instruction for the text backend, [`DEFAULT_PROMPT`] when absent or blank.
    pub ai_prompt: Option<String>,
}

impl GenerateReport {
    fn validate(&self) -> Result<()> {
        if self.report_type.trim().is_empty() {
            return Err(Error::Validation("type must not be empty".to_string()));
        }
        if self.period.trim().is_empty() {
            return Err(Error::Validation("period must not be empty".to_string()));
        }
        Ok(())
    }

    fn prompt(&self) -> &str {
        self.ai_prompt
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .unwrap_or(DEFAULT_PROMPT)
    }
}

/// A downloadable compiled document.
#[derive(Debug, Clone)]
pub struct Artifact {
    /// Report the document belongs to.
    pub report_id: Uuid,
    /// Document bytes.
    pub bytes: Vec<u8>,
    /// Suggested file name (`<id>.pdf`).
    pub file_name: String,
}

/// Runs the report pipeline and answers record and artifact queries.
#[derive(Clone)]
pub struct ReportService {
    store: Arc<dyn ReportStore>,
    generator: SourceGenerator,
    compiler: Arc<dyn Compiler>,
    archiver: Archiver,
}

impl ReportService {
    /// Assemble a service from its collaborators.
    pub fn new(
        store: Arc<dyn ReportStore>,
        generator: SourceGenerator,
        compiler: Arc<dyn Compiler>,
        archiver: Archiver,
    ) -> Self {
        Self {
            store,
            generator,
            compiler,
            archiver,
        }
    }

    /// The report store.
    pub fn store(&self) -> &Arc<dyn ReportStore> {
        &self.store
    }

    /// Generate a report and return its `ready` record.
    ///
    /// On a stage failure the record is moved to `error` before
    /// [`Error::Pipeline`] is returned. Once the record is persisted, the
    /// pipeline and its terminal update run on a detached task, so dropping
    /// the returned future does not leave the record `processing`.
    pub async fn generate(&self, request: GenerateReport) -> Result<ReportRecord> {
        request.validate()?;
        let prompt = request.prompt().to_string();

        let record = ReportRecord::new(
            request.tenant_id,
            request.report_type,
            request.period,
            request.params,
        );
        self.store.insert(&record).await?;

        info!(
            report_id = %record.id,
            tenant_id = %record.tenant_id,
            report_type = %record.report_type,
            "Report accepted"
        );

        let id = record.id;
        let service = self.clone();
        let task = tokio::spawn(async move { service.complete(record, prompt).await });
        match task.await {
            Ok(outcome) => outcome?,
            Err(join_err) => {
                error!(report_id = %id, error = %join_err, "Report pipeline task aborted");
                self.fail_best_effort(id, INTERNAL_STAGE).await;
                return Err(Error::Task(join_err.to_string()));
            }
        }

        self.get(id).await
    }

    /// Run the stages and write exactly one terminal update.
    async fn complete(&self, record: ReportRecord, prompt: String) -> Result<()> {
        match self.run_pipeline(&record, &prompt).await {
            Ok(refs) => match self.store.mark_ready(record.id, &refs.pdf, &refs.tex).await {
                Ok(true) => {
                    info!(report_id = %record.id, pdf = %refs.pdf, "Report ready");
                    Ok(())
                }
                Ok(false) => {
                    warn!(
                        report_id = %record.id,
                        "Report was no longer processing, ready update skipped"
                    );
                    Ok(())
                }
                Err(err) => {
                    error!(
                        report_id = %record.id,
                        tenant_id = %record.tenant_id,
                        stage = PERSISTENCE_STAGE,
                        error = %err,
                        "Failed to record ready report"
                    );
                    self.fail_best_effort(record.id, PERSISTENCE_STAGE).await;
                    Err(err.into())
                }
            },
            Err(source) => {
                error!(
                    report_id = %record.id,
                    tenant_id = %record.tenant_id,
                    stage = source.stage(),
                    error = %source,
                    "Report pipeline failed"
                );
                let applied = self.store.mark_failed(record.id, source.stage()).await?;
                if !applied {
                    warn!(
                        report_id = %record.id,
                        "Report was no longer processing, error update skipped"
                    );
                }
                Err(Error::Pipeline {
                    report_id: record.id,
                    source,
                })
            }
        }
    }

    async fn fail_best_effort(&self, id: Uuid, stage: &str) {
        if let Err(err) = self.store.mark_failed(id, stage).await {
            error!(report_id = %id, stage, error = %err, "Failed to record report error");
        }
    }

    async fn run_pipeline(
        &self,
        record: &ReportRecord,
        prompt: &str,
    ) -> std::result::Result<ArtifactRefs, PipelineError> {
        let generated = self.generator.generate(&record.params, prompt).await?;
        if generated.was_fallback {
            warn!(report_id = %record.id, "Using fallback document");
        }

        let compiled = self.compiler.compile(&generated.source, record.id).await?;

        let refs = self
            .archiver
            .publish(
                &compiled.artifact_path,
                &compiled.source_path,
                record.tenant_id,
                record.id,
            )
            .await?;
        Ok(refs)
    }

    /// Fetch a report record.
    pub async fn get(&self, id: Uuid) -> Result<ReportRecord> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("report {id}")))
    }

    /// Fetch the compiled document of a `ready` report.
    pub async fn download(&self, id: Uuid) -> Result<Artifact> {
        let record = self.get(id).await?;
        let locator = record
            .storage_key_pdf
            .ok_or_else(|| Error::NotFound(format!("artifact of report {id}")))?;

        let bytes = self.archiver.fetch(&locator).await?.ok_or_else(|| {
            warn!(report_id = %id, locator = %locator, "Archived artifact is missing");
            Error::NotFound(format!("artifact of report {id}"))
        })?;

        Ok(Artifact {
            report_id: id,
            bytes,
            file_name: format!("{id}.pdf"),
        })
    }
}
