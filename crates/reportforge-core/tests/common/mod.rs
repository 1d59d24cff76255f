// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Common test infrastructure for reportforge-core integration tests.
//!
//! Provides a stand-in pdflatex, a text backend that writes documents from
//! the params it receives, and a fully wired [`ReportService`].

#![allow(dead_code)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reportforge_core::archive::{Archiver, FsObjectStore, ObjectStore};
use reportforge_core::compiler::{LatexCompiler, LatexCompilerConfig};
use reportforge_core::generator::{
    CompletionRequest, GenerationError, GeneratorConfig, SourceGenerator, TextBackend,
};
use reportforge_core::store::SqliteReportStore;
use reportforge_core::ReportService;
use tempfile::TempDir;

/// How the stand-in toolchain behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toolchain {
    /// Writes `<job>.pdf` when the source has `\end{document}`, fails otherwise.
    Working,
    /// Like `Working`, after a short pid-dependent delay.
    Slow,
    /// Writes the artifact and still exits 1.
    NonzeroWithArtifact,
    /// Exits 1 without output or artifact.
    Silent,
    /// Never finishes.
    Hang,
}

const WORKING_BODY: &str = r#"
if grep -q 'end{document}' "$tex"; then
  printf '%%PDF-1.5\n' > "$job.pdf"
  cat "$tex" >> "$job.pdf"
  echo "Output written on $job.pdf (1 page)."
  exit 0
fi
echo "! Emergency stop."
echo "*** (job aborted, no legal \\end found)" >&2
exit 1
"#;

/// Write a stand-in pdflatex into `dir` and return its path.
pub fn install_toolchain(dir: &Path, behavior: Toolchain) -> PathBuf {
    let body = match behavior {
        Toolchain::Working => WORKING_BODY.to_string(),
        Toolchain::Slow => format!("sleep 0.$(( $$ % 3 ))\n{WORKING_BODY}"),
        Toolchain::NonzeroWithArtifact => r#"
printf '%%PDF-1.5\n' > "$job.pdf"
echo "LaTeX Warning: There were undefined references."
exit 1
"#
        .to_string(),
        Toolchain::Silent => "exit 1\n".to_string(),
        Toolchain::Hang => "exec sleep 30\n".to_string(),
    };
    let script = format!(
        "#!/bin/sh\nfor arg; do tex=\"$arg\"; done\njob=\"${{tex%.tex}}\"\n{body}"
    );

    let path = dir.join("fake-pdflatex");
    std::fs::write(&path, script).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

const COMPILE_TIMEOUT: Duration = Duration::from_secs(20);

/// Compiler config writing into `output_dir` with the given toolchain.
pub fn compiler_config(program: PathBuf, output_dir: &Path) -> LatexCompilerConfig {
    LatexCompilerConfig {
        program,
        timeout: COMPILE_TIMEOUT,
        ..LatexCompilerConfig::new(output_dir)
    }
}

/// Entries left in a directory, empty if it does not exist.
pub fn dir_entries(dir: &Path) -> Vec<PathBuf> {
    match std::fs::read_dir(dir) {
        Ok(entries) => entries.map(|e| e.unwrap().path()).collect(),
        Err(_) => Vec::new(),
    }
}

/// Minimal LaTeX document carrying `marker` in its body.
pub fn document(marker: &str) -> String {
    format!(
        "\\documentclass{{article}}\n\\begin{{document}}\n{marker}\n\\end{{document}}\n"
    )
}

/// Text backend answering with a document built from the request's params.
///
/// The `marker` param is echoed into the body, so every request yields a
/// distinguishable document.
pub struct EchoBackend;

#[async_trait]
impl TextBackend for EchoBackend {
    fn backend_name(&self) -> &'static str {
        "echo"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, GenerationError> {
        let user = request
            .messages
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default();
        let marker = user
            .lines()
            .find(|line| line.contains("\"marker\""))
            .unwrap_or("no marker")
            .trim()
            .replace(['"', ',', '_', '{', '}', '%', '$', '#', '&'], "");
        Ok(format!("```latex\n{}\n```", document(&marker)))
    }
}

/// A service wired to SQLite in memory, the filesystem object store and the
/// stand-in toolchain.
pub struct TestContext {
    pub temp: TempDir,
    pub store: Arc<SqliteReportStore>,
    pub service: ReportService,
}

impl TestContext {
    pub async fn new(backend: Arc<dyn TextBackend>, toolchain: Toolchain) -> Self {
        let temp = TempDir::new().unwrap();
        let objects = Arc::new(FsObjectStore::new(temp.path().join("storage"), "reports"));
        Self::build(temp, backend, toolchain, objects, COMPILE_TIMEOUT).await
    }

    /// Same wiring with a shorter bound on the toolchain.
    pub async fn with_compile_timeout(
        backend: Arc<dyn TextBackend>,
        toolchain: Toolchain,
        timeout: Duration,
    ) -> Self {
        let temp = TempDir::new().unwrap();
        let objects = Arc::new(FsObjectStore::new(temp.path().join("storage"), "reports"));
        Self::build(temp, backend, toolchain, objects, timeout).await
    }

    /// Same wiring, archiving into `objects` instead.
    pub async fn with_object_store(
        backend: Arc<dyn TextBackend>,
        toolchain: Toolchain,
        objects: Arc<dyn ObjectStore>,
    ) -> Self {
        Self::build(
            TempDir::new().unwrap(),
            backend,
            toolchain,
            objects,
            COMPILE_TIMEOUT,
        )
        .await
    }

    async fn build(
        temp: TempDir,
        backend: Arc<dyn TextBackend>,
        toolchain: Toolchain,
        objects: Arc<dyn ObjectStore>,
        compile_timeout: Duration,
    ) -> Self {
        let program = install_toolchain(temp.path(), toolchain);
        let output_dir = temp.path().join("output");
        let store = Arc::new(SqliteReportStore::in_memory().await.unwrap());
        let mut compiler = compiler_config(program, &output_dir);
        compiler.timeout = compile_timeout;

        let service = ReportService::new(
            store.clone(),
            SourceGenerator::new(backend, GeneratorConfig::default()),
            Arc::new(LatexCompiler::new(compiler)),
            Archiver::new(objects, "reports/"),
        );

        Self {
            temp,
            store,
            service,
        }
    }

    pub fn output_dir(&self) -> PathBuf {
        self.temp.path().join("output")
    }

    pub fn work_root(&self) -> PathBuf {
        self.output_dir().join(".work")
    }
}
