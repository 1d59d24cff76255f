// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! pdflatex compiler.
//!
//! Each compilation gets its own ephemeral directory under the work root.
//! The directory is removed when the compilation returns, on every path.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::process::Command;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::traits::*;

/// Diagnostics kept on failure. pdflatex repeats the whole log on stdout, the
/// useful part is at the end.
const MAX_DIAGNOSTICS_BYTES: usize = 16 * 1024;

/// pdflatex compiler configuration.
#[derive(Debug, Clone)]
pub struct LatexCompilerConfig {
    /// Toolchain program.
    pub program: PathBuf,
    /// Parent directory for per-compilation ephemeral directories.
    pub work_root: PathBuf,
    /// Where compiled files are moved on success.
    pub output_dir: PathBuf,
    /// Number of toolchain passes.
    pub passes: u32,
    /// Upper bound on all passes together.
    pub timeout: Duration,
}

impl LatexCompilerConfig {
    /// Defaults for an output directory: `pdflatex`, one pass, 60s, and a
    /// `.work` directory inside `output_dir`.
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        let output_dir = output_dir.into();
        Self {
            program: PathBuf::from("pdflatex"),
            work_root: output_dir.join(".work"),
            output_dir,
            passes: 1,
            timeout: Duration::from_secs(60),
        }
    }
}

/// Compiler invoking pdflatex (or a compatible program).
pub struct LatexCompiler {
    config: LatexCompilerConfig,
}

impl LatexCompiler {
    /// Create a new compiler.
    pub fn new(config: LatexCompilerConfig) -> Self {
        Self { config }
    }

    /// The compiler configuration.
    pub fn config(&self) -> &LatexCompilerConfig {
        &self.config
    }

    fn program_name(&self) -> String {
        self.config.program.display().to_string()
    }

    async fn run_pass(&self, workdir: &Path, tex_name: &str, deadline: Instant) -> Result<Output> {
        let mut cmd = Command::new(&self.config.program);
        cmd.arg("-interaction=nonstopmode")
            .arg("-halt-on-error")
            .arg("-no-shell-escape")
            .arg(tex_name)
            .current_dir(workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd.spawn().map_err(|source| CompilationError::Spawn {
            program: self.program_name(),
            source,
        })?;

        // Dropping the pending wait drops the child, which kills it.
        match tokio::time::timeout_at(deadline, child.wait_with_output()).await {
            Ok(output) => Ok(output?),
            Err(_) => Err(CompilationError::Timeout(self.config.timeout)),
        }
    }
}

#[async_trait]
impl Compiler for LatexCompiler {
    fn compiler_type(&self) -> &'static str {
        "pdflatex"
    }

    async fn compile(&self, source: &str, report_id: Uuid) -> Result<CompiledArtifact> {
        tokio::fs::create_dir_all(&self.config.work_root).await?;
        let workdir = tempfile::Builder::new()
            .prefix("compile-")
            .tempdir_in(&self.config.work_root)?;

        let tex_name = format!("{report_id}.tex");
        let pdf_name = format!("{report_id}.pdf");
        let tex_path = workdir.path().join(&tex_name);
        let pdf_path = workdir.path().join(&pdf_name);

        tokio::fs::write(&tex_path, source).await?;

        debug!(
            report_id = %report_id,
            workdir = %workdir.path().display(),
            passes = self.config.passes,
            "Compiling document"
        );

        let deadline = Instant::now() + self.config.timeout;
        let mut diagnostics = String::new();
        let mut last_status = None;

        for pass in 1..=self.config.passes.max(1) {
            let output = self.run_pass(workdir.path(), &tex_name, deadline).await?;
            diagnostics.push_str(&String::from_utf8_lossy(&output.stdout));
            diagnostics.push_str(&String::from_utf8_lossy(&output.stderr));
            last_status = Some(output.status);

            if !artifact_present(&pdf_path).await {
                debug!(report_id = %report_id, pass, "No artifact after pass");
                break;
            }
        }

        if !artifact_present(&pdf_path).await {
            let mut diagnostics = tail(diagnostics.trim(), MAX_DIAGNOSTICS_BYTES).to_string();
            if diagnostics.is_empty() {
                diagnostics = match last_status {
                    Some(status) => format!(
                        "{} exited with {} without producing {}",
                        self.program_name(),
                        status,
                        pdf_name
                    ),
                    None => format!("{} did not run", self.program_name()),
                };
            }
            warn!(report_id = %report_id, "Compilation produced no artifact");
            return Err(CompilationError::NoArtifact { diagnostics });
        }

        if let Some(status) = last_status.filter(|s| !s.success()) {
            warn!(
                report_id = %report_id,
                status = %status,
                "Toolchain exited unsuccessfully but produced an artifact"
            );
        }

        tokio::fs::create_dir_all(&self.config.output_dir).await?;
        let final_tex = self.config.output_dir.join(&tex_name);
        let final_pdf = self.config.output_dir.join(&pdf_name);
        relocate(&tex_path, &final_tex).await?;
        relocate(&pdf_path, &final_pdf).await?;

        info!(
            report_id = %report_id,
            artifact = %final_pdf.display(),
            "Document compiled"
        );

        Ok(CompiledArtifact {
            source_path: final_tex,
            artifact_path: final_pdf,
        })
    }
}

async fn artifact_present(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file() && m.len() > 0)
        .unwrap_or(false)
}

/// Move a file, falling back to copy when crossing filesystems.
async fn relocate(from: &Path, to: &Path) -> std::io::Result<()> {
    if tokio::fs::rename(from, to).await.is_ok() {
        return Ok(());
    }
    tokio::fs::copy(from, to).await?;
    tokio::fs::remove_file(from).await
}

/// Last `max` bytes of `text`, cut on a char boundary.
fn tail(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut start = text.len() - max;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    &text[start..]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = LatexCompilerConfig::new("/var/reports");
        assert_eq!(config.program, PathBuf::from("pdflatex"));
        assert_eq!(config.work_root, PathBuf::from("/var/reports/.work"));
        assert_eq!(config.passes, 1);
        assert_eq!(config.timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_tail_respects_char_boundaries() {
        assert_eq!(tail("abc", 10), "abc");
        assert_eq!(tail("abcdef", 3), "def");
        // 'ñ' is two bytes; a cut inside it moves forward.
        assert_eq!(tail("añb", 2), "b");
    }
}
