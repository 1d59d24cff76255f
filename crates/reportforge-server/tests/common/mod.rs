// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Common test infrastructure for reportforge-server integration tests.

#![allow(dead_code)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, header};
use http_body_util::BodyExt;
use reportforge_core::ReportService;
use reportforge_core::archive::{Archiver, FsObjectStore};
use reportforge_core::compiler::{LatexCompiler, LatexCompilerConfig};
use reportforge_core::generator::{
    CompletionRequest, GenerationError, GeneratorConfig, SourceGenerator, TextBackend,
};
use reportforge_core::store::SqliteReportStore;
use reportforge_server::{AppState, router};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

/// Stand-in pdflatex: compiles anything with `\end{document}`.
const WORKING: &str = r#"#!/bin/sh
for arg; do tex="$arg"; done
job="${tex%.tex}"
if grep -q 'end{document}' "$tex"; then
  printf '%%PDF-1.5\n' > "$job.pdf"
  cat "$tex" >> "$job.pdf"
  exit 0
fi
echo "! Emergency stop."
exit 1
"#;

/// Stand-in pdflatex that always fails without output.
const BROKEN: &str = "#!/bin/sh\nexit 1\n";

fn install(dir: &Path, script: &str) -> PathBuf {
    let path = dir.join("fake-pdflatex");
    std::fs::write(&path, script).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Text backend that always answers with the same small document.
pub struct StaticBackend;

#[async_trait]
impl TextBackend for StaticBackend {
    fn backend_name(&self) -> &'static str {
        "static"
    }

    async fn complete(&self, _request: &CompletionRequest) -> Result<String, GenerationError> {
        Ok("```latex\n\\documentclass{article}\n\\begin{document}\nResumen financiero\n\\end{document}\n```".to_string())
    }
}

/// Router over a fully wired service with SQLite in memory.
pub struct TestApp {
    pub temp: TempDir,
    pub router: Router,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::build(WORKING).await
    }

    /// Same wiring with a toolchain that never produces a PDF.
    pub async fn with_broken_toolchain() -> Self {
        Self::build(BROKEN).await
    }

    async fn build(script: &str) -> Self {
        let temp = TempDir::new().unwrap();
        let program = install(temp.path(), script);
        let output_dir = temp.path().join("output");
        let store = Arc::new(SqliteReportStore::in_memory().await.unwrap());
        let objects = Arc::new(FsObjectStore::new(temp.path().join("storage"), "reports"));

        let service = ReportService::new(
            store,
            SourceGenerator::new(Arc::new(StaticBackend), GeneratorConfig::default()),
            Arc::new(LatexCompiler::new(LatexCompilerConfig {
                program,
                timeout: Duration::from_secs(20),
                ..LatexCompilerConfig::new(&output_dir)
            })),
            Archiver::new(objects, "reports/"),
        );

        let router = router(AppState {
            service,
            output_dir,
        });
        Self { temp, router }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        self.send(Request::get(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn post_json(&self, uri: &str, body: &str) -> Response<Body> {
        self.send(
            Request::post(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
