// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! LaTeX source generation with fallback template.

use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::backend::{ChatMessage, CompletionRequest, GenerationError, TextBackend};
use crate::sanitize::sanitize_value;

/// Every valid document starts with this declaration.
pub const DOCUMENT_CLASS_MARKER: &str = "\\documentclass";

/// Every valid document ends with this marker.
pub const DOCUMENT_END_MARKER: &str = "\\end{document}";

const SYSTEM_PROMPT: &str = "You are an expert generator of technical documents in LaTeX. \
Reply with one complete LaTeX document and nothing else: it must begin with \\documentclass \
and end with \\end{document}. Do not add explanations, commentary, or Markdown code fences.";

const STRUCTURE_GUIDANCE: &str = "Use a minimal, professional structure: a title, an executive \
summary, a results table, and a conclusion. Escape LaTeX special characters in all literal text.";

/// Result of source generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedSource {
    /// Complete LaTeX document.
    pub source: String,
    /// Whether the backend output was discarded in favour of the fallback template.
    pub was_fallback: bool,
}

/// Source generator settings.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Sampling temperature.
    pub temperature: f32,
    /// Upper bound on a single backend call.
    pub timeout: Duration,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            temperature: 0.3,
            timeout: Duration::from_secs(60),
        }
    }
}

/// Turns report params and an instruction into LaTeX source.
#[derive(Clone)]
pub struct SourceGenerator {
    backend: Arc<dyn TextBackend>,
    config: GeneratorConfig,
}

impl SourceGenerator {
    /// Create a generator over `backend`.
    pub fn new(backend: Arc<dyn TextBackend>, config: GeneratorConfig) -> Self {
        Self { backend, config }
    }

    /// Generate a complete document.
    ///
    /// Fails only when the backend call fails. A response that is not a
    /// LaTeX document is replaced by [`fallback_document`].
    pub async fn generate(
        &self,
        params: &Map<String, Value>,
        prompt: &str,
    ) -> Result<GeneratedSource, GenerationError> {
        let request = CompletionRequest {
            messages: build_messages(params, prompt),
            temperature: self.config.temperature,
        };

        let raw = tokio::time::timeout(self.config.timeout, self.backend.complete(&request))
            .await
            .map_err(|_| GenerationError::Timeout(self.config.timeout))??;

        let cleaned = strip_code_fences(&raw);
        if cleaned.starts_with(DOCUMENT_CLASS_MARKER) {
            debug!(
                backend = self.backend.backend_name(),
                length = cleaned.len(),
                "Backend produced a LaTeX document"
            );
            return Ok(GeneratedSource {
                source: cleaned.to_string(),
                was_fallback: false,
            });
        }

        warn!(
            backend = self.backend.backend_name(),
            response_length = raw.len(),
            "Backend response is not a LaTeX document, using fallback template"
        );
        Ok(GeneratedSource {
            source: fallback_document(params),
            was_fallback: true,
        })
    }
}

/// Build the system and user messages for a generation request.
pub fn build_messages(params: &Map<String, Value>, prompt: &str) -> Vec<ChatMessage> {
    // serde_json leaves non-ASCII characters unescaped
    let rendered = serde_json::to_string_pretty(params).unwrap_or_else(|_| "{}".to_string());
    let content = format!("{prompt}\n\nParameters:\n{rendered}\n\n{STRUCTURE_GUIDANCE}");

    vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(content)]
}

/// Trim whitespace and remove a wrapping Markdown code fence.
pub fn strip_code_fences(raw: &str) -> &str {
    let mut text = raw.trim();

    if let Some(rest) = text.strip_prefix("```") {
        // Drop the opening fence line, including any language tag.
        text = match rest.find('\n') {
            Some(newline) => &rest[newline + 1..],
            None => "",
        };
    }
    if let Some(rest) = text.trim_end().strip_suffix("```") {
        text = rest;
    }

    text.trim()
}

fn field(params: &Map<String, Value>, key: &str, default: &str) -> String {
    match params.get(key) {
        Some(Value::Null) | None => default.to_string(),
        Some(value) => sanitize_value(value),
    }
}

/// Deterministic document used when the backend output is malformed.
pub fn fallback_document(params: &Map<String, Value>) -> String {
    let sales = field(params, "ventas", "N/A");
    let costs = field(params, "costos", "N/A");
    let profit = field(params, "utilidad", "N/A");
    let commentary = field(params, "comentario", "Sin comentarios");

    format!(
        r"\documentclass{{article}}
\usepackage[utf8]{{inputenc}}
\usepackage[T1]{{fontenc}}
\begin{{document}}
\section*{{Reporte Financiero}}
\begin{{itemize}}
  \item Ventas: {sales}
  \item Costos: {costs}
  \item Utilidad: {profit}
\end{{itemize}}
\subsection*{{Comentario}}
{commentary}
{DOCUMENT_END_MARKER}
"
    )
}
