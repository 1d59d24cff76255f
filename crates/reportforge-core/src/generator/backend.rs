// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Generative-text backend trait definitions.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Errors from the generative-text backend call itself.
///
/// A successful call that returns malformed text is not an error; it is
/// handled by the fallback template instead.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GenerationError {
    /// No API credential is configured.
    #[error("No API key configured for the text backend")]
    MissingCredential,

    /// The backend rejected the credential.
    #[error("Backend authentication failed: {0}")]
    Unauthorized(String),

    /// The backend refused the request due to rate limits or quota.
    #[error("Backend rate limit exceeded: {0}")]
    RateLimited(String),

    /// The backend answered with a non-success status.
    #[error("Backend returned status {status}: {body}")]
    Backend {
        /// HTTP status code.
        status: u16,
        /// Response body, as returned.
        body: String,
    },

    /// The request never got a usable response.
    #[error("Backend transport error: {0}")]
    Transport(String),

    /// The response body could not be decoded.
    #[error("Invalid backend response: {0}")]
    InvalidResponse(String),

    /// No response within the configured bound.
    #[error("Backend call timed out after {0:?}")]
    Timeout(Duration),
}

/// Role of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instruction fixing the output contract.
    System,
    /// Caller content.
    User,
    /// Model output.
    Assistant,
}

/// A single chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Message role.
    pub role: Role,
    /// Message text.
    pub content: String,
}

impl ChatMessage {
    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// A completion request sent to a [`TextBackend`].
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Conversation, system message first.
    pub messages: Vec<ChatMessage>,
    /// Sampling temperature.
    pub temperature: f32,
}

/// Trait for generative-text backends.
///
/// Backends are pure transport: they return the raw completion text and
/// leave validation to the caller. An empty completion is `Ok("")`.
#[async_trait]
pub trait TextBackend: Send + Sync {
    /// Backend identifier used in logs (e.g., "openai").
    fn backend_name(&self) -> &'static str;

    /// Run a completion and return the first choice's text.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, GenerationError>;
}
