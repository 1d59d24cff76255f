// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Object store trait definitions.

use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

/// Errors from archiving and object store operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ArchiveError {
    /// A local file to publish could not be read.
    #[error("Failed to read {path}: {source}")]
    Read {
        /// Local path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The store rejected or failed an upload.
    #[error("Upload of {key} failed: {message}")]
    Upload {
        /// Object key.
        key: String,
        /// Failure detail.
        message: String,
    },

    /// The store failed a download.
    #[error("Download of {key} failed: {message}")]
    Download {
        /// Object key.
        key: String,
        /// Failure detail.
        message: String,
    },

    /// Local storage I/O failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for archive operations.
pub type Result<T> = std::result::Result<T, ArchiveError>;

/// Trait for durable object stores.
///
/// Keys are `/`-separated relative paths. Writing an existing key replaces
/// the object.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Locator scheme (e.g., "s3", "file").
    fn scheme(&self) -> &'static str;

    /// Bucket objects are written to.
    fn bucket(&self) -> &str;

    /// Store `bytes` under `key`.
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<()>;

    /// Fetch the object under `key`, `None` if absent.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
}
