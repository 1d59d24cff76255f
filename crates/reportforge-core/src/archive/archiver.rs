// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Artifact archiver.
//!
//! Publishes a compiled document and its source to an [`ObjectStore`] under
//! `<prefix><tenant_id>/<report_id>.{pdf,tex}` and hands back locators of the
//! form `<scheme>://<bucket>/<key>`.

use std::path::Path;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use super::traits::*;

/// Content type recorded for compiled documents.
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Content type recorded for document sources.
pub const TEX_CONTENT_TYPE: &str = "application/x-tex";

/// Locators of a published artifact pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRefs {
    /// Locator of the compiled document.
    pub pdf: String,
    /// Locator of the document source.
    pub tex: String,
}

/// Publishes report artifacts to durable storage.
#[derive(Clone)]
pub struct Archiver {
    store: Arc<dyn ObjectStore>,
    prefix: String,
}

impl Archiver {
    /// Create an archiver writing under `prefix`.
    pub fn new(store: Arc<dyn ObjectStore>, prefix: impl AsRef<str>) -> Self {
        Self {
            store,
            prefix: normalize_prefix(prefix.as_ref()),
        }
    }

    /// Key prefix, empty or ending with `/`.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Object key for an artifact of a report.
    pub fn object_key(&self, tenant_id: Uuid, report_id: Uuid, extension: &str) -> String {
        format!("{}{}/{}.{}", self.prefix, tenant_id, report_id, extension)
    }

    /// Locator for a key in the configured store.
    pub fn locator(&self, key: &str) -> String {
        format!("{}://{}/{}", self.store.scheme(), self.store.bucket(), key)
    }

    /// Upload the document and its source. Local files are left in place.
    pub async fn publish(
        &self,
        pdf_path: &Path,
        tex_path: &Path,
        tenant_id: Uuid,
        report_id: Uuid,
    ) -> Result<ArtifactRefs> {
        let pdf = read_local(pdf_path).await?;
        let tex = read_local(tex_path).await?;

        let tex_key = self.object_key(tenant_id, report_id, "tex");
        let pdf_key = self.object_key(tenant_id, report_id, "pdf");

        self.store.put(&tex_key, tex, TEX_CONTENT_TYPE).await?;
        self.store.put(&pdf_key, pdf, PDF_CONTENT_TYPE).await?;

        let refs = ArtifactRefs {
            pdf: self.locator(&pdf_key),
            tex: self.locator(&tex_key),
        };
        info!(
            report_id = %report_id,
            tenant_id = %tenant_id,
            pdf = %refs.pdf,
            "Artifacts archived"
        );
        Ok(refs)
    }

    /// Fetch the object a locator points at.
    ///
    /// Locators for another scheme or bucket are treated as absent.
    pub async fn fetch(&self, locator: &str) -> Result<Option<Vec<u8>>> {
        let Some(key) = self.key_of(locator) else {
            return Ok(None);
        };
        self.store.get(key).await
    }

    fn key_of<'a>(&self, locator: &'a str) -> Option<&'a str> {
        let rest = locator.strip_prefix(self.store.scheme())?.strip_prefix("://")?;
        let key = rest.strip_prefix(self.store.bucket())?.strip_prefix('/')?;
        (!key.is_empty()).then_some(key)
    }
}

async fn read_local(path: &Path) -> Result<Vec<u8>> {
    tokio::fs::read(path).await.map_err(|source| ArchiveError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Normalize a key prefix so it is empty or ends with exactly one `/`.
pub fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{trimmed}/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::FsObjectStore;
    use tempfile::TempDir;

    fn archiver(temp: &TempDir, prefix: &str) -> Archiver {
        let store = FsObjectStore::new(temp.path().join("storage"), "reports");
        Archiver::new(Arc::new(store), prefix)
    }

    async fn local_pair(temp: &TempDir, id: Uuid) -> (std::path::PathBuf, std::path::PathBuf) {
        let pdf = temp.path().join(format!("{id}.pdf"));
        let tex = temp.path().join(format!("{id}.tex"));
        tokio::fs::write(&pdf, b"%PDF-1.5 body").await.unwrap();
        tokio::fs::write(&tex, b"\\documentclass{article}").await.unwrap();
        (pdf, tex)
    }

    #[test]
    fn test_normalize_prefix() {
        assert_eq!(normalize_prefix("reports"), "reports/");
        assert_eq!(normalize_prefix("reports/"), "reports/");
        assert_eq!(normalize_prefix("/a/b//"), "a/b/");
        assert_eq!(normalize_prefix(""), "");
        assert_eq!(normalize_prefix("/"), "");
    }

    #[tokio::test]
    async fn test_publish_uses_tenant_scoped_keys() {
        let temp = TempDir::new().unwrap();
        let archiver = archiver(&temp, "reports");
        let tenant = Uuid::new_v4();
        let report = Uuid::new_v4();
        let (pdf, tex) = local_pair(&temp, report).await;

        let refs = archiver.publish(&pdf, &tex, tenant, report).await.unwrap();

        assert_eq!(refs.pdf, format!("file://reports/reports/{tenant}/{report}.pdf"));
        assert_eq!(refs.tex, format!("file://reports/reports/{tenant}/{report}.tex"));
        // Local copies are retained.
        assert!(pdf.is_file());
        assert!(tex.is_file());
    }

    #[tokio::test]
    async fn test_fetch_resolves_published_locators() {
        let temp = TempDir::new().unwrap();
        let archiver = archiver(&temp, "");
        let report = Uuid::new_v4();
        let (pdf, tex) = local_pair(&temp, report).await;

        let refs = archiver
            .publish(&pdf, &tex, Uuid::new_v4(), report)
            .await
            .unwrap();

        let bytes = archiver.fetch(&refs.pdf).await.unwrap().unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        let source = archiver.fetch(&refs.tex).await.unwrap().unwrap();
        assert_eq!(source, b"\\documentclass{article}");
    }

    #[tokio::test]
    async fn test_foreign_locators_are_absent() {
        let temp = TempDir::new().unwrap();
        let archiver = archiver(&temp, "reports");

        for locator in [
            "s3://reports/reports/a.pdf",
            "file://other/reports/a.pdf",
            "file://reports/",
            "not a locator",
        ] {
            assert!(archiver.fetch(locator).await.unwrap().is_none(), "{locator}");
        }
    }

    #[tokio::test]
    async fn test_missing_local_file_is_read_error() {
        let temp = TempDir::new().unwrap();
        let archiver = archiver(&temp, "reports");
        let missing = temp.path().join("missing.pdf");

        let err = archiver
            .publish(&missing, &missing, Uuid::new_v4(), Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, ArchiveError::Read { .. }));
    }
}
