// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! S3-compatible object store.
//!
//! Speaks the path-style REST API (`PUT`/`GET /<bucket>/<key>`) and signs
//! every request with AWS Signature Version 4. Works against AWS S3 and
//! compatible servers (MinIO, Ceph RGW, R2).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hmac::digest::InvalidLength;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::traits::*;

type HmacSha256 = Hmac<Sha256>;

const SIGNING_ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// S3 store configuration.
#[derive(Debug, Clone)]
pub struct S3Config {
    /// Endpoint base URL, e.g. `https://s3.eu-west-1.amazonaws.com`.
    pub endpoint: String,
    /// Signing region.
    pub region: String,
    /// Bucket name.
    pub bucket: String,
    /// Access key id.
    pub access_key_id: String,
    /// Secret access key.
    pub secret_access_key: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

/// Object store for S3-compatible services.
pub struct S3ObjectStore {
    client: reqwest::Client,
    endpoint: Url,
    config: S3Config,
}

impl S3ObjectStore {
    /// Create a new store.
    pub fn new(config: S3Config) -> Result<Self> {
        let endpoint = Url::parse(&config.endpoint).map_err(|e| ArchiveError::Upload {
            key: String::new(),
            message: format!("invalid endpoint {}: {}", config.endpoint, e),
        })?;
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ArchiveError::Upload {
                key: String::new(),
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            endpoint,
            config,
        })
    }

    /// Canonical, percent-encoded path of an object.
    fn object_path(&self, key: &str) -> String {
        let base = self.endpoint.path().trim_end_matches('/');
        let encoded: Vec<String> = std::iter::once(self.config.bucket.as_str())
            .chain(key.split('/'))
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect();
        format!("{}/{}", base, encoded.join("/"))
    }

    fn host_header(&self) -> String {
        let host = self.endpoint.host_str().unwrap_or_default();
        match self.endpoint.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        }
    }

    fn object_url(&self, key: &str) -> String {
        format!(
            "{}://{}{}",
            self.endpoint.scheme(),
            self.host_header(),
            self.object_path(key)
        )
    }

    /// Build the signed headers for a request at `now`.
    fn signed_headers(
        &self,
        method: &str,
        key: &str,
        payload: &[u8],
        content_type: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Vec<(String, String)>> {
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let date = now.format("%Y%m%d").to_string();
        let payload_hash = hex::encode(Sha256::digest(payload));

        let mut headers: Vec<(String, String)> = vec![
            ("host".to_string(), self.host_header()),
            ("x-amz-content-sha256".to_string(), payload_hash.clone()),
            ("x-amz-date".to_string(), amz_date.clone()),
        ];
        if let Some(content_type) = content_type {
            headers.push(("content-type".to_string(), content_type.to_string()));
        }
        headers.sort();

        let canonical_headers: String = headers
            .iter()
            .map(|(name, value)| format!("{}:{}\n", name, value.trim()))
            .collect();
        let signed_header_names = headers
            .iter()
            .map(|(name, _)| name.as_str())
            .collect::<Vec<_>>()
            .join(";");

        let canonical_request = format!(
            "{}\n{}\n\n{}\n{}\n{}",
            method,
            self.object_path(key),
            canonical_headers,
            signed_header_names,
            payload_hash
        );

        let scope = format!("{}/{}/s3/aws4_request", date, self.config.region);
        let string_to_sign = format!(
            "{}\n{}\n{}\n{}",
            SIGNING_ALGORITHM,
            amz_date,
            scope,
            hex::encode(Sha256::digest(canonical_request.as_bytes()))
        );

        let key_bytes = signing_key(
            &self.config.secret_access_key,
            &date,
            &self.config.region,
            "s3",
        )
        .and_then(|k| hmac_sha256(&k, string_to_sign.as_bytes()))
        .map_err(|e| ArchiveError::Upload {
            key: key.to_string(),
            message: format!("request signing failed: {e}"),
        })?;
        let signature = hex::encode(key_bytes);

        let authorization = format!(
            "{} Credential={}/{}, SignedHeaders={}, Signature={}",
            SIGNING_ALGORITHM, self.config.access_key_id, scope, signed_header_names, signature
        );

        // reqwest sets Host from the URL itself.
        headers.retain(|(name, _)| name != "host");
        headers.push(("authorization".to_string(), authorization));
        Ok(headers)
    }
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> std::result::Result<Vec<u8>, InvalidLength> {
    let mut mac = HmacSha256::new_from_slice(key)?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Derive the SigV4 signing key for a date (`YYYYMMDD`), region and service.
pub fn signing_key(
    secret: &str,
    date: &str,
    region: &str,
    service: &str,
) -> std::result::Result<Vec<u8>, InvalidLength> {
    let k_date = hmac_sha256(format!("AWS4{secret}").as_bytes(), date.as_bytes())?;
    let k_region = hmac_sha256(&k_date, region.as_bytes())?;
    let k_service = hmac_sha256(&k_region, service.as_bytes())?;
    hmac_sha256(&k_service, b"aws4_request")
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    fn scheme(&self) -> &'static str {
        "s3"
    }

    fn bucket(&self) -> &str {
        &self.config.bucket
    }

    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<()> {
        let headers = self.signed_headers("PUT", key, &bytes, Some(content_type), Utc::now())?;
        let mut request = self.client.put(self.object_url(key));
        for (name, value) in headers {
            request = request.header(name, value);
        }

        let size = bytes.len();
        let response = request
            .body(bytes)
            .send()
            .await
            .map_err(|e| ArchiveError::Upload {
                key: key.to_string(),
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ArchiveError::Upload {
                key: key.to_string(),
                message: format!("status {}: {}", status, body),
            });
        }

        debug!(bucket = %self.config.bucket, key = %key, size, "Uploaded object");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let headers = self.signed_headers("GET", key, b"", None, Utc::now())?;
        let mut request = self.client.get(self.object_url(key));
        for (name, value) in headers {
            request = request.header(name, value);
        }

        let download_error = |message: String| ArchiveError::Download {
            key: key.to_string(),
            message,
        };

        let response = request
            .send()
            .await
            .map_err(|e| download_error(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(download_error(format!("status {}: {}", status, body)));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| download_error(e.to_string()))?;
        Ok(Some(bytes.to_vec()))
    }
}
