//! Walrus HTTP blob store client.
//!
//! Uploads go to the publisher (`PUT /v1/blobs?epochs=N`), downloads to the
//! aggregator (`GET /v1/blobs/{blobId}`). Payloads are wrapped in a JSON
//! envelope `{"message": <base64>}` so the stored blob is self-describing.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use super::{BlobReference, BlobStore};
use crate::config::BlobStoreConfig;
use crate::{Result, SuimailError};

/// Default connect timeout in seconds.
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default total timeout in seconds.
const TOTAL_TIMEOUT_SECS: u64 = 60;

/// User agent string for blob store requests.
const USER_AGENT: &str = concat!("suimail/", env!("CARGO_PKG_VERSION"));

#[derive(Serialize, Deserialize)]
struct Envelope {
    message: String,
}

/// Publisher response. Exactly one of the two shapes is expected.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    newly_created: Option<NewlyCreated>,
    already_certified: Option<AlreadyCertified>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewlyCreated {
    blob_object: BlobObject,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BlobObject {
    blob_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AlreadyCertified {
    blob_id: String,
}

impl UploadResponse {
    fn into_blob_id(self) -> Option<String> {
        match (self.newly_created, self.already_certified) {
            (Some(created), _) => Some(created.blob_object.blob_id),
            (None, Some(certified)) => Some(certified.blob_id),
            (None, None) => None,
        }
    }
}

/// Walrus publisher/aggregator client.
#[derive(Debug, Clone)]
pub struct WalrusClient {
    client: Client,
    publisher_url: String,
    aggregator_url: String,
    epochs: u32,
}

impl WalrusClient {
    /// Create a client with default timeouts.
    pub fn new(publisher_url: &str, aggregator_url: &str, epochs: u32) -> Result<Self> {
        Self::with_timeouts(
            publisher_url,
            aggregator_url,
            epochs,
            Duration::from_secs(CONNECT_TIMEOUT_SECS),
            Duration::from_secs(TOTAL_TIMEOUT_SECS),
        )
    }

    /// Create a client from configuration.
    pub fn from_config(config: &BlobStoreConfig) -> Result<Self> {
        Self::with_timeouts(
            &config.publisher_url,
            &config.aggregator_url,
            config.epochs,
            Duration::from_secs(config.connect_timeout_secs),
            Duration::from_secs(config.timeout_secs),
        )
    }

    fn with_timeouts(
        publisher_url: &str,
        aggregator_url: &str,
        epochs: u32,
        connect_timeout: Duration,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| SuimailError::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            publisher_url: normalize_base_url(publisher_url)?,
            aggregator_url: normalize_base_url(aggregator_url)?,
            epochs,
        })
    }

    fn upload_url(&self) -> String {
        format!("{}/v1/blobs", self.publisher_url)
    }

    fn fetch_url(&self, reference: &BlobReference) -> String {
        format!(
            "{}/v1/blobs/{}",
            self.aggregator_url,
            urlencoding::encode(reference.as_str())
        )
    }
}

fn normalize_base_url(raw: &str) -> Result<String> {
    let url = Url::parse(raw)
        .map_err(|e| SuimailError::Config(format!("invalid blob store URL {raw:?}: {e}")))?;
    Ok(url.as_str().trim_end_matches('/').to_string())
}

#[async_trait]
impl BlobStore for WalrusClient {
    async fn upload(&self, payload: &[u8]) -> Result<BlobReference> {
        let envelope = Envelope {
            message: STANDARD.encode(payload),
        };

        let response = self
            .client
            .put(self.upload_url())
            .query(&[("epochs", self.epochs)])
            .json(&envelope)
            .send()
            .await
            .map_err(|e| {
                warn!("Blob upload failed: {}", e);
                SuimailError::Storage(format!("failed to upload blob: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!("Blob upload rejected: HTTP {}", status);
            return Err(SuimailError::Storage(format!("upload failed: HTTP {status}")));
        }

        let body: UploadResponse = response
            .json()
            .await
            .map_err(|e| SuimailError::Storage(format!("invalid upload response: {e}")))?;

        let blob_id = body.into_blob_id().ok_or_else(|| {
            SuimailError::Storage("upload response carried no blob id".to_string())
        })?;

        debug!("Uploaded blob {} ({} bytes)", blob_id, payload.len());
        Ok(BlobReference::new(blob_id))
    }

    async fn fetch(&self, reference: &BlobReference) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(self.fetch_url(reference))
            .send()
            .await
            .map_err(|e| {
                warn!("Blob fetch failed: {}", e);
                SuimailError::Storage(format!("failed to fetch blob: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!("Blob fetch for {} rejected: HTTP {}", reference, status);
            return Err(SuimailError::Storage(format!("fetch failed: HTTP {status}")));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| SuimailError::Storage(format!("failed to read blob: {e}")))?;

        let envelope: Envelope = serde_json::from_slice(&bytes)
            .map_err(|e| SuimailError::Storage(format!("invalid blob envelope: {e}")))?;

        STANDARD
            .decode(envelope.message.as_bytes())
            .map_err(|e| SuimailError::Storage(format!("invalid blob payload: {e}")))
    }
}
