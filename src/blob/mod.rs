//! Blob storage for Suimail.
//!
//! Attachment bundles are kept in an external content-addressed store.
//! The store is reached through the [`BlobStore`] trait so the mail
//! service does not depend on a particular provider:
//!
//! - [`WalrusClient`] talks to a Walrus publisher/aggregator over HTTP
//! - [`MemoryBlobStore`] keeps blobs in process (development and tests)

mod memory;
mod walrus;

pub use memory::MemoryBlobStore;
pub use walrus::WalrusClient;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::{BlobBackend, BlobStoreConfig};
use crate::Result;

/// Opaque identifier of a stored blob, as assigned by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlobReference(String);

impl BlobReference {
    /// Wrap a provider-assigned blob id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the blob id.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume into the blob id.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for BlobReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A content-addressed blob store.
///
/// Implementations report every transport failure, non-success status or
/// undecodable response as [`SuimailError::Storage`](crate::SuimailError::Storage)
/// and never retry internally.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store a payload and return its reference.
    ///
    /// Uploading a payload the store already holds yields a reference to the
    /// existing blob.
    async fn upload(&self, payload: &[u8]) -> Result<BlobReference>;

    /// Retrieve a payload by reference.
    async fn fetch(&self, reference: &BlobReference) -> Result<Vec<u8>>;
}

/// Create the blob store selected by the configuration.
pub fn from_config(config: &BlobStoreConfig) -> Result<Arc<dyn BlobStore>> {
    match config.backend {
        BlobBackend::Walrus => {
            info!(
                publisher = %config.publisher_url,
                aggregator = %config.aggregator_url,
                "Using Walrus blob store"
            );
            Ok(Arc::new(WalrusClient::from_config(config)?))
        }
        BlobBackend::Memory => {
            info!("Using in-memory blob store");
            Ok(Arc::new(MemoryBlobStore::new()))
        }
    }
}
