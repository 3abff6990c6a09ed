//! In-process blob store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;

use super::{BlobReference, BlobStore};
use crate::{Result, SuimailError};

/// Blob store that keeps payloads in memory, keyed by their SHA-256 hex digest.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
    uploads: AtomicUsize,
    failing: AtomicBool,
}

impl MemoryBlobStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of upload calls received, including failed ones.
    pub fn upload_count(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    /// Make every subsequent call fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of distinct blobs held.
    pub async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }

    /// Whether the store is empty.
    pub async fn is_empty(&self) -> bool {
        self.blobs.read().await.is_empty()
    }

    fn check_available(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(SuimailError::Storage("blob store unavailable".to_string()));
        }
        Ok(())
    }
}

fn blob_id(payload: &[u8]) -> String {
    let digest = Sha256::digest(payload);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload(&self, payload: &[u8]) -> Result<BlobReference> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;

        let id = blob_id(payload);
        self.blobs
            .write()
            .await
            .entry(id.clone())
            .or_insert_with(|| payload.to_vec());
        Ok(BlobReference::new(id))
    }

    async fn fetch(&self, reference: &BlobReference) -> Result<Vec<u8>> {
        self.check_available()?;
        self.blobs
            .read()
            .await
            .get(reference.as_str())
            .cloned()
            .ok_or_else(|| SuimailError::Storage(format!("blob {reference} not found")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upload_and_fetch() {
        let store = MemoryBlobStore::new();
        let reference = store.upload(b"hello").await.unwrap();
        assert_eq!(store.fetch(&reference).await.unwrap(), b"hello");
        assert_eq!(store.upload_count(), 1);
    }

    #[tokio::test]
    async fn test_identical_payload_is_deduplicated() {
        let store = MemoryBlobStore::new();
        let first = store.upload(b"same").await.unwrap();
        let second = store.upload(b"same").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(store.len().await, 1);
        assert_eq!(store.upload_count(), 2);
    }

    #[tokio::test]
    async fn test_blob_id_is_sha256_hex() {
        let store = MemoryBlobStore::new();
        let reference = store.upload(b"abc").await.unwrap();
        assert_eq!(
            reference.as_str(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[tokio::test]
    async fn test_fetch_unknown_is_storage_error() {
        let store = MemoryBlobStore::new();
        let err = store.fetch(&BlobReference::new("missing")).await.unwrap_err();
        assert!(matches!(err, SuimailError::Storage(_)));
    }

    #[tokio::test]
    async fn test_failing_store() {
        let store = MemoryBlobStore::new();
        store.set_failing(true);
        let err = store.upload(b"x").await.unwrap_err();
        assert!(matches!(err, SuimailError::Storage(_)));
        assert!(store.is_empty().await);

        store.set_failing(false);
        assert!(store.upload(b"x").await.is_ok());
    }
}
