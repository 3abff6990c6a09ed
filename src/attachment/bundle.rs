//! Attachment bundle codec.
//!
//! All attachments of one mail travel as a single blob:
//! `{"files":[{"filename","contentType","data"}]}` with base64 file data.
//! A file's position in the bundle is its index in `files`.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::{Result, SuimailError};

use super::AttachmentFile;

/// Metadata recorded on a mail for each attachment in its bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentDescriptor {
    pub filename: String,
    pub size: u64,
    pub content_type: String,
    pub position: usize,
}

#[derive(Serialize, Deserialize)]
struct Bundle {
    files: Vec<BundleEntry>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BundleEntry {
    filename: String,
    content_type: String,
    data: String,
}

/// Build the descriptors for a set of files, in bundle order.
pub fn describe(files: &[AttachmentFile]) -> Vec<AttachmentDescriptor> {
    files
        .iter()
        .enumerate()
        .map(|(position, file)| AttachmentDescriptor {
            filename: file.filename.clone(),
            size: file.size(),
            content_type: file.resolved_content_type(),
            position,
        })
        .collect()
}

/// Pack files into a single bundle payload.
pub fn pack(files: &[AttachmentFile]) -> Result<Vec<u8>> {
    let bundle = Bundle {
        files: files
            .iter()
            .map(|file| BundleEntry {
                filename: file.filename.clone(),
                content_type: file.resolved_content_type(),
                data: STANDARD.encode(&file.data),
            })
            .collect(),
    };

    serde_json::to_vec(&bundle)
        .map_err(|e| SuimailError::Storage(format!("failed to encode attachment bundle: {e}")))
}

/// Unpack a bundle payload into its files, in order.
pub fn unpack(payload: &[u8]) -> Result<Vec<AttachmentFile>> {
    let bundle: Bundle = serde_json::from_slice(payload)
        .map_err(|e| SuimailError::Storage(format!("malformed attachment bundle: {e}")))?;

    bundle
        .files
        .into_iter()
        .map(|entry| {
            let data = STANDARD.decode(entry.data.as_bytes()).map_err(|e| {
                SuimailError::Storage(format!(
                    "malformed attachment data for {}: {e}",
                    entry.filename
                ))
            })?;
            Ok(AttachmentFile {
                filename: entry.filename,
                content_type: Some(entry.content_type),
                data,
            })
        })
        .collect()
}
