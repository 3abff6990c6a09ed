//! Attachment handling for Suimail.
//!
//! This module provides:
//! - Limit checks over an incoming attachment set (count, per-file size, total size)
//! - The bundle codec that packs a whole attachment set into one blob payload

mod bundle;
mod validator;

pub use bundle::{describe, pack, unpack, AttachmentDescriptor};
pub use validator::{
    check, validate, AttachmentChecks, AttachmentError, AttachmentLimits, ByteSize,
    DEFAULT_MAX_ATTACHMENTS, DEFAULT_MAX_FILE_SIZE, DEFAULT_MAX_TOTAL_SIZE,
};

/// Fallback content type when none is given and none can be guessed.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// An attachment file as received from a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentFile {
    /// Original file name.
    pub filename: String,
    /// Declared content type, if the client sent one.
    pub content_type: Option<String>,
    /// File contents.
    pub data: Vec<u8>,
}

impl AttachmentFile {
    /// Create a new attachment file.
    pub fn new(
        filename: impl Into<String>,
        content_type: Option<String>,
        data: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            filename: filename.into(),
            content_type,
            data: data.into(),
        }
    }

    /// Size of the file in bytes.
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    /// The declared content type, or one guessed from the file name.
    pub fn resolved_content_type(&self) -> String {
        match self.content_type.as_deref().map(str::trim) {
            Some(ct) if !ct.is_empty() => ct.to_string(),
            _ => mime_guess::from_path(&self.filename)
                .first_or_octet_stream()
                .to_string(),
        }
    }
}
