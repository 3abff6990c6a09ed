//! Attachment limit checks.
//!
//! The checks are a pure function of the attachment sizes; no I/O happens
//! here. Failures are reported in a fixed order: count, individual size,
//! total size.

use std::fmt;

use thiserror::Error;

use crate::config::AttachmentsConfig;
use crate::SuimailError;

use super::AttachmentFile;

/// Default maximum number of attachments per mail.
pub const DEFAULT_MAX_ATTACHMENTS: usize = 5;

/// Default per-file size limit (exclusive), in bytes.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 300 * 1024;

/// Default total size limit (inclusive), in bytes.
pub const DEFAULT_MAX_TOTAL_SIZE: u64 = 10 * 1024 * 1024;

/// A byte count rendered in the largest whole unit (`10MB`, `300KB`, `17 bytes`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteSize(pub u64);

impl fmt::Display for ByteSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const KB: u64 = 1024;
        const MB: u64 = 1024 * 1024;
        match self.0 {
            n if n >= MB && n % MB == 0 => write!(f, "{}MB", n / MB),
            n if n >= KB && n % KB == 0 => write!(f, "{}KB", n / KB),
            n => write!(f, "{n} bytes"),
        }
    }
}

/// Attachment limit violations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AttachmentError {
    /// Too many files.
    #[error("Attachments cannot exceed limit of {max} files")]
    TooManyFiles { max: usize },

    /// A single file reached the per-file limit.
    #[error("Attachment size exceeds {limit}")]
    FileTooLarge { limit: ByteSize },

    /// The files together exceed the total limit.
    #[error("Total attachment size exceeds {limit}")]
    TotalTooLarge { limit: ByteSize },
}

impl From<AttachmentError> for SuimailError {
    fn from(e: AttachmentError) -> Self {
        SuimailError::Validation(e.to_string())
    }
}

/// Attachment limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttachmentLimits {
    /// Maximum number of files.
    pub max_count: usize,
    /// Every file must be strictly smaller than this.
    pub max_file_size: u64,
    /// The sum of sizes must not exceed this.
    pub max_total_size: u64,
}

impl Default for AttachmentLimits {
    fn default() -> Self {
        Self {
            max_count: DEFAULT_MAX_ATTACHMENTS,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            max_total_size: DEFAULT_MAX_TOTAL_SIZE,
        }
    }
}

impl From<&AttachmentsConfig> for AttachmentLimits {
    fn from(config: &AttachmentsConfig) -> Self {
        Self {
            max_count: config.max_count,
            max_file_size: config.max_file_size_bytes,
            max_total_size: config.max_total_size_bytes,
        }
    }
}

/// Result of the three independent limit checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttachmentChecks {
    pub count_ok: bool,
    pub each_size_ok: bool,
    pub total_size_ok: bool,
}

impl AttachmentChecks {
    /// Whether every check passed.
    pub fn all_ok(&self) -> bool {
        self.count_ok && self.each_size_ok && self.total_size_ok
    }

    /// Turn the checks into the first violation, in count, size, total order.
    pub fn into_result(self, limits: &AttachmentLimits) -> Result<(), AttachmentError> {
        if !self.count_ok {
            return Err(AttachmentError::TooManyFiles {
                max: limits.max_count,
            });
        }
        if !self.each_size_ok {
            return Err(AttachmentError::FileTooLarge {
                limit: ByteSize(limits.max_file_size),
            });
        }
        if !self.total_size_ok {
            return Err(AttachmentError::TotalTooLarge {
                limit: ByteSize(limits.max_total_size),
            });
        }
        Ok(())
    }
}

/// Run the limit checks over a list of file sizes.
pub fn check<I>(sizes: I, limits: &AttachmentLimits) -> AttachmentChecks
where
    I: IntoIterator<Item = u64>,
{
    let mut count = 0usize;
    let mut total = 0u64;
    let mut each_size_ok = true;

    for size in sizes {
        count += 1;
        total = total.saturating_add(size);
        if size >= limits.max_file_size {
            each_size_ok = false;
        }
    }

    AttachmentChecks {
        count_ok: count <= limits.max_count,
        each_size_ok,
        total_size_ok: total <= limits.max_total_size,
    }
}

/// Validate an attachment set, returning the first violation.
pub fn validate(files: &[AttachmentFile], limits: &AttachmentLimits) -> Result<(), AttachmentError> {
    check(files.iter().map(AttachmentFile::size), limits).into_result(limits)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn files(sizes: &[usize]) -> Vec<AttachmentFile> {
        sizes
            .iter()
            .enumerate()
            .map(|(i, &n)| AttachmentFile::new(format!("f{i}.bin"), None, vec![0u8; n]))
            .collect()
    }

    #[test]
    fn test_empty_set_is_valid() {
        let checks = check(std::iter::empty(), &AttachmentLimits::default());
        assert!(checks.all_ok());
        assert!(validate(&[], &AttachmentLimits::default()).is_ok());
    }

    #[test]
    fn test_count_limit_is_inclusive() {
        let limits = AttachmentLimits::default();
        assert!(validate(&files(&[1; 5]), &limits).is_ok());

        let err = validate(&files(&[1; 6]), &limits).unwrap_err();
        assert_eq!(err, AttachmentError::TooManyFiles { max: 5 });
        assert_eq!(err.to_string(), "Attachments cannot exceed limit of 5 files");
    }

    #[test]
    fn test_count_reported_before_size() {
        // Six oversized files still report the count violation.
        let limits = AttachmentLimits::default();
        let sizes = [DEFAULT_MAX_FILE_SIZE + 1; 6];
        let checks = check(sizes, &limits);
        assert!(!checks.count_ok);
        assert!(!checks.each_size_ok);
        assert_eq!(
            checks.into_result(&limits).unwrap_err(),
            AttachmentError::TooManyFiles { max: 5 }
        );
    }

    #[test]
    fn test_file_size_limit_is_strict() {
        let limits = AttachmentLimits::default();
        let just_under = (DEFAULT_MAX_FILE_SIZE - 1) as usize;
        assert!(validate(&files(&[just_under]), &limits).is_ok());

        let err = validate(&files(&[10, DEFAULT_MAX_FILE_SIZE as usize]), &limits).unwrap_err();
        assert_eq!(err.to_string(), "Attachment size exceeds 300KB");
    }

    #[test]
    fn test_total_size_limit_is_inclusive() {
        let limits = AttachmentLimits {
            max_count: 5,
            max_file_size: 100,
            max_total_size: 200,
        };
        assert!(check([99, 99, 2], &limits).all_ok());

        let checks = check([99, 99, 3], &limits);
        assert!(checks.count_ok);
        assert!(checks.each_size_ok);
        assert!(!checks.total_size_ok);
        assert_eq!(
            checks.into_result(&limits).unwrap_err(),
            AttachmentError::TotalTooLarge {
                limit: ByteSize(200)
            }
        );
    }

    #[test]
    fn test_total_size_message_with_default_limit() {
        let err = AttachmentError::TotalTooLarge {
            limit: ByteSize(DEFAULT_MAX_TOTAL_SIZE),
        };
        assert_eq!(err.to_string(), "Total attachment size exceeds 10MB");
    }

    #[test]
    fn test_byte_size_display() {
        assert_eq!(ByteSize(300 * 1024).to_string(), "300KB");
        assert_eq!(ByteSize(10 * 1024 * 1024).to_string(), "10MB");
        assert_eq!(ByteSize(1536).to_string(), "1536 bytes");
        assert_eq!(ByteSize(0).to_string(), "0 bytes");
    }

    #[test]
    fn test_limits_from_config() {
        let config = AttachmentsConfig {
            max_count: 2,
            max_file_size_bytes: 10,
            max_total_size_bytes: 15,
        };
        let limits = AttachmentLimits::from(&config);
        assert_eq!(limits.max_count, 2);
        assert_eq!(limits.max_file_size, 10);
        assert_eq!(limits.max_total_size, 15);
    }

    #[test]
    fn test_converts_into_validation_error() {
        let err: SuimailError = AttachmentError::TooManyFiles { max: 5 }.into();
        assert!(matches!(err, SuimailError::Validation(ref m) if m.contains("limit of 5 files")));
    }
}
