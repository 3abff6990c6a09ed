//! Mail types for Suimail.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::attachment::AttachmentDescriptor;
use crate::blob::BlobReference;

/// Maximum length for mail subject.
pub const MAX_SUBJECT_LENGTH: usize = 200;

/// Maximum length for mail body.
pub const MAX_BODY_LENGTH: usize = 10000;

/// Maximum length for a transaction digest.
pub const MAX_DIGEST_LENGTH: usize = 256;

/// Which side of a mail an account is acting as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailRole {
    Sender,
    Recipient,
}

/// A mail message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mail {
    /// Mail ID (UUID).
    pub id: String,
    /// Sender account ID.
    pub sender_id: i64,
    /// Recipient account ID.
    pub recipient_id: i64,
    /// Mail subject.
    pub subject: String,
    /// Mail body.
    pub body: String,
    /// Attachment bundle, present exactly when `attachments` is non-empty.
    pub blob_reference: Option<BlobReference>,
    /// Attachment descriptors, in bundle order.
    pub attachments: Vec<AttachmentDescriptor>,
    /// Opaque transaction digest.
    pub digest: Option<String>,
    /// Mail this one replies to.
    pub parent_mail_id: Option<String>,
    /// Whether the recipient has read the mail.
    pub is_read_by_recipient: bool,
    /// Whether the sender has deleted the mail.
    pub deleted_for_sender: bool,
    /// Whether the recipient has deleted the mail.
    pub deleted_for_recipient: bool,
    /// When the mail was created.
    pub created_at: DateTime<Utc>,
}

impl Mail {
    /// Check if the mail is visible to the sender.
    pub fn is_visible_to_sender(&self) -> bool {
        !self.deleted_for_sender
    }

    /// Check if the mail is visible to the recipient.
    pub fn is_visible_to_recipient(&self) -> bool {
        !self.deleted_for_recipient
    }

    /// Check if the mail is visible to an account in any of its roles.
    pub fn is_visible_to(&self, account_id: i64) -> bool {
        (self.sender_id == account_id && self.is_visible_to_sender())
            || (self.recipient_id == account_id && self.is_visible_to_recipient())
    }

    /// Check if the mail can be physically deleted.
    /// A mail can be deleted when both sender and recipient have deleted it.
    pub fn can_be_purged(&self) -> bool {
        self.deleted_for_sender && self.deleted_for_recipient
    }

    /// Whether the mail carries attachments.
    pub fn has_attachments(&self) -> bool {
        !self.attachments.is_empty()
    }
}

/// New mail for creation.
#[derive(Debug, Clone)]
pub struct NewMail {
    /// Mail ID, generated on construction.
    pub id: String,
    /// Sender account ID.
    pub sender_id: i64,
    /// Recipient account ID.
    pub recipient_id: i64,
    /// Mail subject.
    pub subject: String,
    /// Mail body.
    pub body: String,
    /// Attachment bundle reference.
    pub blob_reference: Option<BlobReference>,
    /// Attachment descriptors.
    pub attachments: Vec<AttachmentDescriptor>,
    /// Transaction digest.
    pub digest: Option<String>,
    /// Parent mail ID.
    pub parent_mail_id: Option<String>,
}

impl NewMail {
    /// Create a new mail without attachments.
    pub fn new(
        sender_id: i64,
        recipient_id: i64,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            sender_id,
            recipient_id,
            subject: subject.into(),
            body: body.into(),
            blob_reference: None,
            attachments: Vec::new(),
            digest: None,
            parent_mail_id: None,
        }
    }

    /// Attach an uploaded bundle and its descriptors.
    pub fn with_attachments(
        mut self,
        blob_reference: BlobReference,
        attachments: Vec<AttachmentDescriptor>,
    ) -> Self {
        self.blob_reference = Some(blob_reference);
        self.attachments = attachments;
        self
    }

    /// Set the transaction digest.
    pub fn with_digest(mut self, digest: impl Into<String>) -> Self {
        self.digest = Some(digest.into());
        self
    }

    /// Set the parent mail.
    pub fn with_parent(mut self, parent_mail_id: impl Into<String>) -> Self {
        self.parent_mail_id = Some(parent_mail_id.into());
        self
    }
}
