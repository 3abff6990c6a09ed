//! Response DTOs for Web API.

use std::collections::HashMap;

use serde::Serialize;

use crate::account::Account;
use crate::attachment::AttachmentDescriptor;
use crate::datetime;
use crate::mail::Mail;

/// Generic API response wrapper.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a new API response.
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// Account details.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountResponse {
    pub id: i64,
    pub address: String,
    pub created_at: String,
}

impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            address: account.address,
            created_at: datetime::to_storage(&account.created_at),
        }
    }
}

/// Response to account provisioning.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionResponse {
    /// The new account.
    pub account: AccountResponse,
    /// Access token (JWT).
    pub access_token: String,
    /// Always `Bearer`.
    pub token_type: &'static str,
    /// Access token expiry in seconds.
    pub expires_in: u64,
}

/// One side of a mail.
#[derive(Debug, Clone, Serialize)]
pub struct PartyInfo {
    pub id: i64,
    pub address: String,
}

/// Mail as shown in inbox, outbox and reply listings.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MailSummaryResponse {
    pub id: String,
    pub sender: PartyInfo,
    pub recipient: PartyInfo,
    pub subject: String,
    pub is_read: bool,
    pub attachment_count: usize,
    pub digest: Option<String>,
    pub parent_mail_id: Option<String>,
    pub created_at: String,
}

/// Full mail.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MailDetailResponse {
    #[serde(flatten)]
    pub summary: MailSummaryResponse,
    pub body: String,
    pub blob_reference: Option<String>,
    pub attachments: Vec<AttachmentDescriptor>,
}

/// Account addresses keyed by account ID, used to label mail parties.
#[derive(Debug, Default)]
pub struct PartyDirectory(HashMap<i64, String>);

impl PartyDirectory {
    /// Record an account's address.
    pub fn insert(&mut self, id: i64, address: impl Into<String>) {
        self.0.insert(id, address.into());
    }

    /// Whether the directory already knows an account.
    pub fn contains(&self, id: i64) -> bool {
        self.0.contains_key(&id)
    }

    fn party(&self, id: i64) -> PartyInfo {
        PartyInfo {
            id,
            address: self.0.get(&id).cloned().unwrap_or_default(),
        }
    }

    /// Build a summary for a mail.
    pub fn summary(&self, mail: &Mail) -> MailSummaryResponse {
        MailSummaryResponse {
            id: mail.id.clone(),
            sender: self.party(mail.sender_id),
            recipient: self.party(mail.recipient_id),
            subject: mail.subject.clone(),
            is_read: mail.is_read_by_recipient,
            attachment_count: mail.attachments.len(),
            digest: mail.digest.clone(),
            parent_mail_id: mail.parent_mail_id.clone(),
            created_at: datetime::to_storage(&mail.created_at),
        }
    }

    /// Build the full view of a mail.
    pub fn detail(&self, mail: Mail) -> MailDetailResponse {
        MailDetailResponse {
            summary: self.summary(&mail),
            body: mail.body,
            blob_reference: mail.blob_reference.map(|r| r.into_inner()),
            attachments: mail.attachments,
        }
    }
}

/// Unread count response.
#[derive(Debug, Serialize)]
pub struct UnreadCountResponse {
    pub count: i64,
}

/// Number of mails a batch operation changed.
#[derive(Debug, Serialize)]
pub struct AffectedResponse {
    pub affected: u64,
}
