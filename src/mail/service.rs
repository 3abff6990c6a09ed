//! Mail service for Suimail.
//!
//! This module provides high-level mail operations: the send pipeline
//! (validation, attachment upload, persistence) and per-account access to
//! listings, attachments and mutations.

use tracing::{info, warn};

use crate::account::{AccountRepository, Address};
use crate::attachment::{self, AttachmentFile, AttachmentLimits};
use crate::blob::BlobStore;
use crate::db::Database;
use crate::{Result, SuimailError};

use super::repository::MailRepository;
use super::types::{Mail, NewMail, MAX_BODY_LENGTH, MAX_DIGEST_LENGTH, MAX_SUBJECT_LENGTH};

/// Default address domain.
pub const DEFAULT_DOMAIN: &str = "suimail";

/// Request to send a mail.
#[derive(Debug, Clone)]
pub struct SendMailRequest {
    /// Sender account ID.
    pub sender_id: i64,
    /// Recipient address.
    pub recipient: String,
    /// Mail subject.
    pub subject: String,
    /// Mail body.
    pub body: String,
    /// Attachment files.
    pub attachments: Vec<AttachmentFile>,
    /// Transaction digest.
    pub digest: Option<String>,
    /// Mail this one replies to.
    pub parent_mail_id: Option<String>,
}

impl SendMailRequest {
    /// Create a new send mail request.
    pub fn new(
        sender_id: i64,
        recipient: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            sender_id,
            recipient: recipient.into(),
            subject: subject.into(),
            body: body.into(),
            attachments: Vec::new(),
            digest: None,
            parent_mail_id: None,
        }
    }

    /// Set the attachments.
    pub fn with_attachments(mut self, attachments: Vec<AttachmentFile>) -> Self {
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

/// Service for mail operations.
pub struct MailService<'a> {
    db: &'a Database,
    blobs: &'a dyn BlobStore,
    limits: AttachmentLimits,
    domain: String,
}

impl<'a> MailService<'a> {
    /// Create a new MailService with default limits and domain.
    pub fn new(db: &'a Database, blobs: &'a dyn BlobStore) -> Self {
        Self {
            db,
            blobs,
            limits: AttachmentLimits::default(),
            domain: DEFAULT_DOMAIN.to_string(),
        }
    }

    /// Set the attachment limits.
    pub fn with_limits(mut self, limits: AttachmentLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Set the address domain recipients must belong to.
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = domain.into();
        self
    }

    fn repo(&self) -> MailRepository<'_> {
        MailRepository::new(self.db.pool())
    }

    /// Send a mail.
    ///
    /// Attachments are uploaded as one bundle before the mail is stored, so
    /// a storage failure never leaves a mail behind. A failure after the
    /// upload leaves an unreferenced blob.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Subject or body is empty or too long (`Validation`)
    /// - Attachments exceed the count, per-file or total limit (`Validation`)
    /// - The recipient address is malformed (`Validation`) or unknown (`NotFound`)
    /// - The parent mail does not exist or the sender is not party to it (`Validation`)
    /// - The blob store fails (`Storage`)
    pub async fn send(&self, request: SendMailRequest) -> Result<Mail> {
        let subject = request.subject.trim();
        if subject.is_empty() {
            return Err(SuimailError::Validation("subject is required".to_string()));
        }
        if subject.chars().count() > MAX_SUBJECT_LENGTH {
            return Err(SuimailError::Validation(format!(
                "subject must be at most {MAX_SUBJECT_LENGTH} characters"
            )));
        }

        let body = request.body.trim();
        if body.is_empty() {
            return Err(SuimailError::Validation("body is required".to_string()));
        }
        if body.chars().count() > MAX_BODY_LENGTH {
            return Err(SuimailError::Validation(format!(
                "body must be at most {MAX_BODY_LENGTH} characters"
            )));
        }

        let digest = request
            .digest
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty());
        if digest.is_some_and(|d| d.len() > MAX_DIGEST_LENGTH) {
            return Err(SuimailError::Validation(format!(
                "digest must be at most {MAX_DIGEST_LENGTH} characters"
            )));
        }

        attachment::validate(&request.attachments, &self.limits)?;

        let recipient_address = Address::parse(request.recipient.trim(), &self.domain)?;
        let recipient = AccountRepository::new(self.db.pool())
            .get_by_address(recipient_address.as_str())
            .await?
            .ok_or_else(|| SuimailError::NotFound("recipient".to_string()))?;

        let parent_mail_id = request
            .parent_mail_id
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty());
        if let Some(parent_id) = parent_mail_id {
            let parent = self.repo().get_by_id(parent_id).await?;
            let sender_is_party = parent.is_some_and(|p| {
                p.sender_id == request.sender_id || p.recipient_id == request.sender_id
            });
            if !sender_is_party {
                return Err(SuimailError::Validation("parent mail not found".to_string()));
            }
        }

        let mut new_mail = NewMail::new(request.sender_id, recipient.id, subject, body);
        if !request.attachments.is_empty() {
            let payload = attachment::pack(&request.attachments)?;
            let blob_reference = self.blobs.upload(&payload).await?;
            new_mail =
                new_mail.with_attachments(blob_reference, attachment::describe(&request.attachments));
        }
        if let Some(digest) = digest {
            new_mail = new_mail.with_digest(digest);
        }
        if let Some(parent_id) = parent_mail_id {
            new_mail = new_mail.with_parent(parent_id);
        }

        let mail = self.repo().insert(&new_mail).await.inspect_err(|e| {
            if let Some(blob) = &new_mail.blob_reference {
                warn!("Mail insert failed after uploading blob {}: {}", blob, e);
            }
        })?;

        info!(
            "Mail {} sent from {} to {} ({} attachment(s))",
            mail.id,
            mail.sender_id,
            mail.recipient_id,
            mail.attachments.len()
        );
        Ok(mail)
    }

    /// List the inbox of an account, newest first.
    pub async fn fetch_inbox(&self, account_id: i64) -> Result<Vec<Mail>> {
        self.repo().list_inbox(account_id).await
    }

    /// List the outbox of an account, newest first.
    pub async fn fetch_outbox(&self, account_id: i64) -> Result<Vec<Mail>> {
        self.repo().list_outbox(account_id).await
    }

    /// Get a mail visible to the account.
    ///
    /// Fetching does not mark the mail read.
    pub async fn fetch_mail(&self, mail_id: &str, account_id: i64) -> Result<Mail> {
        self.repo().find_visible(mail_id, account_id).await
    }

    /// List the visible replies to a visible mail.
    pub async fn list_replies(&self, mail_id: &str, account_id: i64) -> Result<Vec<Mail>> {
        let repo = self.repo();
        repo.find_visible(mail_id, account_id).await?;
        repo.list_replies(mail_id, account_id).await
    }

    /// Count unread mails in an account's inbox.
    pub async fn count_unread(&self, account_id: i64) -> Result<i64> {
        self.repo().count_unread(account_id).await
    }

    /// Resolve all attachments of a visible mail.
    pub async fn fetch_attachments(
        &self,
        mail_id: &str,
        account_id: i64,
    ) -> Result<Vec<AttachmentFile>> {
        let mail = self.fetch_mail(mail_id, account_id).await?;
        let Some(blob_reference) = mail.blob_reference else {
            return Ok(Vec::new());
        };

        let payload = self.blobs.fetch(&blob_reference).await?;
        attachment::unpack(&payload)
    }

    /// Resolve one attachment of a visible mail by its position.
    pub async fn fetch_attachment(
        &self,
        mail_id: &str,
        account_id: i64,
        position: usize,
    ) -> Result<AttachmentFile> {
        let mail = self.fetch_mail(mail_id, account_id).await?;
        let (Some(blob_reference), Some(descriptor)) = (
            mail.blob_reference.as_ref(),
            mail.attachments.iter().find(|a| a.position == position),
        ) else {
            return Err(SuimailError::NotFound("attachment".to_string()));
        };

        let payload = self.blobs.fetch(blob_reference).await?;
        let mut files = attachment::unpack(&payload)?;
        if descriptor.position >= files.len() {
            return Err(SuimailError::Storage(format!(
                "attachment bundle {} has no entry at position {}",
                blob_reference, descriptor.position
            )));
        }
        Ok(files.swap_remove(descriptor.position))
    }

    /// Mark mails as read, skipping ids the account did not receive.
    pub async fn mark_many_as_read(&self, mail_ids: &[String], account_id: i64) -> Result<u64> {
        self.repo().mark_read(mail_ids, account_id).await
    }

    /// Delete mails from the account's outbox, skipping ids it did not send.
    pub async fn delete_many_for_sender(&self, mail_ids: &[String], account_id: i64) -> Result<u64> {
        self.repo().delete_for_sender(mail_ids, account_id).await
    }

    /// Delete mails from the account's inbox, skipping ids it did not receive.
    pub async fn delete_many_for_recipient(
        &self,
        mail_ids: &[String],
        account_id: i64,
    ) -> Result<u64> {
        self.repo().delete_for_recipient(mail_ids, account_id).await
    }

    /// Delete one mail from the account's outbox.
    ///
    /// Returns `NotFound` if the account did not send the mail.
    pub async fn delete_for_sender(&self, mail_id: &str, account_id: i64) -> Result<()> {
        self.repo().delete_one_for_sender(mail_id, account_id).await
    }

    /// Delete one mail from the account's inbox.
    ///
    /// Returns `NotFound` if the account did not receive the mail.
    pub async fn delete_for_recipient(&self, mail_id: &str, account_id: i64) -> Result<()> {
        self.repo().delete_one_for_recipient(mail_id, account_id).await
    }

    /// Physically remove mails both parties have deleted.
    pub async fn purge_deleted(&self) -> Result<u64> {
        let purged = self.repo().purge_deleted().await?;
        if purged > 0 {
            info!("Purged {} mail(s) deleted by both parties", purged);
        }
        Ok(purged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::AccountRepository;
    use crate::attachment::DEFAULT_MAX_FILE_SIZE;
    use crate::blob::MemoryBlobStore;

    struct Fixture {
        db: Database,
        blobs: MemoryBlobStore,
        alice: i64,
        bob: i64,
        carol: i64,
    }

    impl Fixture {
        async fn new() -> Self {
            let db = Database::open_in_memory().await.unwrap();
            let repo = AccountRepository::new(db.pool());
            let mut ids = Vec::new();
            for name in ["alice", "bob", "carol"] {
                let address = Address::from_parts(name, DEFAULT_DOMAIN).unwrap();
                ids.push(repo.create(&address).await.unwrap().id);
            }
            Self {
                db,
                blobs: MemoryBlobStore::new(),
                alice: ids[0],
                bob: ids[1],
                carol: ids[2],
            }
        }

        fn service(&self) -> MailService<'_> {
            MailService::new(&self.db, &self.blobs)
        }
    }

    fn files(count: usize, size: usize) -> Vec<AttachmentFile> {
        (0..count)
            .map(|i| AttachmentFile::new(format!("file{i}.txt"), None, vec![b'x'; size]))
            .collect()
    }

    #[tokio::test]
    async fn test_send_plain_mail() {
        let f = Fixture::new().await;
        let service = f.service();

        let mail = service
            .send(SendMailRequest::new(f.alice, "bob@suimail", "Hi", "Hello"))
            .await
            .unwrap();

        assert_eq!(mail.sender_id, f.alice);
        assert_eq!(mail.recipient_id, f.bob);
        assert!(!mail.is_read_by_recipient);
        assert!(!mail.deleted_for_sender);
        assert!(!mail.deleted_for_recipient);
        assert!(mail.blob_reference.is_none());
        assert!(mail.digest.is_none());
        assert!(mail.parent_mail_id.is_none());

        assert_eq!(service.fetch_outbox(f.alice).await.unwrap()[0].id, mail.id);
        assert_eq!(service.fetch_inbox(f.bob).await.unwrap()[0].id, mail.id);
        assert_eq!(f.blobs.upload_count(), 0);
    }

    #[tokio::test]
    async fn test_send_with_attachments_uploads_once() {
        let f = Fixture::new().await;
        let service = f.service();

        let attachments = vec![
            AttachmentFile::new("notes.txt", None, b"some notes".to_vec()),
            AttachmentFile::new("pic.png", Some("image/png".into()), vec![1, 2, 3, 4]),
        ];
        let mail = service
            .send(
                SendMailRequest::new(f.alice, "bob@suimail", "Files", "Two files")
                    .with_attachments(attachments.clone())
                    .with_digest("  9mR4xY  "),
            )
            .await
            .unwrap();

        assert_eq!(f.blobs.upload_count(), 1);
        assert!(mail.blob_reference.is_some());
        assert_eq!(mail.attachments.len(), 2);
        assert_eq!(mail.attachments[1].filename, "pic.png");
        assert_eq!(mail.attachments[1].size, 4);
        assert_eq!(mail.digest.as_deref(), Some("9mR4xY"));

        let fetched = service.fetch_attachments(&mail.id, f.bob).await.unwrap();
        assert_eq!(fetched.len(), 2);
        assert_eq!(fetched[0].data, b"some notes");

        let second = service.fetch_attachment(&mail.id, f.alice, 1).await.unwrap();
        assert_eq!(second.filename, "pic.png");
        assert_eq!(second.data, vec![1, 2, 3, 4]);
        assert_eq!(second.content_type.as_deref(), Some("image/png"));

        let err = service.fetch_attachment(&mail.id, f.bob, 2).await.unwrap_err();
        assert!(matches!(err, SuimailError::NotFound(_)));
        let err = service.fetch_attachment(&mail.id, f.carol, 0).await.unwrap_err();
        assert!(matches!(err, SuimailError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_too_many_attachments_rejected_before_upload() {
        let f = Fixture::new().await;
        let err = f
            .service()
            .send(
                SendMailRequest::new(f.alice, "bob@suimail", "Hi", "Hello")
                    .with_attachments(files(6, 1)),
            )
            .await
            .unwrap_err();

        assert!(
            matches!(err, SuimailError::Validation(ref m) if m == "Attachments cannot exceed limit of 5 files")
        );
        assert_eq!(f.blobs.upload_count(), 0);
    }

    #[tokio::test]
    async fn test_count_violation_wins_over_size() {
        let f = Fixture::new().await;
        let err = f
            .service()
            .send(
                SendMailRequest::new(f.alice, "bob@suimail", "Hi", "Hello")
                    .with_attachments(files(6, DEFAULT_MAX_FILE_SIZE as usize)),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, SuimailError::Validation(ref m) if m.contains("limit of 5 files")));
    }

    #[tokio::test]
    async fn test_oversized_attachment_rejected() {
        let f = Fixture::new().await;
        let err = f
            .service()
            .send(
                SendMailRequest::new(f.alice, "bob@suimail", "Hi", "Hello")
                    .with_attachments(files(1, DEFAULT_MAX_FILE_SIZE as usize)),
            )
            .await
            .unwrap_err();

        assert!(
            matches!(err, SuimailError::Validation(ref m) if m == "Attachment size exceeds 300KB")
        );
        assert_eq!(f.blobs.upload_count(), 0);
    }

    #[tokio::test]
    async fn test_total_size_rejected() {
        let f = Fixture::new().await;
        let limits = AttachmentLimits {
            max_count: 5,
            max_file_size: 1024,
            max_total_size: 2048,
        };
        let err = f
            .service()
            .with_limits(limits)
            .send(
                SendMailRequest::new(f.alice, "bob@suimail", "Hi", "Hello")
                    .with_attachments(files(3, 1000)),
            )
            .await
            .unwrap_err();

        assert!(
            matches!(err, SuimailError::Validation(ref m) if m == "Total attachment size exceeds 2KB")
        );
        assert_eq!(f.blobs.upload_count(), 0);
    }

    #[tokio::test]
    async fn test_storage_failure_persists_nothing() {
        let f = Fixture::new().await;
        f.blobs.set_failing(true);

        let err = f
            .service()
            .send(
                SendMailRequest::new(f.alice, "bob@suimail", "Hi", "Hello")
                    .with_attachments(files(1, 10)),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, SuimailError::Storage(_)));
        assert_eq!(MailRepository::new(f.db.pool()).count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_send_validation() {
        let f = Fixture::new().await;
        let service = f.service();

        let cases = [
            SendMailRequest::new(f.alice, "bob@suimail", "   ", "Hello"),
            SendMailRequest::new(f.alice, "bob@suimail", "Hi", ""),
            SendMailRequest::new(f.alice, "bob@suimail", "x".repeat(201), "Hello"),
            SendMailRequest::new(f.alice, "bob@suimail", "Hi", "x".repeat(10001)),
            SendMailRequest::new(f.alice, "bob@elsewhere", "Hi", "Hello"),
            SendMailRequest::new(f.alice, "bob", "Hi", "Hello"),
            SendMailRequest::new(f.alice, "bob@suimail", "Hi", "Hello").with_digest("d".repeat(300)),
        ];
        for request in cases {
            let err = service.send(request).await.unwrap_err();
            assert!(matches!(err, SuimailError::Validation(_)), "{err}");
        }

        assert!(service
            .send(SendMailRequest::new(f.alice, "bob@suimail", "x".repeat(200), "Hello"))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_unknown_recipient() {
        let f = Fixture::new().await;
        let err = f
            .service()
            .send(SendMailRequest::new(f.alice, "nobody@suimail", "Hi", "Hello"))
            .await
            .unwrap_err();
        assert!(matches!(err, SuimailError::NotFound(ref m) if m == "recipient"));
    }

    #[tokio::test]
    async fn test_self_mail_allowed() {
        let f = Fixture::new().await;
        let mail = f
            .service()
            .send(SendMailRequest::new(f.alice, "alice@suimail", "Note", "To self"))
            .await
            .unwrap();
        assert_eq!(mail.sender_id, mail.recipient_id);
    }

    #[tokio::test]
    async fn test_reply_threading() {
        let f = Fixture::new().await;
        let service = f.service();

        let parent = service
            .send(SendMailRequest::new(f.alice, "bob@suimail", "Question", "?"))
            .await
            .unwrap();
        let reply = service
            .send(
                SendMailRequest::new(f.bob, "alice@suimail", "Re: Question", "!")
                    .with_parent(&parent.id),
            )
            .await
            .unwrap();
        assert_eq!(reply.parent_mail_id.as_deref(), Some(parent.id.as_str()));

        let replies = service.list_replies(&parent.id, f.alice).await.unwrap();
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].id, reply.id);

        // Carol is not party to the parent.
        let err = service
            .send(
                SendMailRequest::new(f.carol, "alice@suimail", "Re", "butting in")
                    .with_parent(&parent.id),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, SuimailError::Validation(ref m) if m == "parent mail not found"));

        let err = service.list_replies(&parent.id, f.carol).await.unwrap_err();
        assert!(matches!(err, SuimailError::NotFound(_)));

        let err = service
            .send(SendMailRequest::new(f.alice, "bob@suimail", "Re", "x").with_parent("missing"))
            .await
            .unwrap_err();
        assert!(matches!(err, SuimailError::Validation(_)));
    }

    #[tokio::test]
    async fn test_fetch_does_not_mark_read() {
        let f = Fixture::new().await;
        let service = f.service();

        let mail = service
            .send(SendMailRequest::new(f.alice, "bob@suimail", "Hi", "Hello"))
            .await
            .unwrap();
        let fetched = service.fetch_mail(&mail.id, f.bob).await.unwrap();
        assert!(!fetched.is_read_by_recipient);
        assert_eq!(service.count_unread(f.bob).await.unwrap(), 1);

        assert_eq!(
            service
                .mark_many_as_read(&[mail.id.clone()], f.bob)
                .await
                .unwrap(),
            1
        );
        assert_eq!(service.count_unread(f.bob).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_mark_many_as_read_mixed_ownership() {
        let f = Fixture::new().await;
        let service = f.service();

        let to_bob = service
            .send(SendMailRequest::new(f.alice, "bob@suimail", "1", "to bob"))
            .await
            .unwrap();
        let to_carol = service
            .send(SendMailRequest::new(f.alice, "carol@suimail", "2", "to carol"))
            .await
            .unwrap();

        let marked = service
            .mark_many_as_read(&[to_bob.id.clone(), to_carol.id.clone()], f.bob)
            .await
            .unwrap();
        assert_eq!(marked, 1);

        assert!(service.fetch_mail(&to_bob.id, f.bob).await.unwrap().is_read_by_recipient);
        assert!(!service
            .fetch_mail(&to_carol.id, f.carol)
            .await
            .unwrap()
            .is_read_by_recipient);
    }

    #[tokio::test]
    async fn test_dual_visibility_and_idempotent_delete() {
        let f = Fixture::new().await;
        let service = f.service();

        let mail = service
            .send(SendMailRequest::new(f.alice, "bob@suimail", "Hi", "Hello"))
            .await
            .unwrap();

        service.delete_for_recipient(&mail.id, f.bob).await.unwrap();
        service.delete_for_recipient(&mail.id, f.bob).await.unwrap();

        assert!(service.fetch_inbox(f.bob).await.unwrap().is_empty());
        assert_eq!(service.fetch_outbox(f.alice).await.unwrap().len(), 1);
        assert_eq!(
            service
                .mark_many_as_read(&[mail.id.clone()], f.bob)
                .await
                .unwrap(),
            0
        );

        let err = service.fetch_mail(&mail.id, f.bob).await.unwrap_err();
        assert!(matches!(err, SuimailError::NotFound(_)));
        assert!(service.fetch_mail(&mail.id, f.alice).await.is_ok());
    }

    #[tokio::test]
    async fn test_single_delete_wrong_role_rejected() {
        let f = Fixture::new().await;
        let service = f.service();

        let mail = service
            .send(SendMailRequest::new(f.alice, "bob@suimail", "Hi", "Hello"))
            .await
            .unwrap();

        let err = service.delete_for_sender(&mail.id, f.bob).await.unwrap_err();
        assert!(matches!(err, SuimailError::NotFound(_)));
        let err = service
            .delete_for_recipient(&mail.id, f.carol)
            .await
            .unwrap_err();
        assert!(matches!(err, SuimailError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_batch_delete_and_purge() {
        let f = Fixture::new().await;
        let service = f.service();

        let first = service
            .send(SendMailRequest::new(f.alice, "bob@suimail", "1", "one"))
            .await
            .unwrap();
        let second = service
            .send(SendMailRequest::new(f.alice, "bob@suimail", "2", "two"))
            .await
            .unwrap();
        let ids = vec![first.id.clone(), second.id.clone()];

        assert_eq!(service.delete_many_for_sender(&ids, f.alice).await.unwrap(), 2);
        assert_eq!(service.delete_many_for_sender(&ids, f.bob).await.unwrap(), 0);
        assert_eq!(service.purge_deleted().await.unwrap(), 0);

        assert_eq!(
            service
                .delete_many_for_recipient(&ids[..1], f.bob)
                .await
                .unwrap(),
            1
        );
        assert_eq!(service.purge_deleted().await.unwrap(), 1);
        assert_eq!(service.fetch_inbox(f.bob).await.unwrap().len(), 1);
    }
}
