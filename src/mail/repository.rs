//! Mail repository for Suimail.
//!
//! Visibility is decided per role: a mail is visible to its sender until
//! `deleted_for_sender` is set and to its recipient until
//! `deleted_for_recipient` is set. Batch mutations silently skip ids the
//! caller does not hold in the relevant role; single-id deletions report
//! them as not found.

use sqlx::{QueryBuilder, Sqlite};
use tracing::debug;

use super::types::{Mail, MailRole, NewMail};
use crate::attachment::AttachmentDescriptor;
use crate::blob::BlobReference;
use crate::datetime;
use crate::db::DbPool;
use crate::{Result, SuimailError};

const MAIL_COLUMNS: &str = "id, sender_id, recipient_id, subject, body, blob_reference, \
     attachments, digest, parent_mail_id, is_read_by_recipient, deleted_for_sender, \
     deleted_for_recipient, created_at";

/// Row type for mail from database.
#[derive(Debug, Clone, sqlx::FromRow)]
struct MailRow {
    id: String,
    sender_id: i64,
    recipient_id: i64,
    subject: String,
    body: String,
    blob_reference: Option<String>,
    attachments: String,
    digest: Option<String>,
    parent_mail_id: Option<String>,
    is_read_by_recipient: bool,
    deleted_for_sender: bool,
    deleted_for_recipient: bool,
    created_at: String,
}

impl MailRow {
    fn into_mail(self) -> Result<Mail> {
        let attachments: Vec<AttachmentDescriptor> = serde_json::from_str(&self.attachments)
            .map_err(|e| {
                SuimailError::Database(format!("corrupt attachments for mail {}: {e}", self.id))
            })?;

        Ok(Mail {
            id: self.id,
            sender_id: self.sender_id,
            recipient_id: self.recipient_id,
            subject: self.subject,
            body: self.body,
            blob_reference: self.blob_reference.map(BlobReference::new),
            attachments,
            digest: self.digest,
            parent_mail_id: self.parent_mail_id,
            is_read_by_recipient: self.is_read_by_recipient,
            deleted_for_sender: self.deleted_for_sender,
            deleted_for_recipient: self.deleted_for_recipient,
            created_at: datetime::parse_or_now(&self.created_at),
        })
    }
}

fn into_mails(rows: Vec<MailRow>) -> Result<Vec<Mail>> {
    rows.into_iter().map(MailRow::into_mail).collect()
}

/// Repository for mail operations.
pub struct MailRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> MailRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Insert a new mail.
    ///
    /// Fails with `Conflict` if a mail with the same ID exists, and with
    /// `Validation` if the blob reference and descriptors disagree.
    pub async fn insert(&self, mail: &NewMail) -> Result<Mail> {
        if mail.blob_reference.is_some() == mail.attachments.is_empty() {
            return Err(SuimailError::Validation(
                "blob reference must be present exactly when attachments are".into(),
            ));
        }
        if mail.parent_mail_id.as_deref() == Some(mail.id.as_str()) {
            return Err(SuimailError::Validation("mail cannot reply to itself".into()));
        }

        let attachments = serde_json::to_string(&mail.attachments)
            .map_err(|e| SuimailError::Database(format!("failed to encode attachments: {e}")))?;

        sqlx::query(
            r#"
            INSERT INTO mails (id, sender_id, recipient_id, subject, body, blob_reference,
                               attachments, digest, parent_mail_id, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&mail.id)
        .bind(mail.sender_id)
        .bind(mail.recipient_id)
        .bind(&mail.subject)
        .bind(&mail.body)
        .bind(mail.blob_reference.as_ref().map(BlobReference::as_str))
        .bind(attachments)
        .bind(&mail.digest)
        .bind(&mail.parent_mail_id)
        .bind(datetime::now_storage())
        .execute(self.pool)
        .await?;

        debug!("Inserted mail {}", mail.id);

        self.get_by_id(&mail.id)
            .await?
            .ok_or_else(|| SuimailError::NotFound("mail".into()))
    }

    /// Get a mail by ID regardless of visibility.
    pub async fn get_by_id(&self, id: &str) -> Result<Option<Mail>> {
        let row = sqlx::query_as::<_, MailRow>(&format!(
            "SELECT {MAIL_COLUMNS} FROM mails WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| SuimailError::Database(e.to_string()))?;

        row.map(MailRow::into_mail).transpose()
    }

    /// Get a mail visible to the given account.
    ///
    /// A missing mail, a mail the account is not party to and a mail the
    /// account has deleted all yield the same `NotFound`.
    pub async fn find_visible(&self, id: &str, account_id: i64) -> Result<Mail> {
        let row = sqlx::query_as::<_, MailRow>(&format!(
            r#"
            SELECT {MAIL_COLUMNS} FROM mails
            WHERE id = ?
              AND ((sender_id = ? AND deleted_for_sender = 0)
                OR (recipient_id = ? AND deleted_for_recipient = 0))
            "#
        ))
        .bind(id)
        .bind(account_id)
        .bind(account_id)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| SuimailError::Database(e.to_string()))?;

        row.ok_or_else(|| SuimailError::NotFound("mail".into()))?
            .into_mail()
    }

    /// List mails received by an account, newest first.
    pub async fn list_inbox(&self, account_id: i64) -> Result<Vec<Mail>> {
        let rows = sqlx::query_as::<_, MailRow>(&format!(
            r#"
            SELECT {MAIL_COLUMNS} FROM mails
            WHERE recipient_id = ? AND deleted_for_recipient = 0
            ORDER BY created_at DESC, seq DESC
            "#
        ))
        .bind(account_id)
        .fetch_all(self.pool)
        .await
        .map_err(|e| SuimailError::Database(e.to_string()))?;

        into_mails(rows)
    }

    /// List mails sent by an account, newest first.
    pub async fn list_outbox(&self, account_id: i64) -> Result<Vec<Mail>> {
        let rows = sqlx::query_as::<_, MailRow>(&format!(
            r#"
            SELECT {MAIL_COLUMNS} FROM mails
            WHERE sender_id = ? AND deleted_for_sender = 0
            ORDER BY created_at DESC, seq DESC
            "#
        ))
        .bind(account_id)
        .fetch_all(self.pool)
        .await
        .map_err(|e| SuimailError::Database(e.to_string()))?;

        into_mails(rows)
    }

    /// List replies to a mail that are visible to an account, newest first.
    pub async fn list_replies(&self, parent_id: &str, account_id: i64) -> Result<Vec<Mail>> {
        let rows = sqlx::query_as::<_, MailRow>(&format!(
            r#"
            SELECT {MAIL_COLUMNS} FROM mails
            WHERE parent_mail_id = ?
              AND ((sender_id = ? AND deleted_for_sender = 0)
                OR (recipient_id = ? AND deleted_for_recipient = 0))
            ORDER BY created_at DESC, seq DESC
            "#
        ))
        .bind(parent_id)
        .bind(account_id)
        .bind(account_id)
        .fetch_all(self.pool)
        .await
        .map_err(|e| SuimailError::Database(e.to_string()))?;

        into_mails(rows)
    }

    /// Count unread mails in an account's inbox.
    pub async fn count_unread(&self, account_id: i64) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM mails
            WHERE recipient_id = ? AND deleted_for_recipient = 0 AND is_read_by_recipient = 0
            "#,
        )
        .bind(account_id)
        .fetch_one(self.pool)
        .await
        .map_err(|e| SuimailError::Database(e.to_string()))?;
        Ok(count)
    }

    /// Mark mails as read by their recipient.
    ///
    /// Only ids the account received (and has not deleted) are touched; the
    /// rest are skipped. Returns the number of mails newly marked read.
    pub async fn mark_read(&self, ids: &[String], account_id: i64) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let mut query = QueryBuilder::<Sqlite>::new(
            "UPDATE mails SET is_read_by_recipient = 1 \
             WHERE is_read_by_recipient = 0 AND deleted_for_recipient = 0 AND recipient_id = ",
        );
        query.push_bind(account_id);
        push_id_list(&mut query, ids);

        let result = query
            .build()
            .execute(self.pool)
            .await
            .map_err(|e| SuimailError::Database(e.to_string()))?;

        debug!(
            "Account {} marked {} of {} mail(s) read",
            account_id,
            result.rows_affected(),
            ids.len()
        );
        Ok(result.rows_affected())
    }

    /// Soft-delete mails for their sender, skipping ids the account did not send.
    pub async fn delete_for_sender(&self, ids: &[String], account_id: i64) -> Result<u64> {
        self.delete_many(ids, account_id, MailRole::Sender).await
    }

    /// Soft-delete mails for their recipient, skipping ids the account did not receive.
    pub async fn delete_for_recipient(&self, ids: &[String], account_id: i64) -> Result<u64> {
        self.delete_many(ids, account_id, MailRole::Recipient).await
    }

    async fn delete_many(&self, ids: &[String], account_id: i64, role: MailRole) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let (flag, owner) = role_columns(role);
        let mut query = QueryBuilder::<Sqlite>::new(format!(
            "UPDATE mails SET {flag} = 1 WHERE {flag} = 0 AND {owner} = "
        ));
        query.push_bind(account_id);
        push_id_list(&mut query, ids);

        let result = query
            .build()
            .execute(self.pool)
            .await
            .map_err(|e| SuimailError::Database(e.to_string()))?;

        debug!(
            "Account {} deleted {} of {} mail(s) as {:?}",
            account_id,
            result.rows_affected(),
            ids.len(),
            role
        );
        Ok(result.rows_affected())
    }

    /// Soft-delete one mail for its sender.
    pub async fn delete_one_for_sender(&self, id: &str, account_id: i64) -> Result<()> {
        self.delete_one(id, account_id, MailRole::Sender).await
    }

    /// Soft-delete one mail for its recipient.
    pub async fn delete_one_for_recipient(&self, id: &str, account_id: i64) -> Result<()> {
        self.delete_one(id, account_id, MailRole::Recipient).await
    }

    /// Soft-delete one mail in the given role.
    ///
    /// Fails with `NotFound` when the account does not hold that role on the
    /// mail. Deleting an already deleted mail succeeds: SQLite counts rows
    /// matched by the WHERE clause, not rows whose value changed.
    pub async fn delete_one(&self, id: &str, account_id: i64, role: MailRole) -> Result<()> {
        let (flag, owner) = role_columns(role);
        let result = sqlx::query(&format!(
            "UPDATE mails SET {flag} = 1 WHERE id = ? AND {owner} = ?"
        ))
        .bind(id)
        .bind(account_id)
        .execute(self.pool)
        .await
        .map_err(|e| SuimailError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(SuimailError::NotFound("mail".into()));
        }
        Ok(())
    }

    /// Physically remove mails deleted by both parties.
    pub async fn purge_deleted(&self) -> Result<u64> {
        let result =
            sqlx::query("DELETE FROM mails WHERE deleted_for_sender = 1 AND deleted_for_recipient = 1")
                .execute(self.pool)
                .await
                .map_err(|e| SuimailError::Database(e.to_string()))?;
        Ok(result.rows_affected())
    }

    /// Count all stored mails.
    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM mails")
            .fetch_one(self.pool)
            .await
            .map_err(|e| SuimailError::Database(e.to_string()))?;
        Ok(count)
    }
}

fn role_columns(role: MailRole) -> (&'static str, &'static str) {
    match role {
        MailRole::Sender => ("deleted_for_sender", "sender_id"),
        MailRole::Recipient => ("deleted_for_recipient", "recipient_id"),
    }
}

fn push_id_list(query: &mut QueryBuilder<'_, Sqlite>, ids: &[String]) {
    query.push(" AND id IN (");
    let mut separated = query.separated(", ");
    for id in ids {
        separated.push_bind(id.clone());
    }
    separated.push_unseparated(")");
}
