//! Database schema and migrations for Suimail.
//!
//! Migrations are applied sequentially when the database is first opened
//! or upgraded.

/// Database migrations.
///
/// Each migration is a SQL script that will be executed in order.
/// The schema_version table tracks which migrations have been applied.
pub const MIGRATIONS: &[&str] = &[
    // v1: Accounts and their namespace addresses
    r#"
CREATE TABLE accounts (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    address     TEXT NOT NULL UNIQUE COLLATE NOCASE,
    created_at  TEXT NOT NULL
);
"#,
    // v2: Mails with dual-party visibility
    r#"
CREATE TABLE mails (
    seq                     INTEGER PRIMARY KEY AUTOINCREMENT,
    id                      TEXT NOT NULL UNIQUE,       -- UUID v4
    sender_id               INTEGER NOT NULL REFERENCES accounts(id),
    recipient_id            INTEGER NOT NULL REFERENCES accounts(id),
    subject                 TEXT NOT NULL,
    body                    TEXT NOT NULL,
    blob_reference          TEXT,                       -- NULL when there are no attachments
    attachments             TEXT NOT NULL DEFAULT '[]', -- JSON array of descriptors
    digest                  TEXT,
    parent_mail_id          TEXT,
    is_read_by_recipient    INTEGER NOT NULL DEFAULT 0,
    deleted_for_sender      INTEGER NOT NULL DEFAULT 0,
    deleted_for_recipient   INTEGER NOT NULL DEFAULT 0,
    created_at              TEXT NOT NULL,
    CHECK (parent_mail_id IS NULL OR parent_mail_id <> id)
);

CREATE INDEX idx_mails_inbox ON mails(recipient_id, deleted_for_recipient);
CREATE INDEX idx_mails_outbox ON mails(sender_id, deleted_for_sender);
CREATE INDEX idx_mails_parent ON mails(parent_mail_id);
CREATE INDEX idx_mails_created_at ON mails(created_at);
"#,
];
