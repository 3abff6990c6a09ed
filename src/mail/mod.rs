//! Mail module for Suimail.
//!
//! This module provides mail functionality:
//! - Sending mail with an attachment bundle stored in the blob store
//! - Independent inbox/outbox views for sender and recipient
//! - Read marking, per-party deletion and reply threads
//! - Periodic purge of mails both parties have deleted

mod purge;
mod repository;
mod service;
mod types;

pub use purge::{PurgeTask, DEFAULT_PURGE_INTERVAL_SECS};
pub use repository::MailRepository;
pub use service::{MailService, SendMailRequest, DEFAULT_DOMAIN};
pub use types::{
    Mail, MailRole, NewMail, MAX_BODY_LENGTH, MAX_DIGEST_LENGTH, MAX_SUBJECT_LENGTH,
};
