//! Suimail - mail backend for namespace addresses
//!
//! Accounts exchange mail addressed as `<name>@<domain>`. Sender and
//! recipient each see and delete their own copy of a mail, and attachments
//! travel as a single bundle in an external blob store.

pub mod account;
pub mod attachment;
pub mod blob;
pub mod config;
pub mod datetime;
pub mod db;
pub mod error;
pub mod logging;
pub mod mail;
pub mod web;

pub use account::{Account, AccountService, Address, AddressAllocator};
pub use blob::{BlobReference, BlobStore};
pub use config::Config;
pub use db::Database;
pub use error::{Result, SuimailError};
pub use mail::{Mail, MailService, SendMailRequest};
