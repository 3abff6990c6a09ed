//! API handlers for the mail service.

pub mod account;
pub mod mail;

pub use account::*;
pub use mail::*;
