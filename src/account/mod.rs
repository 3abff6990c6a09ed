//! Account module for Suimail.
//!
//! Accounts are identified by an integer id and carry a unique
//! `<username>@<domain>` address that other accounts send mail to.
//! New accounts get a generated address from [`AddressAllocator`]; the
//! owner may change it later.

mod allocator;
mod repository;
mod service;
mod types;

pub use allocator::{generate_username, AddressAllocator, UsernameGenerator, DEFAULT_MAX_ATTEMPTS};
pub use repository::AccountRepository;
pub use service::AccountService;
pub use types::{
    validate_username, Account, Address, AddressError, MAX_USERNAME_LENGTH, MIN_USERNAME_LENGTH,
};
