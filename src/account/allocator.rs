//! Address allocation for new accounts.
//!
//! Candidates combine a time-derived part with a random part. A candidate
//! that is already taken is discarded and a new one generated, up to a
//! fixed number of attempts.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use rand::Rng;
use tracing::debug;

use super::repository::AccountRepository;
use super::types::Address;
use crate::config::AddressConfig;
use crate::{Result, SuimailError};

/// Characters used in generated usernames.
const BASE36_CHARS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Number of trailing timestamp digits kept in a candidate.
const TIME_PART_LENGTH: usize = 4;

/// Number of random characters in a candidate.
const RANDOM_PART_LENGTH: usize = 4;

/// Default number of attempts before giving up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// Produces candidate usernames.
pub type UsernameGenerator = Arc<dyn Fn() -> String + Send + Sync>;

/// Encode a number in lower-case base 36.
fn to_base36(mut n: u64) -> String {
    if n == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while n > 0 {
        digits.push(BASE36_CHARS[(n % 36) as usize]);
        n /= 36;
    }
    digits.reverse();
    String::from_utf8_lossy(&digits).into_owned()
}

/// Generate a candidate username: the last four base-36 digits of the
/// current millisecond timestamp followed by four random base-36 characters.
pub fn generate_username() -> String {
    let millis = Utc::now().timestamp_millis().unsigned_abs();
    let time = to_base36(millis);
    let time_part = &time[time.len().saturating_sub(TIME_PART_LENGTH)..];

    let mut rng = rand::rng();
    let random_part: String = (0..RANDOM_PART_LENGTH)
        .map(|_| {
            let idx = rng.random_range(0..BASE36_CHARS.len());
            BASE36_CHARS[idx] as char
        })
        .collect();

    format!("{time_part}{random_part}")
}

/// Allocates unused addresses.
#[derive(Clone)]
pub struct AddressAllocator {
    domain: String,
    max_attempts: u32,
    generator: UsernameGenerator,
}

impl AddressAllocator {
    /// Create an allocator with the default candidate generator.
    pub fn new(domain: impl Into<String>, max_attempts: u32) -> Self {
        Self {
            domain: domain.into(),
            max_attempts: max_attempts.max(1),
            generator: Arc::new(generate_username),
        }
    }

    /// Create an allocator from configuration.
    pub fn from_config(config: &AddressConfig) -> Self {
        Self::new(config.domain.clone(), config.max_attempts)
    }

    /// Replace the candidate generator.
    pub fn with_generator<F>(mut self, generator: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        self.generator = Arc::new(generator);
        self
    }

    /// The domain suffix of allocated addresses.
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Maximum number of candidates tried per allocation.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Produce one candidate address.
    pub fn candidate(&self) -> Result<Address> {
        let username = (self.generator)();
        Ok(Address::from_parts(&username, &self.domain)?)
    }

    /// Find an address not held by any account.
    ///
    /// The result is not reserved; a concurrent allocation can pick the same
    /// address, in which case the later insert fails with `Conflict`.
    pub async fn allocate(&self, repo: &AccountRepository<'_>) -> Result<Address> {
        for attempt in 1..=self.max_attempts {
            let address = self.candidate()?;
            if !repo.address_exists(address.as_str()).await? {
                return Ok(address);
            }
            debug!(
                "Address {} taken (attempt {}/{})",
                address, attempt, self.max_attempts
            );
        }

        Err(SuimailError::Conflict(format!(
            "could not allocate a unique address after {} attempts",
            self.max_attempts
        )))
    }
}

impl fmt::Debug for AddressAllocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AddressAllocator")
            .field("domain", &self.domain)
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}
