//! Account service for Suimail.

use tracing::{info, warn};

use super::allocator::AddressAllocator;
use super::repository::AccountRepository;
use super::types::{Account, Address};
use crate::db::Database;
use crate::{Result, SuimailError};

/// Account service for provisioning and address management.
pub struct AccountService<'a> {
    db: &'a Database,
    allocator: &'a AddressAllocator,
}

impl<'a> AccountService<'a> {
    /// Create a new AccountService.
    pub fn new(db: &'a Database, allocator: &'a AddressAllocator) -> Self {
        Self { db, allocator }
    }

    /// Create an account with a freshly allocated address.
    ///
    /// Two concurrent provisions may be handed the same candidate; the loser's
    /// insert fails on the unique index and it allocates again.
    pub async fn provision(&self) -> Result<Account> {
        let repo = AccountRepository::new(self.db.pool());
        let max_attempts = self.allocator.max_attempts();

        for attempt in 1..=max_attempts {
            let address = self.allocator.allocate(&repo).await?;
            match repo.create(&address).await {
                Ok(account) => {
                    info!("Provisioned account {} ({})", account.id, account.address);
                    return Ok(account);
                }
                Err(SuimailError::Conflict(_)) => {
                    warn!(
                        "Address {} claimed concurrently (attempt {}/{})",
                        address, attempt, max_attempts
                    );
                }
                Err(e) => return Err(e),
            }
        }

        Err(SuimailError::Conflict(format!(
            "could not provision an account after {max_attempts} attempts"
        )))
    }

    /// Get an account by ID.
    pub async fn get(&self, id: i64) -> Result<Account> {
        AccountRepository::new(self.db.pool())
            .get_by_id(id)
            .await?
            .ok_or_else(|| SuimailError::NotFound("account".into()))
    }

    /// Resolve an address to its account.
    pub async fn resolve_address(&self, address: &str) -> Result<Account> {
        let address = Address::parse(address.trim(), self.allocator.domain())?;
        AccountRepository::new(self.db.pool())
            .get_by_address(address.as_str())
            .await?
            .ok_or_else(|| SuimailError::NotFound("recipient".into()))
    }

    /// Change an account's address.
    ///
    /// Accepts a full address or a bare username on the service domain.
    pub async fn change_address(&self, id: i64, new_address: &str) -> Result<Account> {
        let new_address = new_address.trim();
        let domain = self.allocator.domain();
        let address = if new_address.contains('@') {
            Address::parse(new_address, domain)?
        } else {
            Address::from_parts(new_address, domain)?
        };
        let repo = AccountRepository::new(self.db.pool());

        if let Some(holder) = repo.get_by_address(address.as_str()).await? {
            if holder.id == id {
                return Ok(holder);
            }
            return Err(SuimailError::Validation("address is already taken".into()));
        }

        match repo.update_address(id, &address).await {
            Ok(Some(account)) => {
                info!("Account {} changed address to {}", id, account.address);
                Ok(account)
            }
            Ok(None) => Err(SuimailError::NotFound("account".into())),
            Err(SuimailError::Conflict(_)) => {
                Err(SuimailError::Validation("address is already taken".into()))
            }
            Err(e) => Err(e),
        }
    }
}
