//! Account repository for Suimail.

use super::types::{Account, Address};
use crate::datetime;
use crate::db::DbPool;
use crate::{Result, SuimailError};

/// Row type for account from database.
#[derive(Debug, Clone, sqlx::FromRow)]
struct AccountRow {
    id: i64,
    address: String,
    created_at: String,
}

impl From<AccountRow> for Account {
    fn from(row: AccountRow) -> Self {
        Account {
            id: row.id,
            address: row.address,
            created_at: datetime::parse_or_now(&row.created_at),
        }
    }
}

/// Repository for account operations.
pub struct AccountRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> AccountRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Create a new account.
    ///
    /// Fails with `Conflict` when the address is already taken.
    pub async fn create(&self, address: &Address) -> Result<Account> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO accounts (address, created_at) VALUES (?, ?) RETURNING id",
        )
        .bind(address.as_str())
        .bind(datetime::now_storage())
        .fetch_one(self.pool)
        .await?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| SuimailError::NotFound("account".into()))
    }

    /// Get an account by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Account>> {
        let row = sqlx::query_as::<_, AccountRow>(
            "SELECT id, address, created_at FROM accounts WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| SuimailError::Database(e.to_string()))?;

        Ok(row.map(Account::from))
    }

    /// Get an account by address (case-insensitive).
    pub async fn get_by_address(&self, address: &str) -> Result<Option<Account>> {
        let row = sqlx::query_as::<_, AccountRow>(
            "SELECT id, address, created_at FROM accounts WHERE address = ?",
        )
        .bind(address)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| SuimailError::Database(e.to_string()))?;

        Ok(row.map(Account::from))
    }

    /// Check whether an address is already taken.
    pub async fn address_exists(&self, address: &str) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM accounts WHERE address = ?)")
                .bind(address)
                .fetch_one(self.pool)
                .await
                .map_err(|e| SuimailError::Database(e.to_string()))?;
        Ok(exists)
    }

    /// Change an account's address.
    ///
    /// Returns `None` if the account does not exist; fails with `Conflict`
    /// when another account holds the address.
    pub async fn update_address(&self, id: i64, address: &Address) -> Result<Option<Account>> {
        let result = sqlx::query("UPDATE accounts SET address = ? WHERE id = ?")
            .bind(address.as_str())
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_by_id(id).await
    }

    /// Count all accounts.
    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM accounts")
            .fetch_one(self.pool)
            .await
            .map_err(|e| SuimailError::Database(e.to_string()))?;
        Ok(count)
    }
}
