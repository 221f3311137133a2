use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};

use crate::domain::{Account, AccountId, Cents, NewAccount};

use super::MIGRATION_001_ACCOUNTS;

/// How long a writer waits for SQLite's write lock before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const MAX_CONNECTIONS: u32 = 8;

/// Result of moving money between two accounts inside one transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    Completed { sender: Account, receiver: Account },
    InsufficientFunds { balance: Cents },
    /// Crediting the receiver would take its balance past `Cents::MAX`.
    ReceiverBalanceLimit { balance: Cents },
    SenderMissing,
    ReceiverMissing,
}

/// Repository for persisting and querying accounts.
///
/// Cloning is cheap: clones share the same connection pool.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database URL.
    /// Use `?mode=rwc` in the URL to create the file if it doesn't exist.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .context("Invalid database URL")?
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_with(options)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_ACCOUNTS)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Initialize a database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    // ========================
    // Account lookups
    // ========================

    /// Get an account by its surrogate ID.
    pub async fn get_account(&self, id: AccountId) -> Result<Option<Account>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, number, email, balance_cents, created_at, updated_at
            FROM accounts
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch account")?;

        row.as_ref().map(Self::row_to_account).transpose()
    }

    /// Get an account by its external account number.
    pub async fn find_by_number(&self, number: &str) -> Result<Option<Account>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, number, email, balance_cents, created_at, updated_at
            FROM accounts
            WHERE number = ?
            "#,
        )
        .bind(number)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch account by number")?;

        row.as_ref().map(Self::row_to_account).transpose()
    }

    /// List all accounts ordered by ID. The result is a snapshot taken at call time.
    pub async fn list_accounts(&self) -> Result<Vec<Account>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, number, email, balance_cents, created_at, updated_at
            FROM accounts
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list accounts")?;

        rows.iter().map(Self::row_to_account).collect()
    }

    pub async fn count_accounts(&self) -> Result<i64> {
        let count: i64 = sqlx::query("SELECT COUNT(*) as count FROM accounts")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count accounts")?
            .try_get("count")
            .context("Invalid account count")?;
        Ok(count)
    }

    // ========================
    // Account writes
    // ========================

    /// Insert a new account and return it with its assigned ID.
    /// Fails with a unique violation (see [`super::is_unique_violation`]) if the number is taken.
    pub async fn insert_account(&self, account: &NewAccount) -> Result<Account> {
        let now = Utc::now().to_rfc3339();
        let row = sqlx::query(
            r#"
            INSERT INTO accounts (name, number, email, balance_cents, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING id, name, number, email, balance_cents, created_at, updated_at
            "#,
        )
        .bind(&account.name)
        .bind(&account.number)
        .bind(&account.email)
        .bind(account.balance)
        .bind(&now)
        .bind(&now)
        .fetch_one(&self.pool)
        .await
        .context("Failed to insert account")?;

        Self::row_to_account(&row)
    }

    /// Replace the mutable fields of an existing account.
    /// Returns `None` if no account has the given ID.
    pub async fn update_account(&self, account: &Account) -> Result<Option<Account>> {
        let row = sqlx::query(
            r#"
            UPDATE accounts
            SET name = ?, number = ?, email = ?, balance_cents = ?, updated_at = ?
            WHERE id = ?
            RETURNING id, name, number, email, balance_cents, created_at, updated_at
            "#,
        )
        .bind(&account.name)
        .bind(&account.number)
        .bind(&account.email)
        .bind(account.balance)
        .bind(Utc::now().to_rfc3339())
        .bind(account.id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to update account")?;

        row.as_ref().map(Self::row_to_account).transpose()
    }

    /// Hard-delete an account. Returns true if a row was removed.
    pub async fn delete_account(&self, id: AccountId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM accounts WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete account")?;
        Ok(result.rows_affected() > 0)
    }

    /// Add `delta` (negative for a debit) to an account balance in one statement.
    /// Returns `None` if the account doesn't exist or the balance would leave
    /// `0..=Cents::MAX`.
    pub async fn adjust_balance(&self, id: AccountId, delta: Cents) -> Result<Option<Account>> {
        // SQLite turns an overflowing integer sum into a REAL, so both bounds are
        // checked without computing `balance_cents + delta`
        let row = sqlx::query(
            r#"
            UPDATE accounts
            SET balance_cents = balance_cents + ?, updated_at = ?
            WHERE id = ?
              AND CASE WHEN ? >= 0
                       THEN balance_cents <= ? - ?
                       ELSE balance_cents >= -?
                  END
            RETURNING id, name, number, email, balance_cents, created_at, updated_at
            "#,
        )
        .bind(delta)
        .bind(Utc::now().to_rfc3339())
        .bind(id)
        .bind(delta)
        .bind(Cents::MAX)
        .bind(delta)
        .bind(delta)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to adjust balance")?;

        row.as_ref().map(Self::row_to_account).transpose()
    }

    /// Debit `sender_id` and credit `receiver_id` in a single transaction.
    /// Nothing is written unless both legs succeed.
    pub async fn transfer_funds(
        &self,
        sender_id: AccountId,
        receiver_id: AccountId,
        amount: Cents,
    ) -> Result<TransferOutcome> {
        let now = Utc::now().to_rfc3339();
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transfer transaction")?;

        // The debit is the first statement so the transaction takes the write lock up front
        let debited = sqlx::query(
            r#"
            UPDATE accounts
            SET balance_cents = balance_cents - ?, updated_at = ?
            WHERE id = ? AND balance_cents >= ?
            RETURNING id, name, number, email, balance_cents, created_at, updated_at
            "#,
        )
        .bind(amount)
        .bind(&now)
        .bind(sender_id)
        .bind(amount)
        .fetch_optional(&mut *tx)
        .await
        .context("Failed to debit sender")?;

        let sender = match debited {
            Some(row) => Self::row_to_account(&row)?,
            None => {
                let balance: Option<Cents> =
                    sqlx::query_scalar("SELECT balance_cents FROM accounts WHERE id = ?")
                        .bind(sender_id)
                        .fetch_optional(&mut *tx)
                        .await
                        .context("Failed to read sender balance")?;
                tx.rollback().await.context("Failed to roll back transfer")?;
                return Ok(match balance {
                    Some(balance) => TransferOutcome::InsufficientFunds { balance },
                    None => TransferOutcome::SenderMissing,
                });
            }
        };

        let credited = sqlx::query(
            r#"
            UPDATE accounts
            SET balance_cents = balance_cents + ?, updated_at = ?
            WHERE id = ? AND balance_cents <= ? - ?
            RETURNING id, name, number, email, balance_cents, created_at, updated_at
            "#,
        )
        .bind(amount)
        .bind(&now)
        .bind(receiver_id)
        .bind(Cents::MAX)
        .bind(amount)
        .fetch_optional(&mut *tx)
        .await
        .context("Failed to credit receiver")?;

        let receiver = match credited {
            Some(row) => Self::row_to_account(&row)?,
            None => {
                let balance: Option<Cents> =
                    sqlx::query_scalar("SELECT balance_cents FROM accounts WHERE id = ?")
                        .bind(receiver_id)
                        .fetch_optional(&mut *tx)
                        .await
                        .context("Failed to read receiver balance")?;
                // Undoes the debit above
                tx.rollback().await.context("Failed to roll back transfer")?;
                return Ok(match balance {
                    Some(balance) => TransferOutcome::ReceiverBalanceLimit { balance },
                    None => TransferOutcome::ReceiverMissing,
                });
            }
        };

        tx.commit().await.context("Failed to commit transfer")?;

        Ok(TransferOutcome::Completed { sender, receiver })
    }

    fn row_to_account(row: &SqliteRow) -> Result<Account> {
        let created_at_str: String = row.try_get("created_at").context("Invalid created_at")?;
        let updated_at_str: String = row.try_get("updated_at").context("Invalid updated_at")?;

        Ok(Account {
            id: row.try_get("id").context("Invalid account id")?,
            name: row.try_get("name").context("Invalid account name")?,
            number: row.try_get("number").context("Invalid account number")?,
            email: row.try_get("email").context("Invalid account email")?,
            balance: row
                .try_get("balance_cents")
                .context("Stored balance is not a whole number of cents")?,
            created_at: DateTime::parse_from_rfc3339(&created_at_str)
                .context("Invalid created_at timestamp")?
                .with_timezone(&Utc),
            updated_at: DateTime::parse_from_rfc3339(&updated_at_str)
                .context("Invalid updated_at timestamp")?
                .with_timezone(&Utc),
        })
    }
}
