mod repository;

pub use repository::*;

/// SQL migration for the accounts table
pub const MIGRATION_001_ACCOUNTS: &str = include_str!("migrations/001_accounts.sql");

/// Returns true if `err` was caused by a UNIQUE constraint violation in the database.
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<sqlx::Error>()
            .and_then(|e| e.as_database_error())
            .is_some_and(|db_err| db_err.is_unique_violation())
    })
}
