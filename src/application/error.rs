use thiserror::Error;

use crate::domain::Cents;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("Account number already exists: {0}")]
    DuplicateAccountNumber(String),

    #[error("Insufficient balance in account {number}")]
    InsufficientFunds {
        number: String,
        balance: Cents,
        required: Cents,
    },

    #[error("Invalid sender or receiver account number: {0}")]
    InvalidTransfer(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("{0}")]
    Validation(String),

    #[error("Internal failure: {0:#}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// True for errors caused by the caller's input rather than by the system.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, AppError::Internal(_))
    }
}
