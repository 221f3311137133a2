use serde::{Deserialize, Serialize};

use crate::application::{AppError, CreateAccountRequest};
use crate::domain::{
    Account, AccountChanges, AccountId, BalanceSummary, Cents, cents_from_units, cents_to_units,
    non_blank,
};

// -------------------------
// Request DTOs
// -------------------------

// Required fields are optional here so a missing field becomes a 400 with our
// own error body instead of the extractor's rejection.

#[derive(Debug, Default, Deserialize)]
pub struct CreateAccountBody {
    pub name: Option<String>,
    pub number: Option<String>,
    pub balance: Option<f64>,
    pub email: Option<String>,
}

impl CreateAccountBody {
    pub fn into_request(self) -> Result<CreateAccountRequest, AppError> {
        Ok(CreateAccountRequest {
            name: self.name.unwrap_or_default(),
            number: self.number.unwrap_or_default(),
            email: self.email.unwrap_or_default(),
            balance: self.balance.map(amount_to_cents).transpose()?,
        })
    }
}

/// Absent and `null` fields are left unchanged; `"balance": 0` is applied.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateAccountBody {
    pub name: Option<String>,
    pub number: Option<String>,
    pub balance: Option<f64>,
    pub email: Option<String>,
}

impl UpdateAccountBody {
    pub fn into_changes(self) -> Result<AccountChanges, AppError> {
        Ok(AccountChanges {
            name: self.name,
            number: self.number,
            email: self.email,
            balance: self.balance.map(amount_to_cents).transpose()?,
        })
    }
}

/// Body of deposit and withdraw requests.
#[derive(Debug, Default, Deserialize)]
pub struct MoneyBody {
    pub number: Option<String>,
    pub amount: Option<f64>,
}

impl MoneyBody {
    pub fn into_parts(self) -> Result<(String, Cents), AppError> {
        match (self.number.as_deref().and_then(non_blank), self.amount) {
            (Some(number), Some(amount)) => Ok((number.to_string(), amount_to_cents(amount)?)),
            _ => Err(AppError::Validation(
                "Account number and amount required".to_string(),
            )),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct TransferBody {
    pub sender: Option<String>,
    pub receiver: Option<String>,
    pub amount: Option<f64>,
}

impl TransferBody {
    pub fn into_parts(self) -> Result<(String, String, Cents), AppError> {
        let sender = self.sender.as_deref().and_then(non_blank);
        let receiver = self.receiver.as_deref().and_then(non_blank);
        match (sender, receiver, self.amount) {
            (Some(sender), Some(receiver), Some(amount)) => Ok((
                sender.to_string(),
                receiver.to_string(),
                amount_to_cents(amount)?,
            )),
            _ => Err(AppError::Validation(
                "Sender, receiver, and amount required".to_string(),
            )),
        }
    }
}

fn amount_to_cents(amount: f64) -> Result<Cents, AppError> {
    cents_from_units(amount).map_err(|err| AppError::InvalidAmount(err.to_string()))
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountView {
    pub id: AccountId,
    pub name: String,
    pub number: String,
    pub email: String,
    pub balance: f64,
}

impl From<&Account> for AccountView {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            name: account.name.clone(),
            number: account.number.clone(),
            email: account.email.clone(),
            balance: cents_to_units(account.balance),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryView {
    pub total_accounts: usize,
    pub total_balance: f64,
    pub average_balance: f64,
}

impl From<BalanceSummary> for SummaryView {
    fn from(summary: BalanceSummary) -> Self {
        Self {
            total_accounts: summary.total_accounts,
            total_balance: cents_to_units(summary.total_balance),
            average_balance: cents_to_units(summary.average_balance),
        }
    }
}
