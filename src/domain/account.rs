use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Cents;

pub type AccountId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub name: String,
    pub number: String,
    pub email: String,
    pub balance: Cents,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    pub fn can_cover(&self, amount: Cents) -> bool {
        self.balance >= amount
    }
}

/// A validated account that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    pub name: String,
    pub number: String,
    pub email: String,
    pub balance: Cents,
}

impl NewAccount {
    pub fn new(name: impl Into<String>, number: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            number: number.into(),
            email: email.into(),
            balance: 0,
        }
    }

    pub fn with_balance(mut self, balance: Cents) -> Self {
        self.balance = balance;
        self
    }
}

/// Partial update of an account. `None` leaves the field untouched,
/// so `balance: Some(0)` is an explicit reset to zero.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountChanges {
    pub name: Option<String>,
    pub number: Option<String>,
    pub email: Option<String>,
    pub balance: Option<Cents>,
}

impl AccountChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.number.is_none() && self.email.is_none() && self.balance.is_none()
    }

    /// Returns true if applying these changes would give the account a different number.
    pub fn renumbers(&self, account: &Account) -> bool {
        self.number
            .as_deref()
            .is_some_and(|number| number != account.number)
    }

    /// Overwrite the supplied fields on `account`.
    pub fn apply_to(self, account: &mut Account) {
        if let Some(name) = self.name {
            account.name = name;
        }
        if let Some(number) = self.number {
            account.number = number;
        }
        if let Some(email) = self.email {
            account.email = email;
        }
        if let Some(balance) = self.balance {
            account.balance = balance;
        }
    }
}

/// Returns the trimmed value, or `None` if nothing but whitespace was supplied.
pub fn non_blank(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_account() -> Account {
        let now = Utc::now();
        Account {
            id: 1,
            name: "Asha".into(),
            number: "10001".into(),
            email: "asha@example.com".into(),
            balance: 200000,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_explicit_zero_balance_is_applied() {
        let mut account = sample_account();
        let changes = AccountChanges {
            balance: Some(0),
            ..Default::default()
        };
        changes.apply_to(&mut account);
        assert_eq!(account.balance, 0);
        assert_eq!(account.name, "Asha");
    }

    #[test]
    fn test_absent_fields_are_untouched() {
        let mut account = sample_account();
        let changes = AccountChanges {
            name: Some("Asha K".into()),
            ..Default::default()
        };
        assert!(!changes.is_empty());
        changes.apply_to(&mut account);
        assert_eq!(account.name, "Asha K");
        assert_eq!(account.number, "10001");
        assert_eq!(account.balance, 200000);
    }

    #[test]
    fn test_renumbers() {
        let account = sample_account();
        let same = AccountChanges {
            number: Some("10001".into()),
            ..Default::default()
        };
        let different = AccountChanges {
            number: Some("10002".into()),
            ..Default::default()
        };
        assert!(!same.renumbers(&account));
        assert!(different.renumbers(&account));
        assert!(!AccountChanges::default().renumbers(&account));
    }

    #[test]
    fn test_can_cover() {
        let account = sample_account();
        assert!(account.can_cover(200000));
        assert!(!account.can_cover(200001));
    }

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank("  10001 "), Some("10001"));
        assert_eq!(non_blank("   "), None);
        assert_eq!(non_blank(""), None);
    }
}
