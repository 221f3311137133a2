use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::{
    Account, AccountChanges, AccountId, Cents, NewAccount, format_cents, non_blank,
};
use crate::storage::{Repository, TransferOutcome, is_unique_violation};

use super::{AccountGuard, AccountLocks, AppError, LogNotifier, Notification, Notifier};

/// Application service providing the ledger operations.
/// This is the primary interface for any client (HTTP API, CLI, tests).
pub struct LedgerService {
    repo: Repository,
    locks: AccountLocks,
    notifier: Arc<dyn Notifier>,
}

/// Input for opening an account. `balance` defaults to zero.
#[derive(Debug, Clone, Default)]
pub struct CreateAccountRequest {
    pub name: String,
    pub number: String,
    pub email: String,
    pub balance: Option<Cents>,
}

/// Both sides of a completed transfer, with their resulting balances.
#[derive(Debug, Clone)]
pub struct TransferResult {
    pub sender: Account,
    pub receiver: Account,
    pub amount: Cents,
}

impl TransferResult {
    pub fn is_self_transfer(&self) -> bool {
        self.sender.id == self.receiver.id
    }
}

impl LedgerService {
    /// Create a new ledger service with the given repository and notifier.
    pub fn new(repo: Repository, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            repo,
            locks: AccountLocks::new(),
            notifier,
        }
    }

    /// Initialize a database at the given path, creating it if needed.
    pub async fn init(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}?mode=rwc", database_path);
        let repo = Repository::init(&db_url).await?;
        Ok(Self::new(repo, Arc::new(LogNotifier)))
    }

    /// Connect to an existing database.
    pub async fn connect(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}", database_path);
        let repo = Repository::connect(&db_url).await?;
        Ok(Self::new(repo, Arc::new(LogNotifier)))
    }

    /// Replace the notifier used after each committed operation.
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    // ========================
    // Account operations
    // ========================

    /// Open a new account.
    pub async fn create_account(&self, request: CreateAccountRequest) -> Result<Account, AppError> {
        let name = required("name", &request.name)?;
        let number = required("number", &request.number)?;
        let email = required("email", &request.email)?;

        let balance = request.balance.unwrap_or(0);
        if balance < 0 {
            return Err(AppError::InvalidAmount(
                "Opening balance cannot be negative".to_string(),
            ));
        }

        if self.repo.find_by_number(number).await?.is_some() {
            return Err(AppError::DuplicateAccountNumber(number.to_string()));
        }

        let new_account = NewAccount::new(name, number, email).with_balance(balance);
        let account = match self.repo.insert_account(&new_account).await {
            Ok(account) => account,
            // Lost a race with another insert of the same number
            Err(err) if is_unique_violation(&err) => {
                return Err(AppError::DuplicateAccountNumber(number.to_string()));
            }
            Err(err) => return Err(err.into()),
        };

        info!(
            account_id = account.id,
            number = %account.number,
            balance = account.balance,
            "account created"
        );
        self.notify(Notification::account_created(&account)).await;
        Ok(account)
    }

    /// Get an account by ID.
    pub async fn get_account(&self, id: AccountId) -> Result<Account, AppError> {
        self.repo
            .get_account(id)
            .await?
            .ok_or_else(|| AppError::AccountNotFound(id.to_string()))
    }

    /// Get an account by its account number.
    pub async fn find_by_number(&self, number: &str) -> Result<Account, AppError> {
        self.repo
            .find_by_number(number)
            .await?
            .ok_or_else(|| AppError::AccountNotFound(number.to_string()))
    }

    /// List all accounts.
    pub async fn list_accounts(&self) -> Result<Vec<Account>, AppError> {
        Ok(self.repo.list_accounts().await?)
    }

    pub async fn account_count(&self) -> Result<i64, AppError> {
        Ok(self.repo.count_accounts().await?)
    }

    /// Overwrite the supplied fields of an account.
    pub async fn update_account(
        &self,
        id: AccountId,
        changes: AccountChanges,
    ) -> Result<Account, AppError> {
        let changes = normalize_changes(changes)?;

        let guard = self.locks.lock(id).await;
        let mut account = self.get_account(id).await?;

        if changes.renumbers(&account) {
            let number = changes.number.as_deref().unwrap_or_default();
            if let Some(existing) = self.repo.find_by_number(number).await? {
                if existing.id != id {
                    return Err(AppError::DuplicateAccountNumber(number.to_string()));
                }
            }
        }

        changes.apply_to(&mut account);
        let updated = match self.repo.update_account(&account).await {
            Ok(Some(updated)) => updated,
            Ok(None) => return Err(AppError::AccountNotFound(id.to_string())),
            Err(err) if is_unique_violation(&err) => {
                return Err(AppError::DuplicateAccountNumber(account.number));
            }
            Err(err) => return Err(err.into()),
        };
        drop(guard);

        info!(account_id = id, number = %updated.number, "account updated");
        self.notify(Notification::account_updated(&updated)).await;
        Ok(updated)
    }

    /// Permanently remove an account. Returns the account as it was before removal.
    pub async fn delete_account(&self, id: AccountId) -> Result<Account, AppError> {
        let guard = self.locks.lock(id).await;
        let account = self.get_account(id).await?;

        if !self.repo.delete_account(id).await? {
            return Err(AppError::AccountNotFound(id.to_string()));
        }
        drop(guard);
        self.locks.forget(id);

        info!(account_id = id, number = %account.number, "account deleted");
        self.notify(Notification::account_deleted(&account)).await;
        Ok(account)
    }

    // ========================
    // Money operations
    // ========================

    /// Add money to an account.
    pub async fn deposit(&self, number: &str, amount: Cents) -> Result<Account, AppError> {
        require_positive(amount, "Deposit")?;

        let (account, guard) = self.lock_by_number(number).await?;
        ensure_can_receive(&account, amount)?;
        let updated = self
            .repo
            .adjust_balance(account.id, amount)
            .await?
            .ok_or_else(|| AppError::AccountNotFound(number.to_string()))?;
        drop(guard);

        info!(
            account_id = updated.id,
            number = %updated.number,
            amount,
            balance = updated.balance,
            "deposit completed"
        );
        self.notify(Notification::deposit(&updated, amount)).await;
        Ok(updated)
    }

    /// Take money out of an account. The balance may reach zero but never go below it.
    pub async fn withdraw(&self, number: &str, amount: Cents) -> Result<Account, AppError> {
        require_positive(amount, "Withdrawal")?;

        let (account, guard) = self.lock_by_number(number).await?;
        if !account.can_cover(amount) {
            return Err(AppError::InsufficientFunds {
                number: number.to_string(),
                balance: account.balance,
                required: amount,
            });
        }

        let updated = self
            .repo
            .adjust_balance(account.id, -amount)
            .await?
            .ok_or_else(|| AppError::InsufficientFunds {
                number: number.to_string(),
                balance: account.balance,
                required: amount,
            })?;
        drop(guard);

        info!(
            account_id = updated.id,
            number = %updated.number,
            amount,
            balance = updated.balance,
            "withdrawal completed"
        );
        self.notify(Notification::withdrawal(&updated, amount)).await;
        Ok(updated)
    }

    /// Move money between two accounts. Both legs commit together or not at all.
    ///
    /// Transferring to the same account is allowed: the balance check still
    /// applies, the balance is unchanged and the holder is notified once.
    pub async fn transfer(
        &self,
        sender_number: &str,
        receiver_number: &str,
        amount: Cents,
    ) -> Result<TransferResult, AppError> {
        require_positive(amount, "Transfer")?;

        let sender = self.transfer_party(sender_number).await?;
        let receiver = self.transfer_party(receiver_number).await?;

        let guard = self.locks.lock_pair(sender.id, receiver.id).await;

        // Re-read under the locks: either side may have changed since the lookup
        let sender = self
            .current_with_number(sender.id, sender_number)
            .await?
            .ok_or_else(|| AppError::InvalidTransfer(sender_number.to_string()))?;
        let receiver = self
            .current_with_number(receiver.id, receiver_number)
            .await?
            .ok_or_else(|| AppError::InvalidTransfer(receiver_number.to_string()))?;

        if !sender.can_cover(amount) {
            return Err(AppError::InsufficientFunds {
                number: sender_number.to_string(),
                balance: sender.balance,
                required: amount,
            });
        }

        if sender.id == receiver.id {
            drop(guard);
            info!(
                account_id = sender.id,
                number = %sender.number,
                amount,
                "self-transfer completed"
            );
            self.notify(Notification::transfer_sent(&sender, receiver_number, amount))
                .await;
            return Ok(TransferResult {
                sender: sender.clone(),
                receiver: sender,
                amount,
            });
        }

        ensure_can_receive(&receiver, amount)?;

        let outcome = self
            .repo
            .transfer_funds(sender.id, receiver.id, amount)
            .await?;
        drop(guard);

        let (sender, receiver) = match outcome {
            TransferOutcome::Completed { sender, receiver } => (sender, receiver),
            TransferOutcome::InsufficientFunds { balance } => {
                return Err(AppError::InsufficientFunds {
                    number: sender_number.to_string(),
                    balance,
                    required: amount,
                });
            }
            TransferOutcome::ReceiverBalanceLimit { balance } => {
                return Err(balance_limit(receiver_number, balance, amount));
            }
            TransferOutcome::SenderMissing => {
                return Err(AppError::InvalidTransfer(sender_number.to_string()));
            }
            TransferOutcome::ReceiverMissing => {
                return Err(AppError::InvalidTransfer(receiver_number.to_string()));
            }
        };

        info!(
            sender = %sender.number,
            receiver = %receiver.number,
            amount,
            "transfer completed"
        );
        self.notify(Notification::transfer_sent(&sender, &receiver.number, amount))
            .await;
        self.notify(Notification::transfer_received(&receiver, &sender.number, amount))
            .await;

        Ok(TransferResult {
            sender,
            receiver,
            amount,
        })
    }

    // ========================
    // Helpers
    // ========================

    /// Resolve an account number and lock the account. The account is re-read
    /// under the lock so callers see its current balance.
    async fn lock_by_number(&self, number: &str) -> Result<(Account, AccountGuard), AppError> {
        let account = self.find_by_number(number).await?;
        let guard = self.locks.lock(account.id).await;

        match self.current_with_number(account.id, number).await? {
            Some(current) => Ok((current, guard)),
            None => Err(AppError::AccountNotFound(number.to_string())),
        }
    }

    async fn transfer_party(&self, number: &str) -> Result<Account, AppError> {
        self.repo
            .find_by_number(number)
            .await?
            .ok_or_else(|| AppError::InvalidTransfer(number.to_string()))
    }

    /// The account with `id`, provided it still carries `number`.
    async fn current_with_number(
        &self,
        id: AccountId,
        number: &str,
    ) -> Result<Option<Account>, AppError> {
        Ok(self
            .repo
            .get_account(id)
            .await?
            .filter(|account| account.number == number))
    }

    async fn notify(&self, notification: Notification) {
        if let Err(err) = self.notifier.send(&notification).await {
            warn!(
                to = %notification.to,
                subject = %notification.subject,
                "Failed to send notification: {err:#}"
            );
        }
    }
}

fn required<'a>(field: &str, value: &'a str) -> Result<&'a str, AppError> {
    non_blank(value).ok_or_else(|| AppError::Validation(format!("Missing required field: {field}")))
}

fn ensure_can_receive(account: &Account, amount: Cents) -> Result<(), AppError> {
    match account.balance.checked_add(amount) {
        Some(_) => Ok(()),
        None => Err(balance_limit(&account.number, account.balance, amount)),
    }
}

fn balance_limit(number: &str, balance: Cents, amount: Cents) -> AppError {
    AppError::InvalidAmount(format!(
        "Crediting {} to account {number} would exceed the maximum balance (current {})",
        format_cents(amount),
        format_cents(balance)
    ))
}

fn require_positive(amount: Cents, operation: &str) -> Result<(), AppError> {
    if amount <= 0 {
        return Err(AppError::InvalidAmount(format!(
            "{operation} amount must be positive"
        )));
    }
    Ok(())
}

/// Trim supplied strings and reject blanks or negative balances.
fn normalize_changes(changes: AccountChanges) -> Result<AccountChanges, AppError> {
    let trim = |field: &str, value: Option<String>| {
        value
            .map(|v| required(field, &v).map(str::to_string))
            .transpose()
    };

    if changes.balance.is_some_and(|balance| balance < 0) {
        return Err(AppError::InvalidAmount(
            "Balance cannot be negative".to_string(),
        ));
    }

    Ok(AccountChanges {
        name: trim("name", changes.name)?,
        number: trim("number", changes.number)?,
        email: trim("email", changes.email)?,
        balance: changes.balance,
    })
}
