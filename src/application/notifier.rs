use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;

use crate::domain::{Account, Cents, format_cents};

/// A message addressed to an account holder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl Notification {
    fn for_account(account: &Account, subject: &str, body: String) -> Self {
        Self {
            to: account.email.clone(),
            subject: subject.to_string(),
            body: format!("Dear {},\n\n{}\n\nBanking Management System", account.name, body),
        }
    }

    pub fn account_created(account: &Account) -> Self {
        Self::for_account(
            account,
            "Account created",
            format!(
                "Your account {} has been created with an opening balance of {}.",
                account.number,
                format_cents(account.balance)
            ),
        )
    }

    pub fn account_updated(account: &Account) -> Self {
        Self::for_account(
            account,
            "Account updated",
            format!(
                "The details of account {} have been updated. Current balance: {}.",
                account.number,
                format_cents(account.balance)
            ),
        )
    }

    /// Built from the account as it was just before removal.
    pub fn account_deleted(account: &Account) -> Self {
        Self::for_account(
            account,
            "Account closed",
            format!("Your account {} has been closed.", account.number),
        )
    }

    pub fn deposit(account: &Account, amount: Cents) -> Self {
        Self::for_account(
            account,
            "Deposit successful",
            format!(
                "{} has been deposited into account {}. New balance: {}.",
                format_cents(amount),
                account.number,
                format_cents(account.balance)
            ),
        )
    }

    pub fn withdrawal(account: &Account, amount: Cents) -> Self {
        Self::for_account(
            account,
            "Withdrawal successful",
            format!(
                "{} has been withdrawn from account {}. New balance: {}.",
                format_cents(amount),
                account.number,
                format_cents(account.balance)
            ),
        )
    }

    pub fn transfer_sent(sender: &Account, receiver_number: &str, amount: Cents) -> Self {
        Self::for_account(
            sender,
            "Transfer sent",
            format!(
                "{} has been transferred from account {} to account {}. New balance: {}.",
                format_cents(amount),
                sender.number,
                receiver_number,
                format_cents(sender.balance)
            ),
        )
    }

    pub fn transfer_received(receiver: &Account, sender_number: &str, amount: Cents) -> Self {
        Self::for_account(
            receiver,
            "Transfer received",
            format!(
                "{} has been received in account {} from account {}. New balance: {}.",
                format_cents(amount),
                receiver.number,
                sender_number,
                format_cents(receiver.balance)
            ),
        )
    }
}

/// Best-effort delivery of account notifications.
///
/// An `Err` means the message was not delivered. Callers log it and carry on;
/// delivery never decides whether a ledger operation succeeded.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<()>;
}

/// Writes notifications to the log instead of delivering them.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notification: &Notification) -> Result<()> {
        tracing::info!(
            to = %notification.to,
            subject = %notification.subject,
            "notification: {}",
            notification.body
        );
        Ok(())
    }
}

/// POSTs each notification as JSON (`{to, subject, body}`) to a mail relay or webhook.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    endpoint: String,
}

impl WebhookNotifier {
    const TIMEOUT: Duration = Duration::from_secs(10);

    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Self::TIMEOUT)
            .build()
            .context("Failed to build HTTP client for notifications")?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, notification: &Notification) -> Result<()> {
        self.client
            .post(&self.endpoint)
            .json(notification)
            .send()
            .await
            .with_context(|| format!("Failed to reach {}", self.endpoint))?
            .error_for_status()
            .context("Notification endpoint rejected the message")?;
        Ok(())
    }
}
