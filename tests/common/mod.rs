// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use bankledger::application::{
    AggregationConfig, AggregationService, CreateAccountRequest, LedgerService, Notification,
    Notifier,
};
use bankledger::domain::{Account, Cents};
use tempfile::TempDir;

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(LedgerService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service = LedgerService::init(db_path.to_str().unwrap()).await?;
    Ok((service, temp_dir))
}

/// Test service whose notifications are captured by the returned notifier
pub async fn test_service_with_recorder(
    notifier: RecordingNotifier,
) -> Result<(LedgerService, Arc<RecordingNotifier>, TempDir)> {
    let (service, temp_dir) = test_service().await?;
    let notifier = Arc::new(notifier);
    let service = service.with_notifier(notifier.clone());
    Ok((service, notifier, temp_dir))
}

/// Aggregation over the same database as `service`, with the default pool sizing
pub fn aggregation_for(service: &LedgerService) -> Result<AggregationService> {
    Ok(AggregationService::new(
        service.repository().clone(),
        AggregationConfig::default(),
    )?)
}

/// Open an account with `balance` whole currency units
pub async fn open_account(
    service: &LedgerService,
    name: &str,
    number: &str,
    balance_units: i64,
) -> Result<Account> {
    Ok(service
        .create_account(CreateAccountRequest {
            name: name.to_string(),
            number: number.to_string(),
            email: format!("{}@example.com", number),
            balance: Some(units(balance_units)),
        })
        .await?)
}

/// Whole currency units to cents
pub fn units(amount: i64) -> Cents {
    amount * 100
}

/// Notifier that keeps every message it is asked to send
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
    fail: bool,
}

impl RecordingNotifier {
    /// A notifier that records messages but reports every delivery as failed
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }

    pub fn subjects(&self) -> Vec<String> {
        self.sent().into_iter().map(|n| n.subject).collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, notification: &Notification) -> Result<()> {
        self.sent.lock().unwrap().push(notification.clone());
        if self.fail {
            anyhow::bail!("mail server unavailable");
        }
        Ok(())
    }
}
