use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use clap::Args;

use crate::application::{AggregationConfig, LogNotifier, Notifier, WebhookNotifier};

/// Settings for the HTTP server.
#[derive(Args, Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on
    #[arg(long, env = "BANKLEDGER_BIND", default_value = "127.0.0.1:5000")]
    pub bind: SocketAddr,

    /// URL that receives notifications as JSON (logged only if omitted)
    #[arg(long, env = "BANKLEDGER_NOTIFY_URL")]
    pub notify_url: Option<String>,

    /// Worker threads used to sum balances
    #[arg(long, env = "BANKLEDGER_WORKERS", default_value_t = AggregationConfig::default().workers)]
    pub workers: usize,

    /// Accounts per partition when summing balances
    #[arg(long, default_value_t = AggregationConfig::default().partition_size)]
    pub partition_size: usize,
}

impl ServerConfig {
    pub fn aggregation(&self) -> AggregationConfig {
        AggregationConfig {
            workers: self.workers,
            partition_size: self.partition_size,
        }
    }

    pub fn notifier(&self) -> Result<Arc<dyn Notifier>> {
        Ok(match &self.notify_url {
            Some(url) => Arc::new(WebhookNotifier::new(url.clone())?),
            None => Arc::new(LogNotifier),
        })
    }
}
