use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::info;

use crate::api::{self, AppState};
use crate::application::{AggregationConfig, AggregationService, CreateAccountRequest, LedgerService};
use crate::config::ServerConfig;
use crate::domain::{Account, AccountChanges, format_cents, parse_cents};
use crate::rates::RateScraper;
use crate::telemetry::{self, LoggingConfig};

/// bankledger - Banking account ledger
#[derive(Parser)]
#[command(name = "bankledger")]
#[command(about = "Bank accounts with deposits, withdrawals, transfers and balance summaries")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, env = "BANKLEDGER_DATABASE", default_value = "bankledger.db")]
    pub database: String,

    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Also write logs to a daily-rolling file in this directory
    #[arg(long, env = "BANKLEDGER_LOG_DIR", global = true)]
    pub log_dir: Option<PathBuf>,

    /// Log as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Run the HTTP API
    Serve(ServerConfig),

    /// Account management commands
    #[command(subcommand)]
    Account(AccountCommands),

    /// Deposit money into an account
    Deposit {
        /// Account number
        number: String,

        /// Amount to deposit (e.g., "50.00" or "50")
        amount: String,
    },

    /// Withdraw money from an account
    Withdraw {
        /// Account number
        number: String,

        /// Amount to withdraw (e.g., "50.00" or "50")
        amount: String,
    },

    /// Transfer money between accounts
    Transfer {
        /// Amount to transfer (e.g., "50.00" or "50")
        amount: String,

        /// Sender account number
        #[arg(long)]
        from: String,

        /// Receiver account number
        #[arg(long)]
        to: String,
    },

    /// Show total and average balance across all accounts
    Summary {
        /// Worker threads used to sum balances
        #[arg(long, default_value_t = AggregationConfig::default().workers)]
        workers: usize,
    },

    /// Fetch current deposit interest rates from bank websites
    Rates {
        /// List bank names from the RBI site instead
        #[arg(long)]
        banks: bool,
    },
}

#[derive(Subcommand)]
pub enum AccountCommands {
    /// Open a new account
    Create {
        /// Account holder name
        name: String,

        /// Account number (must be unique)
        number: String,

        /// Contact email
        email: String,

        /// Opening balance (defaults to 0)
        #[arg(short, long)]
        balance: Option<String>,
    },

    /// List all accounts
    List,

    /// Show account details
    Show {
        /// Account ID
        id: i64,
    },

    /// Update account details
    Update {
        /// Account ID
        id: i64,

        /// New holder name
        #[arg(long)]
        name: Option<String>,

        /// New account number
        #[arg(long)]
        number: Option<String>,

        /// New contact email
        #[arg(long)]
        email: Option<String>,

        /// New balance
        #[arg(long)]
        balance: Option<String>,
    },

    /// Delete an account permanently
    Delete {
        /// Account ID
        id: i64,
    },
}

impl Cli {
    fn logging_config(&self) -> LoggingConfig {
        LoggingConfig {
            verbose: self.verbose,
            json: self.log_json,
            log_dir: self.log_dir.clone(),
        }
    }

    pub async fn run(self) -> Result<()> {
        let _log_guard = telemetry::init(&self.logging_config())?;

        match self.command {
            Commands::Init => {
                LedgerService::init(&self.database).await?;
                println!("Database initialized: {}", self.database);
            }

            Commands::Serve(config) => run_serve_command(&self.database, config).await?,

            Commands::Account(account_cmd) => {
                let service = LedgerService::connect(&self.database).await?;
                run_account_command(&service, account_cmd).await?;
            }

            Commands::Deposit { number, amount } => {
                let service = LedgerService::connect(&self.database).await?;
                let amount_cents = parse_amount(&amount)?;
                let account = service.deposit(&number, amount_cents).await?;
                println!(
                    "Deposited {} into {}. New balance: {}",
                    format_cents(amount_cents),
                    account.number,
                    format_cents(account.balance)
                );
            }

            Commands::Withdraw { number, amount } => {
                let service = LedgerService::connect(&self.database).await?;
                let amount_cents = parse_amount(&amount)?;
                let account = service.withdraw(&number, amount_cents).await?;
                println!(
                    "Withdrew {} from {}. New balance: {}",
                    format_cents(amount_cents),
                    account.number,
                    format_cents(account.balance)
                );
            }

            Commands::Transfer { amount, from, to } => {
                let service = LedgerService::connect(&self.database).await?;
                let amount_cents = parse_amount(&amount)?;
                let result = service.transfer(&from, &to, amount_cents).await?;
                println!(
                    "Transferred {} {} -> {}",
                    format_cents(result.amount),
                    result.sender.number,
                    result.receiver.number
                );
                println!(
                    "  {}: {}",
                    result.sender.number,
                    format_cents(result.sender.balance)
                );
                if !result.is_self_transfer() {
                    println!(
                        "  {}: {}",
                        result.receiver.number,
                        format_cents(result.receiver.balance)
                    );
                }
            }

            Commands::Summary { workers } => {
                let service = LedgerService::connect(&self.database).await?;
                let aggregation = AggregationService::new(
                    service.repository().clone(),
                    AggregationConfig {
                        workers,
                        ..Default::default()
                    },
                )?;
                let summary = aggregation.compute_summary().await?;
                println!("Accounts:        {}", summary.total_accounts);
                println!("Total balance:   {}", format_cents(summary.total_balance));
                println!("Average balance: {}", format_cents(summary.average_balance));
            }

            Commands::Rates { banks } => run_rates_command(banks).await?,
        }

        Ok(())
    }
}

async fn run_serve_command(database: &str, config: ServerConfig) -> Result<()> {
    let ledger = LedgerService::init(database)
        .await?
        .with_notifier(config.notifier()?);
    let aggregation = AggregationService::new(ledger.repository().clone(), config.aggregation())?;
    let scraper = RateScraper::with_defaults()?;
    info!(
        database,
        workers = aggregation.workers(),
        notify_url = config.notify_url.as_deref().unwrap_or("-"),
        "starting server"
    );

    let listener = TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;
    api::serve(listener, AppState::new(ledger, aggregation, scraper)).await
}

async fn run_account_command(service: &LedgerService, cmd: AccountCommands) -> Result<()> {
    match cmd {
        AccountCommands::Create {
            name,
            number,
            email,
            balance,
        } => {
            let balance = balance.map(|b| parse_amount(&b)).transpose()?;
            let account = service
                .create_account(CreateAccountRequest {
                    name,
                    number,
                    email,
                    balance,
                })
                .await?;
            println!(
                "Created account {} for {} (ID {}), balance {}",
                account.number,
                account.name,
                account.id,
                format_cents(account.balance)
            );
        }

        AccountCommands::List => {
            let accounts = service.list_accounts().await?;
            if accounts.is_empty() {
                println!("No accounts found.");
            } else {
                println!(
                    "{:>6} {:<20} {:<14} {:>14} EMAIL",
                    "ID", "NAME", "NUMBER", "BALANCE"
                );
                println!("{}", "-".repeat(78));
                for account in accounts {
                    println!(
                        "{:>6} {:<20} {:<14} {:>14} {}",
                        account.id,
                        truncate(&account.name, 20),
                        truncate(&account.number, 14),
                        format_cents(account.balance),
                        account.email
                    );
                }
            }
        }

        AccountCommands::Show { id } => {
            let account = service.get_account(id).await?;
            print_account(&account);
        }

        AccountCommands::Update {
            id,
            name,
            number,
            email,
            balance,
        } => {
            let changes = AccountChanges {
                name,
                number,
                email,
                balance: balance.map(|b| parse_amount(&b)).transpose()?,
            };
            if changes.is_empty() {
                anyhow::bail!("Nothing to update. Pass --name, --number, --email or --balance");
            }
            let account = service.update_account(id, changes).await?;
            println!("Updated account {}", account.id);
            print_account(&account);
        }

        AccountCommands::Delete { id } => {
            let account = service.delete_account(id).await?;
            println!("Deleted account {} ({})", account.number, account.name);
        }
    }
    Ok(())
}

async fn run_rates_command(banks: bool) -> Result<()> {
    let scraper = RateScraper::with_defaults()?;

    if banks {
        let names = scraper.scrape_bank_names().await;
        if names.is_empty() {
            println!("No bank names available.");
        }
        for name in names {
            println!("{}", name);
        }
        return Ok(());
    }

    for rate in scraper.scrape_interest_rates().await {
        println!("{} ({})", rate.bank, rate.url);
        for line in rate.info.lines() {
            println!("  {}", line);
        }
        println!();
    }
    Ok(())
}

fn print_account(account: &Account) {
    println!("Account: {}", account.number);
    println!("  ID:       {}", account.id);
    println!("  Name:     {}", account.name);
    println!("  Email:    {}", account.email);
    println!("  Balance:  {}", format_cents(account.balance));
    println!(
        "  Created:  {}",
        account.created_at.format("%Y-%m-%d %H:%M:%S")
    );
    println!(
        "  Updated:  {}",
        account.updated_at.format("%Y-%m-%d %H:%M:%S")
    );
}

fn parse_amount(input: &str) -> Result<i64> {
    parse_cents(input).with_context(|| format!("Invalid amount '{}'. Use '50.00' or '50'", input))
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_transfer_command() {
        let cli = Cli::try_parse_from([
            "bankledger",
            "--database",
            "test.db",
            "transfer",
            "250",
            "--from",
            "10001",
            "--to",
            "10002",
        ])
        .unwrap();

        assert_eq!(cli.database, "test.db");
        match cli.command {
            Commands::Transfer { amount, from, to } => {
                assert_eq!(amount, "250");
                assert_eq!(from, "10001");
                assert_eq!(to, "10002");
            }
            _ => panic!("expected transfer command"),
        }
    }

    #[test]
    fn test_parse_serve_defaults() {
        let cli = Cli::try_parse_from(["bankledger", "serve"]).unwrap();
        match cli.command {
            Commands::Serve(config) => {
                assert_eq!(config.workers, 5);
                assert_eq!(config.partition_size, 10);
            }
            _ => panic!("expected serve command"),
        }
    }

    #[test]
    fn test_parse_rates_command() {
        let cli = Cli::try_parse_from(["bankledger", "rates", "--banks"]).unwrap();
        assert!(matches!(cli.command, Commands::Rates { banks: true }));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a very long holder name", 10), "a very ...");
    }

    #[test]
    fn test_parse_amount_rejects_garbage() {
        assert_eq!(parse_amount("12.50").unwrap(), 1250);
        assert!(parse_amount("twelve").is_err());
    }
}
