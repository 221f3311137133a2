use std::sync::Arc;

use anyhow::Context;
use rayon::ThreadPool;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::domain::{BalanceSummary, Cents, TotalCents, partition_ranges, sum_partition};
use crate::storage::Repository;

use super::AppError;

/// Worker pool sizing for balance aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregationConfig {
    pub workers: usize,
    pub partition_size: usize,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            workers: 5,
            partition_size: 10,
        }
    }
}

/// Computes total and average balance over a snapshot of all accounts.
///
/// The snapshot is split into contiguous partitions that are summed on a
/// fixed-size worker pool; partial sums are gathered before returning.
pub struct AggregationService {
    repo: Repository,
    pool: Arc<ThreadPool>,
    partition_size: usize,
}

impl AggregationService {
    pub fn new(repo: Repository, config: AggregationConfig) -> Result<Self, AppError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.workers.max(1))
            .thread_name(|index| format!("aggregate-{index}"))
            .build()
            .context("Failed to build aggregation worker pool")?;

        Ok(Self {
            repo,
            pool: Arc::new(pool),
            partition_size: config.partition_size.max(1),
        })
    }

    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Summarize all account balances.
    pub async fn compute_summary(&self) -> Result<BalanceSummary, AppError> {
        let balances: Vec<Cents> = self
            .repo
            .list_accounts()
            .await?
            .into_iter()
            .map(|account| account.balance)
            .collect();

        if balances.is_empty() {
            info!("balance summary computed over no accounts");
            return Ok(BalanceSummary::empty());
        }

        let pool = self.pool.clone();
        let partition_size = self.partition_size;
        let summary =
            tokio::task::spawn_blocking(move || summarize_on(&pool, &balances, partition_size))
                .await
                .context("Aggregation workers failed")?;

        info!(
            total_accounts = summary.total_accounts,
            total_balance = %summary.total_balance,
            average_balance = summary.average_balance,
            "balance summary computed"
        );
        Ok(summary)
    }
}

/// Sum `balances` in partitions of `partition_size` on `pool` and reduce the partial sums.
/// Blocks until every partition is done.
pub fn summarize_on(pool: &ThreadPool, balances: &[Cents], partition_size: usize) -> BalanceSummary {
    let ranges = partition_ranges(balances.len(), partition_size);

    let partials: Vec<TotalCents> = pool.install(|| {
        ranges
            .into_par_iter()
            .map(|range| {
                let total = sum_partition(balances, range.clone());
                debug!(
                    start = range.start,
                    end = range.end,
                    total = %total,
                    "processed accounts partition"
                );
                total
            })
            .collect()
    });

    BalanceSummary::from_totals(balances.len(), partials.iter().sum())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(workers: usize) -> ThreadPool {
        rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .unwrap()
    }

    #[test]
    fn test_summarize_three_accounts() {
        let summary = summarize_on(&pool(5), &[100000, 200000, 300000], 10);
        assert_eq!(summary, BalanceSummary::from_totals(3, 600000));
        assert_eq!(summary.average_balance, 200000);
    }

    #[test]
    fn test_summarize_many_partitions_is_exact() {
        let balances: Vec<Cents> = (0..1234).map(|n| n * 7 + 1).collect();
        let expected: TotalCents = balances.iter().map(|&b| TotalCents::from(b)).sum();

        for workers in [1, 2, 5] {
            for partition_size in [1, 3, 10, 5000] {
                let summary = summarize_on(&pool(workers), &balances, partition_size);
                assert_eq!(summary.total_accounts, 1234);
                assert_eq!(summary.total_balance, expected);
            }
        }
    }

    #[test]
    fn test_summarize_balances_beyond_i64_total() {
        let balances = [5_000_000_000_000_000_000, 5_000_000_000_000_000_000];
        let summary = summarize_on(&pool(2), &balances, 1);
        assert_eq!(summary.total_balance, 10_000_000_000_000_000_000);
        assert_eq!(summary.average_balance, 5_000_000_000_000_000_000);
    }

    #[test]
    fn test_summarize_empty() {
        assert_eq!(summarize_on(&pool(2), &[], 10), BalanceSummary::empty());
    }
}
