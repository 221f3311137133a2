use std::ops::Range;

use serde::{Deserialize, Serialize};

use super::{Cents, TotalCents};

/// Aggregate figures over a point-in-time snapshot of all accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSummary {
    pub total_accounts: usize,
    pub total_balance: TotalCents,
    pub average_balance: Cents,
}

impl BalanceSummary {
    /// Build a summary from a count and a total. The average is rounded to the
    /// nearest cent and is zero when there are no accounts.
    pub fn from_totals(total_accounts: usize, total_balance: TotalCents) -> Self {
        let average_balance = if total_accounts == 0 {
            0
        } else {
            let count = total_accounts as TotalCents;
            // Half-up rounding; the mean of non-negative balances always fits in `Cents`
            ((total_balance + count / 2) / count) as Cents
        };

        Self {
            total_accounts,
            total_balance,
            average_balance,
        }
    }

    pub fn empty() -> Self {
        Self::from_totals(0, 0)
    }
}

/// Split `len` items into contiguous index ranges of at most `size` items.
/// Example: len 25, size 10 -> [0..10, 10..20, 20..25]
pub fn partition_ranges(len: usize, size: usize) -> Vec<Range<usize>> {
    let size = size.max(1);
    (0..len)
        .step_by(size)
        .map(|start| start..(start + size).min(len))
        .collect()
}

/// Sum a single partition of balances.
pub fn sum_partition(balances: &[Cents], range: Range<usize>) -> TotalCents {
    balances[range].iter().map(|&balance| TotalCents::from(balance)).sum()
}
