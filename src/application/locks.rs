use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::domain::AccountId;

/// Guards held while an account's balance is being changed.
/// Dropping the guard releases the account(s).
pub struct AccountGuard {
    _guards: Vec<OwnedMutexGuard<()>>,
}

/// Per-account mutual exclusion for balance mutations.
///
/// Locks are keyed by surrogate ID. Pairs are always acquired in ascending ID
/// order so two transfers in opposite directions cannot deadlock.
#[derive(Default)]
pub struct AccountLocks {
    locks: DashMap<AccountId, Arc<Mutex<()>>>,
}

impl AccountLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn handle(&self, id: AccountId) -> Arc<Mutex<()>> {
        // Clone out of the map so the shard lock isn't held across an await
        self.locks.entry(id).or_default().clone()
    }

    /// Lock a single account.
    pub async fn lock(&self, id: AccountId) -> AccountGuard {
        let guard = self.handle(id).lock_owned().await;
        AccountGuard {
            _guards: vec![guard],
        }
    }

    /// Lock two accounts in a fixed global order. Locks once if both IDs are equal.
    pub async fn lock_pair(&self, a: AccountId, b: AccountId) -> AccountGuard {
        if a == b {
            return self.lock(a).await;
        }

        let (first, second) = if a < b { (a, b) } else { (b, a) };
        let first_guard = self.handle(first).lock_owned().await;
        let second_guard = self.handle(second).lock_owned().await;
        AccountGuard {
            _guards: vec![first_guard, second_guard],
        }
    }

    /// Drop the lock entry of a deleted account.
    pub fn forget(&self, id: AccountId) {
        self.locks.remove(&id);
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_account_is_exclusive() {
        let locks = Arc::new(AccountLocks::new());
        let guard = locks.lock(1).await;

        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.lock(1).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        contender.await.unwrap();
    }

    #[tokio::test]
    async fn test_different_accounts_do_not_block() {
        let locks = AccountLocks::new();
        let _first = locks.lock(1).await;
        let _second = locks.lock(2).await;
        assert_eq!(locks.len(), 2);
    }

    #[tokio::test]
    async fn test_self_pair_locks_once() {
        let locks = AccountLocks::new();
        let _guard = locks.lock_pair(7, 7).await;
        assert_eq!(locks.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_opposite_pairs_do_not_deadlock() {
        let locks = Arc::new(AccountLocks::new());
        let mut handles = Vec::new();

        for i in 0..50 {
            let locks = locks.clone();
            handles.push(tokio::spawn(async move {
                let (a, b) = if i % 2 == 0 { (1, 2) } else { (2, 1) };
                let _guard = locks.lock_pair(a, b).await;
                tokio::task::yield_now().await;
            }));
        }

        let all = async {
            for handle in handles {
                handle.await.unwrap();
            }
        };
        tokio::time::timeout(Duration::from_secs(5), all)
            .await
            .expect("lock_pair deadlocked");
    }

    #[tokio::test]
    async fn test_forget_removes_entry() {
        let locks = AccountLocks::new();
        drop(locks.lock(3).await);
        locks.forget(3);
        assert!(locks.is_empty());
    }
}
