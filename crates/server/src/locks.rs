// Per-branch serialization of sync chains.
//
// Chains that target the same parent branch run one at a time, in lock
// acquisition order; chains for different branches do not wait on each other.

use std::collections::HashMap;
use std::sync::Arc;

use subsync_common::types::BranchKey;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Default)]
pub struct BranchLocks {
    locks: Mutex<HashMap<BranchKey, Arc<Mutex<()>>>>,
}

impl BranchLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other chain holds `key`. The branch is released when
    /// the guard is dropped.
    pub async fn acquire(&self, key: &BranchKey) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            Arc::clone(locks.entry(key.clone()).or_default())
        };
        lock.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn same_branch_waits_for_release() {
        let locks = Arc::new(BranchLocks::new());
        let key = BranchKey::new("app", "main");

        let guard = locks.acquire(&key).await;

        let waiter = tokio::spawn({
            let locks = Arc::clone(&locks);
            let key = key.clone();
            async move {
                let _guard = locks.acquire(&key).await;
            }
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished(), "second chain must wait for the first");

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should finish once the lock is released")
            .expect("waiter should not panic");
    }

    #[tokio::test]
    async fn different_branches_do_not_block() {
        let locks = BranchLocks::new();
        let _main = locks.acquire(&BranchKey::new("app", "main")).await;

        tokio::time::timeout(Duration::from_secs(1), locks.acquire(&BranchKey::new("app", "dev")))
            .await
            .expect("other branch should lock immediately");
        tokio::time::timeout(Duration::from_secs(1), locks.acquire(&BranchKey::new("web", "main")))
            .await
            .expect("same branch name in another repo should lock immediately");
    }
}
