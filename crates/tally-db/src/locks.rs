//! # Per-Product Locks
//!
//! In-process registry handing out one async mutex per product id. A unit
//! of work that mutates stock holds the guards for every product it
//! touches until it commits or rolls back.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  sell(A)            checkout([B, A, B])        sell(C)                  │
//! │     │                    │                        │                     │
//! │     ▼                    ▼                        ▼                     │
//! │  lock A            lock A, then B             lock C                    │
//! │     │              (sorted, de-duplicated)        │  runs in parallel   │
//! │     │                    │ waits for A            │  with both          │
//! │  commit, release A ──────┘                        │                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Acquiring in ascending id order is what keeps two multi-line sales from
//! deadlocking on each other. The registry only coordinates tasks in this
//! process; the first write inside each database transaction takes SQLite's
//! write lock for cross-process safety.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::trace;

/// Idle entries are pruned once the registry grows past this size.
const PRUNE_THRESHOLD: usize = 1024;

/// Guards held for the duration of one unit of work.
#[derive(Debug)]
pub struct ProductGuards {
    _guards: Vec<OwnedMutexGuard<()>>,
    product_ids: Vec<String>,
}

impl ProductGuards {
    /// Product ids held, in acquisition order.
    pub fn product_ids(&self) -> &[String] {
        &self.product_ids
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProductLocks {
    inner: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

impl ProductLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn handle(&self, product_id: &str) -> Arc<AsyncMutex<()>> {
        // A poisoned map only means another thread panicked mid-insert;
        // the map itself is still usable.
        let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());

        if map.len() > PRUNE_THRESHOLD {
            map.retain(|_, m| Arc::strong_count(m) > 1);
        }

        map.entry(product_id.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    /// Locks a single product.
    pub async fn lock(&self, product_id: &str) -> ProductGuards {
        self.lock_many([product_id]).await
    }

    /// Locks every distinct product in ascending id order.
    pub async fn lock_many<'a, I>(&self, product_ids: I) -> ProductGuards
    where
        I: IntoIterator<Item = &'a str>,
    {
        let ordered: BTreeSet<&str> = product_ids.into_iter().collect();
        let mut guards = Vec::with_capacity(ordered.len());
        let mut held = Vec::with_capacity(ordered.len());

        for id in ordered {
            let guard = self.handle(id).lock_owned().await;
            trace!(product_id = %id, "Product lock acquired");
            guards.push(guard);
            held.push(id.to_string());
        }

        ProductGuards {
            _guards: guards,
            product_ids: held,
        }
    }

    /// Number of products currently tracked (held or idle).
    pub fn tracked(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_lock_many_sorts_and_dedups() {
        let locks = ProductLocks::new();
        let guards = locks.lock_many(["b", "a", "b", "c"]).await;
        assert_eq!(guards.product_ids(), &["a", "b", "c"]);
        assert_eq!(locks.tracked(), 3);
    }

    #[tokio::test]
    async fn test_same_product_is_exclusive() {
        let locks = ProductLocks::new();
        let held = locks.lock("p").await;

        let contender = locks.clone();
        let waiting = tokio::spawn(async move {
            let _g = contender.lock("p").await;
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiting.is_finished());

        drop(held);
        tokio::time::timeout(Duration::from_secs(1), waiting)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_different_products_are_independent() {
        let locks = ProductLocks::new();
        let _a = locks.lock("a").await;
        let b = tokio::time::timeout(Duration::from_secs(1), locks.lock("b")).await;
        assert!(b.is_ok());
    }
}
