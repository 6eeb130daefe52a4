use crate::types::{PendingOperation, PendingOperations};
use alloy::primitives::map::HashMap;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Token identifying a reconciliation run for a domain.
///
/// Generations increase monotonically per domain, only the latest one may write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

impl Generation {
    /// Returns the raw counter value.
    pub const fn get(&self) -> u64 {
        self.0
    }
}

/// Last observed balance of a domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachedBalance {
    /// The balance, in USDC.
    pub balance: Decimal,
    /// Generation of the run that observed it.
    pub generation: Generation,
    /// When it was observed.
    pub observed_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct BalanceCacheInner {
    /// Current generation per domain.
    generations: HashMap<u32, Generation>,
    balances: HashMap<u32, CachedBalance>,
    pending: PendingOperations,
}

/// Last known balances per domain, shared between the orchestrator, the pollers and readers.
///
/// Pollers are the only writers, and a write is accepted only from the current generation of
/// its domain.
#[derive(Debug, Clone, Default)]
pub struct BalanceCache {
    inner: Arc<RwLock<BalanceCacheInner>>,
}

impl BalanceCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new generation for `domain`, superseding the current one.
    pub async fn next_generation(&self, domain: u32) -> Generation {
        let mut inner = self.inner.write().await;
        let generation = inner.generations.entry(domain).or_default();
        generation.0 += 1;
        *generation
    }

    /// Whether `generation` is still the current one for `domain`.
    pub async fn is_current(&self, domain: u32, generation: Generation) -> bool {
        self.inner.read().await.generations.get(&domain) == Some(&generation)
    }

    /// Stores an observed balance and settles the operations pending on the domain.
    ///
    /// Returns `false` and leaves the cache untouched if `generation` has been superseded.
    pub async fn store(&self, domain: u32, generation: Generation, balance: Decimal) -> bool {
        let mut inner = self.inner.write().await;
        if inner.generations.get(&domain) != Some(&generation) {
            return false;
        }

        inner
            .balances
            .insert(domain, CachedBalance { balance, generation, observed_at: Utc::now() });
        inner.pending.remove(domain);
        true
    }

    /// Drops the operations pending on a domain once `generation` gave up watching.
    ///
    /// Returns the dropped operations, none if `generation` has been superseded.
    pub async fn expire(&self, domain: u32, generation: Generation) -> Vec<PendingOperation> {
        let mut inner = self.inner.write().await;
        if inner.generations.get(&domain) != Some(&generation) {
            return Vec::new();
        }
        inner.pending.remove(domain)
    }

    /// Returns the last observed balance of a domain.
    pub async fn get(&self, domain: u32) -> Option<CachedBalance> {
        self.inner.read().await.balances.get(&domain).copied()
    }

    /// Returns a snapshot of all observed balances.
    pub async fn balances(&self) -> HashMap<u32, CachedBalance> {
        self.inner.read().await.balances.clone()
    }

    /// Records a submitted deposit or transfer.
    pub async fn add_pending(&self, operation: PendingOperation) {
        self.inner.write().await.pending.insert(operation);
    }

    /// Returns a snapshot of the pending operations.
    pub async fn pending(&self) -> PendingOperations {
        self.inner.read().await.pending.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OperationKind;

    #[tokio::test]
    async fn only_current_generation_writes() {
        let cache = BalanceCache::new();

        let first = cache.next_generation(0).await;
        let second = cache.next_generation(0).await;
        assert!(second > first);
        assert!(!cache.is_current(0, first).await);

        assert!(!cache.store(0, first, Decimal::from(150)).await);
        assert_eq!(cache.get(0).await, None);

        assert!(cache.store(0, second, Decimal::from(120)).await);
        assert_eq!(cache.get(0).await.map(|cached| cached.balance), Some(Decimal::from(120)));
    }

    #[tokio::test]
    async fn generations_are_per_domain() {
        let cache = BalanceCache::new();

        let base = cache.next_generation(6).await;
        cache.next_generation(0).await;

        assert!(cache.is_current(6, base).await);
    }

    #[tokio::test]
    async fn pending_operations_settle_on_store() {
        let cache = BalanceCache::new();
        cache.add_pending(PendingOperation::new(OperationKind::Deposit, 0, Decimal::from(5))).await;
        cache.add_pending(PendingOperation::new(OperationKind::Deposit, 6, Decimal::from(5))).await;

        let stale = cache.next_generation(0).await;
        let current = cache.next_generation(0).await;
        assert!(cache.expire(0, stale).await.is_empty());
        assert_eq!(cache.pending().await.len(), 2);

        assert!(cache.store(0, current, Decimal::from(5)).await);
        assert!(cache.pending().await.for_domain(0).is_empty());
        assert_eq!(cache.pending().await.len(), 1);
    }
}
