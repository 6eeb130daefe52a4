//! Balance reconciliation after deposits and transfers.
//!
//! The Gateway does not notify when a deposit or burn is reflected in the unified balance, so
//! after submitting one we poll the API on a [`PollSchedule`] until the balance moves. Each run
//! owns a [`Generation`] of its domain: starting a new run supersedes the previous one, whose
//! late results are then discarded.

mod cache;
pub use cache::{BalanceCache, CachedBalance, Generation};

mod schedule;
pub use schedule::PollSchedule;

use crate::{api::GatewayApi, constants::USDC_TOKEN, metrics::PollerMetrics};
use alloy::primitives::Address;
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::{sync::watch, task::JoinHandle};
use tracing::{debug, info, instrument, warn};

/// Direction in which a balance is expected to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceChange {
    /// A deposit, the balance grows.
    Increase,
    /// A burn, the balance shrinks.
    Decrease,
}

impl BalanceChange {
    fn observed(&self, before: Decimal, balance: Decimal) -> bool {
        match self {
            Self::Increase => balance > before,
            Self::Decrease => balance < before,
        }
    }
}

/// Final result of a reconciliation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The balance moved and the new value was stored in the [`BalanceCache`].
    Observed {
        /// The new balance.
        balance: Decimal,
        /// Difference to the balance before the operation.
        delta: Decimal,
    },
    /// The schedule was exhausted without observing a change.
    ///
    /// The operation may still complete later.
    StillPending,
    /// A newer run for the same domain took over.
    Superseded,
    /// The run was cancelled through its [`PollHandle`].
    Cancelled,
}

/// Handle to a running reconciliation.
///
/// Dropping the handle leaves the run going in the background.
#[derive(Debug)]
pub struct PollHandle {
    domain: u32,
    generation: Generation,
    cancel: watch::Sender<bool>,
    task: JoinHandle<PollOutcome>,
}

impl PollHandle {
    /// Domain being watched.
    pub const fn domain(&self) -> u32 {
        self.domain
    }

    /// Generation owned by this run.
    pub const fn generation(&self) -> Generation {
        self.generation
    }

    /// Stops scheduling further polls. A query already in flight is not aborted.
    pub fn cancel(&self) {
        let _ = self.cancel.send(true);
    }

    /// Waits for the run to finish.
    pub async fn outcome(self) -> PollOutcome {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(domain = self.domain, %err, "Poller task failed");
                PollOutcome::Cancelled
            }
        }
    }
}

/// Spawns reconciliation runs for a depositor.
#[derive(Debug, Clone)]
pub struct BalancePoller {
    api: Arc<dyn GatewayApi>,
    cache: BalanceCache,
    schedule: PollSchedule,
    metrics: Arc<PollerMetrics>,
}

impl BalancePoller {
    /// Creates a new poller writing into `cache`.
    pub fn new(api: Arc<dyn GatewayApi>, cache: BalanceCache, schedule: PollSchedule) -> Self {
        Self { api, cache, schedule, metrics: Default::default() }
    }

    /// Returns the cache this poller writes into.
    pub fn cache(&self) -> &BalanceCache {
        &self.cache
    }

    /// Starts watching the balance of `depositor` on `domain` until it moves away from `before`
    /// in the direction of `change`.
    ///
    /// Supersedes any run already watching `domain`.
    pub async fn watch(
        &self,
        domain: u32,
        depositor: Address,
        before: Decimal,
        change: BalanceChange,
    ) -> PollHandle {
        let generation = self.cache.next_generation(domain).await;
        let (cancel, cancelled) = watch::channel(false);

        let this = self.clone();
        let task = tokio::spawn(async move {
            this.run(domain, generation, depositor, before, change, cancelled).await
        });

        PollHandle { domain, generation, cancel, task }
    }

    #[instrument(skip(self, cancelled), fields(generation = generation.get()))]
    async fn run(
        self,
        domain: u32,
        generation: Generation,
        depositor: Address,
        before: Decimal,
        change: BalanceChange,
        mut cancelled: watch::Receiver<bool>,
    ) -> PollOutcome {
        for delay in self.schedule.iter() {
            tokio::select! {
                biased;
                _ = wait_cancelled(&mut cancelled) => {
                    debug!("Poller cancelled");
                    return PollOutcome::Cancelled;
                }
                _ = tokio::time::sleep(delay) => {}
            }

            if !self.cache.is_current(domain, generation).await {
                return self.superseded();
            }

            self.metrics.attempts.increment(1);
            let domains = std::slice::from_ref(&domain);
            let balance = match self.api.balances(USDC_TOKEN, depositor, Some(domains)).await {
                Ok(balances) => balances.for_domain(domain),
                Err(err) => {
                    self.metrics.errors.increment(1);
                    warn!(%err, "Failed to poll balance");
                    continue;
                }
            };

            let Some(balance) = balance else {
                debug!("Domain missing from balances response");
                continue;
            };

            if !change.observed(before, balance) {
                debug!(%balance, "Balance unchanged");
                continue;
            }

            if !self.cache.store(domain, generation, balance).await {
                return self.superseded();
            }

            let delta = balance - before;
            info!(%balance, %delta, "Observed balance change");
            self.metrics.observed.increment(1);
            return PollOutcome::Observed { balance, delta };
        }

        if !self.cache.is_current(domain, generation).await {
            return self.superseded();
        }

        let expired = self.cache.expire(domain, generation).await;
        warn!(pending = expired.len(), "Balance change not observed in time");
        self.metrics.timed_out.increment(1);
        PollOutcome::StillPending
    }

    fn superseded(&self) -> PollOutcome {
        debug!("Poller superseded by a newer generation");
        self.metrics.superseded.increment(1);
        PollOutcome::Superseded
    }
}

/// Resolves once cancellation is requested, never if the handle is dropped first.
async fn wait_cancelled(cancelled: &mut watch::Receiver<bool>) {
    if cancelled.wait_for(|cancelled| *cancelled).await.is_err() {
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::ApiError,
        testing::FakeApi,
        types::{OperationKind, PendingOperation, UnifiedBalance, UnifiedBalances},
    };
    use alloy::primitives::address;
    use std::time::Duration;
    use tokio::sync::Notify;

    const DEPOSITOR: Address = address!("0x4242424242424242424242424242424242424242");

    fn poller(api: Arc<dyn GatewayApi>, delays: &[u64]) -> BalancePoller {
        BalancePoller::new(
            api,
            BalanceCache::new(),
            PollSchedule::new(delays.iter().copied().map(Duration::from_secs)),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn observes_increase_on_third_poll() {
        let api = Arc::new(FakeApi::default());
        api.script_balances([Some(100.into()), Some(100.into()), Some(150.into())]);

        let poller = poller(api.clone(), &[1, 2, 3, 5]);
        let handle = poller.watch(0, DEPOSITOR, 100.into(), BalanceChange::Increase).await;

        assert_eq!(
            handle.outcome().await,
            PollOutcome::Observed { balance: 150.into(), delta: 50.into() }
        );
        assert_eq!(api.balance_calls(), 3);
        assert_eq!(poller.cache().get(0).await.map(|cached| cached.balance), Some(150.into()));
    }

    #[tokio::test(start_paused = true)]
    async fn errors_are_swallowed() {
        let api = Arc::new(FakeApi::default());
        api.script_balances([None, None, Some(90.into())]);

        let poller = poller(api.clone(), &[1, 1, 1]);
        let handle = poller.watch(3, DEPOSITOR, 100.into(), BalanceChange::Decrease).await;

        assert_eq!(
            handle.outcome().await,
            PollOutcome::Observed { balance: 90.into(), delta: (-10).into() }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_schedule_is_still_pending() {
        let api = Arc::new(FakeApi::default().with_balance(0, 100.into()));
        let poller = poller(api.clone(), &[1, 2, 3]);
        poller
            .cache()
            .add_pending(PendingOperation::new(OperationKind::Deposit, 0, 10.into()))
            .await;

        let handle = poller.watch(0, DEPOSITOR, 100.into(), BalanceChange::Increase).await;

        assert_eq!(handle.outcome().await, PollOutcome::StillPending);
        assert_eq!(api.balance_calls(), 3);
        assert!(poller.cache().pending().await.is_empty());
        assert_eq!(poller.cache().get(0).await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_stops_ticks() {
        let api = Arc::new(FakeApi::default().with_balance(0, 100.into()));
        let poller = poller(api.clone(), &[1, 60, 60]);

        let handle = poller.watch(0, DEPOSITOR, 100.into(), BalanceChange::Increase).await;
        tokio::time::sleep(Duration::from_secs(5)).await;
        handle.cancel();

        assert_eq!(handle.outcome().await, PollOutcome::Cancelled);
        assert_eq!(api.balance_calls(), 1);
    }

    /// Answers balance queries only once the gate is opened.
    #[derive(Debug)]
    struct GatedApi {
        gate: Notify,
        balance: Decimal,
    }

    #[async_trait::async_trait]
    impl GatewayApi for GatedApi {
        async fn info(&self) -> Result<serde_json::Value, ApiError> {
            Ok(serde_json::Value::Null)
        }

        async fn balances(
            &self,
            token: &str,
            depositor: Address,
            domains: Option<&[u32]>,
        ) -> Result<UnifiedBalances, ApiError> {
            assert_eq!(token, USDC_TOKEN);
            self.gate.notified().await;
            Ok(domains
                .unwrap_or_default()
                .iter()
                .map(|domain| UnifiedBalance { domain: *domain, depositor, balance: self.balance })
                .collect::<Vec<_>>()
                .into())
        }

        async fn transfer(
            &self,
            _requests: crate::api::TransferRequests,
        ) -> Result<crate::api::TransferResponse, ApiError> {
            unreachable!()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn superseded_result_is_discarded() {
        let api = Arc::new(GatedApi { gate: Notify::new(), balance: 150.into() });
        let poller = poller(api.clone(), &[1, 1, 1]);

        let stale = poller.watch(0, DEPOSITOR, 100.into(), BalanceChange::Increase).await;
        // let the first run reach its in-flight query
        tokio::time::sleep(Duration::from_secs(2)).await;

        let current = poller.watch(0, DEPOSITOR, 100.into(), BalanceChange::Increase).await;
        current.cancel();
        assert!(current.generation() > stale.generation());

        // the stale query now resolves with a balance that would count as success
        api.gate.notify_one();
        assert_eq!(stale.outcome().await, PollOutcome::Superseded);
        assert_eq!(poller.cache().get(0).await, None);

        assert_eq!(current.outcome().await, PollOutcome::Cancelled);
    }
}
