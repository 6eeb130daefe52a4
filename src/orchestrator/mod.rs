//! Transfer and deposit state machines.
//!
//! A [`TransferOrchestrator`] is built once and shared. Each call to
//! [`TransferOrchestrator::transfer`] or [`TransferOrchestrator::deposit`] is an independent run,
//! whose state can be observed through [`TransferRun::subscribe`] or the orchestrator-wide
//! [`TransferEvent`] channel.

mod deposit;
pub use deposit::{DepositReceipt, DepositRequest, DepositRun};

mod state;
pub use state::{DepositState, Failure, TransferEvent, TransferState};

mod transfer;
pub use transfer::{
    BatchTransferRequest, TransferLeg, TransferReceipt, TransferRequest, TransferRun,
};

use crate::{
    api::GatewayApi,
    config::{GatewayConfig, Timeouts},
    error::GatewayError,
    metrics::TransferMetrics,
    poller::{BalanceCache, BalancePoller},
    signers::TypedDataSigner,
    types::{FeePolicy, GatewayRegistry},
    wallet::Wallet,
};
use alloy::primitives::ChainId;
use futures_util::FutureExt;
use std::{
    any::Any,
    future::Future,
    panic::AssertUnwindSafe,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};
use tokio::sync::mpsc;

/// Result of a transfer run.
pub type TransferOutcome = Result<TransferReceipt, GatewayError>;

/// Result of a deposit run.
pub type DepositOutcome = Result<DepositReceipt, GatewayError>;

#[derive(Debug)]
struct OrchestratorInner {
    api: Arc<dyn GatewayApi>,
    signer: Arc<dyn TypedDataSigner>,
    wallet: Arc<dyn Wallet>,
    registry: GatewayRegistry,
    fees: FeePolicy,
    timeouts: Timeouts,
    poller: BalancePoller,
    events_tx: Option<mpsc::UnboundedSender<TransferEvent>>,
    next_run: AtomicU64,
    metrics: TransferMetrics,
}

impl OrchestratorInner {
    fn emit(&self, event: TransferEvent) {
        if let Some(events_tx) = &self.events_tx {
            let _ = events_tx.send(event);
        }
    }

    /// Switches the wallet to `chain_id` unless it is already there.
    async fn ensure_chain(&self, chain_id: ChainId) -> Result<(), GatewayError> {
        if self.wallet.chain_id() == chain_id {
            return Ok(());
        }

        with_timeout(self.timeouts.chain_switch, self.wallet.switch_chain(chain_id), || {
            GatewayError::InternalError(format!("timed out switching to chain {chain_id}"))
        })
        .await??;

        Ok(())
    }
}

/// Drives transfers and deposits through the Gateway.
#[derive(Debug, Clone)]
pub struct TransferOrchestrator {
    inner: Arc<OrchestratorInner>,
}

impl TransferOrchestrator {
    /// Creates a new orchestrator.
    ///
    /// The balances observed after each run are written into `cache`.
    pub fn new(
        config: &GatewayConfig,
        api: Arc<dyn GatewayApi>,
        signer: Arc<dyn TypedDataSigner>,
        wallet: Arc<dyn Wallet>,
        cache: BalanceCache,
    ) -> Self {
        Self::build(config, api, signer, wallet, cache, None)
    }

    /// Creates a new orchestrator publishing every state change of every run.
    pub fn with_events(
        config: &GatewayConfig,
        api: Arc<dyn GatewayApi>,
        signer: Arc<dyn TypedDataSigner>,
        wallet: Arc<dyn Wallet>,
        cache: BalanceCache,
    ) -> (Self, mpsc::UnboundedReceiver<TransferEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        (Self::build(config, api, signer, wallet, cache, Some(events_tx)), events_rx)
    }

    fn build(
        config: &GatewayConfig,
        api: Arc<dyn GatewayApi>,
        signer: Arc<dyn TypedDataSigner>,
        wallet: Arc<dyn Wallet>,
        cache: BalanceCache,
        events_tx: Option<mpsc::UnboundedSender<TransferEvent>>,
    ) -> Self {
        let poller = BalancePoller::new(api.clone(), cache, config.poller.clone());
        Self {
            inner: Arc::new(OrchestratorInner {
                api,
                signer,
                wallet,
                registry: config.registry(),
                fees: config.fees,
                timeouts: config.timeouts,
                poller,
                events_tx,
                next_run: AtomicU64::new(1),
                metrics: TransferMetrics::default(),
            }),
        }
    }

    /// Returns the balance cache the reconciliation pollers write into.
    pub fn cache(&self) -> &BalanceCache {
        self.inner.poller.cache()
    }

    /// Returns the registry in use.
    pub fn registry(&self) -> &GatewayRegistry {
        &self.inner.registry
    }

    fn next_run(&self) -> u64 {
        self.inner.next_run.fetch_add(1, Ordering::Relaxed)
    }

    /// Prepares a transfer run without starting it, so its state can be subscribed to first.
    pub fn prepare_transfer(&self, request: TransferRequest) -> TransferRun {
        TransferRun::new(self.inner.clone(), self.next_run(), request.into())
    }

    /// Prepares a transfer from several source domains, attested together and minted in a
    /// single transaction.
    pub fn prepare_batch(&self, request: BatchTransferRequest) -> TransferRun {
        TransferRun::new(self.inner.clone(), self.next_run(), request)
    }

    /// Moves USDC from the unified balance on one domain to a recipient on another chain.
    pub async fn transfer(&self, request: TransferRequest) -> TransferOutcome {
        self.prepare_transfer(request).run().await
    }

    /// Moves USDC from the unified balance on several domains to a recipient on another chain.
    pub async fn transfer_batch(&self, request: BatchTransferRequest) -> TransferOutcome {
        self.prepare_batch(request).run().await
    }

    /// Prepares a deposit run without starting it.
    pub fn prepare_deposit(&self, request: DepositRequest) -> DepositRun {
        DepositRun::new(self.inner.clone(), self.next_run(), request)
    }

    /// Deposits USDC from the wallet into the Gateway wallet on a chain.
    pub async fn deposit(&self, request: DepositRequest) -> DepositOutcome {
        self.prepare_deposit(request).run().await
    }
}

/// Awaits `fut` for at most `duration`, mapping the elapsed case with `on_timeout`.
async fn with_timeout<T, E>(
    duration: Duration,
    fut: impl Future<Output = Result<T, E>>,
    on_timeout: impl FnOnce() -> GatewayError,
) -> Result<Result<T, E>, GatewayError> {
    tokio::time::timeout(duration, fut).await.map_err(|_| on_timeout())
}

/// Awaits `fut`, turning a panic inside a collaborator into an [`GatewayError::InternalError`]
/// so the run still reaches a terminal state.
async fn catch_panic<T>(
    fut: impl Future<Output = Result<T, GatewayError>>,
) -> Result<T, GatewayError> {
    AssertUnwindSafe(fut).catch_unwind().await.unwrap_or_else(|panic| {
        Err(GatewayError::InternalError(format!("panicked: {}", panic_message(&*panic))))
    })
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown cause")
}
