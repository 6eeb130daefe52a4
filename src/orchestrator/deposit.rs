use super::{DepositOutcome, DepositState, OrchestratorInner, TransferEvent, catch_panic};
use crate::{
    constants::USDC_TOKEN,
    error::GatewayError,
    poller::{BalanceChange, PollHandle},
    types::{IERC20, IGatewayWallet, OperationKind, PendingOperation, usdc},
    wallet::ContractCall,
};
use alloy::primitives::{ChainId, TxHash};
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

/// A deposit of USDC from the wallet into the Gateway wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepositRequest {
    /// Amount to deposit, in USDC.
    pub amount: Decimal,
    /// Chain to deposit on.
    pub chain_id: ChainId,
}

/// A successful deposit.
#[derive(Debug)]
pub struct DepositReceipt {
    /// The deposit transaction.
    pub tx_hash: TxHash,
    /// Reconciliation of the deposited balance.
    pub reconciliation: PollHandle,
}

/// A single deposit run.
#[derive(Debug)]
pub struct DepositRun {
    inner: Arc<OrchestratorInner>,
    id: u64,
    request: DepositRequest,
    state: watch::Sender<DepositState>,
}

impl DepositRun {
    pub(super) fn new(inner: Arc<OrchestratorInner>, id: u64, request: DepositRequest) -> Self {
        let (state, _) = watch::channel(DepositState::Idle);
        Self { inner, id, request, state }
    }

    /// Identifier of the run, as found in [`TransferEvent`]s.
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Subscribes to the state of the run.
    pub fn subscribe(&self) -> watch::Receiver<DepositState> {
        self.state.subscribe()
    }

    /// Runs the deposit to a terminal state.
    #[instrument(skip(self), fields(run = self.id, chain_id = self.request.chain_id))]
    pub async fn run(self) -> DepositOutcome {
        self.inner.metrics.deposits_started.increment(1);

        match catch_panic(self.execute()).await {
            Ok(receipt) => {
                self.inner.metrics.deposits_succeeded.increment(1);
                info!(tx_hash = %receipt.tx_hash, "Deposit succeeded");
                self.set(DepositState::Succeeded { tx_hash: receipt.tx_hash });
                Ok(receipt)
            }
            Err(err) => {
                self.inner.metrics.deposits_failed.increment(1);
                warn!(%err, kind = ?err.kind(), "Deposit failed");
                self.set(DepositState::Failed((&err).into()));
                Err(err)
            }
        }
    }

    fn set(&self, state: DepositState) {
        debug!(?state, "Deposit state changed");
        self.state.send_replace(state.clone());
        self.inner.emit(TransferEvent::Deposit { run: self.id, state });
    }

    /// Sends a transaction and waits for it to succeed.
    async fn send(&self, call: ContractCall, what: &str) -> Result<TxHash, GatewayError> {
        let tx_hash = self.inner.wallet.write_contract(call).await?;
        let receipt = self.inner.wallet.wait_for_receipt(tx_hash).await?;
        if !receipt.success {
            let message = format!("{what} transaction {tx_hash} reverted");
            return Err(GatewayError::InternalError(message));
        }
        Ok(tx_hash)
    }

    /// Snapshot of the unified balance the reconciliation compares against.
    ///
    /// Falls back to the last reconciled balance when the API is unavailable.
    async fn balance_before(&self, domain: u32) -> Result<Decimal, GatewayError> {
        let inner = &self.inner;
        let depositor = inner.wallet.address();

        match inner.api.balances(USDC_TOKEN, depositor, Some(&[domain][..])).await {
            Ok(balances) => Ok(balances.for_domain(domain).unwrap_or_default()),
            Err(err) => match inner.poller.cache().get(domain).await {
                Some(cached) => {
                    warn!(%err, balance = %cached.balance, "Using cached balance");
                    Ok(cached.balance)
                }
                None => Err(err.into()),
            },
        }
    }

    async fn execute(&self) -> DepositOutcome {
        let inner = &self.inner;
        let DepositRequest { amount, chain_id } = self.request;
        let depositor = inner.wallet.address();

        let value = usdc::to_units(amount)?;
        if value.is_zero() {
            return Err(GatewayError::InvalidParameters("amount must be positive".into()));
        }
        let registry = &inner.registry;
        let (Some(domain), Some(token)) = (registry.domain(chain_id), registry.usdc(chain_id))
        else {
            return Err(GatewayError::UnsupportedToken(format!("no USDC on chain {chain_id}")));
        };

        let before = self.balance_before(domain).await?;

        self.set(DepositState::Approving);
        inner.ensure_chain(chain_id).await?;
        self.send(
            ContractCall::new(token, IERC20::approveCall { spender: registry.wallet, value }),
            "approval",
        )
        .await?;

        self.set(DepositState::Depositing);
        let tx_hash = self
            .send(
                ContractCall::new(registry.wallet, IGatewayWallet::depositCall { token, value }),
                "deposit",
            )
            .await?;

        inner
            .poller
            .cache()
            .add_pending(PendingOperation::new(OperationKind::Deposit, domain, amount))
            .await;
        let reconciliation =
            inner.poller.watch(domain, depositor, before, BalanceChange::Increase).await;

        Ok(DepositReceipt { tx_hash, reconciliation })
    }
}
