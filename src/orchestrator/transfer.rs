use super::{
    OrchestratorInner, TransferEvent, TransferOutcome, TransferState, catch_panic, with_timeout,
};
use crate::{
    api::{SignedBurnIntent, TransferRequests},
    constants::USDC_TOKEN,
    eip712,
    error::GatewayError,
    poller::{BalanceChange, PollHandle},
    types::{
        BurnIntent, BurnIntentParams, IGatewayMinter, OperationKind, PendingOperation, usdc,
    },
    wallet::ContractCall,
};
use alloy::primitives::{Address, ChainId, TxHash, U256};
use rust_decimal::Decimal;
use std::{collections::HashSet, sync::Arc, time::Instant};
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

/// A transfer from the unified balance on one domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    /// Amount to receive on the destination, in USDC.
    pub amount: Decimal,
    /// Domain whose unified balance is burned.
    pub source_domain: u32,
    /// Domain to mint on.
    pub destination_domain: u32,
    /// Chain of the destination domain.
    pub destination_chain_id: ChainId,
    /// Receiver of the minted funds, defaults to the wallet account.
    pub recipient: Option<Address>,
}

/// Funds taken from one source domain of a [`BatchTransferRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferLeg {
    /// Domain whose unified balance is burned.
    pub source_domain: u32,
    /// Amount taken from it, in USDC.
    pub amount: Decimal,
}

/// A transfer combining the unified balance of several source domains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchTransferRequest {
    /// One leg per source domain.
    pub legs: Vec<TransferLeg>,
    /// Domain to mint on.
    pub destination_domain: u32,
    /// Chain of the destination domain.
    pub destination_chain_id: ChainId,
    /// Receiver of the minted funds, defaults to the wallet account.
    pub recipient: Option<Address>,
}

impl From<TransferRequest> for BatchTransferRequest {
    fn from(request: TransferRequest) -> Self {
        Self {
            legs: vec![TransferLeg {
                source_domain: request.source_domain,
                amount: request.amount,
            }],
            destination_domain: request.destination_domain,
            destination_chain_id: request.destination_chain_id,
            recipient: request.recipient,
        }
    }
}

/// A successful transfer.
#[derive(Debug)]
pub struct TransferReceipt {
    /// The mint transaction on the destination chain.
    pub mint_tx: TxHash,
    /// Reconciliation of the burned balance, one per source domain.
    pub reconciliation: Vec<PollHandle>,
}

/// A leg with its on-chain parameters resolved.
#[derive(Debug)]
struct ResolvedLeg {
    source_domain: u32,
    amount: Decimal,
    units: U256,
    source_token: Address,
}

/// A single transfer run.
#[derive(Debug)]
pub struct TransferRun {
    inner: Arc<OrchestratorInner>,
    id: u64,
    request: BatchTransferRequest,
    state: watch::Sender<TransferState>,
}

impl TransferRun {
    pub(super) fn new(
        inner: Arc<OrchestratorInner>,
        id: u64,
        request: BatchTransferRequest,
    ) -> Self {
        let (state, _) = watch::channel(TransferState::Idle);
        Self { inner, id, request, state }
    }

    /// Identifier of the run, as found in [`TransferEvent`]s.
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Subscribes to the state of the run.
    pub fn subscribe(&self) -> watch::Receiver<TransferState> {
        self.state.subscribe()
    }

    /// Runs the transfer to a terminal state.
    #[instrument(skip(self), fields(run = self.id))]
    pub async fn run(self) -> TransferOutcome {
        let started = Instant::now();
        self.inner.metrics.started.increment(1);

        match catch_panic(self.execute()).await {
            Ok(receipt) => {
                self.inner.metrics.succeeded.increment(1);
                self.inner.metrics.duration.record(started.elapsed().as_millis() as f64);
                info!(tx_hash = %receipt.mint_tx, "Transfer succeeded");
                self.set(TransferState::Succeeded { tx_hash: receipt.mint_tx });
                Ok(receipt)
            }
            Err(err) => {
                self.inner.metrics.failed.increment(1);
                if err.is_validation() {
                    self.inner.metrics.rejected_locally.increment(1);
                }
                warn!(%err, kind = ?err.kind(), "Transfer failed");
                self.set(TransferState::Failed((&err).into()));
                Err(err)
            }
        }
    }

    fn set(&self, state: TransferState) {
        debug!(?state, "Transfer state changed");
        self.state.send_replace(state.clone());
        self.inner.emit(TransferEvent::Transfer { run: self.id, state });
    }

    /// Checks the request against the registry, without any external call.
    fn resolve(&self) -> Result<(Vec<ResolvedLeg>, Address), GatewayError> {
        let registry = &self.inner.registry;
        let request = &self.request;

        if request.legs.is_empty() {
            return Err(GatewayError::InvalidParameters("no source domain".into()));
        }

        let mut seen = HashSet::new();
        let legs = request
            .legs
            .iter()
            .map(|leg| {
                if !seen.insert(leg.source_domain) {
                    return Err(GatewayError::InvalidParameters(format!(
                        "source domain {} used twice",
                        leg.source_domain
                    )));
                }

                let units = usdc::to_units(leg.amount)?;
                if units.is_zero() {
                    return Err(GatewayError::InvalidParameters("amount must be positive".into()));
                }

                let domain = leg.source_domain;
                let source_token = registry.usdc_for_domain(domain).ok_or_else(|| {
                    GatewayError::UnsupportedToken(format!("no USDC on domain {domain}"))
                })?;

                Ok(ResolvedLeg {
                    source_domain: leg.source_domain,
                    amount: leg.amount,
                    units,
                    source_token,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let destination = request.destination_domain;
        let chain_id = registry.chain_id(destination).ok_or_else(|| {
            GatewayError::UnsupportedToken(format!("no USDC on domain {destination}"))
        })?;
        if chain_id != request.destination_chain_id {
            return Err(GatewayError::InvalidParameters(format!(
                "chain {} is not the chain of domain {destination}",
                request.destination_chain_id
            )));
        }
        let destination_token = registry.usdc(chain_id).ok_or_else(|| {
            GatewayError::UnsupportedToken(format!("no USDC on chain {chain_id}"))
        })?;

        Ok((legs, destination_token))
    }

    async fn execute(&self) -> TransferOutcome {
        let inner = &self.inner;
        let request = &self.request;
        let depositor = inner.wallet.address();

        self.set(TransferState::CheckingBalance);
        let (legs, destination_token) = self.resolve()?;

        let domains: Vec<u32> = legs.iter().map(|leg| leg.source_domain).collect();
        let balances = inner.api.balances(USDC_TOKEN, depositor, Some(&domains[..])).await?;
        let mut before = Vec::with_capacity(legs.len());
        for leg in &legs {
            let available = balances.for_domain(leg.source_domain).unwrap_or_default();
            let required = leg.amount + inner.fees.max_fee;
            if available < required {
                return Err(GatewayError::InsufficientBalance { available, required });
            }
            before.push(available);
        }

        self.set(TransferState::BuildingIntent);
        let recipient = request.recipient.unwrap_or(depositor);
        let intents = legs
            .iter()
            .map(|leg| {
                BurnIntent::build(
                    BurnIntentParams {
                        source_domain: leg.source_domain,
                        destination_domain: request.destination_domain,
                        source_contract: inner.registry.wallet.to_string(),
                        destination_contract: inner.registry.minter.to_string(),
                        source_token: leg.source_token.to_string(),
                        destination_token: destination_token.to_string(),
                        source_depositor: depositor.to_string(),
                        destination_recipient: recipient.to_string(),
                        amount: leg.units,
                        ..Default::default()
                    },
                    &inner.fees,
                )
            })
            .collect::<Result<Vec<_>, _>>()?;

        self.set(TransferState::AwaitingSignature);
        let mut signed = Vec::with_capacity(intents.len());
        for intent in &intents {
            let typed_data = eip712::typed_data(intent)?;
            let signature = with_timeout(
                inner.timeouts.signature,
                inner.signer.sign_typed_data(depositor, &typed_data),
                || GatewayError::SignatureTimeout,
            )
            .await??;
            signed.push(SignedBurnIntent { burn_intent: intent.into(), signature });
        }

        // the signed intents are spent from here on, a retry has to build new ones
        self.set(TransferState::RequestingAttestation);
        let requests: TransferRequests =
            if signed.len() == 1 { signed.swap_remove(0).into() } else { signed.into() };
        let attestation = inner.api.transfer(requests).await?.into_attestation()?;
        debug!(fees = ?attestation.fees, "Received attestation");

        if inner.wallet.chain_id() != request.destination_chain_id {
            self.set(TransferState::SwitchingChain);
            inner.ensure_chain(request.destination_chain_id).await?;
        }

        self.set(TransferState::Minting);
        let mint_tx = inner
            .wallet
            .write_contract(ContractCall::new(
                inner.registry.minter,
                IGatewayMinter::gatewayMintCall {
                    attestationPayload: attestation.payload,
                    signature: attestation.signature,
                },
            ))
            .await?;

        self.set(TransferState::Confirming);
        let receipt = inner.wallet.wait_for_receipt(mint_tx).await?;
        if !receipt.success {
            return Err(GatewayError::InternalError(format!("mint transaction {mint_tx} reverted")));
        }

        let mut reconciliation = Vec::with_capacity(legs.len());
        for (leg, before) in legs.iter().zip(before) {
            let cache = inner.poller.cache();
            cache
                .add_pending(PendingOperation::new(
                    OperationKind::Transfer,
                    leg.source_domain,
                    -leg.amount,
                ))
                .await;
            reconciliation.push(
                inner
                    .poller
                    .watch(leg.source_domain, depositor, before, BalanceChange::Decrease)
                    .await,
            );
        }

        Ok(TransferReceipt { mint_tx, reconciliation })
    }
}
