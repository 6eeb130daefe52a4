//! Chain access used to submit deposits and mints.

use crate::{
    constants::DEFAULT_RECEIPT_TIMEOUT,
    signers::DynSigner,
    types::{GatewayRegistry, IGatewayWallet, usdc},
};
use alloy::{
    consensus::{SignableTransaction, TxEip1559, TxEnvelope},
    network::ReceiptResponse,
    primitives::{Address, Bytes, ChainId, TxHash, U256},
    providers::{DynProvider, Provider},
    rpc::types::TransactionRequest,
    sol_types::SolCall,
};
use eyre::{OptionExt, WrapErr};
use rust_decimal::Decimal;
use std::{
    collections::HashMap,
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};
use tracing::{debug, instrument};

/// A contract call to submit as a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractCall {
    /// The contract.
    pub to: Address,
    /// ABI encoded calldata.
    pub input: Bytes,
}

impl ContractCall {
    /// Creates a new [`ContractCall`] from a typed `sol!` call.
    pub fn new(to: Address, call: impl SolCall) -> Self {
        Self { to, input: call.abi_encode().into() }
    }
}

/// Receipt of an included transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxReceipt {
    /// Transaction hash.
    pub hash: TxHash,
    /// Block the transaction was included in.
    pub block_number: Option<u64>,
    /// Whether the transaction executed successfully.
    pub success: bool,
}

/// A connected wallet able to switch chains and send transactions.
#[async_trait::async_trait]
pub trait Wallet: std::fmt::Debug + Send + Sync {
    /// The connected account.
    fn address(&self) -> Address;

    /// The chain the wallet currently sends transactions to.
    fn chain_id(&self) -> ChainId;

    /// Switches the active chain.
    async fn switch_chain(&self, chain_id: ChainId) -> eyre::Result<()>;

    /// Signs and submits a transaction on the active chain, returning its hash.
    async fn write_contract(&self, call: ContractCall) -> eyre::Result<TxHash>;

    /// Waits for a transaction on the active chain to be included.
    async fn wait_for_receipt(&self, hash: TxHash) -> eyre::Result<TxReceipt>;
}

/// A [`Wallet`] backed by a [`DynSigner`] and one provider per chain.
#[derive(Debug)]
pub struct ProviderWallet {
    providers: HashMap<ChainId, DynProvider>,
    signer: DynSigner,
    active_chain: AtomicU64,
    receipt_timeout: Duration,
    poll_interval: Duration,
}

impl ProviderWallet {
    /// Creates a new wallet, initially on `chain_id`.
    pub fn new(
        signer: DynSigner,
        providers: HashMap<ChainId, DynProvider>,
        chain_id: ChainId,
    ) -> eyre::Result<Self> {
        if !providers.contains_key(&chain_id) {
            eyre::bail!("provider not found for chain {chain_id}");
        }

        Ok(Self {
            providers,
            signer,
            active_chain: AtomicU64::new(chain_id),
            receipt_timeout: DEFAULT_RECEIPT_TIMEOUT,
            poll_interval: Duration::from_secs(2),
        })
    }

    /// Sets how long to wait for transactions to be included.
    pub fn with_receipt_timeout(mut self, timeout: Duration) -> Self {
        self.receipt_timeout = timeout;
        self
    }

    fn provider(&self, chain_id: ChainId) -> eyre::Result<&DynProvider> {
        self.providers
            .get(&chain_id)
            .ok_or_else(|| eyre::eyre!("provider not found for chain {chain_id}"))
    }

    /// Reads the Gateway wallet balance of `depositor` on `chain_id` directly from the chain.
    ///
    /// Unlike the API balance this reflects deposits as soon as they are included, but does
    /// not account for burns attested on other chains yet.
    pub async fn available_balance(
        &self,
        registry: &GatewayRegistry,
        chain_id: ChainId,
        depositor: Address,
    ) -> eyre::Result<Decimal> {
        let call = available_balance_call(registry, chain_id, depositor)?;
        let provider = self.provider(chain_id)?;

        let output = provider
            .call(TransactionRequest::default().to(call.to).input(call.input.into()))
            .await
            .wrap_err("availableBalance call failed")?;
        let units = IGatewayWallet::availableBalanceCall::abi_decode_returns(&output)?;

        Ok(usdc::from_units(units)?)
    }
}

/// The `availableBalance` read of `depositor` on `chain_id`.
fn available_balance_call(
    registry: &GatewayRegistry,
    chain_id: ChainId,
    depositor: Address,
) -> eyre::Result<ContractCall> {
    let token = registry.usdc(chain_id).ok_or_eyre("no USDC deployment for chain")?;
    Ok(ContractCall::new(registry.wallet, IGatewayWallet::availableBalanceCall { token, depositor }))
}

#[async_trait::async_trait]
impl Wallet for ProviderWallet {
    fn address(&self) -> Address {
        self.signer.address()
    }

    fn chain_id(&self) -> ChainId {
        self.active_chain.load(Ordering::Relaxed)
    }

    async fn switch_chain(&self, chain_id: ChainId) -> eyre::Result<()> {
        self.provider(chain_id)?;
        self.active_chain.store(chain_id, Ordering::Relaxed);
        Ok(())
    }

    #[instrument(skip_all, fields(chain_id = self.chain_id(), to = %call.to))]
    async fn write_contract(&self, call: ContractCall) -> eyre::Result<TxHash> {
        let chain_id = self.chain_id();
        let provider = self.provider(chain_id)?;

        let nonce = provider.get_transaction_count(self.signer.address()).await?;
        let fees = provider.estimate_eip1559_fees().await?;

        let gas_limit = provider
            .estimate_gas(
                TransactionRequest::default()
                    .to(call.to)
                    .input(call.input.clone().into())
                    .from(self.signer.address()),
            )
            .await?;

        let mut tx = TxEip1559 {
            chain_id,
            nonce,
            gas_limit,
            max_fee_per_gas: fees.max_fee_per_gas,
            max_priority_fee_per_gas: fees.max_priority_fee_per_gas,
            to: call.to.into(),
            input: call.input,
            value: U256::ZERO,
            ..Default::default()
        };

        let signature = self.signer.sign_transaction(&mut tx).await?;
        let tx = TxEnvelope::Eip1559(tx.into_signed(signature));

        let hash = *provider.send_tx_envelope(tx).await?.tx_hash();
        debug!(%hash, nonce, "Sent transaction");

        Ok(hash)
    }

    #[instrument(skip(self), fields(chain_id = self.chain_id()))]
    async fn wait_for_receipt(&self, hash: TxHash) -> eyre::Result<TxReceipt> {
        let provider = self.provider(self.chain_id())?;

        let receipt = tokio::time::timeout(self.receipt_timeout, async {
            loop {
                if let Some(receipt) = provider.get_transaction_receipt(hash).await? {
                    break Ok::<_, eyre::Error>(receipt);
                }
                tokio::time::sleep(self.poll_interval).await;
            }
        })
        .await
        .map_err(|_| eyre::eyre!("transaction {hash} not included in time"))??;

        Ok(TxReceipt { hash, block_number: receipt.block_number, success: receipt.status() })
    }
}
