//! In-memory fakes of the Gateway API, the signer and the wallet.
//!
//! Each fake records how it was called so tests can assert on side effects.

use crate::{
    api::{GatewayApi, TransferRequests, TransferResponse},
    error::{ApiError, SignerError},
    signers::TypedDataSigner,
    types::{UnifiedBalance, UnifiedBalances},
    wallet::{ContractCall, TxReceipt, Wallet},
};
use alloy::{
    dyn_abi::TypedData,
    primitives::{Address, B256, Bytes, ChainId, TxHash, U256, bytes, map::HashMap},
};
use rust_decimal::Decimal;
use std::{
    collections::VecDeque,
    sync::{
        Mutex, MutexGuard, PoisonError,
        atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
    },
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Attestation payload returned by [`FakeApi`] unless configured otherwise.
pub const FAKE_ATTESTATION: Bytes = bytes!("a77e57a710");

/// Attestation signature returned by [`FakeApi`] unless configured otherwise.
pub const FAKE_ATTESTATION_SIGNATURE: Bytes = bytes!("5161a7");

/// Fake [`GatewayApi`].
///
/// Balance queries first consume the scripted answers, then fall back to fixed balances.
/// Transfers are accepted with [`FAKE_ATTESTATION`] by default.
#[derive(Debug, Default)]
pub struct FakeApi {
    balances: Mutex<HashMap<u32, Decimal>>,
    script: Mutex<VecDeque<Option<Decimal>>>,
    transfer_response: Mutex<Option<TransferResponse>>,
    transfer_unreachable: AtomicBool,
    balance_calls: AtomicUsize,
    transfers: Mutex<Vec<TransferRequests>>,
}

impl FakeApi {
    /// Sets the fixed balance of a domain.
    pub fn with_balance(self, domain: u32, balance: Decimal) -> Self {
        lock(&self.balances).insert(domain, balance);
        self
    }

    /// Queues answers to the next balance queries, `None` being a failed query.
    pub fn script_balances(&self, answers: impl IntoIterator<Item = Option<Decimal>>) {
        lock(&self.script).extend(answers);
    }

    /// Answers transfers with the given response.
    pub fn respond_with(&self, response: TransferResponse) {
        *lock(&self.transfer_response) = Some(response);
    }

    /// Fails transfers at the transport level.
    pub fn fail_transfers(&self) {
        self.transfer_unreachable.store(true, Ordering::Relaxed);
    }

    /// Number of balance queries received.
    pub fn balance_calls(&self) -> usize {
        self.balance_calls.load(Ordering::Relaxed)
    }

    /// Transfer requests received.
    pub fn transfers(&self) -> Vec<TransferRequests> {
        lock(&self.transfers).clone()
    }
}

#[async_trait::async_trait]
impl GatewayApi for FakeApi {
    async fn info(&self) -> Result<serde_json::Value, ApiError> {
        Ok(serde_json::json!({ "version": 1 }))
    }

    async fn balances(
        &self,
        _token: &str,
        depositor: Address,
        domains: Option<&[u32]>,
    ) -> Result<UnifiedBalances, ApiError> {
        self.balance_calls.fetch_add(1, Ordering::Relaxed);

        let scripted = lock(&self.script).pop_front();
        let balances = lock(&self.balances);
        let domains = match domains {
            Some(domains) => domains.to_vec(),
            None => {
                let mut domains: Vec<_> = balances.keys().copied().collect();
                domains.sort_unstable();
                domains
            }
        };

        let balance_of = |domain: u32| match scripted {
            Some(Some(balance)) => Ok(balance),
            Some(None) => Err(ApiError::Status { status: 503, body: "unavailable".into() }),
            None => Ok(balances.get(&domain).copied().unwrap_or_default()),
        };

        domains
            .into_iter()
            .map(|domain| Ok(UnifiedBalance { domain, depositor, balance: balance_of(domain)? }))
            .collect::<Result<Vec<_>, _>>()
            .map(Into::into)
    }

    async fn transfer(&self, requests: TransferRequests) -> Result<TransferResponse, ApiError> {
        lock(&self.transfers).push(requests);

        if self.transfer_unreachable.load(Ordering::Relaxed) {
            return Err(ApiError::Status { status: 502, body: "bad gateway".into() });
        }

        Ok(lock(&self.transfer_response).clone().unwrap_or_else(|| TransferResponse {
            attestation: Some(FAKE_ATTESTATION),
            signature: Some(FAKE_ATTESTATION_SIGNATURE),
            ..Default::default()
        }))
    }
}

/// How a [`FakeSigner`] answers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SignerBehavior {
    /// Returns a fixed signature.
    #[default]
    Sign,
    /// The user declines.
    Reject,
    /// The wallet fails.
    Fail,
    /// The wallet never answers.
    Hang,
    /// The signer implementation panics.
    Panic,
}

/// Fake [`TypedDataSigner`].
#[derive(Debug, Default)]
pub struct FakeSigner {
    behavior: Mutex<SignerBehavior>,
    requests: Mutex<Vec<(Address, TypedData)>>,
}

impl FakeSigner {
    /// Creates a signer answering with `behavior`.
    pub fn new(behavior: SignerBehavior) -> Self {
        Self { behavior: Mutex::new(behavior), ..Default::default() }
    }

    /// Changes how the signer answers.
    pub fn set_behavior(&self, behavior: SignerBehavior) {
        *lock(&self.behavior) = behavior;
    }

    /// Number of signature requests received.
    pub fn calls(&self) -> usize {
        lock(&self.requests).len()
    }

    /// Signature requests received.
    pub fn requests(&self) -> Vec<(Address, TypedData)> {
        lock(&self.requests).clone()
    }
}

#[async_trait::async_trait]
impl TypedDataSigner for FakeSigner {
    async fn sign_typed_data(
        &self,
        account: Address,
        typed_data: &TypedData,
    ) -> Result<Bytes, SignerError> {
        lock(&self.requests).push((account, typed_data.clone()));

        let behavior = *lock(&self.behavior);
        match behavior {
            SignerBehavior::Sign => Ok(Bytes::from(vec![0x5a; 65])),
            SignerBehavior::Reject => Err(SignerError::Rejected),
            SignerBehavior::Fail => Err(eyre::eyre!("wallet disconnected").into()),
            SignerBehavior::Hang => std::future::pending().await,
            SignerBehavior::Panic => panic!("signer crashed"),
        }
    }
}

/// Fake [`Wallet`].
///
/// Transactions get the hashes `1, 2, 3, ...` in submission order, see [`FakeWallet::tx_hash`].
#[derive(Debug)]
pub struct FakeWallet {
    address: Address,
    chain_id: AtomicU64,
    nonce: AtomicU64,
    revert: AtomicBool,
    switch_hangs: AtomicBool,
    calls: Mutex<Vec<(ChainId, ContractCall)>>,
    switches: Mutex<Vec<ChainId>>,
}

impl FakeWallet {
    /// Creates a wallet for `address`, initially on `chain_id`.
    pub fn new(address: Address, chain_id: ChainId) -> Self {
        Self {
            address,
            chain_id: AtomicU64::new(chain_id),
            nonce: AtomicU64::new(0),
            revert: AtomicBool::new(false),
            switch_hangs: AtomicBool::new(false),
            calls: Mutex::default(),
            switches: Mutex::default(),
        }
    }

    /// Hash of the `n`-th submitted transaction, starting at 1.
    pub fn tx_hash(n: u64) -> TxHash {
        B256::from(U256::from(n))
    }

    /// Makes every transaction revert.
    pub fn revert_transactions(&self) {
        self.revert.store(true, Ordering::Relaxed);
    }

    /// Makes chain switches never complete.
    pub fn hang_on_switch(&self) {
        self.switch_hangs.store(true, Ordering::Relaxed);
    }

    /// Contract calls submitted, with the chain they were sent on.
    pub fn calls(&self) -> Vec<(ChainId, ContractCall)> {
        lock(&self.calls).clone()
    }

    /// Chains switched to.
    pub fn switches(&self) -> Vec<ChainId> {
        lock(&self.switches).clone()
    }
}

#[async_trait::async_trait]
impl Wallet for FakeWallet {
    fn address(&self) -> Address {
        self.address
    }

    fn chain_id(&self) -> ChainId {
        self.chain_id.load(Ordering::Relaxed)
    }

    async fn switch_chain(&self, chain_id: ChainId) -> eyre::Result<()> {
        if self.switch_hangs.load(Ordering::Relaxed) {
            std::future::pending::<()>().await;
        }
        lock(&self.switches).push(chain_id);
        self.chain_id.store(chain_id, Ordering::Relaxed);
        Ok(())
    }

    async fn write_contract(&self, call: ContractCall) -> eyre::Result<TxHash> {
        lock(&self.calls).push((self.chain_id(), call));
        let n = self.nonce.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(Self::tx_hash(n))
    }

    async fn wait_for_receipt(&self, hash: TxHash) -> eyre::Result<TxReceipt> {
        Ok(TxReceipt {
            hash,
            block_number: Some(1),
            success: !self.revert.load(Ordering::Relaxed),
        })
    }
}
