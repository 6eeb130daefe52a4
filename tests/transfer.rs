//! End-to-end transfer and deposit runs through the public API, backed by the in-memory fakes.

use alloy::primitives::{Address, ChainId, address};
use gateway::{
    config::GatewayConfig,
    orchestrator::{
        DepositRequest, DepositState, TransferEvent, TransferOrchestrator, TransferRequest,
        TransferState,
    },
    poller::{BalanceCache, PollOutcome},
    testing::{FakeApi, FakeSigner, FakeWallet},
};
use rust_decimal::Decimal;
use std::{str::FromStr, sync::Arc};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const DEPOSITOR: Address = address!("0x70997970C51812dc3A010C7d01b50e0d17dc79C8");
const SEPOLIA: ChainId = 11155111;
const BASE_SEPOLIA: ChainId = 84532;

fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_test_writer())
        .with(EnvFilter::from_default_env())
        .try_init();
}

fn decimal(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

#[tokio::test(start_paused = true)]
async fn transfer_to_another_chain() {
    init_tracing();

    let api = Arc::new(FakeApi::default());
    // the pre-check sees 2000, the first poll sees the burn of 1000 plus the max fee
    api.script_balances([Some(decimal("2000")), Some(decimal("997.99"))]);
    let signer = Arc::new(FakeSigner::default());
    let wallet = Arc::new(FakeWallet::new(DEPOSITOR, SEPOLIA));

    let (orchestrator, mut events) = TransferOrchestrator::with_events(
        &GatewayConfig::default(),
        api.clone(),
        signer.clone(),
        wallet.clone(),
        BalanceCache::new(),
    );

    let receipt = orchestrator
        .transfer(TransferRequest {
            amount: decimal("1000"),
            source_domain: 0,
            destination_domain: 6,
            destination_chain_id: BASE_SEPOLIA,
            recipient: None,
        })
        .await
        .unwrap();

    assert_eq!(receipt.mint_tx, FakeWallet::tx_hash(1));
    assert_eq!(wallet.switches(), [BASE_SEPOLIA]);
    assert_eq!(wallet.calls().len(), 1);
    assert_eq!(wallet.calls()[0].1.to, orchestrator.registry().minter);
    assert_eq!(signer.requests()[0].0, DEPOSITOR);
    assert_eq!(api.transfers().len(), 1);

    let mut states = Vec::new();
    while let Ok(event) = events.try_recv() {
        let TransferEvent::Transfer { state, .. } = event else {
            panic!("unexpected deposit event");
        };
        states.push(state);
    }
    assert_eq!(
        states,
        [
            TransferState::CheckingBalance,
            TransferState::BuildingIntent,
            TransferState::AwaitingSignature,
            TransferState::RequestingAttestation,
            TransferState::SwitchingChain,
            TransferState::Minting,
            TransferState::Confirming,
            TransferState::Succeeded { tx_hash: FakeWallet::tx_hash(1) },
        ]
    );

    let [reconciliation] = <[_; 1]>::try_from(receipt.reconciliation).unwrap();
    assert_eq!(reconciliation.domain(), 0);
    assert_eq!(
        reconciliation.outcome().await,
        PollOutcome::Observed { balance: decimal("997.99"), delta: decimal("-1002.01") }
    );
    assert_eq!(orchestrator.cache().get(0).await.unwrap().balance, decimal("997.99"));
    assert!(orchestrator.cache().pending().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn deposit_then_transfer_share_the_cache() {
    init_tracing();

    let api = Arc::new(FakeApi::default().with_balance(0, decimal("10")));
    let wallet = Arc::new(FakeWallet::new(DEPOSITOR, SEPOLIA));
    let orchestrator = TransferOrchestrator::new(
        &GatewayConfig::default(),
        api.clone(),
        Arc::new(FakeSigner::default()),
        wallet.clone(),
        BalanceCache::new(),
    );

    // before-balance, then one unchanged poll, then the deposit lands
    api.script_balances([Some(decimal("0")), Some(decimal("0")), Some(decimal("10"))]);
    let run =
        orchestrator.prepare_deposit(DepositRequest { amount: decimal("10"), chain_id: SEPOLIA });
    let state = run.subscribe();
    let deposit = run.run().await.unwrap();
    assert_eq!(*state.borrow(), DepositState::Succeeded { tx_hash: FakeWallet::tx_hash(2) });
    assert_eq!(
        deposit.reconciliation.outcome().await,
        PollOutcome::Observed { balance: decimal("10"), delta: decimal("10") }
    );

    // a transfer of 9 needs 9 plus the 2.01 max fee
    let err = orchestrator
        .transfer(TransferRequest {
            amount: decimal("9"),
            source_domain: 0,
            destination_domain: 6,
            destination_chain_id: BASE_SEPOLIA,
            recipient: None,
        })
        .await
        .unwrap_err();
    assert!(err.is_validation());
    assert_eq!(wallet.calls().len(), 2);
    assert_eq!(orchestrator.cache().get(0).await.unwrap().balance, decimal("10"));
}
