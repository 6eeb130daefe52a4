use crate::error::{ErrorKind, GatewayError};
use alloy::primitives::TxHash;

/// State of a transfer run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferState {
    /// Not started yet.
    Idle,
    /// Checking the unified balance covers amount and fees.
    CheckingBalance,
    /// Assembling the burn intents.
    BuildingIntent,
    /// Waiting for the wallet to sign.
    AwaitingSignature,
    /// Waiting for the Gateway API to attest.
    RequestingAttestation,
    /// Waiting for the wallet to switch to the destination chain.
    SwitchingChain,
    /// Submitting the mint transaction.
    Minting,
    /// Waiting for the mint transaction to be included.
    Confirming,
    /// The funds were minted.
    Succeeded {
        /// The mint transaction.
        tx_hash: TxHash,
    },
    /// The run failed.
    Failed(Failure),
}

impl TransferState {
    /// Whether the run is over.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded { .. } | Self::Failed(_))
    }
}

/// State of a deposit run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DepositState {
    /// Not started yet.
    Idle,
    /// Approving the Gateway wallet to pull USDC.
    Approving,
    /// Depositing into the Gateway wallet.
    Depositing,
    /// The deposit was included.
    Succeeded {
        /// The deposit transaction.
        tx_hash: TxHash,
    },
    /// The run failed.
    Failed(Failure),
}

impl DepositState {
    /// Whether the run is over.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded { .. } | Self::Failed(_))
    }
}

/// Terminal failure of a run, as presented to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    /// What went wrong.
    pub kind: ErrorKind,
    /// Human readable message.
    pub message: String,
}

impl From<&GatewayError> for Failure {
    fn from(err: &GatewayError) -> Self {
        Self { kind: err.kind(), message: err.to_string() }
    }
}

/// A state change of any run of a [`TransferOrchestrator`](super::TransferOrchestrator).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferEvent {
    /// A transfer run changed state.
    Transfer {
        /// Run identifier.
        run: u64,
        /// New state.
        state: TransferState,
    },
    /// A deposit run changed state.
    Deposit {
        /// Run identifier.
        run: u64,
        /// New state.
        state: DepositState,
    },
}
