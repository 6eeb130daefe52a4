use crate::{eip712::BurnIntentJson, error::ApiError, types::UnifiedBalance};
use alloy::primitives::{Address, Bytes};
use serde::{Deserialize, Serialize};

/// Body of `POST /balances`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalancesRequest {
    /// Token identifier, e.g. `USDC`.
    pub token: String,
    /// Depositor and domain pairs to query.
    pub sources: Vec<BalanceSource>,
}

/// A depositor on a domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSource {
    /// Owner of the balance.
    pub depositor: Address,
    /// Gateway domain.
    pub domain: u32,
}

/// Response of `POST /balances`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalancesResponse {
    /// Token identifier.
    pub token: String,
    /// Balance per queried source.
    pub balances: Vec<UnifiedBalance>,
}

/// A burn intent and the depositor's signature over it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedBurnIntent {
    /// The intent, with numbers as decimal strings.
    pub burn_intent: BurnIntentJson,
    /// Signature over the EIP-712 digest of the intent.
    pub signature: Bytes,
}

/// Body of `POST /transfer`.
///
/// A batch lets several intents (e.g. from multiple source domains) be attested in one
/// round-trip and minted in a single transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TransferRequests {
    /// A single intent.
    Single(SignedBurnIntent),
    /// Several intents.
    Batch(Vec<SignedBurnIntent>),
}

impl TransferRequests {
    /// Returns the number of intents.
    pub fn len(&self) -> usize {
        match self {
            Self::Single(_) => 1,
            Self::Batch(requests) => requests.len(),
        }
    }

    /// Whether there are no intents.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<SignedBurnIntent> for TransferRequests {
    fn from(request: SignedBurnIntent) -> Self {
        Self::Single(request)
    }
}

impl From<Vec<SignedBurnIntent>> for TransferRequests {
    fn from(requests: Vec<SignedBurnIntent>) -> Self {
        Self::Batch(requests)
    }
}

/// Response of `POST /transfer`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferResponse {
    /// Attestation payload to pass to `gatewayMint`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attestation: Option<Bytes>,
    /// Service signature over the attestation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<Bytes>,
    /// Fee breakdown, passed through.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fees: Option<serde_json::Value>,
    /// Set to `false` on rejection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    /// Reason of a rejection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// An accepted attestation, consumed by the destination chain mint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attestation {
    /// Attestation payload.
    pub payload: Bytes,
    /// Service signature over the payload.
    pub signature: Bytes,
    /// Fee breakdown, if reported.
    pub fees: Option<serde_json::Value>,
}

impl TransferResponse {
    /// Interprets the response: `success: false` or a missing attestation are final rejections.
    pub fn into_attestation(self) -> Result<Attestation, ApiError> {
        let rejected =
            || ApiError::Rejected(self.message.clone().unwrap_or_else(|| "no attestation".into()));

        if self.success == Some(false) {
            return Err(rejected());
        }

        match (&self.attestation, &self.signature) {
            (Some(payload), Some(signature)) if !payload.is_empty() => Ok(Attestation {
                payload: payload.clone(),
                signature: signature.clone(),
                fees: self.fees.clone(),
            }),
            _ => Err(rejected()),
        }
    }
}
