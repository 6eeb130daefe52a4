//! EIP-712 related helpers.
//!
//! Burn intents are signed as EIP-712 typed data under the Gateway wallet domain. This module
//! also owns the JSON representation of burn intents: the wallet and the Gateway API both
//! receive the same message, with every `uint256` rendered as a decimal string.

use crate::{
    constants::{EIP712_DOMAIN_NAME, EIP712_DOMAIN_VERSION},
    error::GatewayError,
    types::{BurnIntent, TransferSpec},
};
use alloy::{
    dyn_abi::TypedData,
    primitives::{Address, B256, Bytes, U256},
    sol_types::{Eip712Domain, SolStruct, eip712_domain},
};
use serde::{Deserialize, Serialize};

/// Returns the EIP-712 domain shared by every chain the Gateway is deployed on.
pub fn gateway_domain() -> Eip712Domain {
    eip712_domain! {
        name: EIP712_DOMAIN_NAME,
        version: EIP712_DOMAIN_VERSION,
    }
}

/// Left-pads an address to a 32 byte identifier.
pub fn address_to_bytes32(address: Address) -> B256 {
    address.into_word()
}

/// Strips the zero padding of an identifier.
///
/// Returns `None` if the upper 12 bytes are not zero, i.e. the identifier is not an EVM address.
pub fn bytes32_to_address(identifier: B256) -> Option<Address> {
    identifier[..12].iter().all(|byte| *byte == 0).then(|| Address::from_word(identifier))
}

/// Computes the EIP-712 digest of a [`BurnIntent`].
pub fn signing_hash(intent: &BurnIntent) -> B256 {
    intent.eip712_signing_hash(&gateway_domain())
}

/// Builds the [`TypedData`] the wallet has to sign for a [`BurnIntent`].
///
/// The message carries the decimal-string encoding of [`BurnIntentJson`].
pub fn typed_data(intent: &BurnIntent) -> Result<TypedData, GatewayError> {
    let mut typed_data = TypedData::from_struct(intent, Some(gateway_domain()));
    typed_data.message = serde_json::to_value(BurnIntentJson::from(intent))
        .map_err(|err| GatewayError::InternalError(format!("failed to encode intent: {err}")))?;

    debug_assert_eq!(typed_data.primary_type, "BurnIntent");
    debug_assert_eq!(typed_data.eip712_signing_hash().ok(), Some(signing_hash(intent)));

    Ok(typed_data)
}

/// JSON form of a [`BurnIntent`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BurnIntentJson {
    /// Upper bound on the source chain block height.
    #[serde(with = "alloy::serde::displayfromstr")]
    pub max_block_height: U256,
    /// Max fee in smallest units.
    #[serde(with = "alloy::serde::displayfromstr")]
    pub max_fee: U256,
    /// The transfer.
    pub spec: TransferSpecJson,
}

/// JSON form of a [`TransferSpec`]. Fields mirror the EIP-712 struct.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferSpecJson {
    pub version: u32,
    pub source_domain: u32,
    pub destination_domain: u32,
    pub source_contract: B256,
    pub destination_contract: B256,
    pub source_token: B256,
    pub destination_token: B256,
    pub source_depositor: B256,
    pub destination_recipient: B256,
    pub source_signer: B256,
    pub destination_caller: B256,
    #[serde(with = "alloy::serde::displayfromstr")]
    pub value: U256,
    pub salt: B256,
    pub hook_data: Bytes,
}

impl TransferSpecJson {
    /// Returns the addresses of the transfer in field order, with padding stripped.
    pub fn addresses(&self) -> Option<[Address; 8]> {
        Some([
            bytes32_to_address(self.source_contract)?,
            bytes32_to_address(self.destination_contract)?,
            bytes32_to_address(self.source_token)?,
            bytes32_to_address(self.destination_token)?,
            bytes32_to_address(self.source_depositor)?,
            bytes32_to_address(self.destination_recipient)?,
            bytes32_to_address(self.source_signer)?,
            bytes32_to_address(self.destination_caller)?,
        ])
    }
}

impl From<&BurnIntent> for BurnIntentJson {
    fn from(intent: &BurnIntent) -> Self {
        let spec = &intent.spec;
        Self {
            max_block_height: intent.maxBlockHeight,
            max_fee: intent.maxFee,
            spec: TransferSpecJson {
                version: spec.version,
                source_domain: spec.sourceDomain,
                destination_domain: spec.destinationDomain,
                source_contract: spec.sourceContract,
                destination_contract: spec.destinationContract,
                source_token: spec.sourceToken,
                destination_token: spec.destinationToken,
                source_depositor: spec.sourceDepositor,
                destination_recipient: spec.destinationRecipient,
                source_signer: spec.sourceSigner,
                destination_caller: spec.destinationCaller,
                value: spec.value,
                salt: spec.salt,
                hook_data: spec.hookData.clone(),
            },
        }
    }
}

impl From<BurnIntentJson> for BurnIntent {
    fn from(json: BurnIntentJson) -> Self {
        let spec = json.spec;
        Self {
            maxBlockHeight: json.max_block_height,
            maxFee: json.max_fee,
            spec: TransferSpec {
                version: spec.version,
                sourceDomain: spec.source_domain,
                destinationDomain: spec.destination_domain,
                sourceContract: spec.source_contract,
                destinationContract: spec.destination_contract,
                sourceToken: spec.source_token,
                destinationToken: spec.destination_token,
                sourceDepositor: spec.source_depositor,
                destinationRecipient: spec.destination_recipient,
                sourceSigner: spec.source_signer,
                destinationCaller: spec.destination_caller,
                value: spec.value,
                salt: spec.salt,
                hookData: spec.hook_data,
            },
        }
    }
}
