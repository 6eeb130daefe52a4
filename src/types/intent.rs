use crate::{
    constants::{DEFAULT_MAX_FEE_UNITS, TRANSFER_SPEC_VERSION, USDC_DECIMALS},
    eip712::address_to_bytes32,
    error::GatewayError,
    types::usdc,
};
use alloy::{
    primitives::{Address, B256, Bytes, U256},
    sol,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

sol! {
    /// A cross-chain value movement.
    ///
    /// Every identifier is an address left-padded to 32 bytes. Field order is part of the
    /// EIP-712 type hash checked by the Gateway wallet and must not change.
    #[derive(Debug, Default, PartialEq, Eq, Serialize)]
    struct TransferSpec {
        uint32 version;
        uint32 sourceDomain;
        uint32 destinationDomain;
        bytes32 sourceContract;
        bytes32 destinationContract;
        bytes32 sourceToken;
        bytes32 destinationToken;
        bytes32 sourceDepositor;
        bytes32 destinationRecipient;
        bytes32 sourceSigner;
        bytes32 destinationCaller;
        uint256 value;
        bytes32 salt;
        bytes hookData;
    }

    /// A [`TransferSpec`] bounded by a block height and a max fee.
    #[derive(Debug, Default, PartialEq, Eq, Serialize)]
    struct BurnIntent {
        uint256 maxBlockHeight;
        uint256 maxFee;
        TransferSpec spec;
    }
}

/// Policy used to bound the fee of a burn intent.
///
/// The same amount is used as buffer in the local balance pre-check, so the check and the
/// intent never disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeePolicy {
    /// Max fee the attestation service may deduct, in USDC.
    pub max_fee: Decimal,
}

impl Default for FeePolicy {
    fn default() -> Self {
        let max_fee = Decimal::from_i128_with_scale(DEFAULT_MAX_FEE_UNITS.into(), USDC_DECIMALS);
        Self { max_fee: max_fee.normalize() }
    }
}

impl FeePolicy {
    /// Returns the max fee in USDC smallest units.
    pub fn max_fee_units(&self) -> Result<U256, GatewayError> {
        usdc::to_units(self.max_fee)
    }
}

/// Parameters of [`BurnIntent::build`].
///
/// Addresses are taken as strings, in any case and with or without `0x` prefix.
#[derive(Debug, Clone, Default)]
pub struct BurnIntentParams {
    /// Source Gateway domain.
    pub source_domain: u32,
    /// Destination Gateway domain.
    pub destination_domain: u32,
    /// Gateway wallet on the source chain.
    pub source_contract: String,
    /// Gateway minter on the destination chain.
    pub destination_contract: String,
    /// USDC on the source chain.
    pub source_token: String,
    /// USDC on the destination chain.
    pub destination_token: String,
    /// Owner of the deposited funds.
    pub source_depositor: String,
    /// Receiver of the minted funds.
    pub destination_recipient: String,
    /// Value to transfer, in smallest units.
    pub amount: U256,
    /// Signer of the intent, defaults to the depositor.
    pub source_signer: Option<String>,
    /// Who may submit the mint, defaults to anyone.
    pub destination_caller: Option<String>,
    /// Opaque payload forwarded to the destination.
    pub hook_data: Bytes,
    /// Upper bound on the source chain block height, defaults to none.
    pub max_block_height: Option<U256>,
}

impl BurnIntent {
    /// Builds a new [`BurnIntent`] with a fresh random salt.
    pub fn build(params: BurnIntentParams, policy: &FeePolicy) -> Result<Self, GatewayError> {
        if params.amount.is_zero() {
            return Err(GatewayError::InvalidParameters("amount must be positive".into()));
        }

        let source_depositor = parse_address("sourceDepositor", &params.source_depositor)?;
        let source_signer = params
            .source_signer
            .as_deref()
            .map(|signer| parse_address("sourceSigner", signer))
            .transpose()?
            .unwrap_or(source_depositor);
        let destination_caller = params
            .destination_caller
            .as_deref()
            .map(|caller| parse_address("destinationCaller", caller))
            .transpose()?
            .unwrap_or(Address::ZERO);

        Ok(Self {
            maxBlockHeight: params.max_block_height.unwrap_or(U256::MAX),
            maxFee: policy.max_fee_units()?,
            spec: TransferSpec {
                version: TRANSFER_SPEC_VERSION,
                sourceDomain: params.source_domain,
                destinationDomain: params.destination_domain,
                sourceContract: bytes32("sourceContract", &params.source_contract)?,
                destinationContract: bytes32("destinationContract", &params.destination_contract)?,
                sourceToken: bytes32("sourceToken", &params.source_token)?,
                destinationToken: bytes32("destinationToken", &params.destination_token)?,
                sourceDepositor: address_to_bytes32(source_depositor),
                destinationRecipient: bytes32(
                    "destinationRecipient",
                    &params.destination_recipient,
                )?,
                sourceSigner: address_to_bytes32(source_signer),
                destinationCaller: address_to_bytes32(destination_caller),
                value: params.amount,
                salt: B256::from(rand::random::<[u8; 32]>()),
                hookData: params.hook_data,
            },
        })
    }
}

/// Parses an address, accepting any case and an optional `0x` prefix.
pub fn parse_address(field: &str, value: &str) -> Result<Address, GatewayError> {
    let trimmed = value.trim();
    let hex = trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")).unwrap_or(trimmed);
    if hex.len() != 40 {
        return Err(GatewayError::InvalidParameters(format!("{field}: invalid address {value:?}")));
    }
    Address::from_str(hex)
        .map_err(|_| GatewayError::InvalidParameters(format!("{field}: invalid address {value:?}")))
}

fn bytes32(field: &str, value: &str) -> Result<B256, GatewayError> {
    parse_address(field, value).map(address_to_bytes32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn params() -> BurnIntentParams {
        BurnIntentParams {
            source_domain: 0,
            destination_domain: 6,
            source_contract: "0x0077777d7EBA4688BDeF3E311b846F25870A19B9".into(),
            destination_contract: "0x0022222ABE238Cc2C7Bb1f21003F0a260052475B".into(),
            source_token: "0x1c7D4B196Cb0C7B01d743Fbc6116a902379C7238".into(),
            destination_token: "0x036CbD53842c5426634e7929541eC2318f3dCF7e".into(),
            source_depositor: "0x742d35Cc6634C0532925a3b844Bc9e7595f8fA0d".into(),
            destination_recipient: "0x742d35Cc6634C0532925a3b844Bc9e7595f8fA0d".into(),
            amount: U256::from(1_000_000),
            ..Default::default()
        }
    }

    #[test]
    fn defaults() {
        let intent = BurnIntent::build(params(), &FeePolicy::default()).unwrap();

        assert_eq!(intent.maxBlockHeight, U256::MAX);
        assert_eq!(intent.maxFee, U256::from(DEFAULT_MAX_FEE_UNITS));
        assert_eq!(intent.spec.version, TRANSFER_SPEC_VERSION);
        assert_eq!(intent.spec.sourceSigner, intent.spec.sourceDepositor);
        assert_eq!(intent.spec.destinationCaller, B256::ZERO);
        assert!(intent.spec.hookData.is_empty());
        assert_eq!(intent.spec.value, U256::from(1_000_000));
    }

    #[test]
    fn default_fee_policy() {
        let policy = FeePolicy::default();
        assert_eq!(policy.max_fee, Decimal::new(201, 2));
        assert_eq!(policy.max_fee.to_string(), "2.01");
        assert_eq!(policy.max_fee_units().unwrap(), U256::from(DEFAULT_MAX_FEE_UNITS));
    }

    #[test]
    fn overrides() {
        let signer = "0x1111111111111111111111111111111111111111";
        let intent = BurnIntent::build(
            BurnIntentParams {
                source_signer: Some(signer.into()),
                destination_caller: Some(signer.into()),
                max_block_height: Some(U256::from(1234)),
                ..params()
            },
            &FeePolicy { max_fee: Decimal::new(1, 2) },
        )
        .unwrap();

        let signer = address_to_bytes32(signer.parse().unwrap());
        assert_eq!(intent.spec.sourceSigner, signer);
        assert_eq!(intent.spec.destinationCaller, signer);
        assert_eq!(intent.maxBlockHeight, U256::from(1234));
        assert_eq!(intent.maxFee, U256::from(10_000));
    }

    #[test]
    fn salts_are_unique() {
        let salts: HashSet<B256> = (0..1000)
            .map(|_| BurnIntent::build(params(), &FeePolicy::default()).unwrap().spec.salt)
            .collect();
        assert_eq!(salts.len(), 1000);
    }

    #[test]
    fn rejects_zero_amount() {
        let err = BurnIntent::build(
            BurnIntentParams { amount: U256::ZERO, ..params() },
            &Default::default(),
        )
        .unwrap_err();
        assert!(matches!(err, GatewayError::InvalidParameters(_)));
    }

    #[test]
    fn rejects_malformed_addresses() {
        for bad in [
            "",
            "0x1234",
            "0xzz2d35Cc6634C0532925a3b844Bc9e7595f8fA0d",
            "0x742d35Cc6634C0532925a3b844Bc9e7595f8fA0d00",
        ] {
            let err = BurnIntent::build(
                BurnIntentParams { destination_recipient: bad.into(), ..params() },
                &Default::default(),
            )
            .unwrap_err();
            assert!(matches!(err, GatewayError::InvalidParameters(_)), "{bad}");
        }
    }

    #[test]
    fn address_case_and_prefix_are_irrelevant() {
        let checksummed = "0x742d35Cc6634C0532925a3b844Bc9e7595f8fA0d";
        let expected = parse_address("a", checksummed).unwrap();

        for variant in [
            checksummed.to_lowercase(),
            checksummed.to_uppercase().replacen("0X", "0x", 1),
            checksummed.trim_start_matches("0x").to_string(),
            checksummed.to_uppercase(),
        ] {
            assert_eq!(parse_address("a", &variant).unwrap(), expected, "{variant}");
        }
    }
}
