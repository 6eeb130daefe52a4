//! Gateway constants.

use std::time::Duration;

/// Number of decimals of USDC on every supported chain.
pub const USDC_DECIMALS: u32 = 6;

/// Token identifier used by the Gateway API for USDC.
pub const USDC_TOKEN: &str = "USDC";

/// Version of the transfer spec understood by the Gateway contracts.
pub const TRANSFER_SPEC_VERSION: u32 = 1;

/// EIP-712 domain name of the Gateway wallet.
///
/// The signing domain carries neither a chain id nor a verifying contract, so the same
/// signature is valid on every chain the Gateway is deployed on.
pub const EIP712_DOMAIN_NAME: &str = "GatewayWallet";

/// EIP-712 domain version of the Gateway wallet.
pub const EIP712_DOMAIN_VERSION: &str = "1";

/// Default max fee for a burn intent, in USDC smallest units (2.01 USDC).
///
/// Covers the mint gas on the most expensive supported destination.
pub const DEFAULT_MAX_FEE_UNITS: u64 = 2_010_000;

/// The Gateway API on testnet.
pub const TESTNET_API_URL: &str = "https://gateway-api-testnet.circle.com/v1";

/// The Gateway API on mainnet.
pub const MAINNET_API_URL: &str = "https://gateway-api.circle.com/v1";

/// How long to wait for the wallet to sign a burn intent.
pub const DEFAULT_SIGNATURE_TIMEOUT: Duration = Duration::from_secs(60);

/// How long to wait for the wallet to switch chains.
pub const DEFAULT_CHAIN_SWITCH_TIMEOUT: Duration = Duration::from_secs(30);

/// How long to wait for a submitted transaction to be included.
pub const DEFAULT_RECEIPT_TIMEOUT: Duration = Duration::from_secs(180);

/// Delays between balance polls after a deposit or transfer.
///
/// Dense at first to catch fast finality, then backing off to minutes.
pub const DEFAULT_POLL_SCHEDULE_SECS: [u64; 12] = [1, 2, 3, 5, 5, 10, 15, 30, 60, 120, 300, 600];
