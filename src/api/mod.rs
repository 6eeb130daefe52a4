//! Gateway attestation API.

mod client;
pub use client::GatewayClient;

mod types;
pub use types::*;

use crate::{error::ApiError, types::UnifiedBalances};
use alloy::primitives::Address;

/// Operations of the Gateway API.
///
/// Implementations do not retry, retry policies belong to callers.
#[async_trait::async_trait]
pub trait GatewayApi: std::fmt::Debug + Send + Sync {
    /// Returns service metadata, as-is.
    async fn info(&self) -> Result<serde_json::Value, ApiError>;

    /// Returns the balances of `depositor` in `token` on the given domains, or on all known
    /// domains if `domains` is `None`.
    async fn balances(
        &self,
        token: &str,
        depositor: Address,
        domains: Option<&[u32]>,
    ) -> Result<UnifiedBalances, ApiError>;

    /// Submits signed burn intents for attestation.
    ///
    /// A rejection is returned as a successful [`TransferResponse`]; use
    /// [`TransferResponse::into_attestation`] to interpret it.
    async fn transfer(&self, requests: TransferRequests) -> Result<TransferResponse, ApiError>;
}
