//! Burn intent signers.

mod r#dyn;
pub use r#dyn::DynSigner;

use crate::error::SignerError;
use alloy::{
    dyn_abi::TypedData,
    primitives::{Address, Bytes},
};

/// Trait for an [EIP-712] typed data signer, usually a connected wallet.
///
/// Implementations must report a user declining the request as [`SignerError::Rejected`].
///
/// [EIP-712]: https://eips.ethereum.org/EIPS/eip-712
#[async_trait::async_trait]
pub trait TypedDataSigner: std::fmt::Debug + Send + Sync {
    /// Signs `typed_data` with the key of `account`.
    ///
    /// Returns the 65 byte signature over the EIP-712 digest.
    async fn sign_typed_data(
        &self,
        account: Address,
        typed_data: &TypedData,
    ) -> Result<Bytes, SignerError>;
}
