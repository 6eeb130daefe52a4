use thiserror::Error;

/// Errors returned by a [`TypedDataSigner`](crate::signers::TypedDataSigner).
#[derive(Debug, Error)]
pub enum SignerError {
    /// The user declined the request in the wallet.
    #[error("user rejected the request")]
    Rejected,
    /// Any other signing failure.
    #[error(transparent)]
    Other(#[from] eyre::Error),
}
