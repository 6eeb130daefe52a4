//! Gateway error types.
use rust_decimal::Decimal;
use thiserror::Error;

mod api;
pub use api::ApiError;

mod signer;
pub use signer::SignerError;

/// Machine-checkable kind of a [`GatewayError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The request was malformed.
    InvalidParameters,
    /// The unified balance does not cover the amount plus fees.
    InsufficientBalance,
    /// No USDC deployment is known for a chain or domain.
    UnsupportedToken,
    /// The wallet did not sign in time.
    SignatureTimeout,
    /// The user declined to sign in the wallet.
    UserRejected,
    /// The attestation service refused the burn intent.
    AttestationRejected,
    /// The attestation service could not be reached.
    NetworkError,
    /// Anything else.
    InternalError,
}

impl ErrorKind {
    /// Whether it makes sense to offer the user to try again with a fresh burn intent.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::UserRejected | Self::SignatureTimeout | Self::NetworkError)
    }
}

/// The overarching error type of transfer and deposit flows.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The request was malformed.
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),
    /// The unified balance does not cover the amount plus fees.
    ///
    /// This is an advisory local check, the attestation service validates again.
    #[error("insufficient balance: required {required}, available {available}")]
    InsufficientBalance {
        /// The balance available on the source domain.
        available: Decimal,
        /// The amount plus the fee buffer.
        required: Decimal,
    },
    /// No USDC deployment is known for a chain or domain.
    #[error("unsupported token: {0}")]
    UnsupportedToken(String),
    /// The wallet did not sign in time.
    #[error("timed out waiting for the wallet signature")]
    SignatureTimeout,
    /// The user declined to sign in the wallet.
    #[error("signature request rejected by the user")]
    UserRejected,
    /// The attestation service refused the burn intent.
    #[error("attestation rejected: {0}")]
    AttestationRejected(String),
    /// The attestation service could not be reached.
    #[error("network error: {0}")]
    NetworkError(String),
    /// An internal error occurred.
    #[error("internal error: {0}")]
    InternalError(String),
}

impl GatewayError {
    /// Returns the [`ErrorKind`] of this error.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidParameters(_) => ErrorKind::InvalidParameters,
            Self::InsufficientBalance { .. } => ErrorKind::InsufficientBalance,
            Self::UnsupportedToken(_) => ErrorKind::UnsupportedToken,
            Self::SignatureTimeout => ErrorKind::SignatureTimeout,
            Self::UserRejected => ErrorKind::UserRejected,
            Self::AttestationRejected(_) => ErrorKind::AttestationRejected,
            Self::NetworkError(_) => ErrorKind::NetworkError,
            Self::InternalError(_) => ErrorKind::InternalError,
        }
    }

    /// Whether this error was raised before any external side effect could happen.
    pub const fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidParameters(_) | Self::InsufficientBalance { .. } | Self::UnsupportedToken(_)
        )
    }
}

impl From<ApiError> for GatewayError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Rejected(message) => Self::AttestationRejected(message),
            err @ (ApiError::Transport(_) | ApiError::Status { .. } | ApiError::Decode(_)) => {
                Self::NetworkError(err.to_string())
            }
        }
    }
}

impl From<SignerError> for GatewayError {
    fn from(err: SignerError) -> Self {
        match err {
            SignerError::Rejected => Self::UserRejected,
            SignerError::Other(err) => Self::InternalError(format!("signing failed: {err}")),
        }
    }
}

impl From<eyre::Report> for GatewayError {
    fn from(err: eyre::Report) -> Self {
        Self::InternalError(format!("{err:#}"))
    }
}
