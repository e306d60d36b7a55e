use thiserror::Error;

/// The error taxonomy for the payment pipeline.
///
/// Non-fatal conditions are deliberately absent: an oracle falling back to
/// the fixed rate or a sweep skipped for lack of gas are reported through
/// step details, never through this enum.
#[derive(Error, Debug)]
pub enum PaymentError {
    /// Secret persistence is unavailable. Fatal: no wallet can be obtained.
    #[error("secret storage unavailable: {0}")]
    Storage(String),
    /// A chain read or write failed at the RPC boundary.
    #[error("chain rpc error: {0}")]
    Rpc(String),
    /// Transfer submission, confirmation timeout, or on-chain revert.
    #[error("transfer failed: {0}")]
    Transfer(String),
    /// The burner key could not be erased. The pipeline must still report
    /// failure: a live, reusable key is a security-relevant leftover.
    #[error("wallet burn failed: {0}")]
    Burn(String),
    /// Discovery ended without a validated counterparty address.
    #[error("no valid counterparty address resolved")]
    NoValidAddress,
    /// Discovery was cancelled externally before settling.
    #[error("discovery cancelled")]
    DiscoveryCancelled,
    #[error("validation error: {0}")]
    Validation(String),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("internal error: {0}")]
    Internal(Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T, E = PaymentError> = std::result::Result<T, E>;
