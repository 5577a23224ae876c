use ael_crypto::EncodingError;
use ael_store::StoreError;

/// Errors produced by ledger operations.
///
/// Integrity findings are not errors: they are reported as
/// [`Violation`](crate::verifier::Violation)s by the verifier.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// The event was rejected before anything was written.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The entry could not be canonicalized; nothing was written.
    #[error("encoding failed: {0}")]
    Encoding(#[from] EncodingError),

    /// The store failed; the ledger is unchanged.
    #[error("persistence failure: {0}")]
    Persistence(#[from] StoreError),

    #[error("ledger reset is disabled by configuration")]
    ResetDisabled,

    #[error("configuration error: {0}")]
    Config(String),
}
