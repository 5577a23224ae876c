/// Errors from ledger store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A committed row could not be decoded.
    #[error("corrupt entry at line {line}: {reason}")]
    Corrupt { line: u64, reason: String },

    /// Storage backend is read-only.
    #[error("store is read-only")]
    ReadOnly,

    /// The backend cannot serve requests (e.g. a poisoned lock).
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
