use upi_types::ContentAddress;

/// Errors from object store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested object was not found.
    #[error("object not found: {0}")]
    NotFound(ContentAddress),

    /// Content hash mismatch on read (data corruption or tampering).
    #[error("hash mismatch for {address}: computed {computed}")]
    HashMismatch {
        address: ContentAddress,
        computed: ContentAddress,
    },

    /// Empty payloads have no meaningful content address.
    #[error("cannot store an empty payload")]
    EmptyPayload,

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Store layout on disk is not what the backend expects.
    #[error("corrupt store at {path}: {reason}")]
    Corrupt { path: String, reason: String },
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
