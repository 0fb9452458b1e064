/// Errors produced by record log operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("invalid log entry: {0}")]
    Validation(String),

    #[error("integrity violation at seq {seq}: {reason}")]
    IntegrityViolation { seq: u64, reason: String },

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("journal I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A failed write could not be rolled back; the journal refuses further
    /// appends until it is reopened.
    #[error("journal is unwritable: {0}")]
    Unwritable(String),

    #[error("record log lock poisoned")]
    LockPoisoned,
}

pub type LedgerResult<T> = Result<T, LedgerError>;
