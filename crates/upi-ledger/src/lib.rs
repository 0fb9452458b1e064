//! Append-only record log for the UPI registry.
//!
//! Each entry links a property identifier to a content address plus
//! free-form metadata. This crate provides:
//! - [`LogEntry`] and its stored, hash-linked envelope [`LogRecord`]
//! - the [`RecordLog`] trait boundary and [`LogQuery`] filter contract
//! - [`InMemoryRecordLog`] for tests and embedding
//! - [`JournalRecordLog`], an in-memory log backed by a CRC-framed journal file
//! - [`LogValidator`] for sequence and hash-chain verification

pub mod entry;
pub mod error;
pub mod journal;
pub mod memory;
pub mod query;
pub mod traits;
pub mod validation;

pub use entry::{LogEntry, LogRecord, Meta};
pub use error::{LedgerError, LedgerResult};
pub use journal::{JournalConfig, JournalRecordLog, SyncMode, MAX_FRAME_LEN};
pub use memory::InMemoryRecordLog;
pub use query::{LogQuery, DEFAULT_OWNER_KEY};
pub use traits::RecordLog;
pub use validation::{LogValidator, ValidationReport, Violation, ViolationKind};
