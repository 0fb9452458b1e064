use crate::entry::{LogEntry, LogRecord};
use crate::error::LedgerResult;
use crate::query::LogQuery;

/// Append-only storage for log entries.
///
/// Implementations must be `Send + Sync`. Completed appends are totally
/// ordered and records are never mutated or removed once appended.
pub trait RecordLog: Send + Sync {
    /// Append an entry, returning the sealed record.
    fn append(&self, entry: LogEntry) -> LedgerResult<LogRecord>;

    /// Records passing `query`, ordered and limited as it specifies.
    fn records(&self, query: &LogQuery) -> LedgerResult<Vec<LogRecord>>;

    /// Number of appended records.
    fn len(&self) -> LedgerResult<u64>;

    /// The most recent record, if any.
    fn head(&self) -> LedgerResult<Option<LogRecord>>;

    fn is_empty(&self) -> LedgerResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Entries passing `query`, without their envelopes.
    fn entries(&self, query: &LogQuery) -> LedgerResult<Vec<LogEntry>> {
        Ok(self
            .records(query)?
            .into_iter()
            .map(|r| r.entry)
            .collect())
    }
}
