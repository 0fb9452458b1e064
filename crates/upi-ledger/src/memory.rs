use std::sync::RwLock;

use chrono::Utc;
use tracing::debug;

use crate::entry::{LogEntry, LogRecord};
use crate::error::{LedgerError, LedgerResult};
use crate::query::LogQuery;
use crate::traits::RecordLog;

/// In-memory record log for tests, local demos, and embedding.
pub struct InMemoryRecordLog {
    name: String,
    records: RwLock<Vec<LogRecord>>,
}

impl InMemoryRecordLog {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            records: RwLock::new(Vec::new()),
        }
    }

    /// Rebuild a log from records already in append order.
    ///
    /// Sequence numbers and hash links are checked; the first break is
    /// reported as an [`LedgerError::IntegrityViolation`].
    pub fn from_records(name: impl Into<String>, records: Vec<LogRecord>) -> LedgerResult<Self> {
        let mut prev = None;
        for (index, record) in records.iter().enumerate() {
            check_link(record, index as u64 + 1, prev)?;
            if !record.is_intact() {
                return Err(LedgerError::IntegrityViolation {
                    seq: record.seq,
                    reason: "record hash mismatch".into(),
                });
            }
            prev = Some(record.record_hash);
        }
        Ok(Self {
            name: name.into(),
            records: RwLock::new(records),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Snapshot of every record in append order.
    pub fn snapshot(&self) -> LedgerResult<Vec<LogRecord>> {
        Ok(self
            .records
            .read()
            .map_err(|_| LedgerError::LockPoisoned)?
            .clone())
    }

    /// Seal `entry` at the next position and hand it to `persist` before it
    /// becomes visible. The write lock is held throughout, so a failed
    /// `persist` leaves the log unchanged.
    pub(crate) fn append_with<F>(&self, entry: LogEntry, persist: F) -> LedgerResult<LogRecord>
    where
        F: FnOnce(&LogRecord) -> LedgerResult<()>,
    {
        let mut records = self
            .records
            .write()
            .map_err(|_| LedgerError::LockPoisoned)?;
        let seq = records.len() as u64 + 1;
        let prev_hash = records.last().map(|r| r.record_hash);
        let record = LogRecord::seal(seq, entry, Utc::now(), prev_hash)?;
        persist(&record)?;
        records.push(record.clone());
        debug!(
            log = %self.name,
            seq,
            id = %record.entry.id.short_hex(),
            "log entry appended"
        );
        Ok(record)
    }

    #[cfg(test)]
    pub(crate) fn tamper(&self, index: usize, f: impl FnOnce(&mut LogRecord)) {
        let mut records = self.records.write().unwrap();
        f(&mut records[index]);
    }
}

pub(crate) fn check_link(
    record: &LogRecord,
    expected_seq: u64,
    expected_prev: Option<upi_types::ContentAddress>,
) -> LedgerResult<()> {
    if record.seq != expected_seq {
        return Err(LedgerError::IntegrityViolation {
            seq: record.seq,
            reason: format!("expected seq {expected_seq}, found {}", record.seq),
        });
    }
    if record.prev_hash != expected_prev {
        return Err(LedgerError::IntegrityViolation {
            seq: record.seq,
            reason: "previous hash link mismatch".into(),
        });
    }
    Ok(())
}

impl RecordLog for InMemoryRecordLog {
    fn append(&self, entry: LogEntry) -> LedgerResult<LogRecord> {
        self.append_with(entry, |_| Ok(()))
    }

    fn records(&self, query: &LogQuery) -> LedgerResult<Vec<LogRecord>> {
        let records = self
            .records
            .read()
            .map_err(|_| LedgerError::LockPoisoned)?;
        Ok(query.apply(records.iter()))
    }

    fn len(&self) -> LedgerResult<u64> {
        Ok(self
            .records
            .read()
            .map_err(|_| LedgerError::LockPoisoned)?
            .len() as u64)
    }

    fn head(&self) -> LedgerResult<Option<LogRecord>> {
        Ok(self
            .records
            .read()
            .map_err(|_| LedgerError::LockPoisoned)?
            .last()
            .cloned())
    }
}

impl std::fmt::Debug for InMemoryRecordLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let len = self.records.read().map(|r| r.len()).unwrap_or(0);
        f.debug_struct("InMemoryRecordLog")
            .field("name", &self.name)
            .field("len", &len)
            .finish()
    }
}
