use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, info, warn};

use crate::entry::{LogEntry, LogRecord};
use crate::error::{LedgerError, LedgerResult};
use crate::memory::InMemoryRecordLog;
use crate::query::LogQuery;
use crate::traits::RecordLog;

/// Header size: 4 bytes length + 4 bytes CRC.
const HEADER_SIZE: usize = 8;

/// Upper bound on a single frame payload. Replay treats anything larger as a
/// corrupt header, so appends refuse to write it.
pub const MAX_FRAME_LEN: u32 = 16 * 1024 * 1024;

/// Flush/sync strategy for the journal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SyncMode {
    /// `fsync` after every append.
    EveryWrite,
    /// Flush to the OS after every append and leave syncing to it.
    #[default]
    OsDefault,
}

#[derive(Clone, Debug, Default)]
pub struct JournalConfig {
    pub sync_mode: SyncMode,
}

/// The file a journal appends to.
trait JournalFile: Write + Send {
    fn truncate(&mut self, len: u64) -> io::Result<()>;
    fn sync(&mut self) -> io::Result<()>;
}

impl JournalFile for File {
    fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)
    }

    fn sync(&mut self) -> io::Result<()> {
        self.sync_all()
    }
}

struct JournalWriter {
    file: Box<dyn JournalFile>,
    /// Length of the committed prefix; every byte before it is a whole frame.
    offset: u64,
    /// Set when a failed write could not be rolled back.
    poisoned: Option<String>,
}

/// Record log persisted to an append-only journal file.
///
/// On-disk format, one frame per record:
/// ```text
/// [4 bytes: payload length (little-endian u32)]
/// [4 bytes: CRC32 of payload (little-endian u32)]
/// [N bytes: payload (JSON-serialized LogRecord)]
/// ```
/// Reads are served from memory. `open` replays the journal front-to-back and
/// stops at the first torn or corrupt frame; everything from that frame on is
/// truncated so later appends extend a clean prefix. A frame that fails to
/// write is cut back off the file before the append reports its error.
pub struct JournalRecordLog {
    log: InMemoryRecordLog,
    path: PathBuf,
    writer: Mutex<JournalWriter>,
    config: JournalConfig,
}

impl JournalRecordLog {
    /// Open (or create) the journal `<dir>/<name>.journal`.
    pub fn open(dir: &Path, name: &str, config: JournalConfig) -> LedgerResult<Self> {
        fs::create_dir_all(dir)?;
        let path = dir.join(format!("{name}.journal"));

        let (records, valid_len) = replay(&path)?;
        let log = InMemoryRecordLog::from_records(name, records)?;

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let file_len = file.metadata()?.len();
        if valid_len < file_len {
            warn!(
                path = %path.display(),
                valid_len,
                file_len,
                "discarding torn journal tail"
            );
            file.set_len(valid_len)?;
            file.sync_all()?;
        }

        let records = log.len()?;
        info!(path = %path.display(), records, "journal opened");
        Ok(Self {
            log,
            path,
            writer: Mutex::new(JournalWriter {
                file: Box::new(file),
                offset: valid_len,
                poisoned: None,
            }),
            config,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Snapshot of every record in append order.
    pub fn snapshot(&self) -> LedgerResult<Vec<LogRecord>> {
        self.log.snapshot()
    }

    fn write_frame(&self, record: &LogRecord) -> LedgerResult<()> {
        let payload =
            serde_json::to_vec(record).map_err(|e| LedgerError::Serialization(e.to_string()))?;
        let length = u32::try_from(payload.len())
            .ok()
            .filter(|len| *len <= MAX_FRAME_LEN)
            .ok_or_else(|| {
                LedgerError::Validation(format!(
                    "record {} encodes to {} bytes, over the {MAX_FRAME_LEN}-byte frame limit",
                    record.seq,
                    payload.len()
                ))
            })?;

        let mut frame = Vec::with_capacity(HEADER_SIZE + payload.len());
        frame.extend_from_slice(&length.to_le_bytes());
        frame.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
        frame.extend_from_slice(&payload);

        let mut w = self.writer.lock().map_err(|_| LedgerError::LockPoisoned)?;
        if let Some(reason) = &w.poisoned {
            return Err(LedgerError::Unwritable(reason.clone()));
        }

        let sync = self.config.sync_mode == SyncMode::EveryWrite;
        if let Err(e) = write_synced(&mut *w.file, &frame, sync) {
            let offset = w.offset;
            match w.file.truncate(offset) {
                Ok(()) => {
                    warn!(seq = record.seq, error = %e, "journal write failed; frame rolled back")
                }
                Err(rollback) => {
                    warn!(
                        seq = record.seq,
                        error = %e,
                        rollback = %rollback,
                        "journal write failed and could not be rolled back"
                    );
                    w.poisoned = Some(format!("partial frame at offset {offset}: {rollback}"));
                }
            }
            return Err(e.into());
        }
        w.offset += frame.len() as u64;

        debug!(seq = record.seq, len = payload.len(), "journal frame written");
        Ok(())
    }
}

fn write_synced<F: JournalFile + ?Sized>(file: &mut F, frame: &[u8], sync: bool) -> io::Result<()> {
    file.write_all(frame)?;
    file.flush()?;
    if sync {
        file.sync()?;
    }
    Ok(())
}

/// Read every intact frame from `path`. Returns the records and the byte
/// length of the intact prefix.
fn replay(path: &Path) -> LedgerResult<(Vec<LogRecord>, u64)> {
    let mut bytes = Vec::new();
    match File::open(path) {
        Ok(mut f) => {
            f.read_to_end(&mut bytes)?;
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok((Vec::new(), 0)),
        Err(e) => return Err(e.into()),
    }

    let mut records = Vec::new();
    let mut offset = 0usize;
    while offset + HEADER_SIZE <= bytes.len() {
        let header = &bytes[offset..offset + HEADER_SIZE];
        let length = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
        let expected_crc = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);

        let start = offset + HEADER_SIZE;
        let end = start + length as usize;
        if length == 0 || length > MAX_FRAME_LEN || end > bytes.len() {
            warn!(offset, length, "invalid journal frame length; stopping replay");
            break;
        }

        let payload = &bytes[start..end];
        let actual_crc = crc32fast::hash(payload);
        if actual_crc != expected_crc {
            warn!(
                offset,
                expected = expected_crc,
                actual = actual_crc,
                "journal CRC mismatch; stopping replay"
            );
            break;
        }

        match serde_json::from_slice::<LogRecord>(payload) {
            Ok(record) => records.push(record),
            Err(e) => {
                warn!(offset, error = %e, "undecodable journal frame; stopping replay");
                break;
            }
        }
        offset = end;
    }

    if offset < bytes.len() && offset + HEADER_SIZE > bytes.len() {
        warn!(offset, "partial journal header at tail");
    }
    debug!(recovered = records.len(), "journal replay complete");
    Ok((records, offset as u64))
}

impl RecordLog for JournalRecordLog {
    fn append(&self, entry: LogEntry) -> LedgerResult<LogRecord> {
        self.log.append_with(entry, |record| self.write_frame(record))
    }

    fn records(&self, query: &LogQuery) -> LedgerResult<Vec<LogRecord>> {
        self.log.records(query)
    }

    fn len(&self) -> LedgerResult<u64> {
        self.log.len()
    }

    fn head(&self) -> LedgerResult<Option<LogRecord>> {
        self.log.head()
    }
}

impl std::fmt::Debug for JournalRecordLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JournalRecordLog")
            .field("path", &self.path)
            .field("log", &self.log)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::Meta;
    use serde_json::json;
    use upi_types::{ContentAddress, Upi};

    fn entry(n: u8, owner: &str) -> LogEntry {
        let mut meta = Meta::new();
        meta.insert("owner".into(), json!(owner));
        LogEntry::new(
            Upi::from_digest([n; 32]),
            ContentAddress::from_hash([n; 32]),
            meta,
        )
        .unwrap()
    }

    fn open(dir: &Path) -> JournalRecordLog {
        JournalRecordLog::open(dir, "upi-logs", JournalConfig::default()).unwrap()
    }

    /// Accepts `budget` bytes of the next write, then fails it.
    struct FailingFile {
        inner: File,
        budget: Option<usize>,
        truncate_fails: bool,
    }

    impl Write for FailingFile {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            match self.budget.take() {
                Some(budget) => {
                    self.inner.write_all(&buf[..budget.min(buf.len())])?;
                    Err(io::Error::new(io::ErrorKind::Other, "no space left on device"))
                }
                None => self.inner.write(buf),
            }
        }

        fn flush(&mut self) -> io::Result<()> {
            self.inner.flush()
        }
    }

    impl JournalFile for FailingFile {
        fn truncate(&mut self, len: u64) -> io::Result<()> {
            if self.truncate_fails {
                return Err(io::Error::new(io::ErrorKind::Other, "read-only file system"));
            }
            self.inner.set_len(len)
        }

        fn sync(&mut self) -> io::Result<()> {
            self.inner.sync_all()
        }
    }

    fn fail_next_write(log: &JournalRecordLog, budget: usize, truncate_fails: bool) {
        let inner = OpenOptions::new().append(true).open(log.path()).unwrap();
        log.writer.lock().unwrap().file = Box::new(FailingFile {
            inner,
            budget: Some(budget),
            truncate_fails,
        });
    }

    fn owned_ids(log: &JournalRecordLog, owner: &str) -> Vec<Upi> {
        log.entries(&LogQuery::owner(owner))
            .unwrap()
            .into_iter()
            .map(|e| e.id)
            .collect()
    }

    #[test]
    fn records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let log = open(dir.path());
            log.append(entry(1, "alice")).unwrap();
            log.append(entry(2, "bob")).unwrap();
            log.append(entry(3, "alice")).unwrap();
        }
        let log = open(dir.path());
        assert_eq!(log.len().unwrap(), 3);
        let alice = log.entries(&LogQuery::owner("alice")).unwrap();
        assert_eq!(alice.len(), 2);

        let r4 = log.append(entry(4, "bob")).unwrap();
        assert_eq!(r4.seq, 4);
        assert_eq!(r4.prev_hash, Some(log.snapshot().unwrap()[2].record_hash));
    }

    #[test]
    fn fresh_journal_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let log = open(dir.path());
        assert!(log.is_empty().unwrap());
        assert!(log.path().ends_with("upi-logs.journal"));
    }

    #[test]
    fn torn_tail_is_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let path = {
            let log = open(dir.path());
            log.append(entry(1, "alice")).unwrap();
            log.append(entry(2, "alice")).unwrap();
            log.path().to_path_buf()
        };
        let intact_len = fs::metadata(&path).unwrap().len();
        {
            let mut f = OpenOptions::new().append(true).open(&path).unwrap();
            f.write_all(&200u32.to_le_bytes()).unwrap();
            f.write_all(&[0xAB; 10]).unwrap();
        }

        let log = open(dir.path());
        assert_eq!(log.len().unwrap(), 2);
        assert_eq!(fs::metadata(&path).unwrap().len(), intact_len);

        log.append(entry(3, "alice")).unwrap();
        drop(log);
        assert_eq!(open(dir.path()).len().unwrap(), 3);
    }

    #[test]
    fn corrupt_final_frame_is_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let path = {
            let log = open(dir.path());
            log.append(entry(1, "alice")).unwrap();
            log.append(entry(2, "alice")).unwrap();
            log.path().to_path_buf()
        };
        let mut bytes = fs::read(&path).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        fs::write(&path, &bytes).unwrap();

        let log = open(dir.path());
        assert_eq!(log.len().unwrap(), 1);
    }

    #[test]
    fn oversized_record_is_rejected_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        let log = open(dir.path());
        let mut big = entry(1, "alice");
        big.meta.insert("blob".into(), json!("x".repeat(MAX_FRAME_LEN as usize + 1)));

        assert!(matches!(log.append(big), Err(LedgerError::Validation(_))));
        assert!(log.is_empty().unwrap());
        assert_eq!(fs::metadata(log.path()).unwrap().len(), 0);

        log.append(entry(2, "alice")).unwrap();
        drop(log);
        let log = open(dir.path());
        assert_eq!(owned_ids(&log, "alice"), vec![Upi::from_digest([2; 32])]);
    }

    #[test]
    fn failed_write_is_rolled_back() {
        let dir = tempfile::tempdir().unwrap();
        let log = open(dir.path());
        log.append(entry(1, "alice")).unwrap();
        let committed = fs::metadata(log.path()).unwrap().len();

        fail_next_write(&log, 12, false);
        assert!(matches!(log.append(entry(2, "alice")), Err(LedgerError::Io(_))));
        assert_eq!(log.len().unwrap(), 1);
        assert_eq!(fs::metadata(log.path()).unwrap().len(), committed);

        let record = log.append(entry(3, "alice")).unwrap();
        assert_eq!(record.seq, 2);
        drop(log);

        let log = open(dir.path());
        assert_eq!(
            owned_ids(&log, "alice"),
            vec![Upi::from_digest([1; 32]), Upi::from_digest([3; 32])]
        );
    }

    #[test]
    fn unrecoverable_write_stops_appends() {
        let dir = tempfile::tempdir().unwrap();
        let log = open(dir.path());
        log.append(entry(1, "alice")).unwrap();

        fail_next_write(&log, 12, true);
        assert!(matches!(log.append(entry(2, "alice")), Err(LedgerError::Io(_))));
        assert!(matches!(
            log.append(entry(3, "alice")),
            Err(LedgerError::Unwritable(_))
        ));
        assert_eq!(log.len().unwrap(), 1);
        drop(log);

        let log = open(dir.path());
        assert_eq!(log.len().unwrap(), 1);
        assert_eq!(log.append(entry(4, "alice")).unwrap().seq, 2);
    }

    #[test]
    fn every_write_sync_mode_appends() {
        let dir = tempfile::tempdir().unwrap();
        let config = JournalConfig {
            sync_mode: SyncMode::EveryWrite,
        };
        let log = JournalRecordLog::open(dir.path(), "synced", config).unwrap();
        log.append(entry(1, "alice")).unwrap();
        assert_eq!(log.len().unwrap(), 1);
    }
}
