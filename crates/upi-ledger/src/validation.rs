use serde::Serialize;

use crate::entry::LogRecord;
use crate::error::LedgerResult;
use crate::query::LogQuery;
use crate::traits::RecordLog;

/// Result of log validation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub record_count: u64,
    pub sequence_contiguous: bool,
    pub hash_chain_valid: bool,
    pub entries_well_formed: bool,
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    /// Returns `true` if all checks passed.
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }
}

/// A specific integrity violation detected during validation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub seq: u64,
    pub kind: ViolationKind,
    pub description: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    SequenceGap,
    HashChainBreak,
    HashMismatch,
    MissingField,
}

/// Record log integrity validator.
pub struct LogValidator;

impl LogValidator {
    /// Validate every record in `log`.
    pub fn validate_log<L: RecordLog + ?Sized>(log: &L) -> LedgerResult<ValidationReport> {
        let records = log.records(&LogQuery::all())?;
        Ok(Self::validate(&records))
    }

    /// Validate records held in append order.
    pub fn validate(records: &[LogRecord]) -> ValidationReport {
        let mut violations = Vec::new();
        let mut sequence_contiguous = true;
        let mut hash_chain_valid = true;
        let mut entries_well_formed = true;

        for (index, record) in records.iter().enumerate() {
            let expected_seq = (index + 1) as u64;
            if record.seq != expected_seq {
                sequence_contiguous = false;
                violations.push(Violation {
                    seq: record.seq,
                    kind: ViolationKind::SequenceGap,
                    description: format!("expected seq {expected_seq}, got {}", record.seq),
                });
            }

            let expected_prev = index.checked_sub(1).map(|i| records[i].record_hash);
            if record.prev_hash != expected_prev {
                hash_chain_valid = false;
                violations.push(Violation {
                    seq: record.seq,
                    kind: ViolationKind::HashChainBreak,
                    description: "previous hash link mismatch".into(),
                });
            }

            if !record.is_intact() {
                hash_chain_valid = false;
                violations.push(Violation {
                    seq: record.seq,
                    kind: ViolationKind::HashMismatch,
                    description: "record hash does not match computed".into(),
                });
            }

            if record.entry.id.is_null() || record.entry.hash.is_null() {
                entries_well_formed = false;
                violations.push(Violation {
                    seq: record.seq,
                    kind: ViolationKind::MissingField,
                    description: "entry id or hash is missing".into(),
                });
            }
        }

        ValidationReport {
            record_count: records.len() as u64,
            sequence_contiguous,
            hash_chain_valid,
            entries_well_formed,
            violations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{LogEntry, Meta};
    use crate::memory::InMemoryRecordLog;
    use serde_json::json;
    use upi_types::{ContentAddress, Upi};

    fn populated(n: u8) -> InMemoryRecordLog {
        let log = InMemoryRecordLog::new("upi-logs");
        for i in 1..=n {
            let mut meta = Meta::new();
            meta.insert("owner".into(), json!("alice"));
            let entry = LogEntry::new(
                Upi::from_digest([i; 32]),
                ContentAddress::from_hash([i; 32]),
                meta,
            )
            .unwrap();
            log.append(entry).unwrap();
        }
        log
    }

    #[test]
    fn valid_log_passes() {
        let log = populated(5);
        let report = LogValidator::validate_log(&log).unwrap();
        assert!(report.is_valid());
        assert_eq!(report.record_count, 5);
        assert!(report.sequence_contiguous);
        assert!(report.hash_chain_valid);
        assert!(report.entries_well_formed);
    }

    #[test]
    fn empty_log_passes() {
        let report = LogValidator::validate(&[]);
        assert!(report.is_valid());
        assert_eq!(report.record_count, 0);
    }

    #[test]
    fn tampered_entry_is_reported() {
        let log = populated(3);
        log.tamper(1, |r| {
            r.entry.meta.insert("owner".into(), json!("mallory"));
        });
        let report = LogValidator::validate_log(&log).unwrap();
        assert!(!report.is_valid());
        assert!(!report.hash_chain_valid);
        assert_eq!(report.violations.len(), 1);
        assert_eq!(report.violations[0].seq, 2);
        assert_eq!(report.violations[0].kind, ViolationKind::HashMismatch);
    }

    #[test]
    fn resealed_tamper_breaks_next_link() {
        let log = populated(3);
        log.tamper(1, |r| {
            r.entry.meta.insert("owner".into(), json!("mallory"));
            r.record_hash = r.recompute_hash().unwrap();
        });
        let report = LogValidator::validate_log(&log).unwrap();
        let kinds: Vec<_> = report.violations.iter().map(|v| (v.seq, v.kind)).collect();
        assert_eq!(kinds, vec![(3, ViolationKind::HashChainBreak)]);
    }

    #[test]
    fn removed_record_is_reported() {
        let log = populated(4);
        let mut records = log.snapshot().unwrap();
        records.remove(1);
        let report = LogValidator::validate(&records);
        assert!(!report.sequence_contiguous);
        assert!(report
            .violations
            .iter()
            .any(|v| v.kind == ViolationKind::SequenceGap && v.seq == 3));
        assert!(report
            .violations
            .iter()
            .any(|v| v.kind == ViolationKind::HashChainBreak && v.seq == 3));
    }

    #[test]
    fn null_entry_fields_are_reported() {
        let log = populated(1);
        log.tamper(0, |r| {
            r.entry.hash = ContentAddress::null();
            r.record_hash = r.recompute_hash().unwrap();
        });
        let report = LogValidator::validate_log(&log).unwrap();
        assert!(!report.entries_well_formed);
        assert_eq!(report.violations[0].kind, ViolationKind::MissingField);
    }
}
