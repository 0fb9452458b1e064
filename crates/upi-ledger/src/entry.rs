use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use upi_crypto::ContentHasher;
use upi_types::{ContentAddress, Upi};

use crate::error::{LedgerError, LedgerResult};

/// Free-form entry metadata. Keys are kept sorted so serialization is canonical.
pub type Meta = BTreeMap<String, Value>;

/// One append-only link between a property identifier and a stored payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: Upi,
    pub hash: ContentAddress,
    #[serde(default)]
    pub meta: Meta,
}

impl LogEntry {
    /// Build an entry, rejecting null identifiers and null content addresses.
    pub fn new(id: Upi, hash: ContentAddress, meta: Meta) -> LedgerResult<Self> {
        if id.is_null() {
            return Err(LedgerError::Validation("entry id is missing".into()));
        }
        if hash.is_null() {
            return Err(LedgerError::Validation("entry hash is missing".into()));
        }
        Ok(Self { id, hash, meta })
    }

    /// Convert a JSON object into metadata. `null` yields empty metadata;
    /// any other non-object is rejected.
    pub fn meta_from_value(value: &Value) -> LedgerResult<Meta> {
        match value {
            Value::Null => Ok(Meta::new()),
            Value::Object(map) => Ok(map.iter().map(|(k, v)| (k.clone(), v.clone())).collect()),
            other => Err(LedgerError::Validation(format!(
                "entry meta must be an object, got {}",
                json_kind(other)
            ))),
        }
    }

    /// The string stored under `key`, if present and a string.
    pub fn meta_str(&self, key: &str) -> Option<&str> {
        self.meta.get(key).and_then(Value::as_str)
    }

    /// Whether `meta[owner_key]` is exactly `owner`.
    pub fn is_owned_by(&self, owner_key: &str, owner: &str) -> bool {
        self.meta_str(owner_key) == Some(owner)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A stored entry with its position and hash-chain linkage.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    /// 1-based position in the log.
    pub seq: u64,
    pub entry: LogEntry,
    pub appended_at: DateTime<Utc>,
    /// `record_hash` of the preceding record; `None` for the first.
    pub prev_hash: Option<ContentAddress>,
    pub record_hash: ContentAddress,
}

impl LogRecord {
    /// Wrap `entry` at `seq`, linking to `prev_hash`, and compute its hash.
    pub fn seal(
        seq: u64,
        entry: LogEntry,
        appended_at: DateTime<Utc>,
        prev_hash: Option<ContentAddress>,
    ) -> LedgerResult<Self> {
        let mut record = Self {
            seq,
            entry,
            appended_at,
            prev_hash,
            record_hash: ContentAddress::null(),
        };
        record.record_hash = record.recompute_hash()?;
        Ok(record)
    }

    /// Hash of this record's canonical JSON with `record_hash` zeroed.
    pub fn recompute_hash(&self) -> LedgerResult<ContentAddress> {
        let mut unsealed = self.clone();
        unsealed.record_hash = ContentAddress::null();
        let digest = ContentHasher::LOG
            .hash_json(&unsealed)
            .map_err(|e| LedgerError::Serialization(e.to_string()))?;
        Ok(ContentAddress::from_hash(digest))
    }

    /// Whether the stored hash matches the recomputed one.
    pub fn is_intact(&self) -> bool {
        self.recompute_hash()
            .map(|h| h == self.record_hash)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(owner: &str) -> LogEntry {
        let mut meta = Meta::new();
        meta.insert("owner".into(), json!(owner));
        LogEntry::new(
            Upi::from_digest([1; 32]),
            ContentAddress::from_hash([2; 32]),
            meta,
        )
        .unwrap()
    }

    #[test]
    fn null_id_is_rejected() {
        let err = LogEntry::new(Upi::null(), ContentAddress::from_hash([2; 32]), Meta::new());
        assert!(matches!(err, Err(LedgerError::Validation(_))));
    }

    #[test]
    fn null_hash_is_rejected() {
        let err = LogEntry::new(Upi::from_digest([1; 32]), ContentAddress::null(), Meta::new());
        assert!(matches!(err, Err(LedgerError::Validation(_))));
    }

    #[test]
    fn meta_from_value_accepts_object_and_null() {
        let meta = LogEntry::meta_from_value(&json!({"owner": "alice", "rooms": 3})).unwrap();
        assert_eq!(meta.len(), 2);
        assert!(LogEntry::meta_from_value(&Value::Null).unwrap().is_empty());
    }

    #[test]
    fn meta_from_value_rejects_scalars() {
        assert!(LogEntry::meta_from_value(&json!("alice")).is_err());
        assert!(LogEntry::meta_from_value(&json!([1, 2])).is_err());
    }

    #[test]
    fn ownership_requires_string_match() {
        let e = entry("alice");
        assert!(e.is_owned_by("owner", "alice"));
        assert!(!e.is_owned_by("owner", "bob"));
        assert!(!e.is_owned_by("seller", "alice"));
    }

    #[test]
    fn numeric_owner_does_not_match_string() {
        let mut meta = Meta::new();
        meta.insert("owner".into(), json!(42));
        let e = LogEntry::new(
            Upi::from_digest([1; 32]),
            ContentAddress::from_hash([2; 32]),
            meta,
        )
        .unwrap();
        assert!(!e.is_owned_by("owner", "42"));
    }

    // ----------------------------------------------------------------
    // Sealing
    // ----------------------------------------------------------------

    #[test]
    fn sealed_record_is_intact() {
        let record = LogRecord::seal(1, entry("alice"), Utc::now(), None).unwrap();
        assert!(!record.record_hash.is_null());
        assert!(record.is_intact());
    }

    #[test]
    fn tampered_meta_breaks_hash() {
        let mut record = LogRecord::seal(1, entry("alice"), Utc::now(), None).unwrap();
        record.entry.meta.insert("owner".into(), json!("mallory"));
        assert!(!record.is_intact());
    }

    #[test]
    fn prev_hash_participates_in_hash() {
        let at = Utc::now();
        let a = LogRecord::seal(2, entry("alice"), at, None).unwrap();
        let b = LogRecord::seal(2, entry("alice"), at, Some(ContentAddress::from_hash([9; 32])))
            .unwrap();
        assert_ne!(a.record_hash, b.record_hash);
    }

    #[test]
    fn json_roundtrip_preserves_hash() {
        let record = LogRecord::seal(1, entry("alice"), Utc::now(), None).unwrap();
        let json = serde_json::to_string(&record).unwrap();
        let back: LogRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
        assert!(back.is_intact());
    }
}
