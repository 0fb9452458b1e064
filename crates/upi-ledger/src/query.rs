use serde::{Deserialize, Serialize};
use upi_types::Upi;

use crate::entry::LogRecord;

/// Metadata key consulted by the owner filter unless overridden.
pub const DEFAULT_OWNER_KEY: &str = "owner";

/// Filter, ordering and limit applied when reading the log.
///
/// Filters are applied first, then ordering (append order, or newest first
/// when `reverse` is set), then `limit`. The default query returns every
/// record in append order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogQuery {
    /// Keep entries whose `meta[owner_key]` equals this string.
    pub owner: Option<String>,
    /// Metadata key for the owner filter. `None` means [`DEFAULT_OWNER_KEY`].
    pub owner_key: Option<String>,
    /// Keep entries for one property.
    pub id: Option<Upi>,
    /// Exclusive lower sequence bound.
    pub after_seq: Option<u64>,
    /// Exclusive upper sequence bound.
    pub before_seq: Option<u64>,
    /// Newest first.
    pub reverse: bool,
    pub limit: Option<usize>,
}

impl LogQuery {
    pub fn all() -> Self {
        Self::default()
    }

    /// Every entry owned by `owner`, in append order.
    pub fn owner(owner: impl Into<String>) -> Self {
        Self::default().with_owner(owner)
    }

    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    pub fn with_owner_key(mut self, key: impl Into<String>) -> Self {
        self.owner_key = Some(key.into());
        self
    }

    pub fn with_id(mut self, id: Upi) -> Self {
        self.id = Some(id);
        self
    }

    pub fn after(mut self, seq: u64) -> Self {
        self.after_seq = Some(seq);
        self
    }

    pub fn before(mut self, seq: u64) -> Self {
        self.before_seq = Some(seq);
        self
    }

    pub fn reversed(mut self) -> Self {
        self.reverse = true;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// The owner key in effect for this query.
    pub fn effective_owner_key(&self) -> &str {
        self.owner_key.as_deref().unwrap_or(DEFAULT_OWNER_KEY)
    }

    /// Whether a single record passes every filter.
    pub fn matches(&self, record: &LogRecord) -> bool {
        if let Some(ref owner) = self.owner {
            if !record.entry.is_owned_by(self.effective_owner_key(), owner) {
                return false;
            }
        }
        if let Some(id) = self.id {
            if record.entry.id != id {
                return false;
            }
        }
        if let Some(after) = self.after_seq {
            if record.seq <= after {
                return false;
            }
        }
        if let Some(before) = self.before_seq {
            if record.seq >= before {
                return false;
            }
        }
        true
    }

    /// Apply filters, ordering and limit to records held in append order.
    pub fn apply<'a, I>(&self, records: I) -> Vec<LogRecord>
    where
        I: DoubleEndedIterator<Item = &'a LogRecord>,
    {
        let limit = self.limit.unwrap_or(usize::MAX);
        if self.reverse {
            records
                .rev()
                .filter(|r| self.matches(r))
                .take(limit)
                .cloned()
                .collect()
        } else {
            records
                .filter(|r| self.matches(r))
                .take(limit)
                .cloned()
                .collect()
        }
    }
}
