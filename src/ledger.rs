//! Run-scoped deduplication ledger keyed by canonical title.

use crate::record::{field, RawRecord};
use serde::Serialize;
use std::collections::HashSet;

/// Why a record was rejected before identity was established
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    MissingTitle,
}

/// Ledger decision for one record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Accepted,
    Rejected(RejectReason),
    Duplicate,
}

/// Lowercased, trimmed title; `None` when nothing is left.
pub fn canonical_title(title: &str) -> Option<String> {
    let canonical = title.to_lowercase().trim().to_string();
    (!canonical.is_empty()).then_some(canonical)
}

/// Identity of a titled record
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TitleKey(String);

impl TitleKey {
    pub fn for_title(title: &str) -> Result<Self, RejectReason> {
        canonical_title(title)
            .map(TitleKey)
            .ok_or(RejectReason::MissingTitle)
    }

    pub fn for_record(record: &RawRecord) -> Result<Self, RejectReason> {
        Self::for_title(record.text(field::TITLE))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Frozen view of the ledger counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct LedgerStats {
    /// Accepted records, i.e. unique titles
    pub total_seen: u64,
    pub duplicates_seen: u64,
}

impl LedgerStats {
    /// Every titled record that reached the ledger
    pub fn considered(&self) -> u64 {
        self.total_seen + self.duplicates_seen
    }
}

/// First-seen-wins title set. Only grows; counters only increase.
#[derive(Debug, Default)]
pub struct DedupLedger {
    titles: HashSet<String>,
    stats: LedgerStats,
}

impl DedupLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn admit(&mut self, record: &RawRecord) -> Admission {
        match TitleKey::for_record(record) {
            Ok(key) => self.admit_key(key),
            Err(reason) => Admission::Rejected(reason),
        }
    }

    pub fn admit_title(&mut self, title: &str) -> Admission {
        match TitleKey::for_title(title) {
            Ok(key) => self.admit_key(key),
            Err(reason) => Admission::Rejected(reason),
        }
    }

    /// Record an established identity: `Accepted` the first time, then
    /// `Duplicate`.
    pub fn admit_key(&mut self, key: TitleKey) -> Admission {
        if self.titles.contains(&key.0) {
            self.stats.duplicates_seen += 1;
            return Admission::Duplicate;
        }
        self.titles.insert(key.0);
        self.stats.total_seen += 1;
        Admission::Accepted
    }

    pub fn contains(&self, title: &str) -> bool {
        canonical_title(title).is_some_and(|t| self.titles.contains(&t))
    }

    pub fn stats(&self) -> LedgerStats {
        self.stats
    }
}
