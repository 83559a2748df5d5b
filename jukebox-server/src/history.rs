//! Per-track attribution ledger
//!
//! One record per distinct track id; a later accepted submission of the same
//! id overwrites the earlier record. Records are never removed while the
//! process runs.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Who contributed a track and the genre it resolved to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub submitted_by: String,
    pub genre: String,
}

#[derive(Debug, Clone, Default)]
pub struct HistoryLedger {
    records: BTreeMap<String, HistoryRecord>,
}

impl HistoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upsert the record for `track_id`
    pub fn record(
        &mut self,
        track_id: impl Into<String>,
        submitted_by: impl Into<String>,
        genre: impl Into<String>,
    ) {
        self.records.insert(
            track_id.into(),
            HistoryRecord {
                submitted_by: submitted_by.into(),
                genre: genre.into(),
            },
        );
    }

    pub fn get(&self, track_id: &str) -> Option<&HistoryRecord> {
        self.records.get(track_id)
    }

    /// Copy of all records ordered by track id
    pub fn snapshot(&self) -> BTreeMap<String, HistoryRecord> {
        self.records.clone()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_get() {
        let mut ledger = HistoryLedger::new();
        assert!(ledger.is_empty());

        ledger.record("Q1", "freddie", "rock");
        assert_eq!(ledger.len(), 1);
        assert_eq!(
            ledger.get("Q1"),
            Some(&HistoryRecord {
                submitted_by: "freddie".to_string(),
                genre: "rock".to_string(),
            })
        );
        assert!(ledger.get("Q2").is_none());
    }

    #[test]
    fn test_record_overwrites_same_id() {
        let mut ledger = HistoryLedger::new();
        ledger.record("Q1", "freddie", "rock");
        ledger.record("Q1", "brian", "rock");

        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.get("Q1").unwrap().submitted_by, "brian");
    }

    #[test]
    fn test_snapshot_is_detached() {
        let mut ledger = HistoryLedger::new();
        ledger.record("B", "u1", "pop");
        ledger.record("A", "u2", "jazz");

        let snapshot = ledger.snapshot();
        ledger.record("C", "u3", "rock");

        let keys: Vec<_> = snapshot.keys().cloned().collect();
        assert_eq!(keys, vec!["A".to_string(), "B".to_string()]);
        assert_eq!(ledger.len(), 3);
    }
}
