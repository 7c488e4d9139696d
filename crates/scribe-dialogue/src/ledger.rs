//! Fact ledger
//!
//! Accumulates short facts extracted from the conversation, per agenda
//! field. Notes are deduplicated (case-insensitively, whitespace-collapsed),
//! kept in arrival order and capped FIFO.

use indexmap::IndexMap;
use scribe_agenda::FieldPos;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Result of recording facts for one field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddOutcome {
    /// Facts that were new for the field
    pub added: usize,
    /// Notes held for the field afterwards
    pub total: usize,
    /// The field had no notes before this call
    pub first_for_field: bool,
}

impl AddOutcome {
    /// Readiness policy
    ///
    /// Ready when the very first facts for a field just arrived, or when the
    /// field holds at least `threshold` notes.
    #[inline]
    #[must_use]
    pub fn is_ready(&self, threshold: usize) -> bool {
        (self.first_for_field && self.added > 0) || self.total >= threshold
    }
}

/// Notes for every field that has any
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<LedgerEntry>", into = "Vec<LedgerEntry>")]
pub struct FactLedger {
    notes: BTreeMap<FieldPos, IndexMap<String, String>>,
}

/// Serialized form of one field's notes
#[derive(Debug, Clone, Serialize, Deserialize)]
struct LedgerEntry {
    #[serde(flatten)]
    pos: FieldPos,
    notes: Vec<String>,
}

impl FactLedger {
    /// Create empty ledger
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record facts against a field
    ///
    /// Blank facts are dropped, duplicates (of existing notes or of each
    /// other) are ignored, and the oldest notes are evicted past `cap`.
    pub fn add_facts<I, S>(&mut self, target: FieldPos, facts: I, cap: usize) -> AddOutcome
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let notes = self.notes.entry(target).or_default();
        let first_for_field = notes.is_empty();

        let mut added = 0;
        for fact in facts {
            let text = normalize_fact(fact.as_ref());
            if text.is_empty() {
                continue;
            }
            let key = text.to_lowercase();
            if notes.contains_key(&key) {
                continue;
            }
            notes.insert(key, text);
            added += 1;
        }

        while notes.len() > cap {
            notes.shift_remove_index(0);
        }

        let total = notes.len();
        if total == 0 {
            self.notes.remove(&target);
        }

        AddOutcome {
            added,
            total,
            first_for_field,
        }
    }

    /// Notes for a field, oldest first
    #[must_use]
    pub fn notes_for(&self, target: FieldPos) -> Vec<String> {
        self.notes
            .get(&target)
            .map(|notes| notes.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of notes held for a field
    #[must_use]
    pub fn count(&self, target: FieldPos) -> usize {
        self.notes.get(&target).map_or(0, IndexMap::len)
    }

    /// Fields with at least one note
    pub fn fields(&self) -> impl Iterator<Item = FieldPos> + '_ {
        self.notes.keys().copied()
    }
}

impl From<Vec<LedgerEntry>> for FactLedger {
    fn from(entries: Vec<LedgerEntry>) -> Self {
        let notes = entries
            .into_iter()
            .map(|entry| {
                let notes = entry
                    .notes
                    .into_iter()
                    .map(|n| (n.to_lowercase(), n))
                    .collect();
                (entry.pos, notes)
            })
            .collect();
        Self { notes }
    }
}

impl From<FactLedger> for Vec<LedgerEntry> {
    fn from(ledger: FactLedger) -> Self {
        ledger
            .notes
            .into_iter()
            .map(|(pos, notes)| LedgerEntry {
                pos,
                notes: notes.into_values().collect(),
            })
            .collect()
    }
}

/// Trim and collapse internal whitespace
fn normalize_fact(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const CAP: usize = 20;

    #[test]
    fn dedups_and_keeps_order() {
        let mut ledger = FactLedger::new();
        let pos = FieldPos::new(0, 1);
        let outcome = ledger.add_facts(pos, ["  SSO via Google ", "", "sso  via google", "p95 < 200ms"], CAP);

        assert_eq!(outcome.added, 2);
        assert!(outcome.first_for_field);
        assert_eq!(ledger.notes_for(pos), vec!["SSO via Google", "p95 < 200ms"]);
    }

    #[test]
    fn evicts_oldest_past_cap() {
        let mut ledger = FactLedger::new();
        let pos = FieldPos::new(1, 0);
        ledger.add_facts(pos, ["a", "b", "c"], 2);
        assert_eq!(ledger.notes_for(pos), vec!["b", "c"]);

        let outcome = ledger.add_facts(pos, ["b", "d"], 2);
        assert_eq!(outcome.added, 1);
        assert!(!outcome.first_for_field);
        assert_eq!(ledger.notes_for(pos), vec!["c", "d"]);
    }

    #[test]
    fn readiness_policy() {
        let mut ledger = FactLedger::new();
        let pos = FieldPos::new(2, 0);

        let first = ledger.add_facts(pos, ["one strong answer"], CAP);
        assert!(first.is_ready(2));

        let mut other = FactLedger::new();
        let empty = other.add_facts(pos, ["  "], CAP);
        assert!(!empty.is_ready(2));
        assert_eq!(other.count(pos), 0);
        assert_eq!(other.fields().count(), 0);

        let trickle = other.add_facts(pos, ["first"], CAP);
        assert!(trickle.is_ready(2));
        let repeat = other.add_facts(pos, ["first"], CAP);
        assert!(!repeat.is_ready(2));
        let second = other.add_facts(pos, ["second"], CAP);
        assert!(second.is_ready(2));
    }

    #[test]
    fn serde_roundtrip_preserves_notes() {
        let mut ledger = FactLedger::new();
        ledger.add_facts(FieldPos::new(0, 0), ["x", "y"], CAP);
        ledger.add_facts(FieldPos::new(3, 1), ["z"], CAP);

        let json = serde_json::to_string(&ledger).unwrap();
        let decoded: FactLedger = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, ledger);
        assert!(json.contains("\"sectionIndex\":3"));
    }
}
