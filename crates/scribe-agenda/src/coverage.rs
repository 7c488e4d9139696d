//! Coverage map
//!
//! [`CoverageMap`] records, for every agenda field, whether the document
//! currently holds adequate content for it. Maps are derived, never edited:
//! the analyzer builds a fresh one from document text on every turn.

use crate::agenda::{positions_of, Agenda, FieldPos};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Coverage status of a single field
///
/// Ordered from weakest to strongest so statuses can be compared directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverageStatus {
    /// Absent or a literal placeholder
    Missing,
    /// Present but shorter than the minimum-content threshold
    Weak,
    /// Present with adequate content
    Covered,
}

impl CoverageStatus {
    /// Check if status is covered
    #[inline]
    #[must_use]
    pub fn is_covered(self) -> bool {
        matches!(self, Self::Covered)
    }
}

/// Extracted value and its status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldCoverage {
    /// Status derived from the value
    pub status: CoverageStatus,
    /// Raw value text as found in the document (trimmed)
    pub value: String,
}

impl FieldCoverage {
    /// Create new field coverage
    #[inline]
    #[must_use]
    pub fn new(status: CoverageStatus, value: impl Into<String>) -> Self {
        Self {
            status,
            value: value.into(),
        }
    }
}

/// Per-field report entry, used in adapter directives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldReport {
    /// Field position
    #[serde(flatten)]
    pub pos: FieldPos,
    /// Field status
    pub status: CoverageStatus,
}

/// Status totals across the whole agenda
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageCounts {
    /// Fields reported missing
    pub missing: usize,
    /// Fields reported weak
    pub weak: usize,
    /// Fields reported covered
    pub covered: usize,
}

/// Coverage of every agenda field
///
/// Only fields actually found in the document are stored; lookups for any
/// other position inside the agenda report [`CoverageStatus::Missing`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverageMap {
    shape: Vec<usize>,
    entries: BTreeMap<FieldPos, FieldCoverage>,
}

impl CoverageMap {
    /// Empty map for an agenda (every field missing)
    #[must_use]
    pub fn empty(agenda: &Agenda) -> Self {
        Self {
            shape: agenda.shape(),
            entries: BTreeMap::new(),
        }
    }

    /// Add a field entry (builder style)
    ///
    /// Positions outside the agenda shape are ignored.
    #[must_use]
    pub fn with_field(mut self, pos: FieldPos, coverage: FieldCoverage) -> Self {
        self.insert(pos, coverage);
        self
    }

    /// Record a field found in the document
    ///
    /// Keeps the strongest status when the field is seen more than once;
    /// ties keep the earlier occurrence.
    pub(crate) fn record(&mut self, pos: FieldPos, coverage: FieldCoverage) {
        match self.entries.get(&pos) {
            Some(existing) if existing.status >= coverage.status => {}
            _ => self.insert(pos, coverage),
        }
    }

    fn insert(&mut self, pos: FieldPos, coverage: FieldCoverage) {
        if self.contains(pos) {
            self.entries.insert(pos, coverage);
        }
    }

    /// Status of a field (missing when not found)
    #[must_use]
    pub fn status(&self, pos: FieldPos) -> CoverageStatus {
        self.entries
            .get(&pos)
            .map_or(CoverageStatus::Missing, |c| c.status)
    }

    /// Raw value of a field, if it appeared in the document
    #[must_use]
    pub fn value(&self, pos: FieldPos) -> Option<&str> {
        self.entries.get(&pos).map(|c| c.value.as_str())
    }

    /// Check whether `pos` lies inside the agenda this map was built for
    #[must_use]
    pub fn contains(&self, pos: FieldPos) -> bool {
        self.shape
            .get(pos.section)
            .is_some_and(|&count| pos.field < count)
    }

    /// Every agenda position in order
    pub fn positions(&self) -> impl Iterator<Item = FieldPos> + '_ {
        positions_of(&self.shape)
    }

    /// Status of every agenda position in order
    #[must_use]
    pub fn report(&self) -> Vec<FieldReport> {
        self.positions()
            .map(|pos| FieldReport {
                pos,
                status: self.status(pos),
            })
            .collect()
    }

    /// Status totals
    #[must_use]
    pub fn counts(&self) -> CoverageCounts {
        let mut counts = CoverageCounts::default();
        for pos in self.positions() {
            match self.status(pos) {
                CoverageStatus::Missing => counts.missing += 1,
                CoverageStatus::Weak => counts.weak += 1,
                CoverageStatus::Covered => counts.covered += 1,
            }
        }
        counts
    }

    /// Check if every field is covered
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.positions().all(|pos| self.status(pos).is_covered())
    }

    /// Check if `pos` went from not covered in `before` to covered here
    #[must_use]
    pub fn newly_covered(&self, before: &CoverageMap, pos: FieldPos) -> bool {
        !before.status(pos).is_covered() && self.status(pos).is_covered()
    }
}
