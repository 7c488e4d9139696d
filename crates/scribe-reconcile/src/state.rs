//! Working copy and remaining proposal
//!
//! [`ReconcileState`] holds the two reconciliation buffers. The working copy
//! starts as the accepted text and absorbs accepted changes; the remaining
//! proposal starts as the proposal and sheds rejected changes. Line and
//! hunk indices always address the diff between the two as it is *now*.
//!
//! Buffers are persistent vectors, so the undo snapshot taken before every
//! mutation shares structure with the live buffers.

use crate::diff::{diff_lines, DiffKind, DiffLine};
use crate::error::ReconcileError;
use crate::hunk::{hunks, Hunk};
use crate::normalize::render;
use im::Vector;
use serde::{Deserialize, Serialize};

/// Saved buffers for undo
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Snapshot {
    working: Vector<String>,
    remaining: Vector<String>,
}

/// Line buffers of an in-progress review
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileState {
    working: Vector<String>,
    remaining: Vector<String>,
    #[serde(default)]
    history: Vec<Snapshot>,
}

impl ReconcileState {
    /// Start a review of `proposal` against `accepted`
    #[must_use]
    pub fn new<A, P>(accepted: &[A], proposal: &[P]) -> Self
    where
        A: AsRef<str>,
        P: AsRef<str>,
    {
        Self {
            working: accepted.iter().map(|l| l.as_ref().to_string()).collect(),
            remaining: proposal.iter().map(|l| l.as_ref().to_string()).collect(),
            history: Vec::new(),
        }
    }

    /// Working copy as normalized text
    #[must_use]
    pub fn working_text(&self) -> String {
        render(&self.working.iter().collect::<Vec<_>>())
    }

    /// Remaining proposal as normalized text
    #[must_use]
    pub fn remaining_text(&self) -> String {
        render(&self.remaining.iter().collect::<Vec<_>>())
    }

    /// Current diff, working → remaining
    #[must_use]
    pub fn diff(&self) -> Vec<DiffLine> {
        let working: Vec<&String> = self.working.iter().collect();
        let remaining: Vec<&String> = self.remaining.iter().collect();
        diff_lines(&working, &remaining)
    }

    /// Current hunks
    #[must_use]
    pub fn hunks(&self, context: usize) -> Vec<Hunk> {
        hunks(&self.diff(), context)
    }

    /// Check if every change has been accepted or rejected
    #[inline]
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.working == self.remaining
    }

    /// Check if there is anything to undo
    #[inline]
    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.history.is_empty()
    }

    /// Depth of the undo log
    #[inline]
    #[must_use]
    pub fn undo_depth(&self) -> usize {
        self.history.len()
    }

    /// Take one change into the working copy
    ///
    /// # Errors
    /// Returns `StaleIndex` past the end of the diff and `NotAChange` for an
    /// unchanged line.
    pub fn accept_line(&mut self, index: usize) -> Result<(), ReconcileError> {
        let line = self.changed_line(index)?;
        self.checkpoint();
        match line.kind {
            DiffKind::Added => self.working.insert(line.old_pos, line.text),
            DiffKind::Removed => {
                self.working.remove(line.old_pos);
            }
            DiffKind::Unchanged => {}
        }
        Ok(())
    }

    /// Drop one change from the remaining proposal
    ///
    /// # Errors
    /// Same as [`ReconcileState::accept_line`].
    pub fn reject_line(&mut self, index: usize) -> Result<(), ReconcileError> {
        let line = self.changed_line(index)?;
        self.checkpoint();
        match line.kind {
            DiffKind::Added => {
                self.remaining.remove(line.new_pos);
            }
            DiffKind::Removed => self.remaining.insert(line.new_pos, line.text),
            DiffKind::Unchanged => {}
        }
        Ok(())
    }

    /// Replace the hunk's old range in the working copy with its new range
    ///
    /// # Errors
    /// Returns `StaleIndex` if there is no such hunk.
    pub fn accept_hunk(&mut self, index: usize, context: usize) -> Result<(), ReconcileError> {
        let hunk = self.hunk(index, context)?;
        self.checkpoint();
        let replacement = self.remaining.clone().slice(hunk.new_range());
        splice(&mut self.working, hunk.old_range(), replacement);
        Ok(())
    }

    /// Replace the hunk's new range in the remaining proposal with its old range
    ///
    /// # Errors
    /// Returns `StaleIndex` if there is no such hunk.
    pub fn reject_hunk(&mut self, index: usize, context: usize) -> Result<(), ReconcileError> {
        let hunk = self.hunk(index, context)?;
        self.checkpoint();
        let replacement = self.working.clone().slice(hunk.old_range());
        splice(&mut self.remaining, hunk.new_range(), replacement);
        Ok(())
    }

    /// Restore the buffers from before the last mutation
    ///
    /// Returns `false` when there is no history.
    pub fn undo(&mut self) -> bool {
        let Some(snapshot) = self.history.pop() else {
            return false;
        };
        self.working = snapshot.working;
        self.remaining = snapshot.remaining;
        true
    }

    fn checkpoint(&mut self) {
        self.history.push(Snapshot {
            working: self.working.clone(),
            remaining: self.remaining.clone(),
        });
    }

    fn changed_line(&self, index: usize) -> Result<DiffLine, ReconcileError> {
        let mut lines = self.diff();
        let len = lines.len();
        if index >= len {
            return Err(ReconcileError::StaleIndex { index, len });
        }
        let line = lines.swap_remove(index);
        if line.kind.is_change() {
            Ok(line)
        } else {
            Err(ReconcileError::NotAChange { index })
        }
    }

    fn hunk(&self, index: usize, context: usize) -> Result<Hunk, ReconcileError> {
        let mut found = self.hunks(context);
        let len = found.len();
        if index >= len {
            return Err(ReconcileError::StaleIndex { index, len });
        }
        Ok(found.swap_remove(index))
    }
}

fn splice(target: &mut Vector<String>, range: std::ops::Range<usize>, replacement: Vector<String>) {
    let mut tail = target.split_off(range.start);
    let rest = tail.split_off(range.end - range.start);
    target.append(replacement);
    target.append(rest);
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn state(old: &[&str], new: &[&str]) -> ReconcileState {
        ReconcileState::new(old, new)
    }

    #[test]
    fn accept_added_line_inserts_into_working() {
        let mut st = state(&["a", "c"], &["a", "b", "c"]);
        assert_eq!(st.diff()[1].kind, DiffKind::Added);

        st.accept_line(1).unwrap();
        assert_eq!(st.working_text(), "a\nb\nc\n");
        assert!(st.is_resolved());
    }

    #[test]
    fn accept_removed_line_deletes_from_working() {
        let mut st = state(&["a", "b", "c"], &["a", "c"]);
        st.accept_line(1).unwrap();
        assert_eq!(st.working_text(), "a\nc\n");
        assert!(st.is_resolved());
    }

    #[test]
    fn reject_lines_edit_remaining() {
        let mut st = state(&["a", "b"], &["a", "x"]);
        // - b, + x
        st.reject_line(2).unwrap();
        assert_eq!(st.remaining_text(), "a\n");
        st.reject_line(1).unwrap();
        assert_eq!(st.remaining_text(), "a\nb\n");
        assert!(st.is_resolved());
    }

    #[test]
    fn partial_acceptance_of_a_run_keeps_order() {
        let mut st = state(&["h"], &["h", "one", "two", "three"]);
        st.accept_line(2).unwrap(); // "two"
        assert_eq!(st.working_text(), "h\ntwo\n");
        let lines = st.diff();
        let added: Vec<&str> = lines
            .iter()
            .filter(|l| l.kind == DiffKind::Added)
            .map(|l| l.text.as_str())
            .collect();
        assert_eq!(added, vec!["one", "three"]);

        st.accept_line(1).unwrap(); // "one"
        st.accept_line(3).unwrap(); // "three"
        assert_eq!(st.working_text(), "h\none\ntwo\nthree\n");
    }

    #[test]
    fn unchanged_and_stale_indices_rejected() {
        let mut st = state(&["a", "b"], &["a", "c"]);
        assert_eq!(st.accept_line(0), Err(ReconcileError::NotAChange { index: 0 }));
        assert_eq!(st.reject_line(9), Err(ReconcileError::StaleIndex { index: 9, len: 3 }));
        assert_eq!(st.accept_hunk(1, 3), Err(ReconcileError::StaleIndex { index: 1, len: 1 }));
        assert!(!st.can_undo());
    }

    #[test]
    fn hunk_accept_and_reject() {
        let old: Vec<String> = (0..20).map(|i| format!("l{i}")).collect();
        let mut new = old.clone();
        new[2] = "first".to_string();
        new[15] = "second".to_string();

        let mut st = ReconcileState::new(&old, &new);
        assert_eq!(st.hunks(3).len(), 2);

        st.reject_hunk(1, 3).unwrap();
        assert_eq!(st.hunks(3).len(), 1);
        st.accept_hunk(0, 3).unwrap();
        assert!(st.is_resolved());
        assert!(st.working_text().contains("first"));
        assert!(!st.working_text().contains("second"));
    }

    #[test]
    fn undo_restores_each_step() {
        let mut st = state(&["a", "b"], &["x", "b", "y"]);
        let initial = st.clone();

        st.accept_line(0).unwrap();
        let after_one = (st.working_text(), st.remaining_text());
        st.accept_hunk(0, 3).unwrap();
        assert_eq!(st.undo_depth(), 2);

        assert!(st.undo());
        assert_eq!((st.working_text(), st.remaining_text()), after_one);
        assert!(st.undo());
        assert_eq!(st.working_text(), initial.working_text());
        assert_eq!(st.remaining_text(), initial.remaining_text());
        assert!(!st.undo());
    }

    #[test]
    fn serde_keeps_history() {
        let mut st = state(&["a"], &["b"]);
        st.accept_line(0).unwrap();
        let json = serde_json::to_string(&st).unwrap();
        let mut back: ReconcileState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, st);
        assert!(back.undo());
        assert_eq!(back.working_text(), "a\n");
    }
}
