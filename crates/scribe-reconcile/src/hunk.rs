//! Hunk grouping
//!
//! A hunk is a reviewable block: one or more changed runs plus up to
//! `context` unchanged lines on each side. Runs separated by at most
//! `2 * context` unchanged lines share a hunk.

use crate::diff::{DiffKind, DiffLine};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Default context lines around a hunk
pub const DEFAULT_CONTEXT_LINES: usize = 3;

/// Contiguous diff region with context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hunk {
    /// First old-side line covered
    pub old_start: usize,
    /// Old-side lines covered
    pub old_len: usize,
    /// First new-side line covered
    pub new_start: usize,
    /// New-side lines covered
    pub new_len: usize,
    /// The lines, context included
    pub lines: Vec<DiffLine>,
}

impl Hunk {
    /// Old-side range covered
    #[inline]
    #[must_use]
    pub fn old_range(&self) -> std::ops::Range<usize> {
        self.old_start..self.old_start + self.old_len
    }

    /// New-side range covered
    #[inline]
    #[must_use]
    pub fn new_range(&self) -> std::ops::Range<usize> {
        self.new_start..self.new_start + self.new_len
    }

    /// Unified-diff header, 1-based
    #[must_use]
    pub fn header(&self) -> String {
        format!(
            "@@ -{},{} +{},{} @@",
            unified_start(self.old_start, self.old_len),
            self.old_len,
            unified_start(self.new_start, self.new_len),
            self.new_len
        )
    }

    /// Header followed by marked lines
    #[must_use]
    pub fn to_unified(&self) -> String {
        let mut out = self.header();
        out.push('\n');
        for line in &self.lines {
            let _ = writeln!(out, "{}{}", line.kind.marker(), line.text);
        }
        out
    }
}

// Empty ranges point at the line before them, as in unified diff.
fn unified_start(start: usize, len: usize) -> usize {
    if len == 0 {
        start
    } else {
        start + 1
    }
}

/// Group a diff into hunks
#[must_use]
pub fn hunks(lines: &[DiffLine], context: usize) -> Vec<Hunk> {
    let changes: Vec<usize> = lines
        .iter()
        .enumerate()
        .filter(|(_, l)| l.kind.is_change())
        .map(|(idx, _)| idx)
        .collect();
    let Some((&first, rest)) = changes.split_first() else {
        return Vec::new();
    };

    let mut groups = vec![(first, first)];
    for &idx in rest {
        let Some(last) = groups.last_mut() else {
            break;
        };
        if idx - last.1 - 1 <= 2 * context {
            last.1 = idx;
        } else {
            groups.push((idx, idx));
        }
    }

    groups
        .into_iter()
        .map(|(first_change, last_change)| {
            let start = first_change.saturating_sub(context);
            let end = (last_change + context + 1).min(lines.len());
            build(&lines[start..end])
        })
        .collect()
}

fn build(lines: &[DiffLine]) -> Hunk {
    let (old_start, new_start) = lines.first().map_or((0, 0), |l| (l.old_pos, l.new_pos));
    Hunk {
        old_start,
        old_len: lines.iter().filter(|l| l.kind != DiffKind::Added).count(),
        new_start,
        new_len: lines.iter().filter(|l| l.kind != DiffKind::Removed).count(),
        lines: lines.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::diff_lines;
    use pretty_assertions::assert_eq;

    fn numbered(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("line {i}")).collect()
    }

    #[test]
    fn no_changes_no_hunks() {
        let a = numbered(10);
        assert!(hunks(&diff_lines(&a, &a), 3).is_empty());
    }

    #[test]
    fn single_change_gets_context() {
        let old = numbered(10);
        let mut new = old.clone();
        new[5] = "changed".to_string();

        let found = hunks(&diff_lines(&old, &new), 3);
        assert_eq!(found.len(), 1);
        let hunk = &found[0];
        assert_eq!((hunk.old_start, hunk.old_len), (2, 7));
        assert_eq!((hunk.new_start, hunk.new_len), (2, 7));
        assert_eq!(hunk.header(), "@@ -3,7 +3,7 @@");
    }

    #[test]
    fn nearby_runs_merge_distant_runs_split() {
        let old = numbered(30);
        let mut near = old.clone();
        near[5] = "x".to_string();
        near[11] = "y".to_string();
        assert_eq!(hunks(&diff_lines(&old, &near), 3).len(), 1);

        let mut far = old.clone();
        far[5] = "x".to_string();
        far[13] = "y".to_string();
        let split = hunks(&diff_lines(&old, &far), 3);
        assert_eq!(split.len(), 2);
        assert_eq!(split[1].old_start, 10);
    }

    #[test]
    fn insertion_at_start_has_no_leading_context() {
        let old = numbered(2);
        let new = vec!["new".to_string(), "line 0".to_string(), "line 1".to_string()];
        let found = hunks(&diff_lines(&old, &new), 3);
        assert_eq!(found.len(), 1);
        assert_eq!((found[0].old_start, found[0].old_len), (0, 2));
        assert_eq!((found[0].new_start, found[0].new_len), (0, 3));
        assert_eq!(found[0].to_unified(), "@@ -1,2 +1,3 @@\n+new\n line 0\n line 1\n");
    }

    #[test]
    fn zero_context() {
        let old = numbered(5);
        let mut new = old.clone();
        new[1] = "a".to_string();
        new[2] = "b".to_string();
        let found = hunks(&diff_lines(&old, &new), 0);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].old_range(), 1..3);
        assert_eq!(found[0].new_range(), 1..3);
    }
}
