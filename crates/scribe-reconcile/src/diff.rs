//! Line diff
//!
//! Longest-common-subsequence diff between two line sequences. Within each
//! changed run, removals are emitted before additions.
//!
//! # Positions
//!
//! Every [`DiffLine`] carries a position on both sides. For a line that only
//! exists on one side, the other position is where it would be inserted:
//! an added line's `old_pos` is its insertion index in the old sequence and a
//! removed line's `new_pos` is its insertion index in the new one.

use serde::{Deserialize, Serialize};

/// Kind of diff line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffKind {
    /// Only in the new side
    Added,
    /// Only in the old side
    Removed,
    /// On both sides
    Unchanged,
}

impl DiffKind {
    /// Check if this line is a change
    #[inline]
    #[must_use]
    pub const fn is_change(self) -> bool {
        !matches!(self, Self::Unchanged)
    }

    /// Unified-diff prefix character
    #[inline]
    #[must_use]
    pub const fn marker(self) -> char {
        match self {
            Self::Added => '+',
            Self::Removed => '-',
            Self::Unchanged => ' ',
        }
    }
}

/// One line of a diff
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffLine {
    /// Line kind
    pub kind: DiffKind,
    /// Line text, without terminator
    pub text: String,
    /// Position in the old sequence
    pub old_pos: usize,
    /// Position in the new sequence
    pub new_pos: usize,
}

/// Diff two line sequences
#[must_use]
pub fn diff_lines<A, B>(old: &[A], new: &[B]) -> Vec<DiffLine>
where
    A: AsRef<str>,
    B: AsRef<str>,
{
    let old: Vec<&str> = old.iter().map(|l| l.as_ref()).collect();
    let new: Vec<&str> = new.iter().map(|l| l.as_ref()).collect();

    // shared prefix and suffix never need the table
    let prefix = old
        .iter()
        .zip(&new)
        .take_while(|(a, b)| a == b)
        .count();
    let suffix = old[prefix..]
        .iter()
        .rev()
        .zip(new[prefix..].iter().rev())
        .take_while(|(a, b)| a == b)
        .count();

    let old_mid = &old[prefix..old.len() - suffix];
    let new_mid = &new[prefix..new.len() - suffix];
    let table = LcsTable::build(old_mid, new_mid);

    let mut out = Vec::with_capacity(old.len().max(new.len()));
    out.extend(old[..prefix].iter().enumerate().map(|(k, text)| unchanged(text, k, k)));

    let mut run = ChangeRun::default();
    let (mut i, mut j) = (0, 0);
    while i < old_mid.len() || j < new_mid.len() {
        if i < old_mid.len() && j < new_mid.len() && old_mid[i] == new_mid[j] {
            run.flush(&mut out, prefix + i);
            out.push(unchanged(old_mid[i], prefix + i, prefix + j));
            i += 1;
            j += 1;
        } else if j == new_mid.len() || (i < old_mid.len() && table.get(i + 1, j) >= table.get(i, j + 1)) {
            run.removed.push((prefix + i, old_mid[i]));
            run.new_at.get_or_insert(prefix + j);
            i += 1;
        } else {
            run.added.push((prefix + j, new_mid[j]));
            run.new_at.get_or_insert(prefix + j);
            j += 1;
        }
    }
    run.flush(&mut out, prefix + old_mid.len());

    let old_tail = old.len() - suffix;
    let new_tail = new.len() - suffix;
    out.extend(
        old[old_tail..]
            .iter()
            .enumerate()
            .map(|(k, text)| unchanged(text, old_tail + k, new_tail + k)),
    );
    out
}

fn unchanged(text: &str, old_pos: usize, new_pos: usize) -> DiffLine {
    DiffLine {
        kind: DiffKind::Unchanged,
        text: text.to_string(),
        old_pos,
        new_pos,
    }
}

/// Pending changed run, flushed removals first
#[derive(Default)]
struct ChangeRun<'a> {
    removed: Vec<(usize, &'a str)>,
    added: Vec<(usize, &'a str)>,
    new_at: Option<usize>,
}

impl ChangeRun<'_> {
    fn flush(&mut self, out: &mut Vec<DiffLine>, old_end: usize) {
        let new_at = self.new_at.take().unwrap_or_default();
        for (old_pos, text) in self.removed.drain(..) {
            out.push(DiffLine {
                kind: DiffKind::Removed,
                text: text.to_string(),
                old_pos,
                new_pos: new_at,
            });
        }
        for (new_pos, text) in self.added.drain(..) {
            out.push(DiffLine {
                kind: DiffKind::Added,
                text: text.to_string(),
                old_pos: old_end,
                new_pos,
            });
        }
    }
}

/// Suffix LCS lengths, `(n + 1) x (m + 1)`
struct LcsTable {
    cols: usize,
    cells: Vec<u32>,
}

impl LcsTable {
    fn build(old: &[&str], new: &[&str]) -> Self {
        let cols = new.len() + 1;
        let mut cells = vec![0u32; (old.len() + 1) * cols];
        for i in (0..old.len()).rev() {
            for j in (0..new.len()).rev() {
                cells[i * cols + j] = if old[i] == new[j] {
                    cells[(i + 1) * cols + j + 1] + 1
                } else {
                    cells[(i + 1) * cols + j].max(cells[i * cols + j + 1])
                };
            }
        }
        Self { cols, cells }
    }

    #[inline]
    fn get(&self, i: usize, j: usize) -> u32 {
        self.cells[i * self.cols + j]
    }
}

/// Side-by-side row kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowKind {
    /// Same text on both sides
    Unchanged,
    /// Left only
    Removed,
    /// Right only
    Added,
    /// Left replaced by right
    Modified,
}

/// One row of the side-by-side view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    /// Row kind
    pub kind: RowKind,
    /// Old-side text
    pub left: Option<String>,
    /// New-side text
    pub right: Option<String>,
}

/// Pair a diff into side-by-side rows
///
/// A changed run with as many removals as additions becomes `Modified` rows;
/// any other run is shown as its removals followed by its additions.
#[must_use]
pub fn side_by_side(lines: &[DiffLine]) -> Vec<Row> {
    let mut rows = Vec::with_capacity(lines.len());
    let mut idx = 0;
    while idx < lines.len() {
        let line = &lines[idx];
        if !line.kind.is_change() {
            rows.push(Row {
                kind: RowKind::Unchanged,
                left: Some(line.text.clone()),
                right: Some(line.text.clone()),
            });
            idx += 1;
            continue;
        }

        let end = lines[idx..]
            .iter()
            .position(|l| !l.kind.is_change())
            .map_or(lines.len(), |off| idx + off);
        let run = &lines[idx..end];
        let split = run.partition_point(|l| l.kind == DiffKind::Removed);
        let (removed, added) = run.split_at(split);

        if removed.len() == added.len() {
            rows.extend(removed.iter().zip(added).map(|(r, a)| Row {
                kind: RowKind::Modified,
                left: Some(r.text.clone()),
                right: Some(a.text.clone()),
            }));
        } else {
            rows.extend(removed.iter().map(|r| Row {
                kind: RowKind::Removed,
                left: Some(r.text.clone()),
                right: None,
            }));
            rows.extend(added.iter().map(|a| Row {
                kind: RowKind::Added,
                left: None,
                right: Some(a.text.clone()),
            }));
        }
        idx = end;
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(lines: &[DiffLine]) -> Vec<char> {
        lines.iter().map(|l| l.kind.marker()).collect()
    }

    #[test]
    fn identical_is_all_unchanged() {
        let a = ["x", "y", "z"];
        let lines = diff_lines(&a, &a);
        assert_eq!(kinds(&lines), vec![' ', ' ', ' ']);
        assert_eq!(lines[2].old_pos, 2);
        assert_eq!(lines[2].new_pos, 2);
    }

    #[test]
    fn replacement_puts_removal_first() {
        let old = ["## Objectives", "- **Objectives:** none"];
        let new = ["## Objectives", "- **Objectives:** Reduce onboarding time by 30%"];
        let lines = diff_lines(&old, &new);
        assert_eq!(kinds(&lines), vec![' ', '-', '+']);
        assert_eq!((lines[1].old_pos, lines[1].new_pos), (1, 1));
        assert_eq!((lines[2].old_pos, lines[2].new_pos), (2, 1));
    }

    #[test]
    fn interleaved_changes_are_grouped_per_run() {
        let old = ["a", "b", "c", "d"];
        let new = ["a", "x", "c", "y", "z"];
        let lines = diff_lines(&old, &new);
        assert_eq!(kinds(&lines), vec![' ', '-', '+', ' ', '-', '+', '+']);

        // removed "d" would be reinstated at index 3 of new
        assert_eq!(lines[4].text, "d");
        assert_eq!(lines[4].new_pos, 3);
        // added "z" would be inserted after "d" in old
        assert_eq!(lines[6].text, "z");
        assert_eq!(lines[6].old_pos, 4);
    }

    #[test]
    fn pure_insertions_and_deletions() {
        let lines = diff_lines::<&str, &str>(&[], &["a", "b"]);
        assert_eq!(kinds(&lines), vec!['+', '+']);
        assert!(lines.iter().all(|l| l.old_pos == 0));

        let lines = diff_lines::<&str, &str>(&["a", "b"], &[]);
        assert_eq!(kinds(&lines), vec!['-', '-']);
        assert!(lines.iter().all(|l| l.new_pos == 0));
    }

    #[test]
    fn side_by_side_pairs_equal_runs() {
        let old = ["t", "a", "b", "u", "c"];
        let new = ["t", "A", "B", "u"];
        let rows = side_by_side(&diff_lines(&old, &new));
        let kinds: Vec<RowKind> = rows.iter().map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            vec![
                RowKind::Unchanged,
                RowKind::Modified,
                RowKind::Modified,
                RowKind::Unchanged,
                RowKind::Removed
            ]
        );
        assert_eq!(rows[1].left.as_deref(), Some("a"));
        assert_eq!(rows[1].right.as_deref(), Some("A"));
    }

    #[test]
    fn side_by_side_uneven_run() {
        let rows = side_by_side(&diff_lines(&["a"], &["b", "c"]));
        let kinds: Vec<RowKind> = rows.iter().map(|r| r.kind).collect();
        assert_eq!(kinds, vec![RowKind::Removed, RowKind::Added, RowKind::Added]);
    }
}
