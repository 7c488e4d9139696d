use pretty_assertions::assert_eq;
use proptest::prelude::*;
use scribe_reconcile::{diff_lines, hunks, normalize, split_lines, DiffKind, DocumentState};

fn document() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop_oneof![
            Just("## Overview".to_string()),
            Just("- **Summary:** tbd".to_string()),
            Just(String::new()),
            Just("  ".to_string()),
            "[a-e]{1,3}",
        ],
        0..25,
    )
    .prop_map(|lines| lines.join("\n"))
}

fn pending(accepted: &str, proposed: &str) -> Option<DocumentState> {
    let mut doc = DocumentState::new(accepted);
    doc.propose(proposed).unwrap().then_some(doc)
}

proptest! {
    #[test]
    fn self_diff_is_unchanged(doc in document()) {
        let lines = split_lines(&doc);
        let diff = diff_lines(&lines, &lines);
        prop_assert!(diff.iter().all(|l| l.kind == DiffKind::Unchanged));
        prop_assert!(hunks(&diff, 3).is_empty());
    }

    #[test]
    fn diff_replays_both_sides(a in document(), p in document()) {
        let (old, new) = (split_lines(&a), split_lines(&p));
        let diff = diff_lines(&old, &new);
        let left: Vec<&str> = diff.iter().filter(|l| l.kind != DiffKind::Added).map(|l| l.text.as_str()).collect();
        let right: Vec<&str> = diff.iter().filter(|l| l.kind != DiffKind::Removed).map(|l| l.text.as_str()).collect();
        prop_assert_eq!(left, old.iter().map(String::as_str).collect::<Vec<_>>());
        prop_assert_eq!(right, new.iter().map(String::as_str).collect::<Vec<_>>());
    }

    #[test]
    fn accepting_every_hunk_yields_proposal(a in document(), p in document()) {
        let Some(mut doc) = pending(&a, &p) else {
            prop_assert_eq!(normalize(&a), normalize(&p));
            return Ok(());
        };

        let mut guard = 0;
        while !doc.diff_view(3).hunks.is_empty() {
            doc.accept_hunk(0, 3).unwrap();
            guard += 1;
            prop_assert!(guard <= 100);
        }
        let merged = doc.merged_text().unwrap();
        doc.finalize(&merged);
        prop_assert_eq!(doc.accepted(), normalize(&p));
        prop_assert!(!doc.has_pending_proposal());
    }

    #[test]
    fn accepting_every_line_yields_proposal(a in document(), p in document()) {
        let Some(mut doc) = pending(&a, &p) else { return Ok(()); };

        let mut guard = 0;
        while let Some(idx) = doc.diff_view(3).lines.iter().position(|l| l.kind != DiffKind::Unchanged) {
            doc.accept_line(idx).unwrap();
            guard += 1;
            prop_assert!(guard <= 200);
        }
        prop_assert_eq!(doc.merged_text().unwrap(), normalize(&p));
    }

    #[test]
    fn undo_restores_single_operation(
        a in document(),
        p in document(),
        op in 0u8..4,
        pick in any::<prop::sample::Index>(),
    ) {
        let Some(mut doc) = pending(&a, &p) else { return Ok(()); };
        let before = doc.diff_view(3);

        let applied = match op {
            0 | 1 => {
                let changes: Vec<usize> = before.lines.iter().enumerate()
                    .filter(|(_, l)| l.kind != DiffKind::Unchanged)
                    .map(|(i, _)| i)
                    .collect();
                let idx = changes[pick.index(changes.len())];
                if op == 0 { doc.accept_line(idx) } else { doc.reject_line(idx) }
            }
            2 => doc.accept_hunk(pick.index(before.hunks.len()), 3),
            _ => doc.reject_hunk(pick.index(before.hunks.len()), 3),
        };
        prop_assert!(applied.is_ok());

        prop_assert!(doc.undo().unwrap());
        let after = doc.diff_view(3);
        prop_assert_eq!(after.working_text, before.working_text);
        prop_assert_eq!(after.remaining_text, before.remaining_text);
    }
}

#[test]
fn accept_all_then_finalize_commits_proposal() {
    let mut doc = DocumentState::new("# Doc\n- Summary: tbd\n");
    doc.propose("# Doc\n- Summary: a tool for nurses to hand over shifts\n")
        .unwrap();
    doc.accept_all().unwrap();
    doc.finalize("# Doc\n- Summary: a tool for nurses to hand over shifts\n");
    assert_eq!(
        doc.accepted(),
        "# Doc\n- Summary: a tool for nurses to hand over shifts\n"
    );
    assert!(!doc.has_pending_proposal());
}

#[test]
fn reject_all_keeps_accepted() {
    let accepted = "# Doc\n- Summary: tbd\n";
    let mut doc = DocumentState::new(accepted);
    doc.propose("# Doc\n- Summary: other\n").unwrap();
    doc.reject_all().unwrap();
    assert_eq!(doc.accepted(), accepted);
    assert!(!doc.has_pending_proposal());
}
