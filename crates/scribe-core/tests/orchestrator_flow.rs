use pretty_assertions::assert_eq;
use scribe_agenda::FieldPos;
use scribe_core::{
    AdapterResponse, ExtractedFact, FileSessionStore, Orchestrator, Planner, PlannerAction, ScribeConfig,
    ScribeError, SessionId, SessionStore,
};
use scribe_dialogue::RESOLVE_PENDING_REPLY;
use scribe_reconcile::{DiffKind, ReconcileError, ResolveOutcome};
use scribe_dialogue::DialogueLimits;
use scribe_test_utils::{
    harness, harness_with_config, prd_skeleton, Harness, ScriptedAdapter, OBJECTIVES_NONE, OBJECTIVES_SET,
    OVERVIEW_COVERED,
};
use std::sync::Arc;

const SUMMARY_DRAFT: &str = "## Overview\n- **Summary:** Shift handover app for hospital ward nurses\n";

async fn with_proposal(h: &Harness, accepted: &str, proposed: &str) -> SessionId {
    let id = h.orchestrator.create_session(accepted).await.unwrap();
    let mut session = h.store.get(id).await.unwrap().unwrap();
    assert!(session.propose(proposed).unwrap());
    h.store.update(&session).await.unwrap();
    id
}

#[tokio::test]
async fn confirm_then_draft_then_accept() {
    let adapter = ScriptedAdapter::new()
        .then_respond(
            AdapterResponse::reply("Who uses it?")
                .with_fact(ExtractedFact::text("Shift handover app for hospital ward nurses")),
        )
        .then_respond(AdapterResponse::reply("Drafted the summary.").with_draft(SUMMARY_DRAFT));
    let h = harness(adapter);
    let id = h.orchestrator.create_session("").await.unwrap();

    // First facts for the field open a confirmation instead of the model reply.
    let first = h
        .orchestrator
        .submit_turn(id, "It's a shift handover app for ward nurses")
        .await
        .unwrap();
    assert!(first.reply.contains("Here is what I have for **Summary**"));
    assert!(first.snapshot.confirmation.is_some());

    let second = h.orchestrator.submit_turn(id, "yes, that's right").await.unwrap();
    assert_eq!(second.reply, "Drafted the summary.");
    assert!(second.has_pending_proposal);
    assert!(second.snapshot.confirmation.is_none());

    let requests = h.adapter.requests();
    assert!(!requests[0].should_draft);
    assert!(requests[1].should_draft);
    assert_eq!(requests[1].conversation.len(), 3);

    // While the proposal is open the model is not consulted.
    let third = h.orchestrator.submit_turn(id, "what next?").await.unwrap();
    assert_eq!(third.reply, RESOLVE_PENDING_REPLY);
    assert_eq!(h.adapter.calls(), 2);

    assert_eq!(h.orchestrator.accept_all(id).await.unwrap(), ResolveOutcome::Applied);
    let snapshot = h.orchestrator.snapshot(id).await.unwrap();
    assert_eq!(snapshot.accepted, SUMMARY_DRAFT);
    assert!(!snapshot.has_pending_proposal);
    assert_eq!(snapshot.cursor.position(), FieldPos::new(0, 1));
}

#[tokio::test]
async fn objectives_scenario() {
    let h = harness(ScriptedAdapter::new());
    let id = with_proposal(&h, OBJECTIVES_NONE, OBJECTIVES_SET).await;

    let diff = h.orchestrator.get_diff(id).await.unwrap();
    assert!(diff.has_pending_proposal);
    let removed = diff.lines.iter().filter(|l| l.kind == DiffKind::Removed).count();
    let added = diff.lines.iter().filter(|l| l.kind == DiffKind::Added).count();
    assert_eq!((removed, added), (1, 1));

    assert_eq!(h.orchestrator.accept_all(id).await.unwrap(), ResolveOutcome::Applied);
    h.orchestrator.finalize(id, OBJECTIVES_SET).await.unwrap();

    let diff = h.orchestrator.get_diff(id).await.unwrap();
    assert!(!diff.has_pending_proposal);
    assert_eq!(diff.accepted_text, OBJECTIVES_SET);
}

#[tokio::test]
async fn second_accept_all_is_a_no_op() {
    let h = harness(ScriptedAdapter::new());
    let id = with_proposal(&h, OBJECTIVES_NONE, OBJECTIVES_SET).await;

    assert_eq!(h.orchestrator.accept_all(id).await.unwrap(), ResolveOutcome::Applied);
    let stored = serde_json::to_string(&h.store.get(id).await.unwrap()).unwrap();

    assert_eq!(h.orchestrator.accept_all(id).await.unwrap(), ResolveOutcome::Replayed);
    assert_eq!(serde_json::to_string(&h.store.get(id).await.unwrap()).unwrap(), stored);

    let err = h.orchestrator.reject_all(id).await.unwrap_err();
    assert!(matches!(err, ScribeError::Reconcile(ReconcileError::NoPendingProposal)));
}

#[tokio::test]
async fn adapter_failure_leaves_session_untouched() {
    let adapter = ScriptedAdapter::new().then_fail("model overloaded");
    let h = harness(adapter);
    let id = h.orchestrator.create_session(OVERVIEW_COVERED).await.unwrap();
    let before = serde_json::to_string(&h.store.get(id).await.unwrap()).unwrap();

    let err = h
        .orchestrator
        .submit_turn(id, "show me some examples, then move on")
        .await
        .unwrap_err();
    assert!(matches!(err, ScribeError::Adapter(_)));

    let after = serde_json::to_string(&h.store.get(id).await.unwrap()).unwrap();
    assert_eq!(after, before);
}

#[tokio::test]
async fn invalid_planner_target_aborts_turn() {
    let adapter = ScriptedAdapter::new().then_respond(AdapterResponse::reply("ok").with_planner(Planner {
        action: PlannerAction::Gather,
        targets: vec![FieldPos::new(0, 7)],
        ..Planner::default()
    }));
    let h = harness(adapter);
    let id = h.orchestrator.create_session("").await.unwrap();

    let err = h.orchestrator.submit_turn(id, "hello").await.unwrap_err();
    assert!(matches!(err, ScribeError::Adapter(_)));
    assert!(h.orchestrator.snapshot(id).await.unwrap().transcript.is_empty());
}

#[tokio::test]
async fn partial_merge_with_undo_and_finalize() {
    let h = harness(ScriptedAdapter::new());
    let accepted = "# Doc\n- Summary: tbd\n- Problem: tbd\n";
    let proposed = "# Doc\n- Summary: Shift handover for nurses\n- Problem: Lost notes\n";
    let id = with_proposal(&h, accepted, proposed).await;

    // - Summary / - Problem / + Summary / + Problem
    let view = h.orchestrator.accept_line(id, 3).await.unwrap();
    assert!(view.can_undo);
    assert!(view.working_text.contains("Shift handover for nurses"));

    let restored = h.orchestrator.undo(id).await.unwrap();
    assert_eq!(restored.working_text, accepted);
    assert!(!restored.can_undo);

    let view = h.orchestrator.accept_hunk(id, 0).await.unwrap();
    assert_eq!(view.working_text, proposed);

    let err = h.orchestrator.accept_hunk(id, 5).await.unwrap_err();
    assert!(err.is_invalid_request());

    h.orchestrator.finalize(id, &view.working_text).await.unwrap();
    let diff = h.orchestrator.get_diff(id).await.unwrap();
    assert!(!diff.has_pending_proposal);
    assert_eq!(diff.accepted_text, proposed);
}

#[tokio::test]
async fn reject_all_keeps_accepted() {
    let h = harness(ScriptedAdapter::new());
    let id = with_proposal(&h, OBJECTIVES_NONE, OBJECTIVES_SET).await;

    assert_eq!(h.orchestrator.reject_all(id).await.unwrap(), ResolveOutcome::Applied);
    let snapshot = h.orchestrator.snapshot(id).await.unwrap();
    assert_eq!(snapshot.accepted, OBJECTIVES_NONE);
    assert!(!snapshot.has_pending_proposal);
}

#[tokio::test]
async fn sessions_run_independently() {
    let adapter = ScriptedAdapter::new().then_reply("one").then_reply("two");
    let h = harness(adapter);
    let a = h.orchestrator.create_session("").await.unwrap();
    let b = h.orchestrator.create_session("").await.unwrap();

    let (ra, rb) = tokio::join!(
        h.orchestrator.submit_turn(a, "hello"),
        h.orchestrator.submit_turn(b, "hello")
    );
    let mut replies = vec![ra.unwrap().reply, rb.unwrap().reply];
    replies.sort();
    assert_eq!(replies, vec!["one", "two"]);
    assert_eq!(h.orchestrator.list().await.unwrap().len(), 2);

    assert!(h.orchestrator.delete(a).await.unwrap());
    assert!(matches!(
        h.orchestrator.snapshot(a).await,
        Err(ScribeError::SessionNotFound(_))
    ));
}

#[tokio::test]
async fn file_store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileSessionStore::open(dir.path()).await.unwrap());
    let orch = Orchestrator::new(
        ScribeConfig::default(),
        store.clone(),
        Arc::new(ScriptedAdapter::new()),
    );

    let id = orch.create_session(OBJECTIVES_NONE).await.unwrap();
    orch.finalize(id, OBJECTIVES_SET).await.unwrap();

    let reopened = FileSessionStore::open(dir.path()).await.unwrap();
    let session = reopened.get(id).await.unwrap().unwrap();
    assert_eq!(session.accepted(), OBJECTIVES_SET);
}

#[tokio::test]
async fn move_on_leaves_placeholder_field() {
    let adapter = ScriptedAdapter::new().then_reply("What problem does it solve?").then_reply("unused");
    let h = harness(adapter);
    let id = h.orchestrator.create_session(&prd_skeleton()).await.unwrap();

    let snapshot = h.orchestrator.snapshot(id).await.unwrap();
    assert_eq!(snapshot.next_focus.pos, FieldPos::new(0, 0));

    let result = h.orchestrator.submit_turn(id, "let's move on").await.unwrap();
    assert_eq!(result.reply, "What problem does it solve?");
    assert_eq!(result.snapshot.cursor.position(), FieldPos::new(0, 1));
    assert_eq!(h.adapter.requests()[0].structure.next_focus.pos, FieldPos::new(0, 1));
    assert_eq!(h.adapter.remaining(), 1);
}

#[tokio::test]
async fn zero_depth_disables_digressions() {
    let config = ScribeConfig::default().with_limits(DialogueLimits {
        max_focus_depth: 0,
        ..DialogueLimits::default()
    });
    let h = harness_with_config(config, ScriptedAdapter::new().then_reply("Sure."));
    let id = h.orchestrator.create_session("").await.unwrap();

    let result = h.orchestrator.submit_turn(id, "show me some examples").await.unwrap();
    assert_eq!(result.reply, "Sure.");
    assert!(result.snapshot.focus_stack.is_empty());
    assert_eq!(h.adapter.remaining(), 0);
}
