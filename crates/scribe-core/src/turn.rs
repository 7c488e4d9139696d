//! Turn pipeline
//!
//! A turn runs in two halves around the adapter call. [`begin`] ticks the
//! digression stack, classifies the input, picks the focus and asks the
//! gate for drafting permission. [`complete`] folds the adapter output back
//! into the session: facts, readiness, the gate's reply and any authorized
//! draft.
//!
//! Both halves mutate a scratch copy of the session; the orchestrator only
//! persists it once `complete` succeeded.

use crate::adapter::{AdapterError, AdapterRequest, AdapterResponse, PlannerAction, Structure, WireMessage};
use crate::config::ScribeConfig;
use crate::error::ScribeError;
use crate::session::{Role, Session};
use scribe_agenda::{CoverageStatus, FieldPos};
use scribe_dialogue::{
    Confirmation, ConfirmationClassifier, DraftPermission, Focus, FocusKind, GateReply, Intent,
    IntentClassifier, TurnOutcome, RESOLVE_PENDING_REPLY,
};
use tracing::{debug, info, warn};

/// Decisions made before the adapter runs
#[derive(Debug, Clone)]
pub(crate) struct TurnPlan {
    permission: DraftPermission,
    focus: Focus,
    digressed: bool,
}

/// First half of a turn
#[derive(Debug)]
pub(crate) enum Begin {
    /// A proposal is pending; the turn is answered without the adapter
    Suppressed,
    /// Call the adapter with this request
    Run(TurnPlan, Box<AdapterRequest>),
}

/// Run the controller up to the adapter call
pub(crate) fn begin(
    session: &mut Session,
    input: &str,
    config: &ScribeConfig,
    intents: &dyn IntentClassifier,
    confirmations: &dyn ConfirmationClassifier,
) -> Begin {
    if session.has_pending_proposal() {
        let _ = session.gate_mut().before_turn(true, Confirmation::Neutral);
        session.record(Role::User, input);
        session.record(Role::Assistant, RESOLVE_PENDING_REPLY);
        debug!(session = %session.id(), "turn suppressed, proposal pending");
        return Begin::Suppressed;
    }

    let _ = session.tick_focus();
    let map = session.coverage(config);

    let intent = intents.classify(input);
    debug!(session = %session.id(), %intent, "input classified");
    let mut digressed = false;
    match intent {
        Intent::Advance => session.skip_field(&map),
        other => {
            if let Some(kind) = other.digression() {
                let topic = focus_label(config, session.next_focus(&map).pos);
                digressed = session.push_focus(kind, &topic, config);
            }
        }
    }

    let focus = session.next_focus(&map);
    let answer = confirmations.classify(input);
    let permission = session.gate_mut().before_turn(false, answer);
    debug!(
        session = %session.id(),
        field = %focus.pos,
        status = status_word(focus.status),
        authorized = permission.is_authorized(),
        "focus decided"
    );

    let mut conversation = Vec::with_capacity(session.transcript().len() + 1);
    conversation.push(WireMessage {
        role: Role::System,
        content: directive(session, config, focus, permission),
    });
    conversation.extend(session.transcript().iter().map(WireMessage::from));

    let request = AdapterRequest {
        prompt: input.to_string(),
        conversation,
        prd_draft: session.accepted().to_string(),
        structure: Structure {
            agenda: config.agenda.clone(),
            cursor: session.cursor(),
            next_focus: focus,
            focus_stack: session.focus().frames().to_vec(),
            limits: config.limits,
            coverage: map.report(),
        },
        should_draft: permission.is_authorized(),
        llm: config.adapter.model.clone(),
        temps: config.adapter.temps,
    };

    Begin::Run(
        TurnPlan {
            permission,
            focus,
            digressed,
        },
        Box::new(request),
    )
}

/// Fold the adapter output into the session and return the visible reply
///
/// # Errors
/// `Adapter(Invalid)` when the planner names fields outside the agenda.
pub(crate) fn complete(
    session: &mut Session,
    plan: TurnPlan,
    input: &str,
    response: AdapterResponse,
    config: &ScribeConfig,
) -> Result<String, ScribeError> {
    let planner = response.planner.clone().unwrap_or_default();
    if let Some(bad) = planner.targets.iter().find(|pos| !config.agenda.contains(**pos)) {
        return Err(AdapterError::Invalid(format!("planner target {bad} is outside the agenda")).into());
    }

    if !plan.digressed {
        let kind = match planner.action {
            PlannerAction::Examples => Some(FocusKind::Examples),
            PlannerAction::Standards => Some(FocusKind::Standards),
            _ => None,
        };
        if let Some(kind) = kind {
            let topic = focus_label(config, plan.focus.pos);
            let _ = session.push_focus(kind, &topic, config);
        }
    }

    let target = planner.targets.first().copied().unwrap_or(plan.focus.pos);
    let mut for_target: Vec<&str> = planner.facts.iter().map(String::as_str).collect();
    for fact in &response.facts {
        let Some(note) = fact.note() else { continue };
        match fact.hinted_field(&config.agenda) {
            Some(pos) if pos != target => {
                let _ = session.add_facts(pos, [note], config);
            }
            _ => for_target.push(note),
        }
    }
    let outcome = session.add_facts(target, for_target, config);
    let ready = outcome.is_ready(config.limits.readiness_threshold);
    debug!(
        session = %session.id(),
        field = %target,
        added = outcome.added,
        total = outcome.total,
        ready,
        "facts recorded"
    );

    let label = focus_label(config, target);
    let notes = session.notes_for(target);
    let gate_reply = session.gate_mut().after_turn(
        plan.permission,
        &TurnOutcome {
            target,
            target_label: &label,
            confirm_signal: planner.action.is_confirm_signal(),
            ready,
            external_summary: planner.summary.as_deref(),
            notes: &notes,
        },
    );
    let reply = match gate_reply {
        GateReply::Summary(summary) => summary,
        GateReply::Passthrough => response.reply,
        GateReply::ResolvePending => RESOLVE_PENDING_REPLY.to_string(),
    };

    match response.prd_draft.as_deref().filter(|d| !d.trim().is_empty()) {
        Some(draft) if plan.permission.is_authorized() => {
            if session.propose(draft)? {
                info!(session = %session.id(), field = %target, "proposal opened");
            } else {
                debug!(session = %session.id(), "draft matches accepted document");
            }
        }
        Some(_) => warn!(session = %session.id(), "ignoring draft returned without authorization"),
        None => {}
    }

    session.record(Role::User, input);
    session.record(Role::Assistant, reply.clone());
    Ok(reply)
}

fn focus_label(config: &ScribeConfig, pos: FieldPos) -> String {
    config
        .agenda
        .field_label(pos)
        .map_or_else(|| pos.to_string(), str::to_string)
}

fn status_word(status: CoverageStatus) -> &'static str {
    match status {
        CoverageStatus::Missing => "missing",
        CoverageStatus::Weak => "weak",
        CoverageStatus::Covered => "covered",
    }
}

/// System message steering the model for this turn
fn directive(session: &Session, config: &ScribeConfig, focus: Focus, permission: DraftPermission) -> String {
    let section = config
        .agenda
        .section(focus.pos.section)
        .map_or("", |s| s.name.as_str());
    let mut text = format!(
        "You are helping the user write a structured document. \
         Focus on the field **{}** in section **{section}** (currently {}). \
         Ask one question at a time and extract concrete facts from each answer.",
        focus_label(config, focus.pos),
        status_word(focus.status),
    );

    if let Some(frame) = session.focus().top() {
        text.push_str(&format!(
            "\nThe user asked for {} about {}; stay on that for {} more turn(s), then return to the agenda.",
            frame.kind, frame.topic, frame.turns_remaining
        ));
    }

    match permission {
        DraftPermission::Authorized(pos) => text.push_str(&format!(
            "\nThe user confirmed the summary for **{}**. Return the full updated document in prdDraft.",
            focus_label(config, pos)
        )),
        _ => text.push_str("\nDo not return a document draft this turn."),
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{ExtractedFact, Planner};
    use scribe_dialogue::{LexicalConfirmationClassifier, LexicalIntentClassifier};

    fn run_begin(session: &mut Session, input: &str, config: &ScribeConfig) -> Begin {
        begin(
            session,
            input,
            config,
            &LexicalIntentClassifier,
            &LexicalConfirmationClassifier,
        )
    }

    fn plan_for(session: &mut Session, input: &str, config: &ScribeConfig) -> (TurnPlan, Box<AdapterRequest>) {
        match run_begin(session, input, config) {
            Begin::Run(plan, request) => (plan, request),
            Begin::Suppressed => panic!("turn unexpectedly suppressed"),
        }
    }

    #[test]
    fn request_carries_directive_and_focus() {
        let config = ScribeConfig::default();
        let mut session = Session::new("");
        session.record(Role::User, "earlier");

        let (plan, request) = plan_for(&mut session, "It helps nurses hand over shifts", &config);
        assert_eq!(plan.focus.pos, FieldPos::new(0, 0));
        assert!(!request.should_draft);
        assert_eq!(request.conversation[0].role, Role::System);
        assert!(request.conversation[0].content.contains("**Summary**"));
        assert_eq!(request.conversation.len(), 2);
        assert_eq!(request.structure.coverage.len(), 11);
    }

    #[test]
    fn examples_request_pushes_frame_on_current_label() {
        let config = ScribeConfig::default();
        let mut session = Session::new("");
        let (plan, request) = plan_for(&mut session, "can you show me some examples?", &config);
        assert!(plan.digressed);
        assert_eq!(request.structure.focus_stack.len(), 1);
        assert_eq!(request.structure.focus_stack[0].topic, "Summary");
    }

    #[test]
    fn first_facts_open_confirmation() {
        let config = ScribeConfig::default();
        let mut session = Session::new("");
        let (plan, _) = plan_for(&mut session, "It is a shift handover tool", &config);

        let response = AdapterResponse::reply("Great, tell me more.")
            .with_fact(ExtractedFact::text("Shift handover tool for nurses"));
        let reply = complete(&mut session, plan, "It is a shift handover tool", response, &config).unwrap();

        assert!(reply.contains("Here is what I have for **Summary**"));
        assert!(session.gate().is_awaiting());
        assert_eq!(session.transcript().len(), 2);
    }

    #[test]
    fn hinted_facts_go_to_hinted_field() {
        let config = ScribeConfig::default();
        let mut session = Session::new("");
        let (plan, _) = plan_for(&mut session, "we want 30% faster onboarding", &config);

        let response = AdapterResponse::reply("Noted.")
            .with_fact(ExtractedFact::text("30% faster onboarding").with_hints("objectives", "success metrics"));
        let _ = complete(&mut session, plan, "we want 30% faster onboarding", response, &config).unwrap();

        assert_eq!(session.notes_for(FieldPos::new(1, 1)), vec!["30% faster onboarding"]);
        assert!(session.notes_for(FieldPos::new(0, 0)).is_empty());
    }

    #[test]
    fn out_of_agenda_target_is_invalid() {
        let config = ScribeConfig::default();
        let mut session = Session::new("");
        let (plan, _) = plan_for(&mut session, "hello", &config);
        let response = AdapterResponse::reply("hi").with_planner(Planner {
            targets: vec![FieldPos::new(9, 0)],
            ..Planner::default()
        });
        let err = complete(&mut session, plan, "hello", response, &config).unwrap_err();
        assert!(matches!(err, ScribeError::Adapter(AdapterError::Invalid(_))));
    }

    #[test]
    fn unauthorized_draft_ignored() {
        let config = ScribeConfig::default();
        let mut session = Session::new("");
        let (plan, _) = plan_for(&mut session, "hello", &config);
        let response = AdapterResponse::reply("hi").with_draft("## Overview\n- Summary: sneaky rewrite of things\n");
        let reply = complete(&mut session, plan, "hello", response, &config).unwrap();
        assert_eq!(reply, "hi");
        assert!(!session.has_pending_proposal());
    }

    #[test]
    fn pending_proposal_suppresses() {
        let config = ScribeConfig::default();
        let mut session = Session::new("");
        session.propose("## Overview\n- Summary: x\n").unwrap();
        assert!(matches!(run_begin(&mut session, "yes", &config), Begin::Suppressed));
        assert_eq!(session.transcript()[1].content, RESOLVE_PENDING_REPLY);
    }

    #[test]
    fn move_on_skips_missing_field() {
        let config = ScribeConfig::default();
        let mut session = Session::new("");
        let (plan, _) = plan_for(&mut session, "let's move on", &config);
        assert_eq!(session.cursor().position(), FieldPos::new(0, 1));
        assert_eq!(plan.focus.pos, FieldPos::new(0, 1));
        assert_eq!(plan.focus.status, CoverageStatus::Missing);
    }

    #[test]
    fn planner_examples_pushes_frame() {
        let config = ScribeConfig::default();
        let mut session = Session::new("");
        let (plan, _) = plan_for(&mut session, "hello", &config);
        assert!(!plan.digressed);

        let response = AdapterResponse::reply("Here are a few examples.").with_planner(Planner {
            action: PlannerAction::Examples,
            ..Planner::default()
        });
        let reply = complete(&mut session, plan, "hello", response, &config).unwrap();
        assert_eq!(reply, "Here are a few examples.");
        assert_eq!(session.focus().depth(), 1);
        assert_eq!(session.focus().frames()[0].kind, FocusKind::Examples);
        assert_eq!(session.focus().frames()[0].topic, "Summary");
    }

    #[test]
    fn planner_digression_skipped_after_lexical_push() {
        let config = ScribeConfig::default();
        let mut session = Session::new("");
        let (plan, _) = plan_for(&mut session, "show me some examples", &config);
        assert!(plan.digressed);

        let response = AdapterResponse::reply("ok").with_planner(Planner {
            action: PlannerAction::Standards,
            ..Planner::default()
        });
        let _ = complete(&mut session, plan, "show me some examples", response, &config).unwrap();
        assert_eq!(session.focus().depth(), 1);
        assert_eq!(session.focus().frames()[0].kind, FocusKind::Examples);
    }

    #[test]
    fn disagreement_keeps_confirmation_open() {
        let config = ScribeConfig::default();
        let mut session = Session::new("");
        let (plan, _) = plan_for(&mut session, "It is a shift handover tool", &config);
        let response = AdapterResponse::reply("Noted.").with_fact(ExtractedFact::text("Shift handover tool for nurses"));
        let _ = complete(&mut session, plan, "It is a shift handover tool", response, &config).unwrap();
        assert!(session.gate().is_awaiting());

        let input = "no, change it to cover doctors as well";
        let (plan, request) = plan_for(&mut session, input, &config);
        assert!(!request.should_draft);
        assert!(!plan.permission.is_authorized());

        let response = AdapterResponse::reply("Got it, doctors too. Anything else?");
        let reply = complete(&mut session, plan, input, response, &config).unwrap();
        assert_eq!(reply, "Got it, doctors too. Anything else?");
        assert!(session.gate().is_awaiting());
        assert!(!session.has_pending_proposal());
    }
}
