//! Confirmation gate
//!
//! Two-state machine (`idle`, `awaiting_confirmation`) deciding when the
//! conversation must stop and ask the user to confirm a summary, and when
//! the model is allowed to draft a document rewrite.
//!
//! A turn calls [`ConfirmationGate::before_turn`] before the model runs and
//! [`ConfirmationGate::after_turn`] once its output is known.

use crate::classify::Confirmation;
use chrono::{DateTime, Utc};
use scribe_agenda::FieldPos;
use serde::{Deserialize, Serialize};

/// Reply shown while a proposal waits for review
pub const RESOLVE_PENDING_REPLY: &str = "There is a pending document proposal. \
Please accept, reject or merge it before we continue.";

/// Outstanding request for the user to confirm a summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmationRequest {
    /// Field being confirmed
    pub target: FieldPos,
    /// Summary shown to the user
    pub summary: String,
    /// When the request was opened
    pub created_at: DateTime<Utc>,
}

/// Gate state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum GateState {
    /// No confirmation outstanding
    #[default]
    Idle,
    /// Waiting for the user to confirm a summary
    AwaitingConfirmation {
        /// The open request
        request: ConfirmationRequest,
    },
}

/// Drafting decision for the current turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftPermission {
    /// A proposal is pending; the turn must not reach the model
    Suppressed,
    /// The user confirmed a summary; one draft for this field is allowed
    Authorized(FieldPos),
    /// Normal turn, no drafting
    Withheld,
}

impl DraftPermission {
    /// Check if drafting is allowed this turn
    #[inline]
    #[must_use]
    pub const fn is_authorized(self) -> bool {
        matches!(self, Self::Authorized(_))
    }
}

/// What the turn produced, as seen by the gate
#[derive(Debug, Clone, Copy)]
pub struct TurnOutcome<'a> {
    /// Field the turn worked on
    pub target: FieldPos,
    /// Human label of that field
    pub target_label: &'a str,
    /// The model asked for a summarize/confirm step
    pub confirm_signal: bool,
    /// The ledger judged the field ready
    pub ready: bool,
    /// Summary supplied by the model
    pub external_summary: Option<&'a str>,
    /// Current notes for the field
    pub notes: &'a [String],
}

/// Visible reply decided by the gate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateReply {
    /// Replace the reply with [`RESOLVE_PENDING_REPLY`]
    ResolvePending,
    /// Replace the reply with a confirmation summary
    Summary(String),
    /// Keep the model's reply
    Passthrough,
}

/// Per-session confirmation state machine
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfirmationGate {
    state: GateState,
}

impl ConfirmationGate {
    /// Create idle gate
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state
    #[inline]
    #[must_use]
    pub fn state(&self) -> &GateState {
        &self.state
    }

    /// Outstanding request, if any
    #[must_use]
    pub fn outstanding(&self) -> Option<&ConfirmationRequest> {
        match &self.state {
            GateState::AwaitingConfirmation { request } => Some(request),
            GateState::Idle => None,
        }
    }

    /// Check if a confirmation is outstanding
    #[inline]
    #[must_use]
    pub fn is_awaiting(&self) -> bool {
        self.outstanding().is_some()
    }

    /// Drop any outstanding request
    pub fn clear(&mut self) {
        self.state = GateState::Idle;
    }

    /// Decide drafting for a turn, before the model runs
    ///
    /// A pending proposal forces the gate idle and suppresses the turn. An
    /// affirmative answer to an outstanding request closes it and authorizes
    /// one draft for the confirmed field.
    pub fn before_turn(&mut self, proposal_pending: bool, answer: Confirmation) -> DraftPermission {
        if proposal_pending {
            self.clear();
            return DraftPermission::Suppressed;
        }

        match (&self.state, answer) {
            (GateState::AwaitingConfirmation { request }, Confirmation::Affirm) => {
                let target = request.target;
                tracing::debug!(field = %target, "confirmation accepted, drafting authorized");
                self.clear();
                DraftPermission::Authorized(target)
            }
            _ => DraftPermission::Withheld,
        }
    }

    /// Decide the visible reply, after the model ran
    ///
    /// Opens a new request only on a `Withheld` turn while idle, so a request
    /// closed this turn is never re-opened in the same turn.
    pub fn after_turn(&mut self, permission: DraftPermission, outcome: &TurnOutcome<'_>) -> GateReply {
        match permission {
            DraftPermission::Suppressed => return GateReply::ResolvePending,
            DraftPermission::Authorized(_) => return GateReply::Passthrough,
            DraftPermission::Withheld => {}
        }

        if self.is_awaiting() || !(outcome.confirm_signal || outcome.ready) {
            return GateReply::Passthrough;
        }

        let summary = compose_summary(outcome);
        tracing::debug!(field = %outcome.target, "confirmation requested");
        self.state = GateState::AwaitingConfirmation {
            request: ConfirmationRequest {
                target: outcome.target,
                summary: summary.clone(),
                created_at: Utc::now(),
            },
        };
        GateReply::Summary(summary)
    }
}

fn compose_summary(outcome: &TurnOutcome<'_>) -> String {
    if let Some(summary) = outcome.external_summary.map(str::trim).filter(|s| !s.is_empty()) {
        return summary.to_string();
    }

    if outcome.notes.is_empty() {
        return format!(
            "Shall I draft the **{}** section from what we have discussed? Reply yes to confirm.",
            outcome.target_label
        );
    }

    let mut summary = format!("Here is what I have for **{}**:\n", outcome.target_label);
    for note in outcome.notes {
        summary.push_str("- ");
        summary.push_str(note);
        summary.push('\n');
    }
    summary.push_str("\nDoes this look right? Reply yes to draft it, or tell me what to change.");
    summary
}
