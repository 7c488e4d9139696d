//! The session aggregate
//!
//! A [`Session`] owns everything one authoring task accumulates: the
//! cursor, the digression stack, the fact ledger, the confirmation gate,
//! the transcript and the document triple. Fields are private; callers go
//! through the controller and reconciliation operations below, which keep
//! the cross-component rules in one place:
//!
//! - the cursor advances only when the field under it becomes covered, or
//!   when the user asks to move on
//! - resolving a proposal clears any outstanding confirmation
//! - the accepted document changes only through `accept_all` and `finalize`

use crate::config::ScribeConfig;
use chrono::{DateTime, Utc};
use scribe_agenda::{CoverageCounts, CoverageMap, FieldPos, FieldReport};
use scribe_dialogue::{
    AddOutcome, ConfirmationGate, ConfirmationRequest, Cursor, FactLedger, Focus, FocusFrame,
    FocusKind, FocusStack,
};
use scribe_reconcile::{ContentHash, DiffView, DocumentState, ReconcileError, ResolveOutcome};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

/// Unique session identifier (ULID for sortability)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub Ulid);

impl SessionId {
    /// Generate new session ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SessionId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ulid::from_string(s.trim()).map(Self)
    }
}

/// Transcript speaker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Controller directive
    System,
    /// The human author
    User,
    /// The model (or a gate-composed reply)
    Assistant,
}

/// One transcript entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Speaker
    pub role: Role,
    /// Text
    pub content: String,
    /// When it was recorded
    pub at: DateTime<Utc>,
}

impl Message {
    /// Create message stamped now
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            at: Utc::now(),
        }
    }
}

/// State of one authoring task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    id: SessionId,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    cursor: Cursor,
    #[serde(default)]
    focus: FocusStack,
    #[serde(default)]
    ledger: FactLedger,
    #[serde(default)]
    gate: ConfirmationGate,
    #[serde(default)]
    transcript: Vec<Message>,
    document: DocumentState,
}

impl Session {
    /// Create session with an initial accepted document
    #[must_use]
    pub fn new(initial: &str) -> Self {
        let now = Utc::now();
        Self {
            id: SessionId::new(),
            created_at: now,
            updated_at: now,
            cursor: Cursor::start(),
            focus: FocusStack::new(),
            ledger: FactLedger::new(),
            gate: ConfirmationGate::new(),
            transcript: Vec::new(),
            document: DocumentState::new(initial),
        }
    }

    /// Session ID
    #[inline]
    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Creation time
    #[inline]
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Last modification time
    #[inline]
    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Current cursor
    #[inline]
    #[must_use]
    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    /// Digression stack
    #[inline]
    #[must_use]
    pub fn focus(&self) -> &FocusStack {
        &self.focus
    }

    /// Fact ledger
    #[inline]
    #[must_use]
    pub fn ledger(&self) -> &FactLedger {
        &self.ledger
    }

    /// Confirmation gate
    #[inline]
    #[must_use]
    pub fn gate(&self) -> &ConfirmationGate {
        &self.gate
    }

    /// Mutable confirmation gate, for the turn pipeline
    #[inline]
    pub(crate) fn gate_mut(&mut self) -> &mut ConfirmationGate {
        &mut self.gate
    }

    /// Conversation so far
    #[inline]
    #[must_use]
    pub fn transcript(&self) -> &[Message] {
        &self.transcript
    }

    /// Document triple
    #[inline]
    #[must_use]
    pub fn document(&self) -> &DocumentState {
        &self.document
    }

    /// Accepted document text
    #[inline]
    #[must_use]
    pub fn accepted(&self) -> &str {
        self.document.accepted()
    }

    /// Check if a proposal awaits review
    #[inline]
    #[must_use]
    pub fn has_pending_proposal(&self) -> bool {
        self.document.has_pending_proposal()
    }

    /// Coverage of the accepted document
    #[must_use]
    pub fn coverage(&self, config: &ScribeConfig) -> CoverageMap {
        config.analyzer().analyze(self.document.accepted(), &config.agenda)
    }

    /// Next agenda target from the current cursor
    #[must_use]
    pub fn next_focus(&self, map: &CoverageMap) -> Focus {
        self.cursor.next_focus(map)
    }

    /// Leave the current field on the user's request
    pub fn skip_field(&mut self, map: &CoverageMap) {
        let from = self.cursor;
        self.cursor = self.cursor.skip(map);
        tracing::debug!(from = %from, to = %self.cursor, "cursor skipped");
    }

    /// Push a digression frame
    ///
    /// Returns `false` and leaves the stack alone when depth or the
    /// consecutive-digression budget is exhausted.
    pub fn push_focus(&mut self, kind: FocusKind, topic: &str, config: &ScribeConfig) -> bool {
        let pushed = self.focus.push(kind, topic, &config.limits);
        if pushed {
            tracing::debug!(%kind, topic, depth = self.focus.depth(), "digression pushed");
        } else {
            tracing::warn!(%kind, topic, depth = self.focus.depth(), "digression refused");
        }
        pushed
    }

    /// Spend one turn of the top digression frame
    pub fn tick_focus(&mut self) -> Option<FocusFrame> {
        let popped = self.focus.tick();
        if let Some(frame) = &popped {
            tracing::debug!(kind = %frame.kind, topic = %frame.topic, "digression finished");
        }
        popped
    }

    /// Record facts against a field
    pub fn add_facts<I, S>(&mut self, target: FieldPos, facts: I, config: &ScribeConfig) -> AddOutcome
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.ledger.add_facts(target, facts, config.limits.fact_cap)
    }

    /// Notes recorded for a field, oldest first
    #[must_use]
    pub fn notes_for(&self, target: FieldPos) -> Vec<String> {
        self.ledger.notes_for(target)
    }

    /// Append to the transcript
    pub fn record(&mut self, role: Role, content: impl Into<String>) {
        self.transcript.push(Message::new(role, content));
    }

    /// Open a review for a drafted document
    ///
    /// Returns `Ok(false)` when the draft equals the accepted document
    /// after normalization.
    ///
    /// # Errors
    /// `ProposalPending` if a review is already open.
    pub fn propose(&mut self, text: &str) -> Result<bool, ReconcileError> {
        self.document.propose(text)
    }

    /// Accept one diff line
    ///
    /// # Errors
    /// `NoPendingProposal`, `StaleIndex` or `NotAChange`.
    pub fn accept_line(&mut self, index: usize) -> Result<(), ReconcileError> {
        self.document.accept_line(index)
    }

    /// Reject one diff line
    ///
    /// # Errors
    /// `NoPendingProposal`, `StaleIndex` or `NotAChange`.
    pub fn reject_line(&mut self, index: usize) -> Result<(), ReconcileError> {
        self.document.reject_line(index)
    }

    /// Accept one hunk
    ///
    /// # Errors
    /// `NoPendingProposal` or `StaleIndex`.
    pub fn accept_hunk(&mut self, index: usize, config: &ScribeConfig) -> Result<(), ReconcileError> {
        self.document.accept_hunk(index, config.context_lines)
    }

    /// Reject one hunk
    ///
    /// # Errors
    /// `NoPendingProposal` or `StaleIndex`.
    pub fn reject_hunk(&mut self, index: usize, config: &ScribeConfig) -> Result<(), ReconcileError> {
        self.document.reject_hunk(index, config.context_lines)
    }

    /// Undo the last line or hunk operation
    ///
    /// # Errors
    /// `NoPendingProposal`.
    pub fn undo(&mut self) -> Result<bool, ReconcileError> {
        self.document.undo()
    }

    /// Take the proposal verbatim
    ///
    /// # Errors
    /// `NoPendingProposal` unless this retries an accept-all.
    pub fn accept_all(&mut self, config: &ScribeConfig) -> Result<ResolveOutcome, ReconcileError> {
        let before = self.coverage(config);
        let outcome = self.document.accept_all()?;
        if outcome == ResolveOutcome::Applied {
            self.gate.clear();
            self.advance_if_covered(&before, config);
        }
        Ok(outcome)
    }

    /// Discard the proposal
    ///
    /// # Errors
    /// `NoPendingProposal` unless this retries a reject-all.
    pub fn reject_all(&mut self) -> Result<ResolveOutcome, ReconcileError> {
        let outcome = self.document.reject_all()?;
        if outcome == ResolveOutcome::Applied {
            self.gate.clear();
        }
        Ok(outcome)
    }

    /// Commit a merged text as the accepted document
    pub fn finalize(&mut self, merged: &str, config: &ScribeConfig) -> ContentHash {
        let before = self.coverage(config);
        if self.document.has_pending_proposal() {
            self.gate.clear();
        }
        let hash = self.document.finalize(merged);
        self.advance_if_covered(&before, config);
        hash
    }

    /// Current review view
    #[must_use]
    pub fn diff_view(&self, config: &ScribeConfig) -> DiffView {
        self.document.diff_view(config.context_lines)
    }

    /// Stamp the modification time
    pub(crate) fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Presentation view of the session
    #[must_use]
    pub fn snapshot(&self, config: &ScribeConfig) -> SessionSnapshot {
        let map = self.coverage(config);
        SessionSnapshot {
            id: self.id,
            cursor: self.cursor,
            next_focus: self.next_focus(&map),
            focus_stack: self.focus.frames().to_vec(),
            coverage: map.report(),
            counts: map.counts(),
            confirmation: self.gate.outstanding().cloned(),
            has_pending_proposal: self.has_pending_proposal(),
            accepted: self.document.accepted().to_string(),
            transcript: self.transcript.clone(),
            updated_at: self.updated_at,
        }
    }

    fn advance_if_covered(&mut self, before: &CoverageMap, config: &ScribeConfig) {
        let after = self.coverage(config);
        if after.newly_covered(before, self.cursor.position()) {
            let from = self.cursor;
            self.cursor = self.cursor.advance(&after);
            tracing::debug!(from = %from, to = %self.cursor, "cursor advanced");
        }
    }
}

/// Read-only session view for the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    /// Session ID
    pub id: SessionId,
    /// Current cursor
    pub cursor: Cursor,
    /// Scheduler's next target
    pub next_focus: Focus,
    /// Active digressions, bottom first
    pub focus_stack: Vec<FocusFrame>,
    /// Per-field coverage
    pub coverage: Vec<FieldReport>,
    /// Coverage totals
    pub counts: CoverageCounts,
    /// Outstanding confirmation, if any
    pub confirmation: Option<ConfirmationRequest>,
    /// Whether a proposal awaits review
    pub has_pending_proposal: bool,
    /// Accepted document text
    pub accepted: String,
    /// Conversation so far
    pub transcript: Vec<Message>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
}
