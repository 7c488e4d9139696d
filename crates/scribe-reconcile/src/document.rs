//! Accepted / proposed / working document triple
//!
//! [`DocumentState`] is the only owner of the accepted document. A proposal
//! opens a review ([`ReconcileState`]); the review ends with `accept_all`,
//! `reject_all` or `finalize`, and only `accept_all` and `finalize` change
//! the accepted text.
//!
//! The last resolution is remembered by content hash, so a retried
//! `accept_all`/`reject_all` for an already resolved proposal succeeds
//! without doing anything.

use crate::diff::DiffLine;
use crate::error::ReconcileError;
use crate::hash::ContentHash;
use crate::hunk::Hunk;
use crate::normalize::{normalize, split_lines};
use crate::state::ReconcileState;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// A proposal under review
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    /// Normalized proposed text
    pub text: String,
    /// Hash of `text`
    pub hash: ContentHash,
    /// Review buffers
    pub review: ReconcileState,
}

/// How a proposal left review
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionKind {
    /// Taken verbatim
    Accepted,
    /// Discarded
    Rejected,
    /// Committed from a merge
    Finalized,
}

/// Record of the last resolved proposal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    /// Resolved proposal
    pub hash: ContentHash,
    /// How it was resolved
    pub kind: ResolutionKind,
}

/// Result of a resolve call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveOutcome {
    /// The pending proposal was resolved
    Applied,
    /// Retry of a resolution that already happened; nothing changed
    Replayed,
}

/// Read-only view of the review, for the presentation layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffView {
    /// Accepted text
    pub accepted_text: String,
    /// Proposed text, if any
    pub proposed_text: Option<String>,
    /// Whether a proposal is pending
    pub has_pending_proposal: bool,
    /// Working copy text
    pub working_text: String,
    /// Remaining proposal text
    pub remaining_text: String,
    /// Current diff lines
    pub lines: Vec<DiffLine>,
    /// Current hunks
    pub hunks: Vec<Hunk>,
    /// Whether undo has anything to restore
    pub can_undo: bool,
}

/// The document triple of one session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentState {
    accepted: String,
    #[serde(default)]
    proposal: Option<Proposal>,
    #[serde(default)]
    last_resolution: Option<Resolution>,
}

impl DocumentState {
    /// Create with an initial accepted document
    #[must_use]
    pub fn new(accepted: &str) -> Self {
        Self {
            accepted: normalize(accepted),
            proposal: None,
            last_resolution: None,
        }
    }

    /// Accepted text
    #[inline]
    #[must_use]
    pub fn accepted(&self) -> &str {
        &self.accepted
    }

    /// Pending proposal, if any
    #[inline]
    #[must_use]
    pub fn proposal(&self) -> Option<&Proposal> {
        self.proposal.as_ref()
    }

    /// Last resolution, if any
    #[inline]
    #[must_use]
    pub fn last_resolution(&self) -> Option<Resolution> {
        self.last_resolution
    }

    /// Check if a proposal awaits review
    #[inline]
    #[must_use]
    pub fn has_pending_proposal(&self) -> bool {
        self.proposal.is_some()
    }

    /// Open a review for `text`
    ///
    /// Returns `Ok(false)` and opens nothing when `text` normalizes to the
    /// accepted document.
    ///
    /// # Errors
    /// Returns `ProposalPending` if a review is already open.
    pub fn propose(&mut self, text: &str) -> Result<bool, ReconcileError> {
        if self.proposal.is_some() {
            return Err(ReconcileError::ProposalPending);
        }

        let text = normalize(text);
        if text == self.accepted {
            debug!("proposal equals accepted document, ignored");
            return Ok(false);
        }

        let hash = ContentHash::of_text(&text);
        let review = ReconcileState::new(&split_lines(&self.accepted), &split_lines(&text));
        info!(proposal = %hash.short(), "proposal opened");
        self.proposal = Some(Proposal { text, hash, review });
        self.last_resolution = None;
        Ok(true)
    }

    /// Accept a diff line
    ///
    /// # Errors
    /// `NoPendingProposal`, `StaleIndex` or `NotAChange`.
    pub fn accept_line(&mut self, index: usize) -> Result<(), ReconcileError> {
        self.review_mut()?.accept_line(index)
    }

    /// Reject a diff line
    ///
    /// # Errors
    /// `NoPendingProposal`, `StaleIndex` or `NotAChange`.
    pub fn reject_line(&mut self, index: usize) -> Result<(), ReconcileError> {
        self.review_mut()?.reject_line(index)
    }

    /// Accept a hunk
    ///
    /// # Errors
    /// `NoPendingProposal` or `StaleIndex`.
    pub fn accept_hunk(&mut self, index: usize, context: usize) -> Result<(), ReconcileError> {
        self.review_mut()?.accept_hunk(index, context)
    }

    /// Reject a hunk
    ///
    /// # Errors
    /// `NoPendingProposal` or `StaleIndex`.
    pub fn reject_hunk(&mut self, index: usize, context: usize) -> Result<(), ReconcileError> {
        self.review_mut()?.reject_hunk(index, context)
    }

    /// Undo the last line or hunk operation
    ///
    /// Returns `Ok(false)` when there is nothing to undo.
    ///
    /// # Errors
    /// `NoPendingProposal`.
    pub fn undo(&mut self) -> Result<bool, ReconcileError> {
        Ok(self.review_mut()?.undo())
    }

    /// Take the proposal verbatim and commit it
    ///
    /// # Errors
    /// `NoPendingProposal` when nothing is pending and the last resolution
    /// was not an accept-all.
    pub fn accept_all(&mut self) -> Result<ResolveOutcome, ReconcileError> {
        let Some(proposal) = self.proposal.take() else {
            return self.replay(ResolutionKind::Accepted);
        };
        info!(proposal = %proposal.hash.short(), "proposal accepted");
        self.accepted = proposal.text;
        self.last_resolution = Some(Resolution {
            hash: proposal.hash,
            kind: ResolutionKind::Accepted,
        });
        Ok(ResolveOutcome::Applied)
    }

    /// Discard the proposal
    ///
    /// # Errors
    /// `NoPendingProposal` when nothing is pending and the last resolution
    /// was not a reject-all.
    pub fn reject_all(&mut self) -> Result<ResolveOutcome, ReconcileError> {
        let Some(proposal) = self.proposal.take() else {
            return self.replay(ResolutionKind::Rejected);
        };
        info!(proposal = %proposal.hash.short(), "proposal rejected");
        self.last_resolution = Some(Resolution {
            hash: proposal.hash,
            kind: ResolutionKind::Rejected,
        });
        Ok(ResolveOutcome::Applied)
    }

    /// Commit `merged` as the accepted document and close any review
    ///
    /// Always allowed; finalizing the same text twice is a no-op the
    /// second time.
    pub fn finalize(&mut self, merged: &str) -> ContentHash {
        self.accepted = normalize(merged);
        let committed = ContentHash::of_text(&self.accepted);
        if let Some(proposal) = self.proposal.take() {
            self.last_resolution = Some(Resolution {
                hash: proposal.hash,
                kind: ResolutionKind::Finalized,
            });
        }
        info!(accepted = %committed.short(), "document finalized");
        committed
    }

    /// Working copy of the open review
    ///
    /// This is the text `finalize` should receive to commit the review as
    /// reconciled so far.
    #[must_use]
    pub fn merged_text(&self) -> Option<String> {
        self.proposal.as_ref().map(|p| p.review.working_text())
    }

    /// Current review view
    #[must_use]
    pub fn diff_view(&self, context: usize) -> DiffView {
        match &self.proposal {
            Some(proposal) => {
                let lines = proposal.review.diff();
                let hunks = crate::hunk::hunks(&lines, context);
                debug!(lines = lines.len(), hunks = hunks.len(), "diff computed");
                DiffView {
                    accepted_text: self.accepted.clone(),
                    proposed_text: Some(proposal.text.clone()),
                    has_pending_proposal: true,
                    working_text: proposal.review.working_text(),
                    remaining_text: proposal.review.remaining_text(),
                    lines,
                    hunks,
                    can_undo: proposal.review.can_undo(),
                }
            }
            None => DiffView {
                accepted_text: self.accepted.clone(),
                proposed_text: None,
                has_pending_proposal: false,
                working_text: self.accepted.clone(),
                remaining_text: self.accepted.clone(),
                lines: Vec::new(),
                hunks: Vec::new(),
                can_undo: false,
            },
        }
    }

    fn review_mut(&mut self) -> Result<&mut ReconcileState, ReconcileError> {
        self.proposal
            .as_mut()
            .map(|p| &mut p.review)
            .ok_or(ReconcileError::NoPendingProposal)
    }

    fn replay(&self, kind: ResolutionKind) -> Result<ResolveOutcome, ReconcileError> {
        match self.last_resolution {
            Some(last) if last.kind == kind => {
                debug!(proposal = %last.hash.short(), ?kind, "resolution replayed");
                Ok(ResolveOutcome::Replayed)
            }
            _ => Err(ReconcileError::NoPendingProposal),
        }
    }
}
