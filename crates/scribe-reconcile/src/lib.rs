//! Scribe Reconcile
//!
//! Review of a proposed document rewrite against the last accepted version,
//! with line- and hunk-level accept/reject, undo, and an explicit commit.
//!
//! # Core Concepts
//!
//! - [`DocumentState`]: Accepted text plus at most one [`Proposal`] under review
//! - [`ReconcileState`]: Working copy and remaining proposal, with undo log
//! - [`diff_lines`] / [`hunks`]: LCS line diff and context-grouped hunks
//! - [`normalize`]: Line-ending and trailing-whitespace normalization
//! - [`ContentHash`]: Blake3 identity of a normalized proposal
//!
//! # Example
//!
//! ```rust
//! use scribe_reconcile::{DocumentState, DEFAULT_CONTEXT_LINES};
//!
//! let mut doc = DocumentState::new("## Objectives\n- **Objectives:** none\n");
//! assert!(doc.propose("## Objectives\n- **Objectives:** Reduce onboarding time by 30%\n").unwrap());
//!
//! doc.accept_hunk(0, DEFAULT_CONTEXT_LINES).unwrap();
//! let merged = doc.merged_text().unwrap();
//! doc.finalize(&merged);
//! assert!(!doc.has_pending_proposal());
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod diff;
mod document;
mod error;
mod hash;
mod hunk;
mod normalize;
mod state;

pub use diff::{diff_lines, side_by_side, DiffKind, DiffLine, Row, RowKind};
pub use document::{DiffView, DocumentState, Proposal, Resolution, ResolutionKind, ResolveOutcome};
pub use error::ReconcileError;
pub use hash::{ContentHash, HashError};
pub use hunk::{hunks, Hunk, DEFAULT_CONTEXT_LINES};
pub use normalize::{normalize, normalized_eq, render, split_lines};
pub use state::ReconcileState;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
