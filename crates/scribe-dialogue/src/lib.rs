//! Scribe Dialogue
//!
//! The conversation-structure controller: which agenda field a turn works
//! on, how far the conversation may digress, what the user has told us so
//! far, and when to stop and ask for confirmation before drafting.
//!
//! # Core Concepts
//!
//! - [`Cursor`]: Agenda position being elicited, moved by the scheduler
//! - [`FocusStack`]: Bounded, turn-budgeted digressions
//! - [`FactLedger`]: Deduplicated, capped notes per agenda field
//! - [`ConfirmationGate`]: `idle` ⇄ `awaiting_confirmation`, authorizes drafting
//! - [`IntentClassifier`] / [`ConfirmationClassifier`]: Replaceable lexical classifiers
//!
//! # Example
//!
//! ```rust
//! use scribe_agenda::{analyze, Agenda, CoverageStatus, FieldPos};
//! use scribe_dialogue::{Cursor, DialogueLimits, FocusKind, FocusStack};
//!
//! let map = analyze("", &Agenda::prd());
//! let focus = Cursor::start().next_focus(&map);
//! assert_eq!(focus.pos, FieldPos::new(0, 0));
//! assert_eq!(focus.status, CoverageStatus::Missing);
//!
//! let limits = DialogueLimits::default();
//! let mut stack = FocusStack::new();
//! assert!(stack.push(FocusKind::Examples, "Summary", &limits));
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod classify;
mod focus;
mod gate;
mod ledger;
mod limits;

pub use classify::{
    Confirmation, ConfirmationClassifier, Intent, IntentClassifier, LexicalConfirmationClassifier,
    LexicalIntentClassifier,
};
pub use focus::{next_focus, next_focus_after, Cursor, Focus, FocusFrame, FocusKind, FocusStack};
pub use gate::{
    ConfirmationGate, ConfirmationRequest, DraftPermission, GateReply, GateState, TurnOutcome,
    RESOLVE_PENDING_REPLY,
};
pub use ledger::{AddOutcome, FactLedger};
pub use limits::DialogueLimits;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
