//! Focus scheduling
//!
//! Decides which agenda field the conversation should work on next and
//! manages the bounded stack of digressions (examples, standards lookups,
//! deep dives) that may temporarily pull the conversation off the agenda.
//!
//! # Scheduling policy
//!
//! 1. First `missing` field at or after the cursor
//! 2. Otherwise the first `weak` field anywhere in the agenda
//! 3. Otherwise the cursor itself, reported `covered`
//!
//! Unvisited gaps are filled before weak answers are revisited.

use crate::limits::DialogueLimits;
use scribe_agenda::{CoverageMap, CoverageStatus, FieldPos};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Agenda target chosen for the next turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Focus {
    /// Field position
    #[serde(flatten)]
    pub pos: FieldPos,
    /// Field status at the time of the decision
    pub status: CoverageStatus,
}

impl Focus {
    /// Create new focus
    #[inline]
    #[must_use]
    pub const fn new(pos: FieldPos, status: CoverageStatus) -> Self {
        Self { pos, status }
    }
}

/// Agenda position currently being elicited
///
/// The cursor only moves through [`Cursor::advance`] and [`Cursor::skip`],
/// both of which land on a scheduler decision.
///
/// Missing fields are only searched forward, so the cursor never moves back
/// while a later gap is open. Once no missing field remains after it, the
/// weak pass scans the whole agenda and may move the cursor back to an
/// earlier weak field to revisit it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(FieldPos);

impl Cursor {
    /// Cursor at the first agenda field
    #[inline]
    #[must_use]
    pub const fn start() -> Self {
        Self(FieldPos::new(0, 0))
    }

    /// Cursor at an explicit position
    #[inline]
    #[must_use]
    pub const fn at(pos: FieldPos) -> Self {
        Self(pos)
    }

    /// Current position
    #[inline]
    #[must_use]
    pub const fn position(self) -> FieldPos {
        self.0
    }

    /// Next focus from this cursor
    #[inline]
    #[must_use]
    pub fn next_focus(self, map: &CoverageMap) -> Focus {
        next_focus(map, self)
    }

    /// Move to the scheduler's next focus
    ///
    /// Used when the current field has just become covered.
    #[must_use]
    pub fn advance(self, map: &CoverageMap) -> Self {
        Self(next_focus(map, self).pos)
    }

    /// Leave the current field on the user's request
    ///
    /// Like [`Cursor::advance`] but never lands on the current position
    /// unless nothing else is open.
    #[must_use]
    pub fn skip(self, map: &CoverageMap) -> Self {
        Self(next_focus_after(map, self).pos)
    }
}

impl Display for Cursor {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

/// Decide the next agenda target
#[must_use]
pub fn next_focus(map: &CoverageMap, cursor: Cursor) -> Focus {
    let at = cursor.position();
    let missing = map
        .positions()
        .filter(|&pos| pos >= at)
        .find(|&pos| map.status(pos) == CoverageStatus::Missing);
    if let Some(pos) = missing {
        return Focus::new(pos, CoverageStatus::Missing);
    }

    if let Some(pos) = map
        .positions()
        .find(|&pos| map.status(pos) == CoverageStatus::Weak)
    {
        return Focus::new(pos, CoverageStatus::Weak);
    }

    Focus::new(at, CoverageStatus::Covered)
}

/// Decide the next agenda target, excluding the cursor's own field
#[must_use]
pub fn next_focus_after(map: &CoverageMap, cursor: Cursor) -> Focus {
    let at = cursor.position();
    let missing = map
        .positions()
        .filter(|&pos| pos > at)
        .find(|&pos| map.status(pos) == CoverageStatus::Missing);
    if let Some(pos) = missing {
        return Focus::new(pos, CoverageStatus::Missing);
    }

    if let Some(pos) = map
        .positions()
        .filter(|&pos| pos != at)
        .find(|&pos| map.status(pos) == CoverageStatus::Weak)
    {
        return Focus::new(pos, CoverageStatus::Weak);
    }

    Focus::new(at, map.status(at))
}

/// Kind of digression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FocusKind {
    /// Concrete examples of the topic
    Examples,
    /// Standards or best-practice lookup
    Standards,
    /// Deeper exploration of the topic
    DeepDive,
}

impl Display for FocusKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Examples => "examples",
            Self::Standards => "standards",
            Self::DeepDive => "deep_dive",
        })
    }
}

/// One active digression
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FocusFrame {
    /// Digression kind
    #[serde(rename = "type")]
    pub kind: FocusKind,
    /// What the digression is about
    pub topic: String,
    /// Turns left before the frame is popped
    #[serde(rename = "turnsLeft")]
    pub turns_remaining: u32,
    /// 1-based depth within the stack
    pub depth: usize,
}

/// Bounded LIFO stack of digressions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FocusStack {
    frames: Vec<FocusFrame>,
    consecutive: u32,
}

impl FocusStack {
    /// Create empty stack
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to push a digression
    ///
    /// Returns `false` without touching the stack when the depth limit or
    /// the consecutive-digression limit has been reached.
    pub fn push(&mut self, kind: FocusKind, topic: impl Into<String>, limits: &DialogueLimits) -> bool {
        if self.frames.len() >= limits.max_focus_depth
            || self.consecutive >= limits.max_consecutive_digressions
        {
            tracing::debug!(
                depth = self.frames.len(),
                consecutive = self.consecutive,
                %kind,
                "digression refused"
            );
            return false;
        }

        let frame = FocusFrame {
            kind,
            topic: topic.into(),
            turns_remaining: limits.turns_per_focus,
            depth: self.frames.len() + 1,
        };
        tracing::debug!(%kind, topic = %frame.topic, depth = frame.depth, "digression pushed");
        self.frames.push(frame);
        self.consecutive += 1;
        true
    }

    /// Spend one turn of the top frame
    ///
    /// Pops the frame when its budget reaches zero and returns it. The
    /// consecutive counter resets only once the stack is empty.
    pub fn tick(&mut self) -> Option<FocusFrame> {
        let top = self.frames.last_mut()?;
        top.turns_remaining = top.turns_remaining.saturating_sub(1);
        if top.turns_remaining > 0 {
            return None;
        }

        let popped = self.frames.pop();
        if self.frames.is_empty() {
            self.consecutive = 0;
        }
        popped
    }

    /// Active frame, if any
    #[inline]
    #[must_use]
    pub fn top(&self) -> Option<&FocusFrame> {
        self.frames.last()
    }

    /// All frames, bottom first
    #[inline]
    #[must_use]
    pub fn frames(&self) -> &[FocusFrame] {
        &self.frames
    }

    /// Current depth
    #[inline]
    #[must_use]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Digressions pushed since the stack was last empty
    #[inline]
    #[must_use]
    pub fn consecutive(&self) -> u32 {
        self.consecutive
    }

    /// Check if no digression is active
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}
