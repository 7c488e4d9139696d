//! Lexical classifiers
//!
//! Both classifiers are single-pass keyword matchers. They sit behind
//! traits so a model-backed classifier can replace them.

use crate::focus::FocusKind;
use regex::RegexSet;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::sync::LazyLock;

/// What the user's turn asks the controller to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    /// Leave the current field
    Advance,
    /// Standards or best-practice digression
    Standards,
    /// Examples digression
    Examples,
    /// Deep-dive digression
    DeepDive,
    /// Ordinary answer for the current field
    OnTopic,
}

impl Intent {
    /// Digression requested by this intent, if any
    #[inline]
    #[must_use]
    pub const fn digression(self) -> Option<FocusKind> {
        match self {
            Self::Standards => Some(FocusKind::Standards),
            Self::Examples => Some(FocusKind::Examples),
            Self::DeepDive => Some(FocusKind::DeepDive),
            Self::Advance | Self::OnTopic => None,
        }
    }
}

impl Display for Intent {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Advance => "advance",
            Self::Standards => "standards",
            Self::Examples => "examples",
            Self::DeepDive => "deep_dive",
            Self::OnTopic => "on_topic",
        })
    }
}

/// Maps free-text input to an [`Intent`]
pub trait IntentClassifier: Send + Sync {
    /// Classify one user utterance
    fn classify(&self, input: &str) -> Intent;
}

/// Whether the user accepted an outstanding summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confirmation {
    /// The summary is right
    Affirm,
    /// The summary needs correcting
    Disagree,
    /// Neither
    Neutral,
}

/// Maps free-text input to a [`Confirmation`]
pub trait ConfirmationClassifier: Send + Sync {
    /// Classify one user utterance
    fn classify(&self, input: &str) -> Confirmation;
}

// Index order is the tie-break order.
const INTENT_ORDER: [Intent; 4] = [
    Intent::Advance,
    Intent::Standards,
    Intent::Examples,
    Intent::DeepDive,
];

static INTENT_PATTERNS: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new([
        r"(?i)\b(?:move on|moving on|next (?:section|question|topic|field|one)|skip(?: this| it| that)?|let'?s continue|go on)\b",
        r"(?i)\b(?:standards?|best practices?|industry norms?|guidelines?|conventions?|compliance)\b",
        r"(?i)\b(?:examples?|for instance|samples?|show me)\b",
        r"(?i)\b(?:deep[- ]?dive|dig (?:deeper|into)|go deeper|elaborate|more detail|in depth|tell me more)\b",
    ])
    .unwrap()
});

static DISAGREE_PATTERNS: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new([
        r"(?i)\b(?:no|nope|nah|wrong|incorrect|actually|instead|change|fix|but)\b",
        r"(?i)\bnot (?:quite|really|right|correct|exactly)\b",
    ])
    .unwrap()
});

static AFFIRM_PATTERNS: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new([
        r"(?i)\b(?:yes|yeah|yep|yup|sure|ok|okay|correct|confirm(?:ed)?|lgtm|approved?|exactly|perfect|right)\b",
        r"(?i)\b(?:looks good|sounds good|go ahead|ship it|that'?s it)\b",
    ])
    .unwrap()
});

/// Keyword-based [`IntentClassifier`]
#[derive(Debug, Clone, Copy, Default)]
pub struct LexicalIntentClassifier;

impl IntentClassifier for LexicalIntentClassifier {
    fn classify(&self, input: &str) -> Intent {
        let intent = INTENT_PATTERNS
            .matches(input)
            .iter()
            .next()
            .map_or(Intent::OnTopic, |idx| INTENT_ORDER[idx]);
        tracing::debug!(%intent, "intent classified");
        intent
    }
}

/// Keyword-based [`ConfirmationClassifier`]
///
/// Disagreement wins over affirmation, so "yes, but change the metric" is a
/// correction.
#[derive(Debug, Clone, Copy, Default)]
pub struct LexicalConfirmationClassifier;

impl ConfirmationClassifier for LexicalConfirmationClassifier {
    fn classify(&self, input: &str) -> Confirmation {
        if DISAGREE_PATTERNS.is_match(input) {
            Confirmation::Disagree
        } else if AFFIRM_PATTERNS.is_match(input) {
            Confirmation::Affirm
        } else {
            Confirmation::Neutral
        }
    }
}
