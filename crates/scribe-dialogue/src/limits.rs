//! Controller limits

use serde::{Deserialize, Serialize};

/// Bounds applied by the conversation controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DialogueLimits {
    /// Maximum focus stack depth
    pub max_focus_depth: usize,
    /// Maximum digressions pushed before the stack drains
    pub max_consecutive_digressions: u32,
    /// Turns a digression frame stays active
    pub turns_per_focus: u32,
    /// Notes kept per field (oldest evicted first)
    pub fact_cap: usize,
    /// Accumulated notes that make a field ready to summarize
    pub readiness_threshold: usize,
}

impl DialogueLimits {
    /// Create default limits
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With max focus depth
    #[inline]
    #[must_use]
    pub fn with_max_focus_depth(mut self, depth: usize) -> Self {
        self.max_focus_depth = depth;
        self
    }

    /// With max consecutive digressions
    #[inline]
    #[must_use]
    pub fn with_max_consecutive_digressions(mut self, max: u32) -> Self {
        self.max_consecutive_digressions = max;
        self
    }

    /// With turns per focus frame
    #[inline]
    #[must_use]
    pub fn with_turns_per_focus(mut self, turns: u32) -> Self {
        self.turns_per_focus = turns;
        self
    }

    /// With fact cap
    #[inline]
    #[must_use]
    pub fn with_fact_cap(mut self, cap: usize) -> Self {
        self.fact_cap = cap;
        self
    }

    /// With readiness threshold
    #[inline]
    #[must_use]
    pub fn with_readiness_threshold(mut self, threshold: usize) -> Self {
        self.readiness_threshold = threshold;
        self
    }

    /// Name of the first limit that would make the controller degenerate
    ///
    /// A zero turn budget or fact cap can never hold anything, so those are
    /// rejected; zero depth or digressions is allowed and disables digressions.
    #[must_use]
    pub fn invalid_limit(&self) -> Option<&'static str> {
        if self.turns_per_focus == 0 {
            Some("turns_per_focus")
        } else if self.fact_cap == 0 {
            Some("fact_cap")
        } else if self.readiness_threshold == 0 {
            Some("readiness_threshold")
        } else {
            None
        }
    }
}

impl Default for DialogueLimits {
    fn default() -> Self {
        Self {
            max_focus_depth: 2,
            max_consecutive_digressions: 2,
            turns_per_focus: 2,
            fact_cap: 20,
            readiness_threshold: 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let limits = DialogueLimits::default();
        assert_eq!(limits.max_focus_depth, 2);
        assert_eq!(limits.fact_cap, 20);
        assert_eq!(limits.invalid_limit(), None);
    }

    #[test]
    fn zero_budgets_are_reported() {
        assert_eq!(
            DialogueLimits::new().with_turns_per_focus(0).invalid_limit(),
            Some("turns_per_focus")
        );
        assert_eq!(
            DialogueLimits::new().with_fact_cap(0).invalid_limit(),
            Some("fact_cap")
        );
    }

    #[test]
    fn partial_serde_uses_defaults() {
        let limits: DialogueLimits = serde_json::from_str(r#"{"fact_cap": 5}"#).unwrap();
        assert_eq!(limits.fact_cap, 5);
        assert_eq!(limits.turns_per_focus, 2);
    }
}
