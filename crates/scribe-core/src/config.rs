//! Scribe configuration
//!
//! Loaded from TOML. Every field has a default, so an empty file (or no
//! file at all) yields the stock PRD agenda, default controller limits and
//! the reference child-process adapter.

use scribe_agenda::{Agenda, CoverageAnalyzer, DEFAULT_MIN_CONTENT_CHARS};
use scribe_dialogue::DialogueLimits;
use scribe_reconcile::DEFAULT_CONTEXT_LINES;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("failed to read config {}: {source}", path.display())]
    Io {
        /// File that failed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// TOML did not decode (includes invalid agenda shapes)
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range
    #[error("invalid config value: {0}")]
    Invalid(String),
}

/// Sampling temperatures sent to the model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Temperatures {
    /// Conversational replies
    pub reply: f32,
    /// Document drafting
    pub draft: f32,
}

impl Default for Temperatures {
    fn default() -> Self {
        Self {
            reply: 0.7,
            draft: 0.2,
        }
    }
}

/// Language-model adapter settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterConfig {
    /// Program to spawn
    pub command: String,
    /// Arguments passed to the program
    pub args: Vec<String>,
    /// Model name forwarded in each request
    pub model: Option<String>,
    /// Sampling temperatures
    pub temps: Temperatures,
    /// Kill the child after this many seconds (0 disables the timeout)
    pub timeout_secs: u64,
}

impl AdapterConfig {
    /// Timeout as a duration, if enabled
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            command: "python3".to_string(),
            args: vec!["llm/conversation_flow.py".to_string()],
            model: None,
            temps: Temperatures::default(),
            timeout_secs: 120,
        }
    }
}

/// Scribe configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScribeConfig {
    /// Sections and fields the document is written against
    pub agenda: Agenda,
    /// Controller limits
    pub limits: DialogueLimits,
    /// Characters a value needs before it counts as covered
    pub min_content_chars: usize,
    /// Unchanged lines around each diff hunk
    pub context_lines: usize,
    /// Language-model adapter
    pub adapter: AdapterConfig,
}

impl ScribeConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load and validate a TOML config file
    ///
    /// # Errors
    /// Returns error if the file cannot be read, does not decode, or fails
    /// [`ScribeConfig::validate`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&raw)?;
        tracing::debug!(path = %path.display(), "config loaded");
        Ok(config)
    }

    /// Parse and validate TOML text
    ///
    /// # Errors
    /// Returns error if the text does not decode or fails validation.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges
    ///
    /// Agenda shape is already enforced when the agenda is built.
    ///
    /// # Errors
    /// Returns `Invalid` naming the first offending value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(name) = self.limits.invalid_limit() {
            return Err(ConfigError::Invalid(format!("limits.{name} must be greater than zero")));
        }
        if self.min_content_chars == 0 {
            return Err(ConfigError::Invalid("min_content_chars must be greater than zero".into()));
        }
        if self.adapter.command.trim().is_empty() {
            return Err(ConfigError::Invalid("adapter.command must not be empty".into()));
        }
        let temps = self.adapter.temps;
        for (name, value) in [("reply", temps.reply), ("draft", temps.draft)] {
            if !(0.0..=2.0).contains(&value) {
                return Err(ConfigError::Invalid(format!(
                    "adapter.temps.{name} must be within 0.0..=2.0, got {value}"
                )));
            }
        }
        Ok(())
    }

    /// With agenda
    #[inline]
    #[must_use]
    pub fn with_agenda(mut self, agenda: Agenda) -> Self {
        self.agenda = agenda;
        self
    }

    /// With controller limits
    #[inline]
    #[must_use]
    pub fn with_limits(mut self, limits: DialogueLimits) -> Self {
        self.limits = limits;
        self
    }

    /// With coverage threshold
    #[inline]
    #[must_use]
    pub fn with_min_content_chars(mut self, chars: usize) -> Self {
        self.min_content_chars = chars;
        self
    }

    /// With diff context lines
    #[inline]
    #[must_use]
    pub fn with_context_lines(mut self, lines: usize) -> Self {
        self.context_lines = lines;
        self
    }

    /// With adapter settings
    #[inline]
    #[must_use]
    pub fn with_adapter(mut self, adapter: AdapterConfig) -> Self {
        self.adapter = adapter;
        self
    }

    /// Coverage analyzer for this configuration
    #[must_use]
    pub fn analyzer(&self) -> CoverageAnalyzer {
        CoverageAnalyzer::new().with_min_content(self.min_content_chars)
    }
}

impl Default for ScribeConfig {
    fn default() -> Self {
        Self {
            agenda: Agenda::prd(),
            limits: DialogueLimits::default(),
            min_content_chars: DEFAULT_MIN_CONTENT_CHARS,
            context_lines: DEFAULT_CONTEXT_LINES,
            adapter: AdapterConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_is_default() {
        let config = ScribeConfig::from_toml_str("").unwrap();
        assert_eq!(config, ScribeConfig::default());
        assert_eq!(config.agenda.field_count(), 11);
        assert_eq!(config.adapter.timeout(), Some(Duration::from_secs(120)));
    }

    #[test]
    fn partial_toml_overrides() {
        let raw = r#"
            context_lines = 1

            [limits]
            max_focus_depth = 3

            [[agenda]]
            name = "Goals"
            fields = ["Goal", "Metric"]

            [adapter]
            command = "./fake-model"
            args = []
            timeout_secs = 0

            [adapter.temps]
            reply = 1.0
        "#;
        let config = ScribeConfig::from_toml_str(raw).unwrap();
        assert_eq!(config.context_lines, 1);
        assert_eq!(config.limits.max_focus_depth, 3);
        assert_eq!(config.limits.fact_cap, 20);
        assert_eq!(config.agenda.sections().len(), 1);
        assert_eq!(config.adapter.command, "./fake-model");
        assert_eq!(config.adapter.timeout(), None);
        assert!((config.adapter.temps.draft - 0.2).abs() < f32::EPSILON);
    }

    #[test]
    fn invalid_agenda_rejected_at_parse() {
        let raw = r#"
            [[agenda]]
            name = "Empty"
            fields = []
        "#;
        assert!(matches!(ScribeConfig::from_toml_str(raw), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn zero_limits_rejected() {
        let raw = "[limits]\nfact_cap = 0\n";
        let err = ScribeConfig::from_toml_str(raw).unwrap_err();
        assert!(err.to_string().contains("limits.fact_cap"));

        let bad_temp = ScribeConfig::new().with_adapter(AdapterConfig {
            temps: Temperatures {
                reply: 3.0,
                draft: 0.2,
            },
            ..AdapterConfig::default()
        });
        assert!(matches!(bad_temp.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = ScribeConfig::load("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
