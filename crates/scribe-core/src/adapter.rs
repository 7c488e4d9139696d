//! Language-model adapter
//!
//! The orchestrator talks to the model through [`LanguageModelAdapter`]. One
//! call per turn: the request carries the transcript, the accepted document
//! and a structured focus directive; the response carries the reply,
//! extracted facts, planner hints and (only when drafting was authorized) a
//! proposed document.
//!
//! [`ProcessAdapter`] is the reference implementation: it spawns a child
//! process, writes one JSON request to stdin and reads one JSON object back
//! from stdout.

use crate::config::{AdapterConfig, Temperatures};
use crate::session::{Message, Role};
use async_trait::async_trait;
use scribe_agenda::{Agenda, FieldPos, FieldReport};
use scribe_dialogue::{Cursor, DialogueLimits, Focus, FocusFrame};
use serde::{Deserialize, Serialize};
use std::process::Stdio;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, warn};

/// Adapter failures; any of these aborts the turn
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    /// Adapter program could not be started
    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        /// Program name
        command: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Pipe I/O with the adapter failed
    #[error("adapter I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// Adapter did not answer in time and was killed
    #[error("adapter timed out after {secs}s")]
    Timeout {
        /// Configured timeout
        secs: u64,
    },

    /// Adapter exited unsuccessfully
    #[error("adapter exited with {}: {stderr}", exit_label(.code))]
    Exit {
        /// Exit status, `None` when killed by a signal
        code: Option<i32>,
        /// Captured stderr
        stderr: String,
    },

    /// Output was not a decodable response
    #[error("undecodable adapter output: {0}")]
    Decode(String),

    /// Adapter answered with an `error` field
    #[error("adapter reported: {0}")]
    Reported(String),

    /// Response decoded but violates the protocol
    #[error("invalid adapter response: {0}")]
    Invalid(String),
}

fn exit_label(code: &Option<i32>) -> String {
    code.map_or_else(|| "signal".to_string(), |c| format!("status {c}"))
}

impl AdapterError {
    /// Check if error is retryable
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Timeout { .. } | Self::Exit { .. })
    }
}

/// Transcript entry as sent to the model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireMessage {
    /// Speaker
    pub role: Role,
    /// Text
    pub content: String,
}

impl From<&Message> for WireMessage {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role,
            content: message.content.clone(),
        }
    }
}

/// Agenda and focus directive for one turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Structure {
    /// Full agenda
    pub agenda: Agenda,
    /// Cursor position
    pub cursor: Cursor,
    /// Scheduler's target for this turn
    pub next_focus: Focus,
    /// Active digressions, bottom first
    pub focus_stack: Vec<FocusFrame>,
    /// Controller limits
    pub limits: DialogueLimits,
    /// Coverage of every field
    pub coverage: Vec<FieldReport>,
}

/// One adapter request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdapterRequest {
    /// Latest user utterance
    pub prompt: String,
    /// Directive message followed by the prior transcript
    pub conversation: Vec<WireMessage>,
    /// Accepted document
    pub prd_draft: String,
    /// Agenda and focus directive
    pub structure: Structure,
    /// Whether the model may return a document draft
    pub should_draft: bool,
    /// Model name
    pub llm: Option<String>,
    /// Sampling temperatures
    pub temps: Temperatures,
}

/// Planner action suggested by the model
///
/// Unknown actions decode as [`PlannerAction::None`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum PlannerAction {
    /// Rewrite the document
    UpdatePrd,
    /// Keep gathering facts
    Gather,
    /// Summarize for confirmation
    Summarize,
    /// Ask for confirmation
    ConfirmGate,
    /// Digress into examples
    Examples,
    /// Digress into standards
    Standards,
    /// No suggestion
    #[default]
    None,
}

impl PlannerAction {
    /// Check if the model asks for a summarize/confirm step
    #[inline]
    #[must_use]
    pub const fn is_confirm_signal(self) -> bool {
        matches!(self, Self::Summarize | Self::ConfirmGate)
    }
}

impl From<String> for PlannerAction {
    fn from(raw: String) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "update_prd" => Self::UpdatePrd,
            "gather" => Self::Gather,
            "summarize" => Self::Summarize,
            "confirm_gate" => Self::ConfirmGate,
            "examples" => Self::Examples,
            "standards" => Self::Standards,
            _ => Self::None,
        }
    }
}

/// Planner block of a response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Planner {
    /// Suggested action
    pub action: PlannerAction,
    /// Model confidence in the action
    pub confidence: Option<f32>,
    /// Fields the turn worked on (first one is the turn target)
    pub targets: Vec<FieldPos>,
    /// Facts for the turn target
    pub facts: Vec<String>,
    /// Summary to show if confirmation is requested
    pub summary: Option<String>,
}

/// A fact extracted from the user's input
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "RawFact")]
pub struct ExtractedFact {
    /// Paraphrased fact
    pub text: Option<String>,
    /// Verbatim span from the input
    #[serde(rename = "exact_span")]
    pub exact_span: Option<String>,
    /// Section name the fact belongs to
    pub section_hint: Option<String>,
    /// Field label the fact belongs to
    pub field_hint: Option<String>,
    /// Model confidence
    pub confidence: Option<f32>,
}

impl ExtractedFact {
    /// Plain-text fact
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    /// With section/field hints
    #[must_use]
    pub fn with_hints(mut self, section: impl Into<String>, field: impl Into<String>) -> Self {
        self.section_hint = Some(section.into());
        self.field_hint = Some(field.into());
        self
    }

    /// Note to record: the exact span when present, else the text
    #[must_use]
    pub fn note(&self) -> Option<&str> {
        [self.exact_span.as_deref(), self.text.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|s| !s.is_empty())
    }

    /// Resolve the hinted field, if both hints name one in the agenda
    #[must_use]
    pub fn hinted_field(&self, agenda: &Agenda) -> Option<FieldPos> {
        let section = agenda.find_section(self.section_hint.as_deref()?)?;
        let field = agenda.find_field(section, self.field_hint.as_deref()?)?;
        Some(FieldPos::new(section, field))
    }
}

/// Facts arrive either as bare strings or as objects
#[derive(Deserialize)]
#[serde(untagged)]
enum RawFact {
    Text(String),
    #[serde(rename_all = "camelCase")]
    Structured {
        #[serde(default)]
        text: Option<String>,
        #[serde(default, rename = "exact_span", alias = "exactSpan")]
        exact_span: Option<String>,
        #[serde(default, alias = "section_hint")]
        section_hint: Option<String>,
        #[serde(default, alias = "field_hint")]
        field_hint: Option<String>,
        #[serde(default)]
        confidence: Option<f32>,
    },
}

impl From<RawFact> for ExtractedFact {
    fn from(raw: RawFact) -> Self {
        match raw {
            RawFact::Text(text) => Self::text(text),
            RawFact::Structured {
                text,
                exact_span,
                section_hint,
                field_hint,
                confidence,
            } => Self {
                text,
                exact_span,
                section_hint,
                field_hint,
                confidence,
            },
        }
    }
}

/// One adapter response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AdapterResponse {
    /// Conversational reply
    pub reply: String,
    /// Proposed document, honored only when drafting was authorized
    pub prd_draft: Option<String>,
    /// Planner hints
    pub planner: Option<Planner>,
    /// Extracted facts
    pub facts: Vec<ExtractedFact>,
    /// Adapter-side failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AdapterResponse {
    /// Response with only a reply
    #[must_use]
    pub fn reply(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            ..Self::default()
        }
    }

    /// With a document draft
    #[must_use]
    pub fn with_draft(mut self, draft: impl Into<String>) -> Self {
        self.prd_draft = Some(draft.into());
        self
    }

    /// With a planner block
    #[must_use]
    pub fn with_planner(mut self, planner: Planner) -> Self {
        self.planner = Some(planner);
        self
    }

    /// With an extracted fact
    #[must_use]
    pub fn with_fact(mut self, fact: ExtractedFact) -> Self {
        self.facts.push(fact);
        self
    }

    /// Planner action, `None` when absent
    #[must_use]
    pub fn action(&self) -> PlannerAction {
        self.planner.as_ref().map_or(PlannerAction::None, |p| p.action)
    }
}

/// Decode adapter output
///
/// Tolerates surrounding prose and code fences: the outermost `{…}` is
/// decoded. An `error` field turns into [`AdapterError::Reported`].
///
/// # Errors
/// `Decode` if no JSON object can be decoded, `Reported` if the adapter
/// reported an error.
pub fn parse_response(raw: &str) -> Result<AdapterResponse, AdapterError> {
    let (Some(start), Some(end)) = (raw.find('{'), raw.rfind('}')) else {
        return Err(AdapterError::Decode("no JSON object in output".to_string()));
    };
    if end < start {
        return Err(AdapterError::Decode("no JSON object in output".to_string()));
    }

    let response: AdapterResponse =
        serde_json::from_str(&raw[start..=end]).map_err(|e| AdapterError::Decode(e.to_string()))?;
    match response.error {
        Some(error) if !error.trim().is_empty() => Err(AdapterError::Reported(error)),
        _ => Ok(response),
    }
}

/// Language-model adapter
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LanguageModelAdapter: Send + Sync {
    /// Run one turn
    ///
    /// # Errors
    /// Any [`AdapterError`]; the caller aborts the turn.
    async fn respond(&self, request: &AdapterRequest) -> Result<AdapterResponse, AdapterError>;
}

/// Child-process adapter speaking JSON over stdio
#[derive(Debug, Clone)]
pub struct ProcessAdapter {
    config: AdapterConfig,
}

impl ProcessAdapter {
    /// Create adapter from settings
    #[inline]
    #[must_use]
    pub fn new(config: AdapterConfig) -> Self {
        Self { config }
    }

    /// Adapter settings
    #[inline]
    #[must_use]
    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }
}

/// Write the request and close stdin
///
/// A child that exits without reading everything is judged by its exit
/// status, so a broken pipe here is not an error.
async fn feed(stdin: &mut tokio::process::ChildStdin, payload: &[u8]) -> std::io::Result<()> {
    match stdin.write_all(payload).await {
        Ok(()) => stdin.shutdown().await,
        Err(err) if err.kind() == std::io::ErrorKind::BrokenPipe => {
            debug!("adapter closed stdin early");
            Ok(())
        }
        Err(err) => Err(err),
    }
}

#[async_trait]
impl LanguageModelAdapter for ProcessAdapter {
    async fn respond(&self, request: &AdapterRequest) -> Result<AdapterResponse, AdapterError> {
        let command = self.config.command.as_str();
        let payload = serde_json::to_vec(request).map_err(|e| AdapterError::Invalid(e.to_string()))?;

        let mut cmd = tokio::process::Command::new(command);
        let _ = cmd
            .args(&self.config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(command, bytes = payload.len(), "spawning adapter");
        let mut child = cmd.spawn().map_err(|source| AdapterError::Spawn {
            command: command.to_string(),
            source,
        })?;

        // Readers run concurrently with the stdin write so a chatty child
        // cannot deadlock on a full pipe.
        let stdout_pipe = child.stdout.take();
        let stderr_pipe = child.stderr.take();
        let stdout_handle = tokio::spawn(async move {
            let mut buf = Vec::new();
            if let Some(mut pipe) = stdout_pipe {
                let _ = pipe.read_to_end(&mut buf).await;
            }
            buf
        });
        let stderr_handle = tokio::spawn(async move {
            let mut buf = Vec::new();
            if let Some(mut pipe) = stderr_pipe {
                let _ = pipe.read_to_end(&mut buf).await;
            }
            buf
        });

        // The stdin write shares the deadline with the wait: a child that
        // never reads would otherwise block on a full pipe.
        let stdin = child.stdin.take();
        let exchange = async {
            if let Some(mut stdin) = stdin {
                feed(&mut stdin, &payload).await?;
            }
            child.wait().await
        };
        let finished = match self.config.timeout() {
            Some(limit) => tokio::time::timeout(limit, exchange).await.ok(),
            None => Some(exchange.await),
        };
        let status = match finished {
            Some(status) => status?,
            None => {
                let _ = child.kill().await;
                stdout_handle.abort();
                stderr_handle.abort();
                warn!(command, secs = self.config.timeout_secs, "adapter timed out");
                return Err(AdapterError::Timeout {
                    secs: self.config.timeout_secs,
                });
            }
        };

        let stdout_bytes = stdout_handle.await.unwrap_or_default();
        let stderr_bytes = stderr_handle.await.unwrap_or_default();
        let stderr = String::from_utf8_lossy(&stderr_bytes).trim().to_string();
        if !stderr.is_empty() {
            warn!(command, stderr = %stderr, "adapter stderr");
        }

        if !status.success() {
            return Err(AdapterError::Exit {
                code: status.code(),
                stderr,
            });
        }

        let stdout = String::from_utf8_lossy(&stdout_bytes);
        debug!(command, bytes = stdout.len(), "adapter answered");
        parse_response(&stdout)
    }
}
