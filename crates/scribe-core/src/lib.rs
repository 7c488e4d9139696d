//! Scribe Core
//!
//! Session orchestration for conversational document authoring. Wires one
//! user turn through coverage analysis, focus scheduling and the
//! confirmation gate, calls the language-model adapter, and routes drafts
//! into reviewed reconciliation.
//!
//! # Core Concepts
//!
//! - [`Orchestrator`]: Presentation-facing API, one operation per session at a time
//! - [`Session`]: Cursor, digressions, facts, gate, transcript and document triple
//! - [`SessionStore`]: Injected persistence ([`InMemorySessionStore`], [`FileSessionStore`])
//! - [`LanguageModelAdapter`]: One async call per turn ([`ProcessAdapter`] speaks JSON over stdio)
//! - [`ScribeConfig`]: Agenda, limits and adapter settings, loaded from TOML
//!
//! # Example
//!
//! ```rust,no_run
//! use scribe_core::{InMemorySessionStore, Orchestrator, ProcessAdapter, ScribeConfig};
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), scribe_core::ScribeError> {
//! let config = ScribeConfig::default();
//! let adapter = Arc::new(ProcessAdapter::new(config.adapter.clone()));
//! let orch = Orchestrator::new(config, Arc::new(InMemorySessionStore::new()), adapter);
//!
//! let id = orch.create_session("").await?;
//! let turn = orch.submit_turn(id, "We are building a shift handover app").await?;
//! println!("{}", turn.reply);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod adapter;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod session;
pub mod store;
mod turn;

pub use adapter::{
    parse_response, AdapterError, AdapterRequest, AdapterResponse, ExtractedFact,
    LanguageModelAdapter, Planner, PlannerAction, ProcessAdapter, Structure, WireMessage,
};
pub use config::{AdapterConfig, ConfigError, ScribeConfig, Temperatures};
pub use error::ScribeError;
pub use orchestrator::{Orchestrator, TurnResult};
pub use session::{Message, Role, Session, SessionId, SessionSnapshot};
pub use store::{FileSessionStore, InMemorySessionStore, SessionStore, StoreError};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude for common imports
pub mod prelude {
    pub use crate::adapter::{AdapterResponse, LanguageModelAdapter};
    pub use crate::config::ScribeConfig;
    pub use crate::error::ScribeError;
    pub use crate::orchestrator::Orchestrator;
    pub use crate::session::SessionId;
    pub use crate::store::SessionStore;
}
