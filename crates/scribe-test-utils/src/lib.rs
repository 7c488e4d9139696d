//! Testing utilities for the Scribe workspace
//!
//! A scripted language-model adapter, document fixtures and an orchestrator
//! wired to an in-memory store.

#![allow(missing_docs)]

use async_trait::async_trait;
use scribe_core::{
    AdapterError, AdapterRequest, AdapterResponse, InMemorySessionStore, LanguageModelAdapter,
    Orchestrator, ScribeConfig,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Accepted document with an empty Objectives field
pub const OBJECTIVES_NONE: &str = "## Objectives\n- **Objectives:** none\n";

/// The same document with the Objectives field filled in
pub const OBJECTIVES_SET: &str = "## Objectives\n- **Objectives:** Reduce onboarding time by 30%\n";

/// Fully covered Overview section
pub const OVERVIEW_COVERED: &str = "## Overview\n\
- **Summary:** Shift handover app for hospital ward nurses\n\
- **Problem:** Handover notes get lost between shifts\n\
- **Target Users:** Registered nurses on inpatient wards\n";

/// PRD skeleton with every field still a placeholder
pub fn prd_skeleton() -> String {
    let config = ScribeConfig::default();
    let mut doc = String::from("# Product Requirements\n");
    for section in config.agenda.sections() {
        doc.push_str(&format!("\n## {}\n", section.name));
        for field in &section.fields {
            doc.push_str(&format!("- **{field}:** TBD\n"));
        }
    }
    doc
}

/// Queued adapter outcome
#[derive(Debug)]
enum Step {
    Respond(AdapterResponse),
    Fail(String),
}

/// Adapter that replays a script and records every request
#[derive(Debug, Default)]
pub struct ScriptedAdapter {
    steps: Mutex<VecDeque<Step>>,
    requests: Mutex<Vec<AdapterRequest>>,
}

impl ScriptedAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful response
    pub fn then_respond(self, response: AdapterResponse) -> Self {
        self.steps.lock().unwrap().push_back(Step::Respond(response));
        self
    }

    /// Queue a plain reply
    pub fn then_reply(self, reply: &str) -> Self {
        self.then_respond(AdapterResponse::reply(reply))
    }

    /// Queue a failure, surfaced as `AdapterError::Reported`
    pub fn then_fail(self, message: &str) -> Self {
        self.steps.lock().unwrap().push_back(Step::Fail(message.to_string()));
        self
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<AdapterRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of calls received so far
    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Steps not yet consumed
    pub fn remaining(&self) -> usize {
        self.steps.lock().unwrap().len()
    }
}

#[async_trait]
impl LanguageModelAdapter for ScriptedAdapter {
    async fn respond(&self, request: &AdapterRequest) -> Result<AdapterResponse, AdapterError> {
        self.requests.lock().unwrap().push(request.clone());
        let step = self.steps.lock().unwrap().pop_front();
        match step {
            Some(Step::Respond(response)) => Ok(response),
            Some(Step::Fail(message)) => Err(AdapterError::Reported(message)),
            None => Err(AdapterError::Invalid("script exhausted".to_string())),
        }
    }
}

/// Orchestrator over an in-memory store and a scripted adapter
pub struct Harness {
    pub orchestrator: Orchestrator,
    pub store: Arc<InMemorySessionStore>,
    pub adapter: Arc<ScriptedAdapter>,
}

pub fn harness(adapter: ScriptedAdapter) -> Harness {
    harness_with_config(ScribeConfig::default(), adapter)
}

pub fn harness_with_config(config: ScribeConfig, adapter: ScriptedAdapter) -> Harness {
    let store = Arc::new(InMemorySessionStore::new());
    let adapter = Arc::new(adapter);
    let orchestrator = Orchestrator::new(config, store.clone(), adapter.clone());
    Harness {
        orchestrator,
        store,
        adapter,
    }
}
