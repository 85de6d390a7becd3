//! Interaction handler: routes user input through the active thread.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Result, anyhow};
use tracing::{debug, info, warn};

use threadbot_config::Credentials;
use threadbot_core::{Message, PendingAction, ToolKind};
use threadbot_llm::{ChatMessage, ChatModel};
use threadbot_tools::{ToolRegistry, ToolSpec};

use crate::gate::{self, Resolution};
use crate::router::{self, RouterDecision};
use crate::store::ThreadStore;
use crate::summary::{self, SummaryReport};
use crate::thread::Thread;

pub const CHAT_PROMPT: &str = "You are a helpful chatbot.";

/// What the session did with a submitted message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// A free-form assistant answer (or the warning standing in for one).
    Answer(String),
    /// A tool was proposed; the thread now waits for approve or deny.
    Proposal(PendingAction),
    /// The message was not accepted because this proposal is still open.
    AwaitingDecision(PendingAction),
}

pub struct Session {
    store: ThreadStore,
    model: Arc<dyn ChatModel>,
    registry: ToolRegistry,
    credentials: Credentials,
}

impl Session {
    pub fn new(model: Arc<dyn ChatModel>, registry: ToolRegistry, credentials: Credentials) -> Self {
        Self {
            store: ThreadStore::default(),
            model,
            registry,
            credentials,
        }
    }

    pub fn store(&self) -> &ThreadStore {
        &self.store
    }

    pub fn active(&self) -> Option<&Thread> {
        self.store.active()
    }

    /// Create a fresh thread, make it active and return its id.
    pub fn new_thread(&mut self) -> String {
        let id = self.store.create().id().to_string();
        debug!(thread = %id, "thread created");
        id
    }

    pub fn switch(&mut self, id: &str) -> Result<()> {
        self.store.select(id)?;
        debug!(thread = id, "thread selected");
        Ok(())
    }

    /// Replace a tool's API key for the rest of the session.  Threads and
    /// their history are untouched.
    pub fn set_credential(&mut self, kind: ToolKind, key: &str) -> Result<()> {
        self.credentials.set_tool_key(kind, key)?;
        info!(tool = %kind, set = self.credentials.for_tool(kind).is_some(), "tool credential updated");
        Ok(())
    }

    pub fn tool_specs(&self) -> Vec<ToolSpec> {
        self.registry.list_specs()
    }

    pub async fn submit(&mut self, text: &str) -> Result<Reply> {
        let model = self.model.as_ref();
        let thread = active_thread(&mut self.store)?;
        if let Some(pending) = thread.pending() {
            return Ok(Reply::AwaitingDecision(pending.clone()));
        }

        thread.push(Message::user(text));
        match router::classify(model, thread, text).await {
            RouterDecision::Tool { kind, arguments } => {
                let action = PendingAction::new(kind, arguments);
                gate::propose(thread, action.clone())?;
                Ok(Reply::Proposal(action))
            }
            RouterDecision::General => Ok(Reply::Answer(general_reply(model, thread).await)),
        }
    }

    pub async fn approve(&mut self) -> Result<Option<Resolution>> {
        let thread = active_thread(&mut self.store)?;
        Ok(gate::approve(thread, &self.registry, &self.credentials).await)
    }

    pub fn deny(&mut self) -> Result<Option<Resolution>> {
        let thread = active_thread(&mut self.store)?;
        Ok(gate::deny(thread))
    }

    pub async fn summarize(&mut self) -> Result<SummaryReport> {
        let model = self.model.as_ref();
        let thread = active_thread(&mut self.store)?;
        Ok(summary::summarize(thread, model).await)
    }

    /// Summarize the active thread and write the report into `dir`.
    pub async fn export_summary(&mut self, dir: &Path) -> Result<(SummaryReport, PathBuf)> {
        let report = self.summarize().await?;
        let path = report.write_to(dir)?;
        Ok((report, path))
    }
}

fn active_thread(store: &mut ThreadStore) -> Result<&mut Thread> {
    store
        .active_mut()
        .ok_or_else(|| anyhow!("no active thread; start one with /new"))
}

/// Free-form chat over the whole history.  A failed call becomes a warning
/// message in the thread rather than an error.
async fn general_reply(model: &dyn ChatModel, thread: &mut Thread) -> String {
    let mut messages = Vec::with_capacity(thread.messages().len() + 1);
    messages.push(ChatMessage::system(CHAT_PROMPT));
    messages.extend(thread.messages().iter().map(ChatMessage::from));

    let content = match model.complete(&messages).await {
        Ok(completion) => {
            thread.add_tokens(completion.total_tokens);
            debug!(thread = thread.id(), tokens = completion.total_tokens, "chat reply");
            completion.content
        }
        Err(err) => {
            warn!(?err, thread = thread.id(), "chat completion failed");
            format!("Warning: the language model request failed: {err}")
        }
    };
    thread.push(Message::assistant(content.clone()));
    content
}
