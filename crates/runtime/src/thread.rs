//! A single conversation thread and its bookkeeping.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use threadbot_core::{Message, PendingAction, Role, ToolKind};

/// Approval state of a thread, derived from its pending slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Idle,
    AwaitingApproval,
}

#[derive(Debug, Clone)]
pub struct Thread {
    id: String,
    messages: Vec<Message>,
    pending: Option<PendingAction>,
    tool_usage: BTreeMap<ToolKind, u64>,
    tokens_used: u64,
    created_at: DateTime<Utc>,
}

impl Thread {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            messages: Vec::new(),
            pending: None,
            tool_usage: ToolKind::ALL.iter().map(|kind| (*kind, 0)).collect(),
            tokens_used: 0,
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn pending(&self) -> Option<&PendingAction> {
        self.pending.as_ref()
    }

    pub fn state(&self) -> GateState {
        if self.pending.is_some() {
            GateState::AwaitingApproval
        } else {
            GateState::Idle
        }
    }

    /// Invocation counts for every tool, zero included, in tool order.
    pub fn tool_usage(&self) -> &BTreeMap<ToolKind, u64> {
        &self.tool_usage
    }

    pub fn usage(&self, kind: ToolKind) -> u64 {
        self.tool_usage.get(&kind).copied().unwrap_or(0)
    }

    pub fn tokens_used(&self) -> u64 {
        self.tokens_used
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_assistant(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.role == Role::Assistant)
    }

    /// `role: content` lines, the form handed to the summarizer.
    pub fn transcript(&self) -> String {
        self.messages
            .iter()
            .map(|m| format!("{}: {}", m.role.as_str(), m.content))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// A pending action exists exactly when the latest assistant message is
    /// an open proposal, and no older message is still flagged.
    pub fn is_consistent(&self) -> bool {
        let open_proposals = self.messages.iter().filter(|m| m.proposal).count();
        let last_is_proposal = self.last_assistant().is_some_and(|m| m.proposal);
        open_proposals <= 1 && self.pending.is_some() == last_is_proposal
    }

    pub fn add_tokens(&mut self, tokens: u64) {
        self.tokens_used = self.tokens_used.saturating_add(tokens);
    }

    pub(crate) fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub(crate) fn record_tool_use(&mut self, kind: ToolKind) {
        *self.tool_usage.entry(kind).or_insert(0) += 1;
    }

    pub(crate) fn open_proposal(&mut self, action: PendingAction, proposal: Message) {
        self.pending = Some(action);
        self.messages.push(proposal);
    }

    /// Clear the pending slot, unflag the proposal and append `outcome`.
    pub(crate) fn close_proposal(&mut self, outcome: Message) -> Option<PendingAction> {
        let action = self.pending.take()?;
        if let Some(proposal) = self.messages.iter_mut().rev().find(|m| m.proposal) {
            proposal.proposal = false;
        }
        self.messages.push(outcome);
        Some(action)
    }

    #[cfg(test)]
    pub(crate) fn backdate(&mut self, by: chrono::Duration) {
        self.created_at -= by;
    }
}
