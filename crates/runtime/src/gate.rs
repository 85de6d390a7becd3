//! Human approval gate in front of tool execution.
//!
//! A thread is either `Idle` or `AwaitingApproval` (see [`GateState`]).  The
//! only transitions are:
//!
//! * `propose`: Idle → AwaitingApproval
//! * `approve`: AwaitingApproval → Idle, after the tool ran (or could not)
//! * `deny`: AwaitingApproval → Idle, without running anything
//!
//! `approve` and `deny` on an idle thread return `None` and leave it alone.
//!
//! [`GateState`]: crate::thread::GateState

use anyhow::{Result, bail};
use tracing::info;

use threadbot_config::Credentials;
use threadbot_core::{Message, PendingAction, ToolKind, describe_args};
use threadbot_tools::{ToolError, ToolRegistry};

use crate::thread::Thread;

pub const DENIAL_NOTICE: &str = "Tool request denied.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionStatus {
    Completed,
    /// The tool was attempted and reported an error.
    Failed,
    /// The tool needs a key that is not configured; nothing was attempted.
    MissingCredential,
    /// The provider rejected the configured key.
    InvalidCredential,
    Denied,
}

/// How a pending action ended, plus the message appended for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub kind: ToolKind,
    pub status: ResolutionStatus,
    pub message: String,
}

pub fn proposal_text(action: &PendingAction) -> String {
    format!(
        "I think I should use **{}** with `{}`.\n\nDo you approve?",
        action.kind,
        describe_args(&action.arguments)
    )
}

pub fn propose(thread: &mut Thread, action: PendingAction) -> Result<()> {
    if let Some(existing) = thread.pending() {
        bail!(
            "thread {} is already waiting on a {} decision",
            thread.id(),
            existing.kind
        );
    }
    info!(thread = thread.id(), tool = %action.kind, "tool proposed");
    let text = proposal_text(&action);
    thread.open_proposal(action, Message::proposal(text));
    Ok(())
}

pub async fn approve(
    thread: &mut Thread,
    registry: &ToolRegistry,
    credentials: &Credentials,
) -> Option<Resolution> {
    let action = thread.pending()?.clone();
    let kind = action.kind;

    let (status, message) = match registry.resolve_credential(kind, credentials) {
        Err(err @ ToolError::MissingCredential(_)) => {
            (ResolutionStatus::MissingCredential, err.user_message())
        }
        Err(err) => (ResolutionStatus::Failed, err.user_message()),
        Ok(_) => {
            // Counted as soon as the call is attempted, whatever the outcome.
            thread.record_tool_use(kind);
            match registry.execute(kind, &action.arguments, credentials).await {
                Ok(output) => (ResolutionStatus::Completed, output),
                Err(err @ ToolError::InvalidCredential(_)) => {
                    (ResolutionStatus::InvalidCredential, err.user_message())
                }
                Err(err) => (ResolutionStatus::Failed, err.user_message()),
            }
        }
    };

    thread.close_proposal(Message::assistant(message.clone()));
    info!(thread = thread.id(), tool = %kind, ?status, "pending action approved");
    Some(Resolution {
        kind,
        status,
        message,
    })
}

pub fn deny(thread: &mut Thread) -> Option<Resolution> {
    let action = thread.close_proposal(Message::assistant(DENIAL_NOTICE))?;
    info!(thread = thread.id(), tool = %action.kind, "pending action denied");
    Some(Resolution {
        kind: action.kind,
        status: ResolutionStatus::Denied,
        message: DENIAL_NOTICE.to_string(),
    })
}
