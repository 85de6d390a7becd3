//! Scripted language model for unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use anyhow::{Result, anyhow};
use async_trait::async_trait;

use threadbot_llm::{ChatMessage, ChatModel, Completion};

/// Replays queued replies in order and records every request.
#[derive(Default)]
pub(crate) struct ScriptedModel {
    replies: Mutex<VecDeque<Result<Completion, String>>>,
    calls: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedModel {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn reply(&self, content: &str, total_tokens: u64) -> &Self {
        self.replies.lock().unwrap().push_back(Ok(Completion {
            content: content.to_string(),
            total_tokens,
        }));
        self
    }

    pub(crate) fn fail(&self, error: &str) -> &Self {
        self.replies.lock().unwrap().push_back(Err(error.to_string()));
        self
    }

    pub(crate) fn calls(&self) -> Vec<Vec<ChatMessage>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<Completion> {
        self.calls.lock().unwrap().push(messages.to_vec());
        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(completion)) => Ok(completion),
            Some(Err(error)) => Err(anyhow!(error)),
            None => Err(anyhow!("no scripted reply left")),
        }
    }
}
