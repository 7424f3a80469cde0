//! Test doubles shared across module tests.

use crate::error::CapabilityError;
use crate::synthesis::Completion;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// A `Completion` that replays scripted replies in order and records
/// every prompt it was given.
pub struct ScriptedModel {
    replies: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn new(replies: Vec<String>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Completion for ScriptedModel {
    async fn complete(&self, prompt: &str) -> Result<String, CapabilityError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| CapabilityError::Transport("no scripted reply left".to_string()))
    }
}
