//! Testing utilities.
//!
//! - [`ScriptedGenerator`] replays scripted replies instead of calling an API
//!   and records every request it receives
//! - Message helpers for building coordinator and extractor replies

use crate::error::GenerationError;
use crate::llm::{GenerationRequest, GenerationService};
use crate::message::{ContentBlock, Message, Role};
use crate::tool::UPDATE_MEMORY;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// One scripted outcome
#[derive(Debug)]
pub enum ScriptStep {
    /// Return this message
    Reply(Message),
    /// Fail with this error
    Fail(GenerationError),
}

#[derive(Debug, Default)]
struct Script {
    steps: VecDeque<(Duration, ScriptStep)>,
    requests: Vec<GenerationRequest>,
}

/// A generation service that returns scripted responses in order.
///
/// Use this for deterministic tests without API calls. When the script runs
/// out, calls fail with [`GenerationError::ScriptExhausted`].
#[derive(Debug, Default)]
pub struct ScriptedGenerator {
    script: Mutex<Script>,
}

impl ScriptedGenerator {
    /// Create a generator with an empty script
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a generator that replies with `messages` in order
    pub fn with_replies(messages: impl IntoIterator<Item = Message>) -> Self {
        let generator = Self::new();
        for message in messages {
            generator.push(message);
        }
        generator
    }

    /// Queue a reply
    pub fn push(&self, message: Message) {
        self.push_step(Duration::ZERO, ScriptStep::Reply(message));
    }

    /// Queue a reply that arrives after `delay`
    pub fn push_delayed(&self, message: Message, delay: Duration) {
        self.push_step(delay, ScriptStep::Reply(message));
    }

    /// Queue a failure
    pub fn push_error(&self, error: GenerationError) {
        self.push_step(Duration::ZERO, ScriptStep::Fail(error));
    }

    fn push_step(&self, delay: Duration, step: ScriptStep) {
        self.lock().steps.push_back((delay, step));
    }

    /// Requests received so far, oldest first
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.lock().requests.clone()
    }

    /// Number of scripted steps not yet consumed
    pub fn remaining(&self) -> usize {
        self.lock().steps.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl GenerationService for ScriptedGenerator {
    async fn generate(&self, request: GenerationRequest) -> Result<Message, GenerationError> {
        let next = {
            let mut script = self.lock();
            script.requests.push(request);
            let calls = script.requests.len();
            script
                .steps
                .pop_front()
                .ok_or(GenerationError::ScriptExhausted { calls: calls - 1 })
        };
        let (delay, step) = next?;

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        match step {
            ScriptStep::Reply(message) => Ok(message),
            ScriptStep::Fail(error) => Err(error),
        }
    }
}

/// Assistant message carrying a single `UpdateMemory` call
pub fn update_memory(id: &str, update_type: &str) -> Message {
    Message::new(
        Role::Assistant,
        vec![ContentBlock::tool_use(
            id,
            UPDATE_MEMORY,
            json!({ "update_type": update_type }),
        )],
    )
}

/// Assistant message carrying a single call to `name`
pub fn tool_call(name: &str, input: Value) -> Message {
    Message::new(
        Role::Assistant,
        vec![ContentBlock::tool_use(format!("{name}_1"), name, input)],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replays_in_order_and_records() {
        let generator = ScriptedGenerator::with_replies([Message::assistant("one"), Message::assistant("two")]);

        let first = generator
            .generate(GenerationRequest::new(vec![Message::user("a")]))
            .await
            .unwrap();
        let second = generator.generate(GenerationRequest::default()).await.unwrap();

        assert_eq!(first.text_content(), "one");
        assert_eq!(second.text_content(), "two");
        assert_eq!(generator.requests().len(), 2);
        assert_eq!(generator.requests()[0].messages[0].text_content(), "a");
    }

    #[tokio::test]
    async fn test_exhausted() {
        let generator = ScriptedGenerator::new();
        let err = generator.generate(GenerationRequest::default()).await.unwrap_err();
        assert!(matches!(err, GenerationError::ScriptExhausted { calls: 0 }));
    }

    #[tokio::test]
    async fn test_scripted_error() {
        let generator = ScriptedGenerator::new();
        generator.push_error(GenerationError::Network("reset".to_string()));
        let err = generator.generate(GenerationRequest::default()).await.unwrap_err();
        assert!(matches!(err, GenerationError::Network(_)));
        assert_eq!(generator.remaining(), 0);
    }

    #[test]
    fn test_update_memory_helper() {
        let msg = update_memory("c1", "todo");
        let call = msg.first_tool_call().unwrap();
        assert_eq!(call.name, "UpdateMemory");
        assert_eq!(call.str_arg("update_type"), Some("todo"));
    }
}
