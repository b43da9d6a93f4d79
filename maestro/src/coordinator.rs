//! The coordinator: decide whether memory needs updating, and reply.
//!
//! Each run renders the current memory into the system prompt and exposes a
//! single `UpdateMemory` tool with parallel calls disabled, so every reply
//! carries at most one routing decision.

use crate::error::Result;
use crate::llm::{GenerationRequest, GenerationService, Turn};
use crate::message::{ConversationState, Message};
use crate::prompts;
use crate::records::MemoryCategory;
use crate::store::{MemoryStore, Namespace};
use crate::tool::{ToolChoice, ToolDefinition};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Rendered view of a user's memory, as shown to the coordinator
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemorySnapshot {
    /// Profile JSON, empty when no profile exists
    pub profile: String,
    /// One JSON document per line
    pub todo: String,
    /// Instruction text, empty when none
    pub instructions: String,
}

impl MemorySnapshot {
    /// Read all three namespaces for `user_id`
    pub async fn load(store: &dyn MemoryStore, user_id: &str) -> Result<Self> {
        let profile = store
            .search(&Namespace::for_category(MemoryCategory::Profile, user_id))
            .await?;
        let todo = store
            .search(&Namespace::for_category(MemoryCategory::Todo, user_id))
            .await?;
        let instructions = store
            .search(&Namespace::for_category(MemoryCategory::Instructions, user_id))
            .await?;

        Ok(Self {
            profile: profile
                .first()
                .map(|item| item.value.to_string())
                .unwrap_or_default(),
            todo: todo
                .iter()
                .map(|item| item.value.to_string())
                .collect::<Vec<_>>()
                .join("\n"),
            instructions: instructions
                .first()
                .and_then(|item| item.value.get("memory"))
                .and_then(|memory| memory.as_str())
                .unwrap_or_default()
                .to_string(),
        })
    }

    /// The coordinator system prompt for this snapshot
    pub fn system_prompt(&self) -> String {
        prompts::coordinator(&self.profile, &self.todo, &self.instructions)
    }
}

/// Runs the coordinator step
pub struct Coordinator {
    generator: Arc<dyn GenerationService>,
    store: Arc<dyn MemoryStore>,
}

impl Coordinator {
    /// Create a coordinator
    pub fn new(generator: Arc<dyn GenerationService>, store: Arc<dyn MemoryStore>) -> Self {
        Self { generator, store }
    }

    /// Append the coordinator's reply to `state`
    #[instrument(skip_all, fields(user_id = %turn.user_id, messages = state.len()))]
    pub async fn advance(&self, state: &mut ConversationState, turn: &Turn) -> Result<()> {
        let snapshot = MemorySnapshot::load(self.store.as_ref(), &turn.user_id).await?;

        let messages = std::iter::once(Message::system(snapshot.system_prompt()))
            .chain(state.messages.iter().cloned())
            .collect();
        let request = GenerationRequest::new(messages)
            .with_tools(vec![ToolDefinition::update_memory()])
            .with_tool_choice(ToolChoice::Auto)
            .with_parallel_tool_calls(false);

        let reply = turn.generate(self.generator.as_ref(), request).await?;
        debug!(tool_calls = reply.tool_calls().len(), "coordinator replied");
        state.push(reply);
        Ok(())
    }
}
