//! Profile updater.

use super::{Reconciler, UpdateReport, Updater};
use crate::error::Result;
use crate::extract::{Extractor, SchemaExtractor};
use crate::id::KeyGenerator;
use crate::llm::{GenerationService, Turn};
use crate::message::ConversationState;
use crate::records::MemoryCategory;
use crate::store::MemoryStore;
use async_trait::async_trait;
use std::sync::Arc;

/// Acknowledgment sent back to the coordinator; never echoes details
pub const PROFILE_ACK: &str = "updated profile";

/// Keeps the single profile record current
pub struct ProfileUpdater {
    reconciler: Reconciler,
}

impl ProfileUpdater {
    /// Create an updater with the default schema extractor. Once a profile
    /// exists it can only be patched.
    pub fn new(
        generator: Arc<dyn GenerationService>,
        store: Arc<dyn MemoryStore>,
        keys: Arc<dyn KeyGenerator>,
    ) -> Self {
        let extractor = SchemaExtractor::new(generator, MemoryCategory::Profile, false);
        Self::with_extractor(Arc::new(extractor), store, keys)
    }

    /// Create an updater around a custom extractor
    pub fn with_extractor(
        extractor: Arc<dyn Extractor>,
        store: Arc<dyn MemoryStore>,
        keys: Arc<dyn KeyGenerator>,
    ) -> Self {
        Self {
            reconciler: Reconciler::new(extractor, store, keys),
        }
    }
}

#[async_trait]
impl Updater for ProfileUpdater {
    fn category(&self) -> MemoryCategory {
        MemoryCategory::Profile
    }

    async fn run(&self, state: &mut ConversationState, turn: &Turn) -> Result<UpdateReport> {
        self.reconciler
            .run(state, turn, |_| PROFILE_ACK.to_string())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::id::SequentialKeys;
    use crate::message::Message;
    use crate::store::{InMemoryStore, Namespace};
    use crate::testing::{tool_call, update_memory, ScriptedGenerator};
    use serde_json::json;

    fn conversation(text: &str) -> ConversationState {
        let mut state = ConversationState::new();
        state.push(Message::user(text));
        state.push(update_memory("call_1", "user"));
        state
    }

    #[tokio::test]
    async fn test_first_profile_is_created() {
        let generator = Arc::new(ScriptedGenerator::new());
        generator.push(tool_call("Profile", json!({"name": "Alex", "location": "Denver"})));
        let store = Arc::new(InMemoryStore::new());
        let updater = ProfileUpdater::new(generator, store.clone(), Arc::new(SequentialKeys::new("p")));

        let mut state = conversation("My name is Alex and I live in Denver");
        let report = updater.run(&mut state, &Turn::new("u1")).await.unwrap();

        assert_eq!(report.acknowledgment, "updated profile");
        assert_eq!(report.changes.len(), 1);
        let items = store
            .search(&Namespace::for_category(MemoryCategory::Profile, "u1"))
            .await
            .unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].key.as_str(), "p-1");
        assert_eq!(items[0].value["name"], "Alex");

        let last = state.last().unwrap();
        assert_eq!(last.content.len(), 1);
        assert!(matches!(
            &last.content[0],
            crate::message::ContentBlock::ToolResult { tool_use_id, content, .. }
                if tool_use_id == "call_1" && content == "updated profile"
        ));
    }

    #[tokio::test]
    async fn test_stray_insert_overwrites_singleton() {
        let store = Arc::new(InMemoryStore::new());
        let ns = Namespace::for_category(MemoryCategory::Profile, "u1");
        store.put(&ns, &"p-0".into(), json!({"name": "Alex"})).await.unwrap();

        let generator = Arc::new(ScriptedGenerator::new());
        // Two unkeyed responses: only the last survives, under the existing key.
        generator.push(
            tool_call("Profile", json!({"name": "Alex"}))
                .with_content(crate::message::ContentBlock::tool_use(
                    "x2",
                    "Profile",
                    json!({"name": "Alex", "job": "baker"}),
                )),
        );
        let extractor = SchemaExtractor::new(generator, MemoryCategory::Profile, true);
        let updater = ProfileUpdater::with_extractor(Arc::new(extractor), store.clone(), Arc::new(SequentialKeys::default()));

        let mut state = conversation("I'm a baker");
        updater.run(&mut state, &Turn::new("u1")).await.unwrap();

        let items = store.search(&ns).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].key.as_str(), "p-0");
        assert_eq!(items[0].value["job"], "baker");
    }

    #[tokio::test]
    async fn test_missing_tool_call_before_io() {
        let generator = Arc::new(ScriptedGenerator::new());
        let updater = ProfileUpdater::new(
            generator.clone(),
            Arc::new(InMemoryStore::new()),
            Arc::new(SequentialKeys::default()),
        );

        let mut state = ConversationState::new();
        state.push(Message::assistant("no call here"));
        let err = updater.run(&mut state, &Turn::new("u1")).await.unwrap_err();

        assert!(matches!(err, Error::MissingToolCall { updater: MemoryCategory::Profile }));
        assert!(generator.requests().is_empty());
        assert_eq!(state.len(), 1);
    }
}
