//! To-do updater. Unlike the other updaters it reports exactly what changed.

use super::{Change, Reconciler, UpdateReport, Updater};
use crate::error::Result;
use crate::extract::{Extractor, SchemaExtractor};
use crate::id::KeyGenerator;
use crate::llm::{GenerationService, Turn};
use crate::message::ConversationState;
use crate::records::MemoryCategory;
use crate::store::MemoryStore;
use async_trait::async_trait;
use std::sync::Arc;

/// Acknowledgment when the extractor found nothing to change
pub const NO_CHANGES: &str = "No changes to the ToDo list.";

/// Maintains the to-do list
pub struct TodoUpdater {
    reconciler: Reconciler,
}

impl TodoUpdater {
    /// Create an updater with the default schema extractor (inserts enabled)
    pub fn new(
        generator: Arc<dyn GenerationService>,
        store: Arc<dyn MemoryStore>,
        keys: Arc<dyn KeyGenerator>,
    ) -> Self {
        let extractor = SchemaExtractor::new(generator, MemoryCategory::Todo, true);
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

/// Human-readable summary of the changes made in one run
pub fn summarize(changes: &[Change]) -> String {
    if changes.is_empty() {
        return NO_CHANGES.to_string();
    }
    let schema = MemoryCategory::Todo.schema_name();
    changes
        .iter()
        .map(|change| match change {
            Change::Created { value, .. } => format!("New {schema} created:\nContent: {value}"),
            Change::Updated {
                key,
                planned_edits,
                value,
            } => format!(
                "Document {key} updated:\nPlan: {}\nAdded content: {value}",
                planned_edits.as_deref().unwrap_or_default()
            ),
            Change::Removed { key, planned_edits } => format!(
                "Document {key} removed:\nPlan: {}",
                planned_edits.as_deref().unwrap_or_default()
            ),
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[async_trait]
impl Updater for TodoUpdater {
    fn category(&self) -> MemoryCategory {
        MemoryCategory::Todo
    }

    async fn run(&self, state: &mut ConversationState, turn: &Turn) -> Result<UpdateReport> {
        self.reconciler.run(state, turn, summarize).await
    }
}
