//! Instructions updater.

use super::{Reconciler, UpdateReport, Updater};
use crate::error::Result;
use crate::extract::{Extractor, InstructionsExtractor};
use crate::id::KeyGenerator;
use crate::llm::{GenerationService, Turn};
use crate::message::ConversationState;
use crate::records::MemoryCategory;
use crate::store::MemoryStore;
use async_trait::async_trait;
use std::sync::Arc;

/// Acknowledgment sent back to the coordinator
pub const INSTRUCTIONS_ACK: &str = "updated instructions";

/// Rewrites the single instructions record
pub struct InstructionsUpdater {
    reconciler: Reconciler,
}

impl InstructionsUpdater {
    /// Create an updater with the free-text extractor
    pub fn new(
        generator: Arc<dyn GenerationService>,
        store: Arc<dyn MemoryStore>,
        keys: Arc<dyn KeyGenerator>,
    ) -> Self {
        Self::with_extractor(Arc::new(InstructionsExtractor::new(generator)), store, keys)
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
impl Updater for InstructionsUpdater {
    fn category(&self) -> MemoryCategory {
        MemoryCategory::Instructions
    }

    async fn run(&self, state: &mut ConversationState, turn: &Turn) -> Result<UpdateReport> {
        self.reconciler
            .run(state, turn, |_| INSTRUCTIONS_ACK.to_string())
            .await
    }
}
