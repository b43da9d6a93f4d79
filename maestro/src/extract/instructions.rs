//! Free-text rewrite of the user's to-do instructions.

use super::{Extraction, ExtractionRequest, Extractor, ResponseMetadata};
use crate::error::Result;
use crate::llm::{GenerationRequest, GenerationService, Turn};
use crate::message::{merge_runs, Message};
use crate::prompts;
use crate::records::MemoryCategory;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use tracing::instrument;

/// Asks the model to rewrite the instructions as plain text
pub struct InstructionsExtractor {
    generator: Arc<dyn GenerationService>,
}

impl InstructionsExtractor {
    /// Create an extractor
    pub fn new(generator: Arc<dyn GenerationService>) -> Self {
        Self { generator }
    }
}

#[async_trait]
impl Extractor for InstructionsExtractor {
    fn category(&self) -> MemoryCategory {
        MemoryCategory::Instructions
    }

    #[instrument(skip_all, fields(existing = request.existing.len()))]
    async fn reconcile(&self, request: ExtractionRequest, turn: &Turn) -> Result<Extraction> {
        let current = request.existing.first();
        let current_text = current.map(|item| {
            item.value
                .get("memory")
                .and_then(|m| m.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| item.value.to_string())
        });
        let system = prompts::instructions(Utc::now(), current_text.as_deref());

        let messages = merge_runs(
            std::iter::once(Message::system(system))
                .chain(request.messages)
                .chain(std::iter::once(Message::user(prompts::INSTRUCTIONS_REQUEST))),
        );

        let reply = turn
            .generate(self.generator.as_ref(), GenerationRequest::new(messages))
            .await?;

        let mut extraction = Extraction::default();
        let metadata = match current {
            Some(item) => ResponseMetadata::patch(item.key.clone()),
            None => ResponseMetadata::insert(),
        };
        extraction.push(json!({ "memory": reply.text_content() }), metadata);
        Ok(extraction)
    }
}
