//! Tool-calling extractor for schema-shaped records (profile, to-do items).
//!
//! The model sees the category schema as an insert tool and, when records
//! already exist, a `PatchDoc` tool addressed by record key. Insert calls
//! become new responses; patch calls are applied to the stored document and
//! become responses carrying that document's key.

use super::{
    patch, EditKind, Extraction, ExtractionRequest, Extractor, PlannedEdit, ResponseMetadata,
};
use crate::error::{ExtractError, Result};
use crate::id::RecordKey;
use crate::llm::{GenerationRequest, GenerationService, Turn};
use crate::message::{merge_runs, Message};
use crate::prompts;
use crate::records::MemoryCategory;
use crate::tool::{PatchDoc, ToolChoice, ToolDefinition, PATCH_DOC};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Extractor exposing the category schema and `PatchDoc`
pub struct SchemaExtractor {
    generator: Arc<dyn GenerationService>,
    category: MemoryCategory,
    enable_inserts: bool,
}

impl SchemaExtractor {
    /// Create an extractor. With `enable_inserts` off, the insert tool is only
    /// offered while the namespace is empty.
    pub fn new(generator: Arc<dyn GenerationService>, category: MemoryCategory, enable_inserts: bool) -> Self {
        Self {
            generator,
            category,
            enable_inserts,
        }
    }

    /// Tools offered given how many records already exist
    pub fn tools(&self, has_existing: bool) -> Vec<ToolDefinition> {
        let mut tools = Vec::new();
        if !has_existing || self.enable_inserts {
            tools.push(ToolDefinition::schema(self.category));
        }
        if has_existing {
            tools.push(ToolDefinition::patch_doc());
        }
        tools
    }
}

// A patched document being accumulated across calls in one reply.
struct PendingPatch {
    doc: Value,
    meta: ResponseMetadata,
}

#[async_trait]
impl Extractor for SchemaExtractor {
    fn category(&self) -> MemoryCategory {
        self.category
    }

    #[instrument(skip_all, fields(category = %self.category, existing = request.existing.len()))]
    async fn reconcile(&self, request: ExtractionRequest, turn: &Turn) -> Result<Extraction> {
        let schema = self.category.schema_name();
        let system = prompts::extraction(Utc::now(), self.category, &request.existing);
        let messages = merge_runs(std::iter::once(Message::system(system)).chain(request.messages));

        let tools = self.tools(!request.existing.is_empty());
        let tool_choice = match tools.as_slice() {
            [only] => ToolChoice::Tool {
                name: only.name.clone(),
            },
            _ => ToolChoice::Any,
        };
        let generation = GenerationRequest::new(messages)
            .with_tools(tools)
            .with_tool_choice(tool_choice)
            .with_parallel_tool_calls(true);

        let reply = turn.generate(self.generator.as_ref(), generation).await?;

        // Slots hold inserts directly, or the index of a pending patch.
        let mut slots: Vec<std::result::Result<Value, usize>> = Vec::new();
        let mut pending: Vec<PendingPatch> = Vec::new();

        for call in reply.tool_calls() {
            if call.name == schema {
                slots.push(Ok(call.input.clone()));
            } else if call.name == PATCH_DOC {
                let doc: PatchDoc = serde_json::from_value(call.input.clone()).map_err(|e| {
                    ExtractError::InvalidResponse {
                        schema: PATCH_DOC.to_string(),
                        reason: e.to_string(),
                    }
                })?;
                let key = RecordKey::new(doc.json_doc_id.as_str());

                let index = match pending.iter().position(|p| p.meta.key.as_ref() == Some(&key)) {
                    Some(index) => index,
                    None => {
                        let Some(item) = request.existing.iter().find(|item| item.key == key) else {
                            warn!(%key, "patch names an unknown record, dropping");
                            continue;
                        };
                        pending.push(PendingPatch {
                            doc: item.value.clone(),
                            meta: ResponseMetadata::patch(key.clone()),
                        });
                        slots.push(Err(pending.len() - 1));
                        pending.len() - 1
                    }
                };

                let entry = &mut pending[index];
                if entry.doc.is_null() {
                    warn!(%key, "record already removed in this reply, ignoring later patch");
                    continue;
                }
                let mut patched = entry.doc.clone();
                patch::apply(&mut patched, &doc.patches).map_err(|source| ExtractError::Patch {
                    key: key.to_string(),
                    source,
                })?;
                entry.doc = patched;

                let kind = if doc.is_removal() {
                    EditKind::Remove
                } else {
                    EditKind::Update
                };
                let plan = Some(doc.planned_edits).filter(|plan| !plan.trim().is_empty());
                entry.meta.edits.push(PlannedEdit { kind, plan });
            } else {
                warn!(tool = call.name, "ignoring call to unexpected tool");
            }
        }

        let mut pending: Vec<Option<PendingPatch>> = pending.into_iter().map(Some).collect();
        let mut extraction = Extraction::default();
        for slot in slots {
            match slot {
                Ok(value) => extraction.push(value, ResponseMetadata::insert()),
                Err(index) => {
                    if let Some(entry) = pending[index].take() {
                        extraction.push(entry.doc, entry.meta);
                    }
                }
            }
        }

        debug!(responses = extraction.len(), "extraction complete");
        Ok(extraction)
    }
}
