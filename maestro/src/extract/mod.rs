//! Record extraction: reconcile conversation content against stored records.
//!
//! An [`Extractor`] turns a transcript plus the existing records of one
//! category into a list of responses. Each response is paired with metadata
//! saying whether it patches an existing record (and which) or is new.

pub mod instructions;
pub mod patch;
pub mod schema;

pub use instructions::InstructionsExtractor;
pub use schema::SchemaExtractor;

use crate::error::{ExtractError, Result};
use crate::id::RecordKey;
use crate::llm::Turn;
use crate::message::Message;
use crate::records::MemoryCategory;
use crate::store::Item;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Input to a reconciliation
#[derive(Debug, Clone, Default)]
pub struct ExtractionRequest {
    /// Conversation to reflect on, without the routing decision
    pub messages: Vec<Message>,
    /// Records currently stored for the category
    pub existing: Vec<Item>,
}

/// Whether a patch call changed content or took it away
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditKind {
    /// Content was added or replaced
    Update,
    /// The call led with a removal
    Remove,
}

/// One patch call applied to a record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedEdit {
    /// What the call did
    pub kind: EditKind,
    /// The model's description of the call, when it gave one
    pub plan: Option<String>,
}

/// What a response corresponds to
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseMetadata {
    /// Existing record being patched; `None` for inserts
    pub key: Option<RecordKey>,
    /// Patch calls composed into the response, in order. Empty for inserts
    /// and whole-record rewrites.
    pub edits: Vec<PlannedEdit>,
}

impl ResponseMetadata {
    /// Metadata for a brand new record
    pub fn insert() -> Self {
        Self::default()
    }

    /// Metadata for a response that replaces `key`
    pub fn patch(key: RecordKey) -> Self {
        Self {
            key: Some(key),
            edits: Vec::new(),
        }
    }

    /// Record one patch call
    pub fn with_edit(mut self, kind: EditKind, plan: Option<String>) -> Self {
        self.edits.push(PlannedEdit { kind, plan });
        self
    }
}

/// Result of a reconciliation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    /// New or updated values, one per change. `Null` deletes the record.
    pub responses: Vec<Value>,
    /// One entry per response
    pub response_metadata: Vec<ResponseMetadata>,
}

impl Extraction {
    /// Add a response with its metadata
    pub fn push(&mut self, response: Value, metadata: ResponseMetadata) {
        self.responses.push(response);
        self.response_metadata.push(metadata);
    }

    /// Number of responses
    pub fn len(&self) -> usize {
        self.responses.len()
    }

    /// Whether nothing changed
    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }

    /// Pair responses with metadata, failing if the two lists disagree in length
    pub fn into_pairs(self) -> std::result::Result<Vec<(Value, ResponseMetadata)>, ExtractError> {
        if self.responses.len() != self.response_metadata.len() {
            return Err(ExtractError::Misaligned {
                responses: self.responses.len(),
                metadata: self.response_metadata.len(),
            });
        }
        Ok(self.responses.into_iter().zip(self.response_metadata).collect())
    }
}

/// Reconciles conversation content against one category's records
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Category whose records this extractor produces
    fn category(&self) -> MemoryCategory;

    /// Produce inserts and patches for the request
    async fn reconcile(&self, request: ExtractionRequest, turn: &Turn) -> Result<Extraction>;
}
