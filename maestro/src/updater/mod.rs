//! Category updaters.
//!
//! Every updater follows the same protocol: load the namespace, reconcile the
//! conversation against it, validate every response, resolve keys, then
//! write. Nothing is written unless every response validates. The updater
//! finally answers the coordinator's tool call with an acknowledgment.

pub mod instructions;
pub mod profile;
pub mod todo;

pub use instructions::InstructionsUpdater;
pub use profile::ProfileUpdater;
pub use todo::TodoUpdater;

use crate::error::{Error, ExtractError, Result};
use crate::extract::{EditKind, ExtractionRequest, Extractor, PlannedEdit};
use crate::id::{KeyGenerator, RecordKey};
use crate::llm::Turn;
use crate::message::{transcript, ContentBlock, ConversationState, Message, Role};
use crate::records::MemoryCategory;
use crate::store::{MemoryStore, Namespace};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Answer given to tool calls beyond the first, which are never routed
pub const IGNORED_CALL: &str = "Ignored: only one memory update is handled per reply.";

/// One write made by an updater
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    /// A new record
    Created {
        /// Fresh key
        key: RecordKey,
        /// Stored value
        value: Value,
    },
    /// An existing record was overwritten
    Updated {
        /// Existing key
        key: RecordKey,
        /// The model's description of the edit
        planned_edits: Option<String>,
        /// Stored value
        value: Value,
    },
    /// Content was removed. The record itself is gone only if the edit removed it whole
    Removed {
        /// Existing key
        key: RecordKey,
        /// The model's description of the edit
        planned_edits: Option<String>,
    },
}

impl Change {
    /// Key the change was written under
    pub fn key(&self) -> &RecordKey {
        match self {
            Change::Created { key, .. } | Change::Updated { key, .. } | Change::Removed { key, .. } => key,
        }
    }
}

/// Outcome of one updater run
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateReport {
    /// Category that was updated
    pub category: MemoryCategory,
    /// Writes, in order
    pub changes: Vec<Change>,
    /// Tool-result text appended to the conversation
    pub acknowledgment: String,
}

/// Handles one routed memory update
#[async_trait]
pub trait Updater: Send + Sync {
    /// Category this updater writes
    fn category(&self) -> MemoryCategory;

    /// Reconcile, write, and append the acknowledgment to `state`
    async fn run(&self, state: &mut ConversationState, turn: &Turn) -> Result<UpdateReport>;
}

/// The shared insert-or-patch protocol
#[derive(Clone)]
pub struct Reconciler {
    extractor: Arc<dyn Extractor>,
    store: Arc<dyn MemoryStore>,
    keys: Arc<dyn KeyGenerator>,
}

// A validated write waiting for its turn.
struct PlannedWrite {
    key: RecordKey,
    existed: bool,
    value: Value,
    edits: Vec<PlannedEdit>,
}

impl Reconciler {
    /// Create a reconciler
    pub fn new(
        extractor: Arc<dyn Extractor>,
        store: Arc<dyn MemoryStore>,
        keys: Arc<dyn KeyGenerator>,
    ) -> Self {
        Self {
            extractor,
            store,
            keys,
        }
    }

    /// Category handled by the wrapped extractor
    pub fn category(&self) -> MemoryCategory {
        self.extractor.category()
    }

    /// Run the full updater protocol. `acknowledge` renders the tool-result text.
    #[instrument(skip_all, fields(category = %self.category(), user_id = %turn.user_id))]
    pub async fn run(
        &self,
        state: &mut ConversationState,
        turn: &Turn,
        acknowledge: impl FnOnce(&[Change]) -> String + Send,
    ) -> Result<UpdateReport> {
        let category = self.category();
        let call_ids: Vec<String> = state
            .last()
            .map(|last| last.tool_calls().iter().map(|call| call.id.to_string()).collect())
            .unwrap_or_default();
        let Some((call_id, extra)) = call_ids.split_first() else {
            return Err(Error::MissingToolCall { updater: category });
        };

        let changes = self.reconcile(state, turn).await?;
        let acknowledgment = acknowledge(&changes);

        // Every tool call needs an answer before the next request.
        let mut answers = vec![ContentBlock::tool_result(call_id.as_str(), acknowledgment.clone())];
        if !extra.is_empty() {
            warn!(ignored = extra.len(), "answering extra tool calls as ignored");
        }
        answers.extend(extra.iter().map(|id| ContentBlock::tool_error(id.as_str(), IGNORED_CALL)));
        state.push(Message::new(Role::Tool, answers));

        Ok(UpdateReport {
            category,
            changes,
            acknowledgment,
        })
    }

    async fn reconcile(&self, state: &ConversationState, turn: &Turn) -> Result<Vec<Change>> {
        let category = self.category();
        let namespace = Namespace::for_category(category, turn.user_id.as_str());
        let existing = self.store.search(&namespace).await?;

        let request = ExtractionRequest {
            messages: transcript(state.history_before_last()),
            existing: existing.clone(),
        };
        let mut pairs = self.extractor.reconcile(request, turn).await?.into_pairs()?;

        if category.is_singleton() && pairs.len() > 1 {
            warn!(responses = pairs.len(), "singleton category, keeping the last response");
            let last = pairs.len() - 1;
            pairs = pairs.split_off(last);
        }

        let mut writes = Vec::with_capacity(pairs.len());
        for (value, meta) in pairs {
            let value = if value.is_null() {
                value
            } else {
                category
                    .normalize(value)
                    .map_err(|e| ExtractError::InvalidResponse {
                        schema: category.schema_name().to_string(),
                        reason: e.to_string(),
                    })?
            };

            let key = match meta.key {
                Some(key) => {
                    if !existing.iter().any(|item| item.key == key) {
                        return Err(Error::UnknownRecord {
                            namespace: namespace.to_string(),
                            key: key.to_string(),
                        });
                    }
                    Some(key)
                }
                None if category.is_singleton() => existing.first().map(|item| item.key.clone()),
                None => None,
            };

            if value.is_null() && key.is_none() {
                return Err(ExtractError::InvalidResponse {
                    schema: category.schema_name().to_string(),
                    reason: "removal of a record that does not exist".to_string(),
                }
                .into());
            }

            let (key, existed) = match key {
                Some(key) => (key, true),
                None => (self.fresh_key(&existing), false),
            };
            writes.push(PlannedWrite {
                key,
                existed,
                value,
                edits: meta.edits,
            });
        }

        let mut changes = Vec::with_capacity(writes.len());
        for write in writes {
            if write.value.is_null() {
                self.store.delete(&namespace, &write.key).await?;
                changes.push(Change::Removed {
                    key: write.key,
                    planned_edits: joined_plans(&write.edits),
                });
                continue;
            }

            self.store.put(&namespace, &write.key, write.value.clone()).await?;
            if !write.existed {
                changes.push(Change::Created {
                    key: write.key,
                    value: write.value,
                });
            } else if write.edits.is_empty() {
                changes.push(Change::Updated {
                    key: write.key,
                    planned_edits: None,
                    value: write.value,
                });
            } else {
                // One change per patch call; updates show the composed record.
                changes.extend(write.edits.into_iter().map(|edit| match edit.kind {
                    EditKind::Update => Change::Updated {
                        key: write.key.clone(),
                        planned_edits: edit.plan,
                        value: write.value.clone(),
                    },
                    EditKind::Remove => Change::Removed {
                        key: write.key.clone(),
                        planned_edits: edit.plan,
                    },
                }));
            }
        }

        info!(changes = changes.len(), "memory updated");
        Ok(changes)
    }

    fn fresh_key(&self, existing: &[crate::store::Item]) -> RecordKey {
        loop {
            let key = self.keys.next_key();
            if !existing.iter().any(|item| item.key == key) {
                return key;
            }
        }
    }
}

fn joined_plans(edits: &[PlannedEdit]) -> Option<String> {
    let plans: Vec<&str> = edits.iter().filter_map(|edit| edit.plan.as_deref()).collect();
    (!plans.is_empty()).then(|| plans.join("\n"))
}
