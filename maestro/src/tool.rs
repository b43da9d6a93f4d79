//! Tool definitions exposed to the generation service.
//!
//! Tools are used purely as a structured output channel: the coordinator's
//! `UpdateMemory` call carries the routing decision, and the extractor's
//! schema and `PatchDoc` calls carry the records to write.

use crate::records::MemoryCategory;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Name of the coordinator's routing tool
pub const UPDATE_MEMORY: &str = "UpdateMemory";

/// Name of the extractor's document patch tool
pub const PATCH_DOC: &str = "PatchDoc";

/// A tool the model may call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name
    pub name: String,
    /// What the tool is for
    pub description: String,
    /// JSON schema for the arguments
    pub input_schema: Value,
}

impl ToolDefinition {
    /// Create a tool definition
    pub fn new(name: impl Into<String>, description: impl Into<String>, input_schema: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }

    /// The coordinator's single routing tool
    pub fn update_memory() -> Self {
        Self::new(
            UPDATE_MEMORY,
            "Decision on what memory type to update",
            json!({
                "type": "object",
                "properties": {
                    "update_type": {
                        "type": "string",
                        "enum": ["user", "todo", "instructions"],
                        "description": "Which memory collection to update"
                    },
                    "update_value": {
                        "type": "string",
                        "description": "Optional note on what changed"
                    }
                },
                "required": ["update_type"]
            }),
        )
    }

    /// Insert tool for a category: the arguments are the record itself
    pub fn schema(category: MemoryCategory) -> Self {
        Self::new(
            category.schema_name(),
            category.description(),
            category.json_schema(),
        )
    }

    /// Patch tool for existing documents
    pub fn patch_doc() -> Self {
        Self::new(
            PATCH_DOC,
            "Use this tool to patch an existing JSON document. Name the document by its \
             json_doc_id, explain the change in planned_edits, then list JSON patch operations.",
            json!({
                "type": "object",
                "properties": {
                    "json_doc_id": {
                        "type": "string",
                        "description": "The ID of the document to patch"
                    },
                    "planned_edits": {
                        "type": "string",
                        "description": "Step-by-step reasoning about the changes to make"
                    },
                    "patches": {
                        "type": "array",
                        "description": "JSON patch operations to apply in order",
                        "items": {
                            "type": "object",
                            "properties": {
                                "op": {"type": "string", "enum": ["add", "replace", "remove"]},
                                "path": {"type": "string", "description": "JSON pointer into the document"},
                                "value": {"description": "Value for add and replace"}
                            },
                            "required": ["op", "path"]
                        }
                    }
                },
                "required": ["json_doc_id", "planned_edits", "patches"]
            }),
        )
    }
}

/// How the model may pick among tools
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ToolChoice {
    /// Model decides whether to call a tool
    #[default]
    Auto,
    /// Model must call some tool
    Any,
    /// Model must call the named tool
    Tool {
        /// Tool name
        name: String,
    },
}

/// Arguments of an `UpdateMemory` call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateMemory {
    /// Raw category label; validated by the router
    pub update_type: String,
    /// Optional note from the coordinator
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_value: Option<String>,
}

/// One JSON patch operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchOp {
    /// `add`, `replace` or `remove`
    pub op: String,
    /// JSON pointer
    pub path: String,
    /// Value for add and replace
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

/// Arguments of a `PatchDoc` call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchDoc {
    /// Key of the document to patch
    pub json_doc_id: String,
    /// Natural-language description of the edit
    #[serde(default)]
    pub planned_edits: String,
    /// Operations, applied in order
    #[serde(default)]
    pub patches: Vec<PatchOp>,
}

impl PatchDoc {
    /// Whether the first operation removes something
    pub fn is_removal(&self) -> bool {
        self.patches.first().is_some_and(|p| p.op == "remove")
    }
}
