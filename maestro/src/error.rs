//! Error types for the memory agent.
//!
//! Uses thiserror for ergonomic error definition. Each collaborator gets its
//! own enum; [`Error`] wraps them for the turn loop.

use crate::records::MemoryCategory;

/// Main error type for a conversation turn
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The coordinator asked for a memory category that does not exist
    #[error("Unknown update type: {0}")]
    UnknownUpdateType(String),

    /// An updater ran without a tool call to answer
    #[error("{updater} updater invoked without a triggering tool call")]
    MissingToolCall {
        /// The updater that was dispatched
        updater: MemoryCategory,
    },

    /// A patch targeted a key that is not in the namespace
    #[error("Record {key} does not exist in namespace {namespace}")]
    UnknownRecord {
        /// Namespace that was searched
        namespace: String,
        /// Key named by the patch
        key: String,
    },

    /// The coordinator/updater cycle did not terminate in time
    #[error("Turn exceeded {max} steps without finishing")]
    StepLimitExceeded {
        /// Configured limit
        max: usize,
    },

    /// Generation service error
    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    /// Extraction error
    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractError),

    /// Memory store error
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors from the generation service
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// API error from provider
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status
        status: u16,
        /// Response body
        message: String,
    },

    /// Network/connection error
    #[error("Network error: {0}")]
    Network(String),

    /// Response parsing error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Provider misconfigured
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The call was cancelled by the caller
    #[error("Generation cancelled")]
    Cancelled,

    /// The call did not finish in time
    #[error("Generation timed out after {duration:?}")]
    Timeout {
        /// Timeout that elapsed
        duration: std::time::Duration,
    },

    /// A scripted generator ran out of replies
    #[error("Script exhausted after {calls} calls")]
    ScriptExhausted {
        /// Calls served before the script ran dry
        calls: usize,
    },
}

impl From<claude::Error> for GenerationError {
    fn from(err: claude::Error) -> Self {
        match err {
            claude::Error::NoApiKey => {
                GenerationError::Configuration("ANTHROPIC_API_KEY not set".to_string())
            }
            claude::Error::Network(msg) => GenerationError::Network(msg),
            claude::Error::Api { status, message } => GenerationError::Api { status, message },
            claude::Error::Parse(msg) => GenerationError::Parse(msg),
            claude::Error::Config(msg) => GenerationError::Configuration(msg),
        }
    }
}

/// Errors from reconciling conversation content against stored records
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// A response does not conform to the category schema
    #[error("Invalid {schema} response: {reason}")]
    InvalidResponse {
        /// Schema name
        schema: String,
        /// What was wrong
        reason: String,
    },

    /// A patch could not be applied to the stored document
    #[error("Failed to patch {key}: {source}")]
    Patch {
        /// Key of the patched record
        key: String,
        /// Underlying patch failure
        #[source]
        source: PatchError,
    },

    /// Responses and metadata are not aligned
    #[error("Extraction returned {responses} responses but {metadata} metadata entries")]
    Misaligned {
        /// Number of responses
        responses: usize,
        /// Number of metadata entries
        metadata: usize,
    },
}

/// Errors from applying a JSON patch
#[derive(Debug, thiserror::Error)]
pub enum PatchError {
    /// Unsupported operation
    #[error("unsupported operation '{0}'")]
    UnsupportedOp(String),

    /// Path does not resolve inside the document
    #[error("path '{0}' does not exist")]
    MissingPath(String),

    /// Path is not a valid JSON pointer
    #[error("invalid path '{0}'")]
    InvalidPath(String),

    /// Operation requires a value but none was given
    #[error("operation on '{0}' is missing a value")]
    MissingValue(String),
}

/// Memory store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Backend failure
    #[error("Storage backend error: {reason}")]
    Backend {
        /// What went wrong
        reason: String,
    },
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Error>;

/// Result type for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;
