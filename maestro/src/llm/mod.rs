//! Generation capability.
//!
//! The coordinator and the extractors only see [`GenerationService`]; the
//! Anthropic adapter lives in [`anthropic`] and a scripted double lives in
//! [`crate::testing`].

pub mod anthropic;

pub use anthropic::AnthropicGenerator;

use crate::error::GenerationError;
use crate::message::Message;
use crate::tool::{ToolChoice, ToolDefinition};
use async_trait::async_trait;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Request for a single generation
#[derive(Debug, Clone, Default)]
pub struct GenerationRequest {
    /// Conversation, system messages first
    pub messages: Vec<Message>,
    /// Tools the model may call
    pub tools: Vec<ToolDefinition>,
    /// Tool selection policy
    pub tool_choice: ToolChoice,
    /// Whether the reply may carry more than one tool call
    pub parallel_tool_calls: bool,
}

impl GenerationRequest {
    /// Create a request over the given messages
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            tools: Vec::new(),
            tool_choice: ToolChoice::Auto,
            parallel_tool_calls: true,
        }
    }

    /// Set tools
    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }

    /// Set tool choice
    pub fn with_tool_choice(mut self, choice: ToolChoice) -> Self {
        self.tool_choice = choice;
        self
    }

    /// Allow or forbid multiple tool calls in one reply
    pub fn with_parallel_tool_calls(mut self, allowed: bool) -> Self {
        self.parallel_tool_calls = allowed;
        self
    }
}

/// Produces an assistant message for a conversation
#[async_trait]
pub trait GenerationService: Send + Sync {
    /// Generate the next assistant message
    async fn generate(&self, request: GenerationRequest) -> Result<Message, GenerationError>;
}

/// Per-turn context: whose memory, and how long generation may take
#[derive(Debug, Clone)]
pub struct Turn {
    /// Owner of the memory being read and written
    pub user_id: String,
    cancel: CancellationToken,
    timeout: Option<Duration>,
}

impl Turn {
    /// A turn for `user_id` with no timeout
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            cancel: CancellationToken::new(),
            timeout: None,
        }
    }

    /// Bound every generation call in this turn
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Share an externally owned cancellation token
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Token that cancels in-flight generation for this turn
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Configured generation timeout
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Run a generation call, racing cancellation and the timeout.
    pub async fn generate(
        &self,
        service: &dyn GenerationService,
        request: GenerationRequest,
    ) -> Result<Message, GenerationError> {
        if self.cancel.is_cancelled() {
            return Err(GenerationError::Cancelled);
        }

        let call = service.generate(request);
        let outcome = match self.timeout {
            Some(duration) => tokio::select! {
                _ = self.cancel.cancelled() => Err(GenerationError::Cancelled),
                result = tokio::time::timeout(duration, call) => {
                    result.unwrap_or(Err(GenerationError::Timeout { duration }))
                }
            },
            None => tokio::select! {
                _ = self.cancel.cancelled() => Err(GenerationError::Cancelled),
                result = call => result,
            },
        };

        if let Err(err) = &outcome {
            warn!(user_id = %self.user_id, error = %err, "generation failed");
        }
        outcome
    }
}
