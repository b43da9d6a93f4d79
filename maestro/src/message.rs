//! Conversation messages.
//!
//! The coordinator's routing decision arrives as a tool call on an assistant
//! message; an updater answers it with a tool-result message. Everything else
//! is plain text.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Who produced a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The person being helped
    User,
    /// The model
    Assistant,
    /// Prompt text assembled by the agent
    System,
    /// An updater's acknowledgment of a tool call
    Tool,
}

impl Role {
    /// Lowercase name, as serialized
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
            Role::Tool => "tool",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Text, a tool call, or the answer to one
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Plain text
    Text {
        /// Text body
        text: String,
    },

    /// A request from the model to run a tool
    ToolUse {
        /// Call id, echoed back by the matching result
        id: String,
        /// Tool name
        name: String,
        /// Arguments object
        input: Value,
    },

    /// Answer to a `ToolUse` block
    ToolResult {
        /// Id of the call being answered
        tool_use_id: String,
        /// Acknowledgment text
        content: String,
        /// Set when the tool failed
        #[serde(default)]
        is_error: bool,
    },
}

impl ContentBlock {
    /// Text block
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Tool call block
    pub fn tool_use(id: impl Into<String>, name: impl Into<String>, input: Value) -> Self {
        Self::ToolUse {
            id: id.into(),
            name: name.into(),
            input,
        }
    }

    /// Successful tool result block
    pub fn tool_result(tool_use_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::ToolResult {
            tool_use_id: tool_use_id.into(),
            content: content.into(),
            is_error: false,
        }
    }

    /// Failed tool result block
    pub fn tool_error(tool_use_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::ToolResult {
            tool_use_id: tool_use_id.into(),
            content: content.into(),
            is_error: true,
        }
    }

    /// Body of a text block
    pub fn as_text(&self) -> Option<&str> {
        if let Self::Text { text } = self {
            Some(text)
        } else {
            None
        }
    }

    /// Borrowed view of a tool call block
    pub fn as_tool_call(&self) -> Option<ToolCall<'_>> {
        if let Self::ToolUse { id, name, input } = self {
            Some(ToolCall { id, name, input })
        } else {
            None
        }
    }
}

/// Borrowed view of a tool invocation request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToolCall<'a> {
    /// Call id
    pub id: &'a str,
    /// Tool name
    pub name: &'a str,
    /// Argument mapping
    pub input: &'a Value,
}

impl ToolCall<'_> {
    /// A string argument, if present and a string
    pub fn str_arg(&self, name: &str) -> Option<&str> {
        self.input.get(name).and_then(Value::as_str)
    }
}

/// One entry of the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Sender
    pub role: Role,
    /// Blocks, in order
    pub content: Vec<ContentBlock>,
}

impl Message {
    /// Message with the given blocks
    pub fn new(role: Role, content: Vec<ContentBlock>) -> Self {
        Self { role, content }
    }

    /// Plain-text user message
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, vec![ContentBlock::text(text)])
    }

    /// Plain-text assistant message
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, vec![ContentBlock::text(text)])
    }

    /// Plain-text system prompt
    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Role::System, vec![ContentBlock::text(text)])
    }

    /// Acknowledgment answering the call `tool_use_id`
    pub fn tool_result(tool_use_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(Role::Tool, vec![ContentBlock::tool_result(tool_use_id, content)])
    }

    /// Text blocks joined by newlines
    pub fn text_content(&self) -> String {
        let texts: Vec<&str> = self.content.iter().filter_map(ContentBlock::as_text).collect();
        texts.join("\n")
    }

    /// Every tool call, in order
    pub fn tool_calls(&self) -> Vec<ToolCall<'_>> {
        self.content.iter().filter_map(ContentBlock::as_tool_call).collect()
    }

    /// The first tool call. Routing only ever looks at this one.
    pub fn first_tool_call(&self) -> Option<ToolCall<'_>> {
        self.content.iter().find_map(ContentBlock::as_tool_call)
    }

    /// Whether the message carries any tool call
    pub fn has_tool_calls(&self) -> bool {
        self.first_tool_call().is_some()
    }

    /// Append a block
    pub fn with_content(mut self, block: ContentBlock) -> Self {
        self.content.push(block);
        self
    }
}

/// Ordered history of one conversation, oldest first
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    /// Messages, oldest first
    pub messages: Vec<Message>,
}

impl From<Vec<Message>> for ConversationState {
    fn from(messages: Vec<Message>) -> Self {
        Self { messages }
    }
}

impl ConversationState {
    /// Empty history
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Most recent message
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Everything but the most recent message
    pub fn history_before_last(&self) -> &[Message] {
        match self.messages.split_last() {
            Some((_, rest)) => rest,
            None => &[],
        }
    }

    /// Message count
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether there are no messages
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Merge consecutive messages from the same role into one.
pub fn merge_runs(messages: impl IntoIterator<Item = Message>) -> Vec<Message> {
    let mut merged: Vec<Message> = Vec::new();
    for message in messages {
        match merged.last_mut() {
            Some(prev) if prev.role == message.role => prev.content.extend(message.content),
            _ => merged.push(message),
        }
    }
    merged
}

/// Plain-text transcript: tool blocks and empty messages dropped, runs merged.
pub fn transcript(messages: &[Message]) -> Vec<Message> {
    let text_only = messages.iter().filter_map(|m| {
        let content: Vec<ContentBlock> = m
            .content
            .iter()
            .filter(|block| block.as_text().is_some_and(|t| !t.trim().is_empty()))
            .cloned()
            .collect();
        (!content.is_empty()).then(|| Message::new(m.role, content))
    });
    merge_runs(text_only)
}
