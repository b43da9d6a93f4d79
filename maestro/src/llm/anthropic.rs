//! Anthropic Claude adapter for [`GenerationService`].

use super::{GenerationRequest, GenerationService};
use crate::config::MaestroConfig;
use crate::error::GenerationError;
use crate::message::{merge_runs, ContentBlock, Message, Role};
use crate::tool::ToolChoice;
use async_trait::async_trait;
use claude::Claude;
use tracing::{debug, instrument};

/// Generation backed by the Anthropic Messages API
#[derive(Debug, Clone)]
pub struct AnthropicGenerator {
    client: Claude,
    max_tokens: usize,
    temperature: Option<f32>,
}

impl AnthropicGenerator {
    /// Wrap an existing client
    pub fn new(client: Claude) -> Self {
        Self {
            client,
            max_tokens: 4096,
            temperature: None,
        }
    }

    /// Build a client from `ANTHROPIC_API_KEY` and the given configuration
    pub fn from_config(config: &MaestroConfig) -> Result<Self, GenerationError> {
        let client = Claude::from_env()?.with_model(config.model.clone());
        Ok(Self {
            client,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }

    /// Set max tokens per reply
    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set sampling temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature.clamp(0.0, 1.0));
        self
    }

    fn to_api_request(&self, request: GenerationRequest) -> claude::Request {
        let mut system = Vec::new();
        let mut conversation = Vec::new();
        for message in request.messages {
            if message.role == Role::System {
                system.push(message.text_content());
            } else {
                conversation.push(message);
            }
        }

        let messages = merge_runs(conversation.into_iter().map(|m| Message {
            role: match m.role {
                Role::Assistant => Role::Assistant,
                // Tool results come from the user side
                _ => Role::User,
            },
            content: m.content,
        }))
        .into_iter()
        .map(to_api_message)
        .collect();

        let mut api = claude::Request::new(messages).with_max_tokens(self.max_tokens);
        if !system.is_empty() {
            api = api.with_system(system.join("\n\n"));
        }
        if let Some(temperature) = self.temperature {
            api = api.with_temperature(temperature);
        }
        if !request.tools.is_empty() {
            let tools = request
                .tools
                .into_iter()
                .map(|t| claude::Tool {
                    name: t.name,
                    description: t.description,
                    input_schema: t.input_schema,
                })
                .collect();
            let choice = match request.tool_choice {
                ToolChoice::Auto => claude::ToolChoice::Auto,
                ToolChoice::Any => claude::ToolChoice::Any,
                ToolChoice::Tool { name } => claude::ToolChoice::Tool { name },
            };
            api = api
                .with_tools(tools)
                .with_tool_choice(choice)
                .with_parallel_tool_use(request.parallel_tool_calls);
        }
        api
    }
}

fn to_api_message(message: Message) -> claude::Message {
    let role = match message.role {
        Role::Assistant => claude::Role::Assistant,
        _ => claude::Role::User,
    };
    let content = message
        .content
        .into_iter()
        .map(|block| match block {
            ContentBlock::Text { text } => claude::ContentBlock::Text { text },
            ContentBlock::ToolUse { id, name, input } => {
                claude::ContentBlock::ToolUse { id, name, input }
            }
            ContentBlock::ToolResult {
                tool_use_id,
                content,
                is_error,
            } => claude::ContentBlock::ToolResult {
                tool_use_id,
                content,
                is_error,
            },
        })
        .collect();
    claude::Message { role, content }
}

fn from_api_block(block: claude::ContentBlock) -> ContentBlock {
    match block {
        claude::ContentBlock::Text { text } => ContentBlock::Text { text },
        claude::ContentBlock::ToolUse { id, name, input } => ContentBlock::ToolUse { id, name, input },
        claude::ContentBlock::ToolResult {
            tool_use_id,
            content,
            is_error,
        } => ContentBlock::ToolResult {
            tool_use_id,
            content,
            is_error,
        },
    }
}

#[async_trait]
impl GenerationService for AnthropicGenerator {
    #[instrument(skip_all, fields(model = %self.client.model(), tools = request.tools.len()))]
    async fn generate(&self, request: GenerationRequest) -> Result<Message, GenerationError> {
        let api_request = self.to_api_request(request);
        let response = self.client.complete(api_request).await?;
        debug!(
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "completion received"
        );
        Ok(Message::new(
            Role::Assistant,
            response.content.into_iter().map(from_api_block).collect(),
        ))
    }
}
