use crate::llm;
use crate::tools::{ToolCall, ToolDefinition};
use crate::{Error, Result};
use async_openai::{
    Client,
    config::OpenAIConfig,
    types::{
        ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessageArgs,
        ChatCompletionRequestAssistantMessageContent, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessage, ChatCompletionRequestSystemMessageContent,
        ChatCompletionRequestToolMessage, ChatCompletionRequestToolMessageContent,
        ChatCompletionRequestUserMessage, ChatCompletionRequestUserMessageContent,
        ChatCompletionTool, ChatCompletionToolArgs, ChatCompletionToolType,
        CreateChatCompletionRequestArgs, FunctionCall, FunctionObjectArgs, Role,
    },
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

pub struct OpenAI {
    model: String,
    client: Client<OpenAIConfig>,
}

impl OpenAI {
    /// Client configured from the environment (`OPENAI_API_KEY`, `OPENAI_BASE_URL`).
    pub fn new(model: String) -> Arc<Self> {
        Arc::new(Self {
            model,
            client: Client::new(),
        })
    }

    /// Client for an OpenAI-compatible endpoint. Unset values fall back to the environment.
    pub fn with_endpoint(model: String, api_base: Option<&str>, api_key: Option<&str>) -> Arc<Self> {
        let mut config = OpenAIConfig::default();
        if let Some(api_base) = api_base {
            config = config.with_api_base(api_base);
        }
        if let Some(api_key) = api_key {
            config = config.with_api_key(api_key);
        }
        Arc::new(Self {
            model,
            client: Client::with_config(config),
        })
    }
}

impl TryFrom<&llm::Message> for ChatCompletionRequestMessage {
    type Error = Error;

    fn try_from(msg: &llm::Message) -> Result<Self> {
        match msg {
            llm::Message::User(msg) => Ok(ChatCompletionRequestMessage::User(
                ChatCompletionRequestUserMessage {
                    content: ChatCompletionRequestUserMessageContent::Text(msg.clone()),
                    name: None,
                },
            )),
            llm::Message::System(msg) => Ok(ChatCompletionRequestMessage::System(
                ChatCompletionRequestSystemMessage {
                    content: ChatCompletionRequestSystemMessageContent::Text(msg.clone()),
                    name: None,
                },
            )),
            llm::Message::Tool { id, result, .. } => Ok(ChatCompletionRequestMessage::Tool(
                ChatCompletionRequestToolMessage {
                    content: ChatCompletionRequestToolMessageContent::Text(result.clone()),
                    tool_call_id: id.clone(),
                },
            )),
            llm::Message::Assistant(msg, tool_calls) => {
                let mut args = ChatCompletionRequestAssistantMessageArgs::default();
                args.content(ChatCompletionRequestAssistantMessageContent::Text(
                    msg.clone(),
                ));
                // an empty tool_calls array is rejected by the API
                if !tool_calls.is_empty() {
                    args.tool_calls(
                        tool_calls
                            .iter()
                            .map(|call| ChatCompletionMessageToolCall {
                                id: call.id.clone(),
                                r#type: ChatCompletionToolType::Function,
                                function: FunctionCall {
                                    name: call.name.clone(),
                                    arguments: call.args.clone(),
                                },
                            })
                            .collect::<Vec<_>>(),
                    );
                }
                Ok(ChatCompletionRequestMessage::Assistant(args.build()?))
            }
        }
    }
}

impl TryFrom<&ToolDefinition> for ChatCompletionTool {
    type Error = Error;

    fn try_from(tool: &ToolDefinition) -> Result<Self> {
        let res = ChatCompletionToolArgs::default()
            .function(
                FunctionObjectArgs::default()
                    .name(tool.name.clone())
                    .description(tool.desc.clone())
                    .parameters(tool.params.clone())
                    .build()?,
            )
            .build()?;

        Ok(res)
    }
}

#[async_trait]
impl llm::LLM for OpenAI {
    async fn completion<'a>(
        &self,
        request: llm::CompletionRequest<'a>,
    ) -> Result<llm::CompletionResponse> {
        let mut completion = CreateChatCompletionRequestArgs::default();
        completion.model(&self.model).messages(
            request
                .messages
                .iter()
                .map(ChatCompletionRequestMessage::try_from)
                .collect::<Result<Vec<_>>>()?,
        );

        if !request.tools.is_empty() {
            completion.tools(
                request
                    .tools
                    .iter()
                    .map(ChatCompletionTool::try_from)
                    .collect::<Result<Vec<_>>>()?,
            );
        }

        let completion = completion.build()?;

        debug!(
            model = %self.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "requesting chat completion"
        );

        let res = self.client.chat().create(completion).await?;

        let choice = res
            .choices
            .first()
            .ok_or(Error::LLMResponseError("choices is empty".to_string()))?;

        if choice.message.role != Role::Assistant {
            return Err(Error::LLMResponseError(
                "expected role to be assistant".to_string(),
            ));
        }

        let tool_calls: Vec<ToolCall> = choice
            .message
            .tool_calls
            .iter()
            .flat_map(|calls| {
                calls.iter().map(|call| ToolCall {
                    id: call.id.clone(),
                    name: call.function.name.clone(),
                    args: call.function.arguments.clone(),
                })
            })
            .collect();

        // content is null when the model only calls tools
        let content = match (&choice.message.content, tool_calls.is_empty()) {
            (Some(content), _) => content.clone(),
            (None, false) => String::new(),
            (None, true) => {
                return Err(Error::LLMResponseError("content is empty".to_string()));
            }
        };

        Ok(llm::CompletionResponse {
            content,
            tool_calls,
        })
    }
}
