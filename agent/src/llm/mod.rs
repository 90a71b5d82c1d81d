use crate::Result;
use crate::tools::{ToolCall, ToolDefinition};
use async_trait::async_trait;

mod openai;
pub use openai::OpenAI;

#[derive(Clone, Debug)]
pub enum Message {
    User(String),
    Assistant(String, Vec<ToolCall>),
    System(String),
    Tool {
        id: String,
        name: String,
        result: String,
    },
}

impl Message {
    /// Text an assistant produced, `None` for every other role.
    pub fn assistant_text(&self) -> Option<&str> {
        match self {
            Message::Assistant(content, _) => Some(content),
            _ => None,
        }
    }

    pub fn is_final_answer(&self) -> bool {
        matches!(self, Message::Assistant(_, tool_calls) if tool_calls.is_empty())
    }
}

impl std::fmt::Display for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Message::User(content) => write!(f, "**user**\n\n{}\n\n", content),
            Message::System(content) => write!(f, "**system**\n\n{}\n\n", content),
            Message::Assistant(content, tool_calls) => {
                write!(f, "**assistant**\n\n")?;
                if !content.is_empty() {
                    write!(f, "{}\n\n", content)?;
                }
                for call in tool_calls {
                    write!(f, "{}", call)?;
                }
                Ok(())
            }
            Message::Tool { id, name, result } => {
                write!(f, "**tool {} ({})**\n\n{}\n\n", name, id, result)
            }
        }
    }
}

pub struct CompletionRequest<'a> {
    pub messages: &'a [Message],
    pub tools: &'a [ToolDefinition],
}

pub struct CompletionResponse {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
}

#[async_trait]
pub trait LLM {
    async fn completion<'a>(&self, request: CompletionRequest<'a>) -> Result<CompletionResponse>;
}
