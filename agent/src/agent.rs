use crate::callbacks;
use crate::llm::{self, Message};
use crate::tools;
use crate::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

pub trait StopCondition {
    fn done(&self, history: &[llm::Message]) -> bool;
}

type Tool = Box<dyn tools::Tool + Send>;
type Callback = Box<dyn callbacks::Callback + Send>;

const DEFAULT_MAX_STEPS: usize = 16;

pub struct Agent {
    llm: Arc<dyn llm::LLM + Send + Sync>,
    system_prompt: Option<String>,
    tools: HashMap<String, Tool>,
    callbacks: Vec<Callback>,
    tool_defs: Vec<tools::ToolDefinition>,
    stop_condition: Box<dyn StopCondition + Send>,
    max_steps: usize,
}

impl Agent {
    async fn execute_tool_call(
        &mut self,
        tool_call: &tools::ToolCall,
        messages: Vec<llm::Message>,
    ) -> Result<Vec<llm::Message>> {
        let tool = self
            .tools
            .get_mut(&tool_call.name)
            .ok_or(Error::ToolDoesNotExist(tool_call.name.clone()))?;

        debug!(tool = %tool_call.name, id = %tool_call.id, "invoking tool");

        let messages = tool.invoke(tool_call, messages).await?;

        Ok(messages)
    }

    /// Starts a fresh conversation from the system prompt and `user_prompt`.
    pub async fn prompt(&mut self, user_prompt: impl Into<String>) -> Result<Vec<Message>> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &self.system_prompt {
            messages.push(Message::System(system.clone()));
        }
        messages.push(Message::User(user_prompt.into()));
        self.run(messages).await
    }

    pub async fn run(&mut self, mut messages: Vec<llm::Message>) -> Result<Vec<Message>> {
        let mut steps = 0;

        while !self.stop_condition.done(&messages) {
            if steps == self.max_steps {
                return Err(Error::StepLimitExceeded(self.max_steps));
            }
            steps += 1;

            let next = self
                .llm
                .completion(llm::CompletionRequest {
                    messages: &messages,
                    tools: &self.tool_defs,
                })
                .await?;

            debug!(
                step = steps,
                tool_calls = next.tool_calls.len(),
                "llm step complete"
            );

            messages.push(llm::Message::Assistant(
                next.content,
                next.tool_calls.clone(),
            ));

            for tool_call in &next.tool_calls {
                messages = self.execute_tool_call(tool_call, messages).await?;
            }

            for callback in &mut self.callbacks {
                messages = callback.call(messages).await?;
            }
        }

        Ok(messages)
    }
}

pub struct AgentBuilder {
    llm: Option<Arc<dyn llm::LLM + Send + Sync>>,
    system_prompt: Option<String>,
    tools: Vec<Tool>,
    callbacks: Vec<Callback>,
    stop_condition: Option<Box<dyn StopCondition + Send>>,
    max_steps: usize,
}

impl Default for AgentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentBuilder {
    pub fn new() -> Self {
        Self {
            llm: None,
            system_prompt: None,
            tools: Vec::new(),
            callbacks: Vec::new(),
            stop_condition: None,
            max_steps: DEFAULT_MAX_STEPS,
        }
    }

    pub fn llm(mut self, llm: Arc<dyn llm::LLM + Send + Sync>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn system_prompt(mut self, prompt: String) -> Self {
        self.system_prompt = Some(prompt);
        self
    }

    pub fn tool(mut self, tool: Tool) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn tools(mut self, tools: Vec<Tool>) -> Self {
        self.tools.extend(tools);
        self
    }

    pub fn callback(mut self, callback: Callback) -> Self {
        self.callbacks.push(callback);
        self
    }

    pub fn stop_condition(mut self, cond: Box<dyn StopCondition + Send>) -> Self {
        self.stop_condition = Some(cond);
        self
    }

    /// Upper bound on llm round trips for one `run`.
    pub fn max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn build(self) -> Result<Agent> {
        let mut tool_defs = Vec::new();
        let mut tools = HashMap::new();

        for tool in self.tools {
            let def = tool.definition()?;
            tools.insert(def.name.clone(), tool);
            tool_defs.push(def);
        }

        Ok(Agent {
            llm: self
                .llm
                .ok_or(Error::MissingArg("llm is required for agent".to_string()))?,
            system_prompt: self.system_prompt,
            tools,
            tool_defs,
            callbacks: self.callbacks,
            stop_condition: self.stop_condition.ok_or(Error::MissingArg(
                "stop_condition is required for agent".to_string(),
            ))?,
            max_steps: self.max_steps,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::llm::{CompletionRequest, CompletionResponse, LLM, Message};
    use crate::tools::{FunctionalTool, ToolCall, ToolDefinition};
    use crate::{AgentBuilder, Error, Result, StopCondition};
    use async_trait::async_trait;
    use std::sync::Arc;

    struct MockLLM;

    #[async_trait]
    impl LLM for MockLLM {
        async fn completion<'a>(
            &self,
            request: CompletionRequest<'a>,
        ) -> Result<CompletionResponse> {
            match request.messages.last() {
                Some(Message::User(_)) => Ok(CompletionResponse {
                    content: "tool call".to_string(),
                    tool_calls: vec![ToolCall {
                        id: "call1".to_string(),
                        name: "double".to_string(),
                        args: "{\"arg\":123}".to_string(),
                    }],
                }),
                Some(Message::Tool { .. }) => Ok(CompletionResponse {
                    content: "tool call recieved".to_string(),
                    tool_calls: vec![],
                }),
                Some(Message::Assistant(_, _)) => Ok(CompletionResponse {
                    content: "completed".to_string(),
                    tool_calls: vec![],
                }),
                _ => panic!("unexpected message sequence"),
            }
        }
    }

    struct DoubleTool;

    #[derive(serde::Deserialize, schemars::JsonSchema)]
    struct DoubleArgs {
        arg: i32,
    }

    #[async_trait]
    impl FunctionalTool for DoubleTool {
        fn definition(&self) -> Result<ToolDefinition> {
            ToolDefinition::new::<DoubleArgs>("double", "double")
        }

        async fn invoke_fn(&mut self, tool_call: &ToolCall) -> Result<Message> {
            let args: DoubleArgs = tool_call.args()?;
            Ok(tool_call.reply(format!("2 * {} = {}", args.arg, 2 * args.arg)))
        }
    }

    struct SimpleStop;

    impl StopCondition for SimpleStop {
        fn done(&self, history: &[Message]) -> bool {
            if let Some(Message::Assistant(content, _)) = history.last() {
                content == "completed"
            } else {
                false
            }
        }
    }

    struct Never;

    impl StopCondition for Never {
        fn done(&self, _: &[Message]) -> bool {
            false
        }
    }

    #[tokio::test]
    async fn test_agent() -> Result<()> {
        let mut agent = AgentBuilder::new()
            .llm(Arc::new(MockLLM))
            .tool(Box::new(DoubleTool))
            .stop_condition(Box::new(SimpleStop))
            .build()?;

        let history = agent
            .run(vec![Message::User("do stuff".to_string())])
            .await?;

        assert_eq!(history.len(), 5);

        assert!(matches!(&history[0], Message::User (content) if content == "do stuff"));
        assert!(matches!(&history[1], Message::Assistant (_, tool_calls) if tool_calls.len() == 1));
        assert!(matches!(&history[2], Message::Tool {  result,.. } if result == "2 * 123 = 246"));
        assert!(
            matches!(&history[3], Message::Assistant (content, _) if content== "tool call recieved")
        );
        assert!(matches!(&history[4], Message::Assistant (content, _) if content== "completed"));

        Ok(())
    }

    #[tokio::test]
    async fn test_prompt_seeds_system_message() -> Result<()> {
        let mut agent = AgentBuilder::new()
            .llm(Arc::new(MockLLM))
            .system_prompt("be brief".to_string())
            .tool(Box::new(DoubleTool))
            .stop_condition(Box::new(SimpleStop))
            .build()?;

        let history = agent.prompt("do stuff").await?;

        assert!(matches!(&history[0], Message::System(content) if content == "be brief"));
        assert!(matches!(&history[1], Message::User(content) if content == "do stuff"));
        assert!(history.last().is_some_and(Message::is_final_answer));

        Ok(())
    }

    #[tokio::test]
    async fn test_step_limit() -> Result<()> {
        let mut agent = AgentBuilder::new()
            .llm(Arc::new(MockLLM))
            .tool(Box::new(DoubleTool))
            .stop_condition(Box::new(Never))
            .max_steps(3)
            .build()?;

        let result = agent.prompt("do stuff").await;
        assert!(matches!(result, Err(Error::StepLimitExceeded(3))));

        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_tool() -> Result<()> {
        let mut agent = AgentBuilder::new()
            .llm(Arc::new(MockLLM))
            .stop_condition(Box::new(SimpleStop))
            .build()?;

        let result = agent.prompt("do stuff").await;
        assert!(matches!(result, Err(Error::ToolDoesNotExist(name)) if name == "double"));

        Ok(())
    }

    #[test]
    fn test_missing_llm() {
        let result = AgentBuilder::new().stop_condition(Box::new(SimpleStop)).build();
        assert!(matches!(result, Err(Error::MissingArg(_))));
    }
}
