//! ReAct-style agent: the model either answers or asks for tools, tool
//! results are fed back, and the loop repeats within a fixed step budget.

mod error;

pub use error::AgentError;

use medrag_llm::LlmProvider;
use medrag_llm::provider::{
    ChatResponse, Message, MessagePart, Role, ToolDefinition, ToolUseRequest,
};
use medrag_tools::{ToolCall, ToolDef, ToolExecutor};
use tracing::Instrument;

/// Steps allowed per question. Each model call and each tool round is one step.
pub const DEFAULT_RECURSION_LIMIT: usize = 50;

pub const DEFAULT_SYSTEM_PROMPT: &str = "\
You are a medical assistant answering questions about a patient's uploaded medical report.
Always call the `medical_report_retriever` tool to look up the relevant parts of the report before answering.
Base your answer on the retrieved excerpts and say so when the report does not contain the information.
Only call `duckduckgo_search` if it is available and the question needs general medical knowledge that is not in the report.
Answer clearly and concisely. You do not replace a consultation with a physician.";

pub struct ReactAgent<P, T> {
    provider: P,
    tools: T,
    system_prompt: String,
    recursion_limit: usize,
}

impl<P, T> std::fmt::Debug for ReactAgent<P, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReactAgent")
            .field("recursion_limit", &self.recursion_limit)
            .finish_non_exhaustive()
    }
}

impl<P: LlmProvider, T: ToolExecutor> ReactAgent<P, T> {
    #[must_use]
    pub fn new(provider: P, tools: T) -> Self {
        Self {
            provider,
            tools,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_owned(),
            recursion_limit: DEFAULT_RECURSION_LIMIT,
        }
    }

    #[must_use]
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    #[must_use]
    pub fn with_recursion_limit(mut self, limit: usize) -> Self {
        self.recursion_limit = limit;
        self
    }

    #[must_use]
    pub fn tools(&self) -> &T {
        &self.tools
    }

    #[must_use]
    pub fn recursion_limit(&self) -> usize {
        self.recursion_limit
    }

    /// Run the loop for a single human message and return the final answer.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Llm`] if a model call fails and
    /// [`AgentError::RecursionLimit`] if the step budget runs out first.
    pub async fn invoke(&self, question: &str) -> Result<String, AgentError> {
        let tool_defs: Vec<ToolDefinition> = self
            .tools
            .tool_definitions()
            .iter()
            .map(ToolDef::to_definition)
            .collect();

        let mut messages = vec![
            Message::from_legacy(Role::System, self.system_prompt.as_str()),
            Message::from_legacy(Role::User, question),
        ];
        let mut steps = 0;

        loop {
            self.take_step(&mut steps)?;
            tracing::debug!(
                iteration = steps,
                provider = self.provider.name(),
                tool_count = tool_defs.len(),
                "agent: model call"
            );
            let response = self
                .provider
                .chat_with_tools(&messages, &tool_defs)
                .instrument(tracing::info_span!("llm_call", provider = self.provider.name()))
                .await?;

            let (text, tool_calls) = match response {
                ChatResponse::Text(text) => return Ok(text),
                ChatResponse::ToolUse { text, tool_calls } if tool_calls.is_empty() => {
                    return Ok(text.unwrap_or_default());
                }
                ChatResponse::ToolUse { text, tool_calls } => (text, tool_calls),
            };

            self.take_step(&mut steps)?;
            tracing::debug!(
                iteration = steps,
                calls = tool_calls.len(),
                "agent: tool round"
            );
            self.run_tools(&mut messages, text, &tool_calls).await;
        }
    }

    fn take_step(&self, steps: &mut usize) -> Result<(), AgentError> {
        if *steps >= self.recursion_limit {
            tracing::warn!(limit = self.recursion_limit, "agent step budget exhausted");
            return Err(AgentError::RecursionLimit {
                limit: self.recursion_limit,
            });
        }
        *steps += 1;
        Ok(())
    }

    async fn run_tools(
        &self,
        messages: &mut Vec<Message>,
        text: Option<String>,
        tool_calls: &[ToolUseRequest],
    ) {
        let mut parts = Vec::with_capacity(tool_calls.len() + 1);
        if let Some(t) = text
            && !t.is_empty()
        {
            parts.push(MessagePart::Text { text: t });
        }
        for tc in tool_calls {
            parts.push(MessagePart::ToolUse {
                id: tc.id.clone(),
                name: tc.name.clone(),
                input: tc.input.clone(),
            });
        }
        messages.push(Message::from_parts(Role::Assistant, parts));

        let mut result_parts = Vec::with_capacity(tool_calls.len());
        for tc in tool_calls {
            let call = ToolCall::from_input(tc.name.as_str(), &tc.input);
            let result = self
                .tools
                .execute_tool_call(&call)
                .instrument(tracing::info_span!("tool_exec", tool_name = %tc.name, idx = %tc.id))
                .await;
            let (content, is_error) = match result {
                Ok(Some(out)) => (out.summary, false),
                Ok(None) => ("(no output)".to_owned(), false),
                Err(e) => {
                    tracing::warn!(tool = %tc.name, "tool call failed: {e}");
                    (format!("[error] {e}"), true)
                }
            };
            result_parts.push(MessagePart::ToolResult {
                tool_use_id: tc.id.clone(),
                content,
                is_error,
            });
        }
        messages.push(Message::from_parts(Role::User, result_parts));
    }
}
