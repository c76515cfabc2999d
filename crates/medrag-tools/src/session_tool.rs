use medrag_llm::provider::ToolDefinition;

use crate::executor::{ToolCall, ToolError, ToolExecutor, ToolOutput, truncate_tool_output};
use crate::registry::{ToolDef, ToolRegistry};
use crate::retriever::{RETRIEVER_TOOL_NAME, ReportRetriever};
use crate::web_search::{WEB_SEARCH_TOOL_NAME, WebSearchExecutor};

/// The closed set of tools a chat session can expose.
#[derive(Debug, Clone)]
pub enum SessionTool {
    Retriever(ReportRetriever),
    WebSearch(WebSearchExecutor),
}

impl SessionTool {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Retriever(_) => RETRIEVER_TOOL_NAME,
            Self::WebSearch(_) => WEB_SEARCH_TOOL_NAME,
        }
    }

    #[must_use]
    pub fn definition(&self) -> ToolDef {
        match self {
            Self::Retriever(_) => ReportRetriever::definition(),
            Self::WebSearch(_) => WebSearchExecutor::definition(),
        }
    }

    /// Run the tool with already-routed params.
    ///
    /// # Errors
    ///
    /// Propagates the tool's own error.
    pub async fn call(&self, call: &ToolCall) -> Result<Option<ToolOutput>, ToolError> {
        match self {
            Self::Retriever(r) => r.execute_tool_call(call).await,
            Self::WebSearch(w) => w.execute_tool_call(call).await,
        }
    }
}

/// Ordered tool list handed to the agent. The retriever always comes first.
#[derive(Debug, Clone)]
pub struct ToolSet {
    tools: Vec<SessionTool>,
}

impl ToolSet {
    #[must_use]
    pub fn new(retriever: ReportRetriever, web_search: Option<WebSearchExecutor>) -> Self {
        let mut tools = vec![SessionTool::Retriever(retriever)];
        if let Some(w) = web_search {
            tools.push(SessionTool::WebSearch(w));
        }
        Self { tools }
    }

    #[must_use]
    pub fn tools(&self) -> &[SessionTool] {
        &self.tools
    }

    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.tools.iter().map(SessionTool::name).collect()
    }

    #[must_use]
    pub fn has_web_search(&self) -> bool {
        self.tools
            .iter()
            .any(|t| matches!(t, SessionTool::WebSearch(_)))
    }

    #[must_use]
    pub fn registry(&self) -> ToolRegistry {
        ToolRegistry::from_definitions(self.tool_definitions())
    }

    #[must_use]
    pub fn llm_definitions(&self) -> Vec<ToolDefinition> {
        self.registry().definitions()
    }
}

impl ToolExecutor for ToolSet {
    fn tool_definitions(&self) -> Vec<ToolDef> {
        self.tools.iter().map(SessionTool::definition).collect()
    }

    async fn execute_tool_call(&self, call: &ToolCall) -> Result<Option<ToolOutput>, ToolError> {
        let Some(tool) = self.tools.iter().find(|t| t.name() == call.tool_id) else {
            return Err(ToolError::UnknownTool {
                name: call.tool_id.clone(),
            });
        };
        let output = tool.call(call).await?;
        Ok(output.map(|mut o| {
            o.summary = truncate_tool_output(&o.summary);
            o
        }))
    }
}
