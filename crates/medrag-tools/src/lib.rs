//! Tools the medrag agent can call: report retrieval and web search.

pub mod config;
pub mod executor;
pub mod registry;
pub mod retriever;
pub mod session_tool;
pub mod web_search;

pub use config::WebSearchConfig;
pub use executor::{
    MAX_TOOL_OUTPUT_CHARS, ToolCall, ToolError, ToolExecutor, ToolOutput, deserialize_params,
    truncate_tool_output,
};
pub use registry::{ToolDef, ToolRegistry};
pub use retriever::{ReportRetriever, SharedEmbedFn};
pub use session_tool::{SessionTool, ToolSet};
pub use web_search::WebSearchExecutor;
