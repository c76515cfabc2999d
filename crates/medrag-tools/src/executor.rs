use std::collections::HashMap;
use std::fmt;

/// Structured tool invocation from LLM.
#[derive(Debug, Clone)]
pub struct ToolCall {
    pub tool_id: String,
    pub params: HashMap<String, serde_json::Value>,
}

impl ToolCall {
    /// Build a call from a model-supplied JSON value. Non-object input yields
    /// empty params, which typed tools then reject.
    #[must_use]
    pub fn from_input(tool_id: impl Into<String>, input: &serde_json::Value) -> Self {
        let params = input
            .as_object()
            .map(|o| o.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default();
        Self {
            tool_id: tool_id.into(),
            params,
        }
    }
}

/// Structured result from tool execution.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub tool_name: String,
    pub summary: String,
}

impl fmt::Display for ToolOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary)
    }
}

pub const MAX_TOOL_OUTPUT_CHARS: usize = 30_000;

/// Truncate tool output that exceeds `MAX_TOOL_OUTPUT_CHARS` using head+tail split.
#[must_use]
pub fn truncate_tool_output(output: &str) -> String {
    let total = output.chars().count();
    if total <= MAX_TOOL_OUTPUT_CHARS {
        return output.to_owned();
    }

    let half = MAX_TOOL_OUTPUT_CHARS / 2;
    let head_end = output
        .char_indices()
        .nth(half)
        .map_or(output.len(), |(i, _)| i);
    let tail_start = output
        .char_indices()
        .nth(total - half)
        .map_or(output.len(), |(i, _)| i);
    let head = &output[..head_end];
    let tail = &output[tail_start..];
    let truncated = total - 2 * half;

    format!(
        "{head}\n\n... [truncated {truncated} chars, showing first and last ~{half} chars] ...\n\n{tail}"
    )
}

/// Errors that can occur during tool execution.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("invalid tool parameters: {message}")]
    InvalidParams { message: String },

    #[error("unknown tool: {name}")]
    UnknownTool { name: String },

    #[error("request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("web request failed: {0}")]
    Http(String),

    #[error("retrieval failed: {0}")]
    Retrieval(String),

    #[error("execution failed: {0}")]
    Execution(#[from] std::io::Error),
}

/// Deserialize tool call params from a `HashMap<String, Value>` into a typed struct.
///
/// # Errors
///
/// Returns `ToolError::InvalidParams` when deserialization fails.
pub fn deserialize_params<T: serde::de::DeserializeOwned, S: std::hash::BuildHasher>(
    params: &HashMap<String, serde_json::Value, S>,
) -> Result<T, ToolError> {
    let obj =
        serde_json::Value::Object(params.iter().map(|(k, v)| (k.clone(), v.clone())).collect());
    serde_json::from_value(obj).map_err(|e| ToolError::InvalidParams {
        message: e.to_string(),
    })
}

/// Async trait for structured tool execution backends.
pub trait ToolExecutor: Send + Sync {
    /// Return tool definitions this executor can handle.
    fn tool_definitions(&self) -> Vec<crate::registry::ToolDef>;

    /// Execute a structured tool call. Returns `None` if `tool_id` is not handled.
    fn execute_tool_call(
        &self,
        call: &ToolCall,
    ) -> impl Future<Output = Result<Option<ToolOutput>, ToolError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_output_display() {
        let output = ToolOutput {
            tool_name: "medical_report_retriever".to_owned(),
            summary: "Patient has mild fever.".to_owned(),
        };
        assert_eq!(output.to_string(), "Patient has mild fever.");
    }

    #[test]
    fn tool_error_display() {
        assert_eq!(
            ToolError::UnknownTool {
                name: "calculator".into()
            }
            .to_string(),
            "unknown tool: calculator"
        );
        assert_eq!(
            ToolError::Timeout { timeout_secs: 15 }.to_string(),
            "request timed out after 15s"
        );
        assert_eq!(
            ToolError::InvalidParams {
                message: "missing field `query`".into()
            }
            .to_string(),
            "invalid tool parameters: missing field `query`"
        );
    }

    #[test]
    fn from_input_object() {
        let call = ToolCall::from_input("duckduckgo_search", &serde_json::json!({"query": "flu"}));
        assert_eq!(call.tool_id, "duckduckgo_search");
        assert_eq!(call.params["query"], "flu");
    }

    #[test]
    fn from_input_non_object_is_empty() {
        let call = ToolCall::from_input("x", &serde_json::json!("flu"));
        assert!(call.params.is_empty());
    }

    #[derive(Debug, serde::Deserialize)]
    struct QueryParams {
        query: String,
    }

    #[test]
    fn deserialize_params_ok() {
        let params = HashMap::from([("query".to_owned(), serde_json::json!("fever"))]);
        let p: QueryParams = deserialize_params(&params).unwrap();
        assert_eq!(p.query, "fever");
    }

    #[test]
    fn deserialize_params_wrong_type() {
        let params = HashMap::from([("query".to_owned(), serde_json::json!(42))]);
        let err = deserialize_params::<QueryParams, _>(&params).unwrap_err();
        assert!(matches!(err, ToolError::InvalidParams { .. }));
    }

    #[test]
    fn deserialize_params_missing_field() {
        let params: HashMap<String, serde_json::Value> = HashMap::new();
        let err = deserialize_params::<QueryParams, _>(&params).unwrap_err();
        assert!(err.to_string().contains("query"));
    }

    #[test]
    fn truncate_short_output_unchanged() {
        assert_eq!(truncate_tool_output("short"), "short");
        let exact = "x".repeat(MAX_TOOL_OUTPUT_CHARS);
        assert_eq!(truncate_tool_output(&exact), exact);
    }

    #[test]
    fn truncate_long_output_keeps_head_and_tail() {
        let input = format!("{}{}", "a".repeat(20_000), "b".repeat(20_000));
        let out = truncate_tool_output(&input);
        assert!(out.starts_with(&"a".repeat(15_000)));
        assert!(out.ends_with(&"b".repeat(15_000)));
        assert!(out.contains("truncated 10000 chars"));
    }

    #[test]
    fn truncate_multibyte_counts_chars() {
        let input = "é".repeat(MAX_TOOL_OUTPUT_CHARS + 10);
        let out = truncate_tool_output(&input);
        assert!(out.contains("truncated 10 chars"));
    }

    mod proptest_truncate {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn never_panics_on_unicode(s in "\\PC{0,200}", repeat in 0usize..400) {
                let input = s.repeat(repeat);
                let _ = truncate_tool_output(&input);
            }
        }
    }
}
