use serde::{Deserialize, Serialize};

fn default_timeout() -> u64 {
    15
}

fn default_max_results() -> usize {
    5
}

fn default_max_body_bytes() -> usize {
    1_048_576
}

/// Configuration for the web search tool.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WebSearchConfig {
    /// Whether chat sessions start with web search enabled.
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for WebSearchConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            timeout: default_timeout(),
            max_results: default_max_results(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}
