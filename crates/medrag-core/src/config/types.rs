use serde::{Deserialize, Serialize};

pub use medrag_tools::WebSearchConfig;

use crate::vault::Secret;

/// Backend selector shared by the chat and embedding sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Any OpenAI-compatible chat/embeddings API (Groq, `OpenAI`, vLLM, ...).
    OpenAi,
    Ollama,
}

impl ProviderKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Ollama => "ollama",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_provider")]
    pub provider: ProviderKind,
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_llm_provider() -> ProviderKind {
    ProviderKind::OpenAi
}

fn default_llm_base_url() -> String {
    "https://api.groq.com/openai/v1".into()
}

fn default_llm_model() -> String {
    "openai/gpt-oss-120b".into()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    4096
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            base_url: default_llm_base_url(),
            model: default_llm_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_provider")]
    pub provider: ProviderKind,
    #[serde(default = "default_embedding_base_url")]
    pub base_url: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
}

fn default_embedding_provider() -> ProviderKind {
    ProviderKind::Ollama
}

fn default_embedding_base_url() -> String {
    "http://localhost:11434".into()
}

fn default_embedding_model() -> String {
    "all-minilm".into()
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            base_url: default_embedding_base_url(),
            model: default_embedding_model(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RagConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
    #[serde(default = "default_top_k")]
    pub top_k: u64,
}

fn default_chunk_size() -> usize {
    1000
}

fn default_chunk_overlap() -> usize {
    200
}

fn default_top_k() -> u64 {
    3
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            top_k: default_top_k(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AgentConfig {
    #[serde(default = "default_recursion_limit")]
    pub recursion_limit: usize,
    /// Replaces the built-in system prompt when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

fn default_recursion_limit() -> usize {
    crate::agent::DEFAULT_RECURSION_LIMIT
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            recursion_limit: default_recursion_limit(),
            system_prompt: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_output_file")]
    pub output_file: String,
}

fn default_output_file() -> String {
    crate::analysis::DEFAULT_DIAGNOSIS_FILE.into()
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            output_file: default_output_file(),
        }
    }
}

/// Secrets resolved at runtime; never read from or written to the TOML file.
#[derive(Debug, Default, Clone)]
pub struct ResolvedSecrets {
    pub llm_api_key: Option<Secret>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub rag: RagConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub web_search: WebSearchConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(skip)]
    pub secrets: ResolvedSecrets,
}
