use super::{Config, ProviderKind};

fn parse_provider(var: &str, value: &str) -> Option<ProviderKind> {
    if let Ok(kind) = serde_json::from_value(serde_json::Value::String(value.to_owned())) {
        Some(kind)
    } else {
        tracing::warn!("ignoring invalid {var} value: {value}");
        None
    }
}

impl Config {
    pub(crate) fn apply_env_overrides(&mut self) {
        self.apply_env_overrides_models();
        self.apply_env_overrides_rag();
    }

    fn apply_env_overrides_models(&mut self) {
        if let Ok(v) = std::env::var("MEDRAG_LLM_PROVIDER")
            && let Some(kind) = parse_provider("MEDRAG_LLM_PROVIDER", &v)
        {
            self.llm.provider = kind;
        }
        if let Ok(v) = std::env::var("MEDRAG_LLM_BASE_URL") {
            self.llm.base_url = v;
        }
        if let Ok(v) = std::env::var("MEDRAG_LLM_MODEL") {
            self.llm.model = v;
        }
        if let Ok(v) = std::env::var("MEDRAG_EMBEDDING_PROVIDER")
            && let Some(kind) = parse_provider("MEDRAG_EMBEDDING_PROVIDER", &v)
        {
            self.embedding.provider = kind;
        }
        if let Ok(v) = std::env::var("MEDRAG_EMBEDDING_BASE_URL") {
            self.embedding.base_url = v;
        }
        if let Ok(v) = std::env::var("MEDRAG_EMBEDDING_MODEL") {
            self.embedding.model = v;
        }
    }

    fn apply_env_overrides_rag(&mut self) {
        if let Ok(v) = std::env::var("MEDRAG_RAG_CHUNK_SIZE")
            && let Ok(size) = v.parse::<usize>()
        {
            self.rag.chunk_size = size;
        }
        if let Ok(v) = std::env::var("MEDRAG_RAG_CHUNK_OVERLAP")
            && let Ok(overlap) = v.parse::<usize>()
        {
            self.rag.chunk_overlap = overlap;
        }
        if let Ok(v) = std::env::var("MEDRAG_RAG_TOP_K")
            && let Ok(k) = v.parse::<u64>()
        {
            self.rag.top_k = k;
        }
        if let Ok(v) = std::env::var("MEDRAG_AGENT_RECURSION_LIMIT")
            && let Ok(limit) = v.parse::<usize>()
        {
            self.agent.recursion_limit = limit;
        }
        if let Ok(v) = std::env::var("MEDRAG_WEB_SEARCH_ENABLED")
            && let Ok(enabled) = v.parse::<bool>()
        {
            self.web_search.enabled = enabled;
        }
        if let Ok(v) = std::env::var("MEDRAG_WEB_SEARCH_TIMEOUT")
            && let Ok(secs) = v.parse::<u64>()
        {
            self.web_search.timeout = secs;
        }
    }
}
