//! Per-report chat state: the vector index, the tool set and the agent.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use medrag_llm::LlmProvider;
use medrag_llm::any::AnyProvider;
use medrag_llm::provider::Role;
use medrag_memory::{
    Document, DocumentError, DocumentLoader, InMemoryVectorStore, IngestionPipeline,
    SplitterConfig, TextLoader, TextSplitter, VectorStore,
};
use medrag_tools::{ReportRetriever, SharedEmbedFn, ToolSet, WebSearchConfig, WebSearchExecutor};

use crate::agent::ReactAgent;
use crate::config::{AgentConfig, Config, RagConfig};

/// Collection name of the per-session report index.
pub const REPORT_COLLECTION: &str = "medical_report";

pub const NOT_READY_MESSAGE: &str = "Please upload a medical report first.";

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("failed to process report: {0}")]
    Ingest(#[from] DocumentError),
}

/// Result of a chat query. Failures are values, never propagated errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryOutcome {
    Answer(String),
    /// No report has been ingested yet.
    NotReady,
    Failed(String),
}

impl QueryOutcome {
    #[must_use]
    pub fn is_answer(&self) -> bool {
        matches!(self, Self::Answer(_))
    }
}

impl fmt::Display for QueryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Answer(text) => f.write_str(text),
            Self::NotReady => f.write_str(NOT_READY_MESSAGE),
            Self::Failed(msg) => write!(f, "An error occurred: {msg}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

pub type SessionAgent = ReactAgent<AnyProvider, ToolSet>;

pub struct RagSession {
    llm: AnyProvider,
    embedder: AnyProvider,
    rag: RagConfig,
    agent_config: AgentConfig,
    web_search: WebSearchConfig,
    search_base_url: Option<String>,
    index: Option<Arc<InMemoryVectorStore>>,
    agent: Option<SessionAgent>,
    web_search_enabled: bool,
    history: Vec<ChatTurn>,
}

impl fmt::Debug for RagSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RagSession")
            .field("llm", &self.llm.name())
            .field("embedder", &self.embedder.name())
            .field("indexed", &self.index.is_some())
            .field("ready", &self.agent.is_some())
            .field("web_search_enabled", &self.web_search_enabled)
            .field("history_len", &self.history.len())
            .finish_non_exhaustive()
    }
}

impl RagSession {
    /// Empty session. `llm` answers questions, `embedder` vectorizes chunks and queries.
    #[must_use]
    pub fn new(llm: AnyProvider, embedder: AnyProvider, config: &Config) -> Self {
        Self {
            llm,
            embedder,
            rag: config.rag.clone(),
            agent_config: config.agent.clone(),
            web_search: config.web_search.clone(),
            search_base_url: None,
            index: None,
            agent: None,
            web_search_enabled: config.web_search.enabled,
            history: Vec::new(),
        }
    }

    /// Point the web-search tool at a different endpoint.
    #[must_use]
    pub fn with_search_base_url(mut self, url: impl Into<String>) -> Self {
        self.search_base_url = Some(url.into());
        self
    }

    /// Index raw report text. Returns the number of chunks stored.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Ingest`] if splitting, embedding or indexing
    /// fails; the previous index, agent and history are kept in that case.
    pub async fn ingest(&mut self, text: &str) -> Result<usize, SessionError> {
        self.ingest_document(Document::from_text(text, "upload")).await
    }

    /// Load a report file and index it.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Ingest`] if the file cannot be read or ingestion fails.
    pub async fn ingest_file(&mut self, path: &Path) -> Result<usize, SessionError> {
        let documents = TextLoader::default().load(path).await?;
        let document = documents
            .into_iter()
            .next()
            .unwrap_or_else(|| Document::from_text("", path.display().to_string()));
        self.ingest_document(document).await
    }

    /// Build a fresh index for `document` and swap it in once complete.
    ///
    /// # Errors
    ///
    /// See [`RagSession::ingest`].
    pub async fn ingest_document(&mut self, document: Document) -> Result<usize, SessionError> {
        let source = document.metadata.source.clone();
        let splitter = TextSplitter::new(SplitterConfig::with_sizes(
            self.rag.chunk_size,
            self.rag.chunk_overlap,
        ))?;
        let index = Arc::new(InMemoryVectorStore::new());
        let store: Arc<dyn VectorStore> = index.clone();
        let pipeline = IngestionPipeline::new(
            splitter,
            store,
            REPORT_COLLECTION,
            Box::new(self.embedder.embed_fn()),
        );

        let chunks = pipeline.ingest(document).await.inspect_err(|e| {
            tracing::error!(%source, "report ingestion failed: {e}");
        })?;
        tracing::info!(%source, chunks, "report indexed");

        self.index = Some(index);
        self.history.clear();
        self.setup_agent(self.web_search_enabled);
        Ok(chunks)
    }

    /// Rebuild the agent over the current index. No-op before the first ingest.
    pub fn setup_agent(&mut self, enable_web_search: bool) {
        let Some(index) = &self.index else {
            tracing::debug!("setup_agent skipped: no report indexed");
            return;
        };

        let store: Arc<dyn VectorStore> = index.clone();
        let embed_fn: SharedEmbedFn = Arc::new(self.embedder.embed_fn());
        let retriever = ReportRetriever::new(store, REPORT_COLLECTION, embed_fn, self.rag.top_k);

        let web_search = enable_web_search.then(|| {
            let executor = WebSearchExecutor::new(&self.web_search);
            match &self.search_base_url {
                Some(url) => executor.with_base_url(url.clone()),
                None => executor,
            }
        });

        let tools = ToolSet::new(retriever, web_search);
        tracing::debug!(tools = ?tools.names(), "agent rebuilt");

        let mut agent = ReactAgent::new(self.llm.clone(), tools)
            .with_recursion_limit(self.agent_config.recursion_limit);
        if let Some(prompt) = &self.agent_config.system_prompt {
            agent = agent.with_system_prompt(prompt.clone());
        }
        self.agent = Some(agent);
    }

    /// Record the web-search flag and rebuild the agent with it.
    pub fn update_tools(&mut self, enable_web_search: bool) {
        self.web_search_enabled = enable_web_search;
        self.setup_agent(enable_web_search);
    }

    /// Ask the agent a question about the current report.
    ///
    /// Both the question and the rendered outcome are appended to the history.
    pub async fn query(&mut self, question: &str) -> QueryOutcome {
        let outcome = match &self.agent {
            None => QueryOutcome::NotReady,
            Some(agent) => match agent.invoke(question).await {
                Ok(answer) => QueryOutcome::Answer(answer),
                Err(e) => {
                    tracing::error!("query failed: {e}");
                    QueryOutcome::Failed(e.to_string())
                }
            },
        };

        self.history.push(ChatTurn {
            role: Role::User,
            content: question.to_owned(),
        });
        self.history.push(ChatTurn {
            role: Role::Assistant,
            content: outcome.to_string(),
        });
        outcome
    }

    #[must_use]
    pub fn history(&self) -> &[ChatTurn] {
        &self.history
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.agent.is_some()
    }

    #[must_use]
    pub fn web_search_enabled(&self) -> bool {
        self.web_search_enabled
    }

    /// Names of the tools the current agent can call, retriever first.
    #[must_use]
    pub fn tool_names(&self) -> Vec<&'static str> {
        self.agent
            .as_ref()
            .map(|a| a.tools().names())
            .unwrap_or_default()
    }
}
