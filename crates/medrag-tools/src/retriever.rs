use std::sync::Arc;

use medrag_llm::provider::EmbedFuture;
use medrag_memory::VectorStore;
use schemars::JsonSchema;
use serde::Deserialize;

use crate::executor::{ToolCall, ToolError, ToolExecutor, ToolOutput, deserialize_params};
use crate::registry::ToolDef;

pub const RETRIEVER_TOOL_NAME: &str = "medical_report_retriever";
pub const RETRIEVER_DESCRIPTION: &str =
    "Searches and returns excerpts from the uploaded medical report.";
pub const NO_EXCERPTS: &str = "No relevant excerpts found.";

pub type SharedEmbedFn = Arc<dyn Fn(&str) -> EmbedFuture + Send + Sync>;

#[derive(Debug, Deserialize, JsonSchema)]
pub(crate) struct RetrieverParams {
    /// What to look up in the report
    pub query: String,
}

/// Vector-index lookup over the chunks of the current report.
#[derive(Clone)]
pub struct ReportRetriever {
    store: Arc<dyn VectorStore>,
    collection: String,
    embed_fn: SharedEmbedFn,
    top_k: u64,
}

impl std::fmt::Debug for ReportRetriever {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportRetriever")
            .field("collection", &self.collection)
            .field("top_k", &self.top_k)
            .finish_non_exhaustive()
    }
}

impl ReportRetriever {
    #[must_use]
    pub fn new(
        store: Arc<dyn VectorStore>,
        collection: impl Into<String>,
        embed_fn: SharedEmbedFn,
        top_k: u64,
    ) -> Self {
        Self {
            store,
            collection: collection.into(),
            embed_fn,
            top_k,
        }
    }

    #[must_use]
    pub fn top_k(&self) -> u64 {
        self.top_k
    }

    #[must_use]
    pub fn definition() -> ToolDef {
        ToolDef {
            id: RETRIEVER_TOOL_NAME,
            description: RETRIEVER_DESCRIPTION,
            schema: schemars::schema_for!(RetrieverParams),
        }
    }

    /// Top-k excerpts for `query`, joined by blank lines.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::Retrieval`] if embedding or the index lookup fails.
    pub async fn retrieve(&self, query: &str) -> Result<String, ToolError> {
        let count = self
            .store
            .count(&self.collection)
            .await
            .map_err(|e| ToolError::Retrieval(e.to_string()))?;
        if count == 0 {
            return Ok(NO_EXCERPTS.to_owned());
        }

        let vector = (self.embed_fn)(query)
            .await
            .map_err(|e| ToolError::Retrieval(e.to_string()))?;
        let hits = self
            .store
            .search(&self.collection, vector, self.top_k)
            .await
            .map_err(|e| ToolError::Retrieval(e.to_string()))?;

        let excerpts: Vec<&str> = hits.iter().filter_map(|h| h.content()).collect();
        tracing::debug!(query, hits = excerpts.len(), "report retrieval");
        if excerpts.is_empty() {
            return Ok(NO_EXCERPTS.to_owned());
        }
        Ok(excerpts.join("\n\n"))
    }
}

impl ToolExecutor for ReportRetriever {
    fn tool_definitions(&self) -> Vec<ToolDef> {
        vec![Self::definition()]
    }

    async fn execute_tool_call(&self, call: &ToolCall) -> Result<Option<ToolOutput>, ToolError> {
        if call.tool_id != RETRIEVER_TOOL_NAME {
            return Ok(None);
        }
        let params: RetrieverParams = deserialize_params(&call.params)?;
        let summary = self.retrieve(&params.query).await?;
        Ok(Some(ToolOutput {
            tool_name: RETRIEVER_TOOL_NAME.to_owned(),
            summary,
        }))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use medrag_llm::LlmProvider;
    use medrag_llm::mock::MockProvider;
    use medrag_memory::{InMemoryVectorStore, VectorPoint};

    use super::*;

    fn mock_embed() -> SharedEmbedFn {
        let provider = Arc::new(MockProvider::default());
        Arc::new(move |text: &str| -> EmbedFuture {
            let p = Arc::clone(&provider);
            let owned = text.to_owned();
            Box::pin(async move { p.embed(&owned).await })
        })
    }

    async fn indexed_store(chunks: &[&str]) -> Arc<InMemoryVectorStore> {
        let provider = MockProvider::default();
        let store = Arc::new(InMemoryVectorStore::new());
        store
            .ensure_collection("report", medrag_llm::mock::MOCK_EMBEDDING_DIM as u64)
            .await
            .unwrap();
        let mut points = Vec::new();
        for (i, chunk) in chunks.iter().enumerate() {
            points.push(VectorPoint {
                id: format!("p{i}"),
                vector: provider.embed(chunk).await.unwrap(),
                payload: HashMap::from([
                    ("content".to_owned(), serde_json::json!(chunk)),
                    ("chunk_index".to_owned(), serde_json::json!(i)),
                ]),
            });
        }
        store.upsert("report", points).await.unwrap();
        store
    }

    #[tokio::test]
    async fn returns_top_k_joined_by_blank_lines() {
        let store = indexed_store(&[
            "Patient has mild fever.",
            "Blood pressure 120/80.",
            "No known allergies.",
            "Follow up in two weeks.",
        ])
        .await;
        let retriever = ReportRetriever::new(store, "report", mock_embed(), 3);

        let out = retriever.retrieve("mild fever").await.unwrap();
        let parts: Vec<_> = out.split("\n\n").collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "Patient has mild fever.");
    }

    #[tokio::test]
    async fn empty_index_reports_no_excerpts() {
        let store: Arc<dyn VectorStore> = Arc::new(InMemoryVectorStore::new());
        let retriever = ReportRetriever::new(store, "report", mock_embed(), 3);
        assert_eq!(retriever.retrieve("fever").await.unwrap(), NO_EXCERPTS);
    }

    #[tokio::test]
    async fn tool_call_routes_by_name() {
        let store = indexed_store(&["Patient has mild fever."]).await;
        let retriever = ReportRetriever::new(store, "report", mock_embed(), 3);

        let call = ToolCall::from_input(RETRIEVER_TOOL_NAME, &serde_json::json!({"query": "fever"}));
        let out = retriever.execute_tool_call(&call).await.unwrap().unwrap();
        assert_eq!(out.summary, "Patient has mild fever.");

        let other = ToolCall::from_input("duckduckgo_search", &serde_json::json!({"query": "x"}));
        assert!(retriever.execute_tool_call(&other).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn missing_query_is_invalid_params() {
        let store = indexed_store(&["x"]).await;
        let retriever = ReportRetriever::new(store, "report", mock_embed(), 3);
        let call = ToolCall::from_input(RETRIEVER_TOOL_NAME, &serde_json::json!({}));
        let err = retriever.execute_tool_call(&call).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidParams { .. }));
    }

    #[tokio::test]
    async fn embed_failure_is_retrieval_error() {
        let store = indexed_store(&["x"]).await;
        let failing: SharedEmbedFn = Arc::new(|_text: &str| -> EmbedFuture {
            Box::pin(async { Err(medrag_llm::LlmError::Other("embedder offline".into())) })
        });
        let retriever = ReportRetriever::new(store, "report", failing, 3);
        let err = retriever.retrieve("fever").await.unwrap_err();
        assert_eq!(err.to_string(), "retrieval failed: embedder offline");
    }

    #[test]
    fn definition_schema_requires_query() {
        let def = ReportRetriever::definition().to_definition();
        assert_eq!(def.name, "medical_report_retriever");
        assert_eq!(
            def.description,
            "Searches and returns excerpts from the uploaded medical report."
        );
        assert!(
            def.parameters["required"]
                .as_array()
                .unwrap()
                .iter()
                .any(|v| v == "query")
        );
    }
}
