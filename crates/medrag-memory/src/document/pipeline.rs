use std::collections::HashMap;
use std::sync::Arc;

use medrag_llm::provider::EmbedFuture;
use serde_json::json;
use uuid::Uuid;

use super::{Document, DocumentError, DocumentLoader, TextSplitter};
use crate::vector_store::{VectorPoint, VectorStore};

pub type EmbedFn = Box<dyn Fn(&str) -> EmbedFuture + Send + Sync>;

pub struct IngestionPipeline {
    splitter: TextSplitter,
    store: Arc<dyn VectorStore>,
    collection: String,
    embed_fn: EmbedFn,
}

impl IngestionPipeline {
    pub fn new(
        splitter: TextSplitter,
        store: Arc<dyn VectorStore>,
        collection: impl Into<String>,
        embed_fn: EmbedFn,
    ) -> Self {
        Self {
            splitter,
            store,
            collection: collection.into(),
            embed_fn,
        }
    }

    /// Ingest a document: split -> embed -> store. Returns chunk count.
    ///
    /// All chunks are embedded before anything is written, so a failed
    /// embedding leaves the store untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if embedding or storage fails.
    pub async fn ingest(&self, document: Document) -> Result<usize, DocumentError> {
        let chunks = self.splitter.split(&document);
        if chunks.is_empty() {
            tracing::debug!(source = %document.metadata.source, "document produced no chunks");
            return Ok(0);
        }

        let mut points = Vec::with_capacity(chunks.len());
        for chunk in &chunks {
            let vector = (self.embed_fn)(&chunk.content).await?;
            let payload: HashMap<String, serde_json::Value> = HashMap::from([
                ("source".to_owned(), json!(chunk.metadata.source)),
                ("content_type".to_owned(), json!(chunk.metadata.content_type)),
                ("chunk_index".to_owned(), json!(chunk.chunk_index)),
                ("content".to_owned(), json!(chunk.content)),
            ]);
            points.push(VectorPoint {
                id: Uuid::new_v4().to_string(),
                vector,
                payload,
            });
        }

        let vector_size = points[0].vector.len() as u64;
        self.store
            .ensure_collection(&self.collection, vector_size)
            .await?;

        let count = points.len();
        self.store.upsert(&self.collection, points).await?;
        tracing::info!(
            source = %document.metadata.source,
            chunks = count,
            collection = %self.collection,
            "document ingested"
        );

        Ok(count)
    }

    /// # Errors
    ///
    /// Returns an error if loading, embedding, or storage fails.
    pub async fn load_and_ingest(
        &self,
        loader: &(dyn DocumentLoader + '_),
        path: &std::path::Path,
    ) -> Result<usize, DocumentError> {
        let documents = loader.load(path).await?;
        let mut total = 0;
        for doc in documents {
            total += self.ingest(doc).await?;
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryVectorStore;
    use crate::document::splitter::SplitterConfig;

    fn fixed_embed() -> EmbedFn {
        Box::new(|_text: &str| Box::pin(async move { Ok(vec![0.5f32; 4]) }))
    }

    fn error_embed() -> EmbedFn {
        Box::new(|_text: &str| {
            Box::pin(async move { Err(medrag_llm::LlmError::Other("mock embed error".into())) })
        })
    }

    fn pipeline(store: Arc<InMemoryVectorStore>, embed: EmbedFn) -> IngestionPipeline {
        let splitter = TextSplitter::new(SplitterConfig::with_sizes(40, 10)).unwrap();
        IngestionPipeline::new(splitter, store, "report", embed)
    }

    #[tokio::test]
    async fn empty_document_returns_zero_and_leaves_store_untouched() {
        let store = Arc::new(InMemoryVectorStore::new());
        let p = pipeline(Arc::clone(&store), fixed_embed());

        let count = p.ingest(Document::from_text("", "empty.txt")).await.unwrap();
        assert_eq!(count, 0);
        assert_eq!(store.count("report").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn ingest_stores_every_chunk_with_payload() {
        let store = Arc::new(InMemoryVectorStore::new());
        let p = pipeline(Arc::clone(&store), fixed_embed());

        let text = "Patient has mild fever. No other symptoms noted. Follow up in a week.";
        let count = p.ingest(Document::from_text(text, "r.txt")).await.unwrap();
        assert!(count > 1);
        assert_eq!(store.count("report").await.unwrap(), count as u64);

        let hits = store.search("report", vec![0.5; 4], 10).await.unwrap();
        assert_eq!(hits[0].chunk_index(), Some(0));
        assert_eq!(hits[0].payload["source"], "r.txt");
        assert!(hits[0].content().unwrap().contains("fever"));
    }

    #[tokio::test]
    async fn embedding_error_propagates_without_writes() {
        let store = Arc::new(InMemoryVectorStore::new());
        let p = pipeline(Arc::clone(&store), error_embed());

        let result = p
            .ingest(Document::from_text("hello world, some report text", "r.txt"))
            .await;
        assert!(matches!(result, Err(DocumentError::Embedding(_))));
        assert_eq!(store.count("report").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn load_and_ingest_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("report.txt");
        std::fs::write(&file, "Blood pressure normal.").unwrap();

        let store = Arc::new(InMemoryVectorStore::new());
        let p = pipeline(Arc::clone(&store), fixed_embed());
        let count = p
            .load_and_ingest(&crate::TextLoader::default(), &file)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }
}
