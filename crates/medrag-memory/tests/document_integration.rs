use std::sync::Arc;

use medrag_llm::any::AnyProvider;
use medrag_llm::mock::MockProvider;
use medrag_memory::document::{
    Document, IngestionPipeline, SplitterConfig, TextLoader, TextSplitter,
};
use medrag_memory::{InMemoryVectorStore, VectorStore};

const COLLECTION: &str = "report";

fn report() -> String {
    [
        "Chief complaint: persistent cough for two weeks.",
        "Vital signs: temperature 38.1 C, mild fever, pulse 88.",
        "Medications: none reported. Allergies: penicillin.",
        "Plan: chest x-ray and follow up with primary care.",
    ]
    .join("\n\n")
}

fn pipeline(store: Arc<InMemoryVectorStore>) -> (IngestionPipeline, AnyProvider) {
    let provider = AnyProvider::Mock(MockProvider::default());
    let splitter = TextSplitter::new(SplitterConfig::with_sizes(60, 10)).unwrap();
    let pipeline = IngestionPipeline::new(
        splitter,
        store,
        COLLECTION,
        Box::new(provider.embed_fn()),
    );
    (pipeline, provider)
}

#[tokio::test]
async fn query_retrieves_matching_paragraph() {
    let store = Arc::new(InMemoryVectorStore::new());
    let (pipeline, provider) = pipeline(Arc::clone(&store));

    let count = pipeline
        .ingest(Document::from_text(report(), "report.txt"))
        .await
        .unwrap();
    assert_eq!(count, 4);

    let query = medrag_llm::LlmProvider::embed(&provider, "fever temperature")
        .await
        .unwrap();
    let hits = store.search(COLLECTION, query, 3).await.unwrap();
    assert_eq!(hits.len(), 3);
    assert!(hits[0].content().unwrap().contains("fever"));
}

#[tokio::test]
async fn load_from_disk_and_ingest() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.txt");
    std::fs::write(&path, report()).unwrap();

    let store = Arc::new(InMemoryVectorStore::new());
    let (pipeline, _) = pipeline(Arc::clone(&store));
    let count = pipeline
        .load_and_ingest(&TextLoader::default(), &path)
        .await
        .unwrap();

    assert_eq!(count, 4);
    assert_eq!(store.count(COLLECTION).await.unwrap(), 4);
}

#[tokio::test]
async fn separate_stores_do_not_share_chunks() {
    let first = Arc::new(InMemoryVectorStore::new());
    let second = Arc::new(InMemoryVectorStore::new());

    pipeline(Arc::clone(&first))
        .0
        .ingest(Document::from_text(report(), "a.txt"))
        .await
        .unwrap();
    pipeline(Arc::clone(&second))
        .0
        .ingest(Document::from_text("Unrelated discharge note.", "b.txt"))
        .await
        .unwrap();

    assert_eq!(first.count(COLLECTION).await.unwrap(), 4);
    assert_eq!(second.count(COLLECTION).await.unwrap(), 1);
}
