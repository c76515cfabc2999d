//! Report ingestion: loading, recursive chunking, embedding and vector search.

pub mod document;
pub mod in_memory_store;
pub mod vector_store;

pub use document::{
    Chunk, Document, DocumentError, DocumentLoader, DocumentMetadata, IngestionPipeline,
    SplitterConfig, TextLoader, TextSplitter,
};
pub use in_memory_store::InMemoryVectorStore;
pub use vector_store::{ScoredVectorPoint, VectorPoint, VectorStore, VectorStoreError};
