use crate::vector_store::VectorStoreError;

#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("file too large: {0} bytes")]
    FileTooLarge(u64),

    #[error("invalid splitter config: {0}")]
    InvalidSplitter(String),

    #[error("embedding failed: {0}")]
    Embedding(#[from] medrag_llm::LlmError),

    #[error("storage error: {0}")]
    Storage(#[from] VectorStoreError),
}
