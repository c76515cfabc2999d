#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentMetadata {
    pub source: String,
    pub content_type: String,
}

impl DocumentMetadata {
    #[must_use]
    pub fn plain_text(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            content_type: "text/plain".to_owned(),
        }
    }
}

/// Raw report text held for the current session only.
#[derive(Debug, Clone)]
pub struct Document {
    pub content: String,
    pub metadata: DocumentMetadata,
}

impl Document {
    #[must_use]
    pub fn from_text(content: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            metadata: DocumentMetadata::plain_text(source),
        }
    }
}

/// A window of document text. Never mutated once produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub content: String,
    pub metadata: DocumentMetadata,
    pub chunk_index: usize,
}
