use std::path::Path;
use std::pin::Pin;

use super::super::{
    DEFAULT_MAX_FILE_SIZE, Document, DocumentError, DocumentLoader, DocumentMetadata,
};

/// Loads a UTF-8 report file as a single document.
pub struct TextLoader {
    pub max_file_size: u64,
}

impl Default for TextLoader {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

impl DocumentLoader for TextLoader {
    fn load(
        &self,
        path: &Path,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<Vec<Document>, DocumentError>> + Send + '_>>
    {
        let path = path.to_path_buf();
        let max_size = self.max_file_size;
        Box::pin(async move {
            let path = tokio::fs::canonicalize(&path).await?;

            let meta = tokio::fs::metadata(&path).await?;
            if meta.len() > max_size {
                return Err(DocumentError::FileTooLarge(meta.len()));
            }

            let content_type = match path.extension().and_then(|e| e.to_str()) {
                Some("md" | "markdown") => "text/markdown",
                _ => "text/plain",
            };

            let content = tokio::fs::read_to_string(&path).await?;
            tracing::debug!(path = %path.display(), bytes = content.len(), "report loaded");

            Ok(vec![Document {
                content,
                metadata: DocumentMetadata {
                    source: path.display().to_string(),
                    content_type: content_type.to_owned(),
                },
            }])
        })
    }

    fn supported_extensions(&self) -> &[&str] {
        &["txt", "md", "markdown"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn load_report_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("report.txt");
        std::fs::write(&file, "Patient has mild fever.").unwrap();

        let docs = TextLoader::default().load(&file).await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].content, "Patient has mild fever.");
        assert_eq!(docs[0].metadata.content_type, "text/plain");
    }

    #[tokio::test]
    async fn markdown_content_type() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("report.md");
        std::fs::write(&file, "# Findings").unwrap();

        let docs = TextLoader::default().load(&file).await.unwrap();
        assert_eq!(docs[0].metadata.content_type, "text/markdown");
    }

    #[tokio::test]
    async fn missing_file_is_io_error() {
        let result = TextLoader::default()
            .load(Path::new("/nonexistent/report.txt"))
            .await;
        assert!(matches!(result, Err(DocumentError::Io(_))));
    }

    #[tokio::test]
    async fn invalid_utf8_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("binary.txt");
        std::fs::write(&file, [0xff, 0xfe, 0x00, 0x80]).unwrap();

        let result = TextLoader::default().load(&file).await;
        assert!(matches!(result, Err(DocumentError::Io(_))));
    }

    #[tokio::test]
    async fn source_is_canonical_path() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("report.txt");
        std::fs::write(&file, "data").unwrap();

        let docs = TextLoader::default().load(&file).await.unwrap();
        let canonical = std::fs::canonicalize(&file).unwrap();
        assert_eq!(docs[0].metadata.source, canonical.display().to_string());
    }

    #[tokio::test]
    async fn file_too_large_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("big.txt");
        std::fs::write(&file, "xx").unwrap();

        let loader = TextLoader { max_file_size: 1 };
        let result = loader.load(&file).await;
        assert!(matches!(result, Err(DocumentError::FileTooLarge(2))));
    }

    #[test]
    fn supported_extensions_list() {
        let loader = TextLoader::default();
        let exts = loader.supported_extensions().to_vec();
        assert_eq!(exts, vec!["txt", "md", "markdown"]);
    }
}
