use ollama_rs::Ollama;
use ollama_rs::generation::chat::ChatMessage;
use ollama_rs::generation::chat::request::ChatMessageRequest;
use ollama_rs::generation::embeddings::request::{EmbeddingsInput, GenerateEmbeddingsRequest};

use crate::error::LlmError;
use crate::provider::{LlmProvider, Message, Role};

const DEFAULT_PORT: u16 = 11434;

/// Local Ollama backend. Used mostly for embeddings; chat works without
/// native tool calling.
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    client: Ollama,
    model: String,
    embedding_model: String,
}

impl OllamaProvider {
    #[must_use]
    pub fn new(base_url: &str, model: String, embedding_model: String) -> Self {
        let (host, port) = parse_host_port(base_url);
        Self {
            client: Ollama::new(host, port),
            model,
            embedding_model,
        }
    }

    #[must_use]
    pub fn embedding_model(&self) -> &str {
        &self.embedding_model
    }

    /// Check if Ollama is reachable.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection to Ollama fails.
    pub async fn health_check(&self) -> Result<(), LlmError> {
        self.client
            .list_local_models()
            .await
            .map_err(|e| LlmError::Other(format!("failed to connect to Ollama, is it running? {e}")))?;
        Ok(())
    }
}

impl LlmProvider for OllamaProvider {
    async fn chat(&self, messages: &[Message]) -> Result<String, LlmError> {
        let ollama_messages: Vec<ChatMessage> = messages.iter().map(convert_message).collect();
        let request = ChatMessageRequest::new(self.model.clone(), ollama_messages);

        let response = self
            .client
            .send_chat_messages(request)
            .await
            .map_err(|e| LlmError::Other(format!("Ollama chat request failed: {e}")))?;

        Ok(response.message.content)
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        let request = GenerateEmbeddingsRequest::new(
            self.embedding_model.clone(),
            EmbeddingsInput::from(text),
        );

        let response = self
            .client
            .generate_embeddings(request)
            .await
            .map_err(|e| LlmError::Other(format!("Ollama embedding request failed: {e}")))?;

        response
            .embeddings
            .into_iter()
            .next()
            .ok_or(LlmError::EmptyResponse {
                provider: "ollama".into(),
            })
    }

    fn supports_embeddings(&self) -> bool {
        true
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "ollama"
    }
}

fn convert_message(msg: &Message) -> ChatMessage {
    let text = msg.to_llm_content().to_owned();
    match msg.role {
        Role::System => ChatMessage::system(text),
        Role::Assistant => ChatMessage::assistant(text),
        Role::User => ChatMessage::user(text),
    }
}

fn parse_host_port(url: &str) -> (String, u16) {
    let url = url.trim_end_matches('/');
    if let Some(colon_pos) = url.rfind(':')
        && let Ok(port) = url[colon_pos + 1..].parse::<u16>()
    {
        return (url[..colon_pos].to_owned(), port);
    }
    (url.to_owned(), DEFAULT_PORT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MessagePart;

    #[test]
    fn parse_host_port_with_port() {
        let (host, port) = parse_host_port("http://localhost:11434");
        assert_eq!(host, "http://localhost");
        assert_eq!(port, 11434);
    }

    #[test]
    fn parse_host_port_without_port_uses_default() {
        let (host, port) = parse_host_port("http://localhost");
        assert_eq!(host, "http://localhost");
        assert_eq!(port, DEFAULT_PORT);
    }

    #[test]
    fn parse_host_port_trailing_slashes() {
        let (host, port) = parse_host_port("http://10.0.0.5:8080///");
        assert_eq!(host, "http://10.0.0.5");
        assert_eq!(port, 8080);
    }

    #[test]
    fn parse_host_port_overflow_falls_back() {
        let (host, port) = parse_host_port("http://localhost:99999");
        assert_eq!(host, "http://localhost:99999");
        assert_eq!(port, DEFAULT_PORT);
    }

    #[test]
    fn convert_message_keeps_content_per_role() {
        for role in [Role::System, Role::User, Role::Assistant] {
            let cm = convert_message(&Message::from_legacy(role, "line one\nline two"));
            assert_eq!(cm.content, "line one\nline two");
        }
    }

    #[test]
    fn convert_message_flattens_tool_parts() {
        let msg = Message::from_parts(
            Role::User,
            vec![MessagePart::ToolResult {
                tool_use_id: "c1".into(),
                content: "excerpt".into(),
                is_error: false,
            }],
        );
        let cm = convert_message(&msg);
        assert!(cm.content.contains("[tool_result]"));
        assert!(cm.content.contains("excerpt"));
    }

    #[test]
    fn capabilities() {
        let provider = OllamaProvider::new("http://localhost:11434", "llama3".into(), "all-minilm".into());
        assert!(provider.supports_embeddings());
        assert!(!provider.supports_tool_use());
        assert_eq!(provider.name(), "ollama");
        assert_eq!(provider.embedding_model(), "all-minilm");
    }

    #[tokio::test]
    async fn embed_with_unreachable_endpoint_errors() {
        let provider = OllamaProvider::new("http://127.0.0.1:1", "m".into(), "e".into());
        assert!(provider.embed("fever").await.is_err());
    }

    #[tokio::test]
    async fn health_check_unreachable_errors() {
        let provider = OllamaProvider::new("http://127.0.0.1:1", "m".into(), "e".into());
        let err = provider.health_check().await.unwrap_err();
        assert!(err.to_string().contains("failed to connect to Ollama"));
    }

    proptest::proptest! {
        #[test]
        fn parse_host_port_never_panics(url in ".{0,64}") {
            let (host, _) = parse_host_port(&url);
            proptest::prop_assert!(host.len() <= url.len());
        }
    }
}
