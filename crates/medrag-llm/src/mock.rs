//! Test-only mock LLM provider.
//!
//! Chat replies are scripted; embeddings are a deterministic hashed
//! bag-of-words, so texts sharing words land close together.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::LlmError;
use crate::provider::{ChatResponse, LlmProvider, Message, ToolDefinition};

pub const MOCK_EMBEDDING_DIM: usize = 64;

#[derive(Debug, Clone)]
enum Failure {
    Message(String),
    Timeout(u64),
}

#[derive(Debug, Clone)]
pub struct MockProvider {
    responses: Arc<Mutex<VecDeque<ChatResponse>>>,
    requests: Arc<Mutex<Vec<Vec<Message>>>>,
    pub default_response: String,
    pub fail_embed: bool,
    failure: Option<Failure>,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
            default_response: "mock response".into(),
            fail_embed: false,
            failure: None,
        }
    }
}

impl MockProvider {
    #[must_use]
    pub fn with_responses(responses: Vec<String>) -> Self {
        Self::with_script(responses.into_iter().map(ChatResponse::Text).collect())
    }

    /// Replies are handed out in order; once exhausted, `default_response` is used.
    #[must_use]
    pub fn with_script(script: Vec<ChatResponse>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(script.into())),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn failing_with(message: impl Into<String>) -> Self {
        Self {
            failure: Some(Failure::Message(message.into())),
            ..Self::default()
        }
    }

    /// Every chat call fails with [`LlmError::Timeout`].
    #[must_use]
    pub fn timing_out(secs: u64) -> Self {
        Self {
            failure: Some(Failure::Timeout(secs)),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_failing_embed(mut self) -> Self {
        self.fail_embed = true;
        self
    }

    /// Queue more scripted replies.
    pub fn push_responses(&self, script: impl IntoIterator<Item = ChatResponse>) {
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(script);
    }

    /// Message lists received by chat calls so far, oldest first.
    #[must_use]
    pub fn requests(&self) -> Vec<Vec<Message>> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn next_response(&self, messages: &[Message]) -> Result<ChatResponse, LlmError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(messages.to_vec());
        match &self.failure {
            Some(Failure::Message(msg)) => return Err(LlmError::Other(msg.clone())),
            Some(Failure::Timeout(secs)) => return Err(LlmError::Timeout { secs: *secs }),
            None => {}
        }
        let next = self
            .responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        Ok(next.unwrap_or_else(|| ChatResponse::Text(self.default_response.clone())))
    }
}

impl LlmProvider for MockProvider {
    async fn chat(&self, messages: &[Message]) -> Result<String, LlmError> {
        match self.next_response(messages).await? {
            ChatResponse::Text(text) => Ok(text),
            ChatResponse::ToolUse { text, .. } => Ok(text.unwrap_or_default()),
        }
    }

    async fn chat_with_tools(
        &self,
        messages: &[Message],
        _tools: &[ToolDefinition],
    ) -> Result<ChatResponse, LlmError> {
        self.next_response(messages).await
    }

    fn supports_tool_use(&self) -> bool {
        true
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        if self.fail_embed {
            return Err(LlmError::EmbedUnsupported {
                provider: "mock".into(),
            });
        }
        Ok(bag_of_words(text))
    }

    fn supports_embeddings(&self) -> bool {
        !self.fail_embed
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "mock"
    }
}

fn bag_of_words(text: &str) -> Vec<f32> {
    let mut v = vec![0.0_f32; MOCK_EMBEDDING_DIM];
    for word in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        let lower = word.to_lowercase();
        // FNV-1a
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for b in lower.bytes() {
            hash ^= u64::from(b);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        #[allow(clippy::cast_possible_truncation)]
        let bucket = (hash % MOCK_EMBEDDING_DIM as u64) as usize;
        v[bucket] += 1.0;
    }
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in &mut v {
            *x /= norm;
        }
    }
    v
}
