#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error(transparent)]
    Llm(#[from] medrag_llm::LlmError),

    #[error("recursion limit of {limit} steps reached without a final answer")]
    RecursionLimit { limit: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recursion_limit_display() {
        let err = AgentError::RecursionLimit { limit: 50 };
        assert_eq!(
            err.to_string(),
            "recursion limit of 50 steps reached without a final answer"
        );
    }

    #[test]
    fn llm_error_is_transparent() {
        let err = AgentError::from(medrag_llm::LlmError::Timeout { secs: 60 });
        assert_eq!(err.to_string(), "request timed out after 60s");
    }
}
