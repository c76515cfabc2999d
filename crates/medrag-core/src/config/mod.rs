mod env;
mod types;


pub use types::*;

use std::path::Path;

use anyhow::{Context, bail};

use crate::vault::{Secret, VaultProvider};

/// Checked in order; the first non-empty value wins.
pub const LLM_API_KEY_VARS: [&str; 2] = ["MEDRAG_LLM_API_KEY", "GROQ_API_KEY"];

impl Config {
    /// Load configuration from a TOML file with env var overrides.
    ///
    /// Falls back to sensible defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str::<Self>(&content).context("failed to parse config file")?
        } else {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Resolve the chat backend API key through the vault.
    ///
    /// # Errors
    ///
    /// Returns an error if the vault backend fails.
    pub async fn resolve_secrets(&mut self, vault: &dyn VaultProvider) -> anyhow::Result<()> {
        for key in LLM_API_KEY_VARS {
            if let Some(val) = vault.get_secret(key).await? {
                tracing::debug!(source = key, "resolved LLM API key");
                self.secrets.llm_api_key = Some(Secret::new(val));
                break;
            }
        }
        Ok(())
    }

    /// Reject values the rest of the system cannot work with.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first offending setting.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.rag.chunk_size == 0 {
            bail!("rag.chunk_size must be greater than 0");
        }
        if self.rag.chunk_overlap >= self.rag.chunk_size {
            bail!(
                "rag.chunk_overlap ({}) must be smaller than rag.chunk_size ({})",
                self.rag.chunk_overlap,
                self.rag.chunk_size
            );
        }
        if self.rag.top_k == 0 {
            bail!("rag.top_k must be greater than 0");
        }
        if self.agent.recursion_limit == 0 {
            bail!("agent.recursion_limit must be greater than 0");
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            bail!(
                "llm.temperature must be within 0.0..=2.0, got {}",
                self.llm.temperature
            );
        }
        if self.llm.max_tokens == 0 {
            bail!("llm.max_tokens must be greater than 0");
        }
        if self.llm.model.trim().is_empty() {
            bail!("llm.model must not be empty");
        }
        if self.embedding.model.trim().is_empty() {
            bail!("embedding.model must not be empty");
        }
        if self.web_search.timeout == 0 {
            bail!("web_search.timeout must be greater than 0");
        }
        if self.web_search.max_results == 0 {
            bail!("web_search.max_results must be greater than 0");
        }
        if self.analysis.output_file.trim().is_empty() {
            bail!("analysis.output_file must not be empty");
        }
        Ok(())
    }
}
