//! One-shot diagnostic analysis of a whole report.

use std::fmt;
use std::path::Path;

use medrag_llm::LlmProvider;
use medrag_llm::provider::{Message, Role};

pub const DEFAULT_DIAGNOSIS_FILE: &str = "diagnosis_result.txt";

pub const ANALYSIS_SYSTEM_PROMPT: &str = "\
You are an experienced physician reviewing a patient's medical report.
Read the whole report, note the relevant findings and combine them into a final assessment.
Respond in markdown with these sections:
## Summary
## Possible Health Issues
List up to three likely issues, each with a short reason grounded in the report.
## Recommended Next Steps
State clearly that this analysis does not replace a consultation with a physician.";

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Llm(#[from] medrag_llm::LlmError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Produces a diagnosis for a full report. `Ok(None)` means the analyzer ran
/// but had nothing to say.
pub trait ReportAnalyzer: Send + Sync {
    /// # Errors
    ///
    /// Returns an error if the underlying model or pipeline fails.
    fn process_medical_report(
        &self,
        report_text: &str,
    ) -> impl Future<Output = Result<Option<String>, AnalysisError>> + Send;
}

/// Analyzer backed by a single chat call.
#[derive(Debug, Clone)]
pub struct LlmReportAnalyzer<P> {
    provider: P,
    system_prompt: String,
}

impl<P: LlmProvider> LlmReportAnalyzer<P> {
    #[must_use]
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            system_prompt: ANALYSIS_SYSTEM_PROMPT.to_owned(),
        }
    }

    #[must_use]
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }
}

impl<P: LlmProvider> ReportAnalyzer for LlmReportAnalyzer<P> {
    async fn process_medical_report(
        &self,
        report_text: &str,
    ) -> Result<Option<String>, AnalysisError> {
        let messages = [
            Message::from_legacy(Role::System, self.system_prompt.as_str()),
            Message::from_legacy(Role::User, format!("Medical report:\n\n{report_text}")),
        ];
        let response = self.provider.chat(&messages).await?;
        let trimmed = response.trim();
        if trimmed.is_empty() {
            tracing::warn!(provider = self.provider.name(), "analysis returned an empty response");
            return Ok(None);
        }
        Ok(Some(trimmed.to_owned()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisOutcome {
    Completed(String),
    NoResult,
    Failed(String),
}

impl AnalysisOutcome {
    #[must_use]
    pub fn diagnosis(&self) -> Option<&str> {
        match self {
            Self::Completed(d) => Some(d),
            Self::NoResult | Self::Failed(_) => None,
        }
    }
}

impl fmt::Display for AnalysisOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed(d) => f.write_str(d),
            Self::NoResult => {
                f.write_str("Analysis failed to generate a result. Please check the logs.")
            }
            Self::Failed(msg) => write!(f, "An error occurred during analysis: {msg}"),
        }
    }
}

/// Run `analyzer` and fold every result into an [`AnalysisOutcome`].
pub async fn analyze_report<A: ReportAnalyzer>(analyzer: &A, report_text: &str) -> AnalysisOutcome {
    match analyzer.process_medical_report(report_text).await {
        Ok(Some(diagnosis)) => {
            tracing::info!(chars = diagnosis.chars().count(), "analysis complete");
            AnalysisOutcome::Completed(diagnosis)
        }
        Ok(None) => AnalysisOutcome::NoResult,
        Err(e) => {
            tracing::error!("analysis failed: {e}");
            AnalysisOutcome::Failed(e.to_string())
        }
    }
}

/// Write the diagnosis as plain UTF-8 text.
///
/// # Errors
///
/// Returns [`AnalysisError::Io`] if the file cannot be written.
pub async fn save_diagnosis(path: &Path, diagnosis: &str) -> Result<(), AnalysisError> {
    tokio::fs::write(path, diagnosis).await?;
    tracing::info!(path = %path.display(), "diagnosis saved");
    Ok(())
}
