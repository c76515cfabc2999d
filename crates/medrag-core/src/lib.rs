//! Agent loop, RAG session, report analysis and configuration for medrag.

pub mod agent;
pub mod analysis;
pub mod channel;
pub mod chat;
pub mod config;
pub mod session;
pub mod vault;

pub use agent::{AgentError, ReactAgent};
pub use analysis::{AnalysisOutcome, LlmReportAnalyzer, ReportAnalyzer};
pub use channel::Channel;
pub use config::Config;
pub use session::{QueryOutcome, RagSession, SessionError};
