mod channel;

use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use medrag_core::analysis::{analyze_report, save_diagnosis};
use medrag_core::chat::{HELP_TEXT, run_chat};
use medrag_core::config::{Config, ProviderKind};
use medrag_core::vault::EnvVaultProvider;
use medrag_core::{LlmReportAnalyzer, RagSession};
use medrag_llm::any::AnyProvider;
use medrag_llm::ollama::OllamaProvider;
use medrag_llm::openai::OpenAiProvider;
use medrag_memory::{DocumentLoader, TextLoader};

use crate::channel::CliChannel;

#[derive(Debug, Parser)]
#[command(name = "medrag", version, about = "Chat with a medical report")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(
        long,
        global = true,
        env = "MEDRAG_CONFIG",
        default_value = "config/default.toml"
    )]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Index a report and ask questions about it
    Chat {
        /// Plain-text (UTF-8) medical report
        report: PathBuf,
        /// Start with the web search tool enabled
        #[arg(long)]
        web_search: bool,
    },
    /// Produce a diagnostic summary of a report
    Analyze {
        /// Plain-text (UTF-8) medical report
        report: PathBuf,
        /// Where to save the diagnosis (defaults to `analysis.output_file`)
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_subscriber();

    let mut config = Config::load(&cli.config)?;
    config.resolve_secrets(&EnvVaultProvider).await?;
    config.validate().context("invalid configuration")?;
    tracing::debug!(
        llm = %config.llm.provider,
        model = %config.llm.model,
        embedding = %config.embedding.provider,
        "configuration loaded"
    );

    match cli.command {
        Command::Chat { report, web_search } => chat(&config, &report, web_search).await,
        Command::Analyze { report, output } => analyze(&config, &report, output).await,
    }
}

fn init_subscriber() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

fn api_key(config: &Config) -> anyhow::Result<String> {
    config
        .secrets
        .llm_api_key
        .as_ref()
        .map(|s| s.expose().to_owned())
        .context("API key required: set MEDRAG_LLM_API_KEY or GROQ_API_KEY")
}

fn create_chat_provider(config: &Config) -> anyhow::Result<AnyProvider> {
    let llm = &config.llm;
    match llm.provider {
        ProviderKind::OpenAi => Ok(AnyProvider::OpenAi(
            OpenAiProvider::new(
                api_key(config)?,
                llm.base_url.clone(),
                llm.model.clone(),
                llm.max_tokens,
                None,
            )
            .with_temperature(llm.temperature),
        )),
        ProviderKind::Ollama => Ok(AnyProvider::Ollama(OllamaProvider::new(
            &llm.base_url,
            llm.model.clone(),
            config.embedding.model.clone(),
        ))),
    }
}

fn create_embedding_provider(config: &Config) -> anyhow::Result<AnyProvider> {
    let emb = &config.embedding;
    match emb.provider {
        ProviderKind::OpenAi => Ok(AnyProvider::OpenAi(OpenAiProvider::new(
            api_key(config)?,
            emb.base_url.clone(),
            emb.model.clone(),
            config.llm.max_tokens,
            Some(emb.model.clone()),
        ))),
        ProviderKind::Ollama => Ok(AnyProvider::Ollama(OllamaProvider::new(
            &emb.base_url,
            emb.model.clone(),
            emb.model.clone(),
        ))),
    }
}

async fn chat(config: &Config, report: &Path, web_search: bool) -> anyhow::Result<()> {
    let llm = create_chat_provider(config)?;
    let embedder = create_embedding_provider(config)?;
    let mut session = RagSession::new(llm, embedder, config);
    if web_search {
        session.update_tools(true);
    }

    println!("Processing report for chat...");
    match session.ingest_file(report).await {
        Ok(chunks) => println!("Report loaded: {} ({chunks} chunks)", report.display()),
        Err(e) => eprintln!("Failed to process report: {e}"),
    }
    println!("{HELP_TEXT}\n");

    let mut channel = CliChannel::stdio();
    run_chat(&mut session, &mut channel).await?;
    Ok(())
}

async fn analyze(config: &Config, report: &Path, output: Option<PathBuf>) -> anyhow::Result<()> {
    let document = TextLoader::default()
        .load(report)
        .await
        .with_context(|| format!("failed to read report {}", report.display()))?
        .into_iter()
        .next()
        .context("report produced no document")?;

    let analyzer = LlmReportAnalyzer::new(create_chat_provider(config)?);
    eprintln!("Analyzing the report...");
    let outcome = analyze_report(&analyzer, &document.content).await;
    let Some(diagnosis) = outcome.diagnosis() else {
        bail!("{outcome}");
    };

    println!("{diagnosis}");
    let path = output.unwrap_or_else(|| PathBuf::from(&config.analysis.output_file));
    save_diagnosis(&path, diagnosis)
        .await
        .with_context(|| format!("failed to save diagnosis to {}", path.display()))?;
    eprintln!("Diagnosis saved to {}", path.display());
    Ok(())
}
