use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use scholar_flow::config::PipelineSettings;
use scholar_flow::engine::Orchestrator;
use scholar_flow::ops::telemetry;
use scholar_flow::persistence::{connect_store, PdfUpload, PdfUploader, ReferenceStore};
use scholar_flow::refinery::{DisciplineModel, DocumentType};

#[derive(Parser)]
#[command(
    name = "scholar-flow",
    about = "Extract and classify scholarly references from URLs and PDFs",
    version,
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// TOML settings file (default: ./scholar-flow.toml when present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Human-readable logs instead of JSON.
    #[arg(long, global = true)]
    pretty_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract and classify one or more URLs.
    Extract {
        #[arg(required = true)]
        urls: Vec<String>,
        /// Document type override (journal, thesis, book, report).
        #[arg(long = "type")]
        document_type: Option<DocumentType>,
        /// Save each reference to the configured store.
        #[arg(long)]
        save: bool,
    },

    /// Ingest a local PDF file.
    Upload {
        file: PathBuf,
        #[arg(long)]
        title: Option<String>,
        /// Comma-separated author names.
        #[arg(long)]
        authors: Option<String>,
        #[arg(long = "type")]
        document_type: Option<DocumentType>,
        #[arg(long)]
        discipline: Option<String>,
    },

    /// Classify free text.
    Classify { text: String },

    /// Show library statistics.
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.pretty_logs {
        telemetry::init_tracing_pretty();
    } else {
        telemetry::init_tracing();
    }

    let settings = PipelineSettings::load_from(cli.config.as_deref())?;
    let metrics = match settings.metrics_port {
        Some(port) => Some(telemetry::start_metrics_server(port).await),
        None => None,
    };

    // * Trained before anything can classify
    let model = Arc::new(DisciplineModel::with_default_corpus()?);
    tracing::info!(
        disciplines = model.labels().len(),
        vocabulary = model.vocabulary_size(),
        "Discipline classifier trained"
    );

    let result = run(cli.command, &settings, model).await;

    if let Some(handle) = metrics {
        handle.shutdown();
    }
    result
}

async fn run(command: Commands, settings: &PipelineSettings, model: Arc<DisciplineModel>) -> Result<()> {
    match command {
        Commands::Extract {
            urls,
            document_type,
            save,
        } => {
            let orchestrator = Orchestrator::from_settings(settings, model)?;
            let store = if save {
                Some(connect_store(settings.redis_url.as_deref()).await)
            } else {
                None
            };

            let mut failures = 0usize;
            for url in &urls {
                let outcome = match &store {
                    Some(store) => orchestrator
                        .ingest_url(url, document_type, store.as_ref())
                        .await
                        .map(serde_json::to_value),
                    None => orchestrator
                        .extract_and_classify(url, document_type)
                        .await
                        .map(serde_json::to_value),
                };

                match outcome {
                    Ok(json) => println!("{}", serde_json::to_string_pretty(&json?)?),
                    Err(e) => {
                        failures += 1;
                        tracing::error!(url = %url, kind = ?e.kind(), error = %e, "Extraction failed");
                    }
                }
            }

            orchestrator.shutdown().await;
            if failures > 0 {
                anyhow::bail!("{} of {} URLs failed", failures, urls.len());
            }
        }

        Commands::Upload {
            file,
            title,
            authors,
            document_type,
            discipline,
        } => {
            let bytes = tokio::fs::read(&file)
                .await
                .with_context(|| format!("reading {}", file.display()))?;
            let upload = PdfUpload {
                file_name: file
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                content_type: "application/pdf".to_string(),
                bytes,
                title,
                authors,
                document_type,
                discipline,
            };

            let store = connect_store(settings.redis_url.as_deref()).await;
            let uploader = PdfUploader::from_settings(settings, model);
            let record = uploader.ingest(upload, store.as_ref()).await?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }

        Commands::Classify { text } => {
            let orchestrator = Orchestrator::from_settings(settings, model)?;
            let profile = orchestrator.classify_text(&text);
            println!("{}", serde_json::to_string_pretty(&profile)?);
        }

        Commands::Stats => {
            let store: Arc<dyn ReferenceStore> = connect_store(settings.redis_url.as_deref()).await;
            let overview = store.overview().await?;
            println!("{}", serde_json::to_string_pretty(&overview)?);
        }
    }
    Ok(())
}
