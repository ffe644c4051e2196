//! Offline companion to the HTTP server.
//!
//! Runs the same extraction and summarization pipeline against a local file, which is handy for
//! checking a document (or a chunking configuration) without starting the server.
use std::{
    fmt::Write as _,
    fs,
    io::Write,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use docsum::{
    config::{self, Config},
    document::{self, DocumentFormat},
    logging,
    processing::{DocumentService, RequestLifecycle, SummarizationPipeline, chunking::count_units},
    upload::TransientUpload,
};

#[derive(Parser)]
#[command(
    name = "docsum-cli",
    about = "Extract, chunk, summarize, or analyze a local document"
)]
struct Cli {
    /// Read environment variables from this file instead of `.env`.
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the plain text of a PDF or DOCX.
    Extract {
        input: PathBuf,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Show how a document would be split before summarization.
    Chunks { input: PathBuf },
    /// Summarize a document with the configured backend.
    Summarize {
        input: PathBuf,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Request a structured case analysis.
    Analyze { input: PathBuf },
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Extract { input, output } => {
            let text = extract_local(&input)?;
            emit(output.as_deref(), &text)
        }
        Command::Chunks { input } => {
            let config = load(cli.env_file.as_deref(), true)?;
            emit(None, &chunk_plan(&config, &input)?)
        }
        Command::Summarize { input, output } => {
            let config = load(cli.env_file.as_deref(), false)?;
            logging::init_tracing(&config.log_file);
            let service = DocumentService::new(config.clone())?;
            let upload = stage_upload(&config, &input).await?;
            let mut lifecycle = RequestLifecycle::new("cli-summarize");
            let outcome = service.summarize_document(&upload, &mut lifecycle).await?;
            eprintln!(
                "{} chunks, {} -> {} characters",
                outcome.chunk_count, outcome.original_length, outcome.summary_length
            );
            emit(output.as_deref(), &outcome.summary)
        }
        Command::Analyze { input } => {
            let config = load(cli.env_file.as_deref(), false)?;
            logging::init_tracing(&config.log_file);
            let service = DocumentService::new(config.clone())?;
            let upload = stage_upload(&config, &input).await?;
            let mut lifecycle = RequestLifecycle::new("cli-analyze");
            let analysis = service.analyze_document(&upload, &mut lifecycle).await?;
            emit(None, &serde_json::to_string_pretty(&analysis)?)
        }
    }
}

/// Load configuration; `offline` skips validation so backend credentials are not required.
fn load(env_file: Option<&Path>, offline: bool) -> Result<Arc<Config>> {
    let config = if offline {
        config::read_config(env_file)
    } else {
        config::load_config(env_file)
    }
    .context("failed to load configuration")?;
    Ok(Arc::new(config))
}

fn extract_local(input: &Path) -> Result<String> {
    let name = file_name(input)?;
    let format = DocumentFormat::from_file_name(name);
    document::extract_text(input, format)
        .with_context(|| format!("failed to extract {}", input.display()))
}

/// Describe how `input` would be split, one line per chunk.
fn chunk_plan(config: &Config, input: &Path) -> Result<String> {
    let text = extract_local(input)?;
    let pipeline = SummarizationPipeline::from_config(config)?;
    let chunks = pipeline.split(&text)?;
    let unit = pipeline.chunker().unit();

    let mut out = format!(
        "{} characters in {} chunks (max {} {:?} each)\n",
        text.chars().count(),
        chunks.len(),
        pipeline.chunker().max_unit_size(),
        unit
    );
    for chunk in &chunks {
        let preview: String = chunk.text.trim().chars().take(60).collect();
        writeln!(
            out,
            "#{:<3} {:>6} units  {preview}",
            chunk.ordinal + 1,
            count_units(chunk.text, unit)
        )?;
    }
    Ok(out)
}

/// Copy a local file into the upload directory the way the server stores uploads.
async fn stage_upload(config: &Config, input: &Path) -> Result<TransientUpload> {
    let bytes = fs::read(input).with_context(|| format!("failed to read {}", input.display()))?;
    TransientUpload::persist(&config.upload_dir, file_name(input)?, &bytes)
        .await
        .with_context(|| format!("failed to stage {}", input.display()))
}

fn file_name(path: &Path) -> Result<&str> {
    path.file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| anyhow!("{} has no usable file name", path.display()))
}

fn emit(output: Option<&Path>, contents: &str) -> Result<()> {
    let Some(path) = output else {
        println!("{contents}");
        return Ok(());
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| {
            format!(
                "failed to create parent directories for {}",
                parent.display()
            )
        })?;
    }
    let mut file = fs::File::create(path)
        .with_context(|| format!("failed to create file at {}", path.display()))?;
    file.write_all(contents.as_bytes())
        .with_context(|| format!("failed to write data to {}", path.display()))?;
    Ok(())
}
