use anyhow::{Context, Result};
use clap::Parser;
use docsum::{api, config, logging, processing};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

#[derive(Parser)]
#[command(
    name = "docsum",
    about = "HTTP server that summarizes uploaded PDF and DOCX documents"
)]
struct Cli {
    /// Port to listen on; overrides `SERVER_PORT`.
    #[arg(long)]
    port: Option<u16>,
    /// Read environment variables from this file instead of `.env`.
    #[arg(long)]
    env_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = config::load_config(cli.env_file.as_deref())
        .context("failed to load configuration")?;
    if cli.port.is_some() {
        config.server_port = cli.port;
    }
    let config = Arc::new(config);

    logging::init_tracing(&config.log_file);
    tracing::debug!(
        upload_dir = %config.upload_dir.display(),
        provider = ?config.summarization_provider,
        model = %config.summarization_model,
        chunk_unit = ?config.chunk_unit,
        chunk_size = config.chunk_size,
        analysis_enabled = config.gemini_api_key.is_some(),
        legal_validation = config.legal_validation,
        "Loaded configuration"
    );

    let service = processing::DocumentService::new(config.clone())
        .context("failed to initialize document service")?;
    let app = api::create_router(Arc::new(service), &config.allowed_origins);

    let (listener, port) = bind_listener(config.server_port)
        .await
        .context("failed to bind listener")?;
    tracing::info!(
        upload_dir = %config.upload_dir.display(),
        "Listening on http://0.0.0.0:{}",
        port
    );
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}

async fn bind_listener(server_port: Option<u16>) -> Result<(TcpListener, u16), std::io::Error> {
    use std::net::Ipv4Addr;

    if let Some(port) = server_port {
        return TcpListener::bind((Ipv4Addr::UNSPECIFIED, port))
            .await
            .map(|listener| (listener, port));
    }

    const PORT_RANGE: std::ops::RangeInclusive<u16> = 4100..=4199;
    for port in PORT_RANGE {
        match TcpListener::bind((Ipv4Addr::UNSPECIFIED, port)).await {
            Ok(listener) => {
                tracing::debug!(port, "Bound server port");
                return Ok((listener, port));
            }
            Err(err) if err.kind() == std::io::ErrorKind::AddrInUse => {
                tracing::debug!(port, "Port already in use; trying next");
                continue;
            }
            Err(err) => return Err(err),
        }
    }

    Err(std::io::Error::new(
        std::io::ErrorKind::AddrNotAvailable,
        "No available port found in range 4100-4199",
    ))
}
