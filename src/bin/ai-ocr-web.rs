//! Web form binary for ai-ocr.
//!
//! Serves the single-page upload form from [`ai_ocr::web`]. The API key is
//! read once at start-up from the secrets file (or `GEMINI_API_KEY`); the
//! server refuses to start without it.

use ai_ocr::config::{secrets_path, DEFAULT_API_BASE_URL, DEFAULT_MODEL};
use ai_ocr::web::{router, AppState};
use ai_ocr::{Credential, GeminiClient, OcrConfig};
use anyhow::{Context, Result};
use clap::Parser;
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Upload a PDF or image and view it as HTML.
#[derive(Parser, Debug)]
#[command(name = "ai-ocr-web", version, about = "Web form: convert PDF and image files to HTML with Gemini")]
struct Cli {
    /// Address to listen on.
    #[arg(long, env = "AI_OCR_BIND", default_value = "127.0.0.1:8501")]
    bind: SocketAddr,

    /// Secrets TOML file with `[gemini] api_key = "..."`.
    /// Default: .streamlit/secrets.toml, falling back to GEMINI_API_KEY.
    #[arg(long, env = "AI_OCR_SECRETS")]
    secrets: Option<PathBuf>,

    /// Gemini model ID.
    #[arg(long, env = "GEMINI_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    /// Gemini API base URL.
    #[arg(long, env = "GEMINI_API_BASE", default_value = DEFAULT_API_BASE_URL)]
    api_base: String,

    /// Largest accepted upload, in megabytes.
    #[arg(long, env = "AI_OCR_MAX_UPLOAD_MB", default_value_t = 20)]
    max_upload_mb: usize,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "AI_OCR_VERBOSE")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(if cli.verbose { "debug" } else { "info" })
        }))
        .with_writer(io::stderr)
        .init();

    let secrets = secrets_path(cli.secrets.clone());
    let credential = Credential::from_secrets_file(&secrets).context("Missing API credential")?;
    let config = OcrConfig::builder()
        .model(&cli.model)
        .api_base_url(&cli.api_base)
        .build()
        .context("Invalid configuration")?;
    let client = GeminiClient::new(config, credential).context("Failed to create Gemini client")?;

    let state = AppState {
        model: Arc::new(client),
    };
    let app = router(state, cli.max_upload_mb.saturating_mul(1024 * 1024));

    let listener = tokio::net::TcpListener::bind(cli.bind)
        .await
        .with_context(|| format!("Failed to bind {}", cli.bind))?;
    info!("Listening on http://{} (model {})", cli.bind, cli.model);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
