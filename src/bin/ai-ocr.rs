//! CLI binary for ai-ocr.
//!
//! A thin shim over the library crate that maps CLI flags to a model client,
//! an output kind and a destination, then runs one conversion.

use ai_ocr::{
    convert_file, output::validate_destination, Credential, Destination, GeminiClient, OcrConfig,
    OutputKind,
};
use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::ffi::OsString;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = r#"EXAMPLES:
  # Print the text of a scanned page
  ai-ocr -infile scan.png

  # Markdown file (type taken from the extension)
  ai-ocr -infile report.pdf -outfile report.md

  # Spreadsheet with formatted tables (also writes invoice.xlsx.temp.md)
  ai-ocr -infile invoice.pdf -outfile invoice.xlsx

  # CSV in the locale encoding, explicit type
  ai-ocr -infile table.jpg -outfile table.out -outfiletype csv

SUPPORTED INPUT:
  .pdf .png .jpg .jpeg .tif .tiff .bmp .gif

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY    Google Gemini API key (required)
  GEMINI_MODEL      Override model ID
  GEMINI_API_BASE   Override API base URL
  RUST_LOG          Log filter (e.g. ai_ocr=debug)
"#;

/// Read a PDF or image with Gemini and write it as text, Markdown, CSV, HTML or XLSX.
#[derive(Parser, Debug)]
#[command(
    name = "ai-ocr",
    version,
    about = "OCR a PDF or image file with Gemini and write the result",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Input file (PDF or image).
    #[arg(long = "infile", value_name = "PATH")]
    infile: PathBuf,

    /// Output file. Omit to print to standard output.
    #[arg(long = "outfile", value_name = "PATH")]
    outfile: Option<PathBuf>,

    /// Output type. Default: the output file's extension, else txt.
    #[arg(long = "outfiletype", value_enum, value_name = "TYPE")]
    outfiletype: Option<OutputTypeArg>,

    /// Gemini model ID.
    #[arg(long, env = "GEMINI_MODEL", default_value = ai_ocr::config::DEFAULT_MODEL)]
    model: String,

    /// Gemini API base URL.
    #[arg(long, env = "GEMINI_API_BASE", default_value = ai_ocr::config::DEFAULT_API_BASE_URL)]
    api_base: String,

    /// Disable the spinner shown while waiting for the model.
    #[arg(long, env = "AI_OCR_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "AI_OCR_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors and the converted content.
    #[arg(short, long, env = "AI_OCR_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum OutputTypeArg {
    Txt,
    Md,
    Csv,
    Html,
    Xlsx,
}

impl From<OutputTypeArg> for OutputKind {
    fn from(v: OutputTypeArg) -> Self {
        match v {
            OutputTypeArg::Txt => OutputKind::Text,
            OutputTypeArg::Md => OutputKind::Markdown,
            OutputTypeArg::Csv => OutputKind::Csv,
            OutputTypeArg::Html => OutputKind::Html,
            OutputTypeArg::Xlsx => OutputKind::Spreadsheet,
        }
    }
}

/// Accept the single-dash spellings `-infile`, `-outfile`, `-outfiletype`
/// (optionally `=value`) by rewriting them to their `--` form.
///
/// Only tokens in flag position are touched: the value after a flag that
/// takes one, and everything after `--`, pass through unchanged.
fn normalize_legacy_flags<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    const LEGACY: [&str; 3] = ["infile", "outfile", "outfiletype"];
    const TAKES_VALUE: [&str; 5] = ["infile", "outfile", "outfiletype", "model", "api-base"];

    let mut out = Vec::new();
    let mut args = args.into_iter();
    if let Some(program) = args.next() {
        out.push(program);
    }

    let mut value_next = false;
    let mut positional_only = false;
    for arg in args {
        if value_next || positional_only {
            value_next = false;
            out.push(arg);
            continue;
        }
        let Some(s) = arg.to_str() else {
            out.push(arg);
            continue;
        };
        if s == "--" {
            positional_only = true;
            out.push(arg);
            continue;
        }
        let (dashes, rest) = if let Some(r) = s.strip_prefix("--") {
            (2, r)
        } else if let Some(r) = s.strip_prefix('-') {
            (1, r)
        } else {
            out.push(arg);
            continue;
        };
        let (name, inline_value) = match rest.split_once('=') {
            Some((name, _)) => (name, true),
            None => (rest, false),
        };
        value_next = !inline_value && TAKES_VALUE.contains(&name);
        if dashes == 1 && LEGACY.contains(&name) {
            out.push(OsString::from(format!("-{s}")));
        } else {
            out.push(arg);
        }
    }
    out
}

fn log_filter(verbose: bool, quiet: bool, show_progress: bool) -> &'static str {
    if verbose {
        "debug"
    } else if quiet || show_progress {
        "error"
    } else {
        "info"
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_from(normalize_legacy_flags(std::env::args_os()));

    // ── Logging setup ────────────────────────────────────────────────────
    // INFO lines would tear the spinner line, so only errors get through
    // while it is shown; the summary is printed once it is cleared.
    let show_progress = !cli.quiet && !cli.no_progress;
    let filter = log_filter(cli.verbose, cli.quiet, show_progress);

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Resolve what to produce ──────────────────────────────────────────
    let kind = OutputKind::resolve(cli.outfiletype.map(Into::into), cli.outfile.as_deref());
    let destination = Destination::from_option(cli.outfile.clone());

    info!("Input file:  {}", cli.infile.display());
    info!("Output:      {}", destination);
    info!("Output type: {}", kind);

    validate_destination(kind, &destination).context("Invalid output options")?;

    // ── Build the model client ───────────────────────────────────────────
    let credential = Credential::from_env().context("Missing API credential")?;
    let config = OcrConfig::builder()
        .model(&cli.model)
        .api_base_url(&cli.api_base)
        .build()
        .context("Invalid configuration")?;
    let client = GeminiClient::new(config, credential).context("Failed to create Gemini client")?;

    // ── Run conversion ───────────────────────────────────────────────────
    let spinner = if show_progress {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg} {elapsed:.dim}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message(format!("Waiting for {}…", cli.model));
        bar.enable_steady_tick(Duration::from_millis(80));
        Some(bar)
    } else {
        None
    };

    let result = convert_file(
        &client,
        &cli.infile,
        kind,
        &destination,
        &mut io::stdout(),
    )
    .await;

    if let Some(bar) = spinner {
        bar.finish_and_clear();
    }

    let output = result.with_context(|| format!("Conversion of {} failed", cli.infile.display()))?;

    if !cli.quiet {
        eprintln!(
            "✔ {} → {}  ({} tokens in / {} tokens out{})",
            cli.infile.display(),
            destination,
            output.response.prompt_tokens,
            output.response.output_tokens,
            if output.content.fenced {
                ""
            } else {
                ", no fenced block: full answer used"
            }
        );
    }

    Ok(())
}
