//! # ai-ocr
//!
//! Read PDFs and images with a hosted multimodal model (Google Gemini) and
//! turn the answer into plain text, Markdown, CSV, HTML, or an `.xlsx`
//! workbook with formatted tables.
//!
//! The model does all of the document understanding. This crate builds the
//! instruction, sends the file, pulls the file body out of the model's answer,
//! and, for spreadsheets, lays the Markdown tables out as styled cells.
//!
//! ## Pipeline Overview
//!
//! ```text
//! file.pdf / .png / …
//!  │
//!  ├─ 1. Input    resolve MIME type from the extension, read bytes
//!  ├─ 2. Prompt   one sentence naming the target format
//!  ├─ 3. Model    single generateContent call, file sent inline
//!  ├─ 4. Extract  first ``` fenced block, else the whole answer
//!  └─ 5. Output   stdout, a UTF-8 / locale-encoded file, or .xlsx + .temp.md
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ai_ocr::{convert_file, Credential, Destination, GeminiClient, OcrConfig, OutputKind};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = GeminiClient::new(OcrConfig::default(), Credential::from_env()?)?;
//!     let destination = Destination::File("invoice.xlsx".into());
//!     convert_file(
//!         &client,
//!         "invoice.pdf",
//!         OutputKind::Spreadsheet,
//!         &destination,
//!         &mut std::io::stdout(),
//!     )
//!     .await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `ai-ocr` binary (clap + anyhow + tracing-subscriber + indicatif) |
//! | `web`   | on      | Enables the `ai-ocr-web` binary and the [`web`] module (axum) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod prompts;
#[cfg(feature = "web")]
pub mod web;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{Credential, OcrConfig, OcrConfigBuilder};
pub use convert::{convert, convert_file, ConversionOutput, ConversionRequest};
pub use error::OcrError;
pub use output::{write_output, Destination, OutputKind};
pub use pipeline::extract::{extract_file_content, ExtractedContent};
pub use pipeline::input::{get_mime_type, read_file, InputFile, MimeType};
pub use pipeline::llm::{GeminiClient, GenerativeModel, ModelResponse};
pub use pipeline::spreadsheet::{
    is_markdown_table_separator, markdown_to_xlsx, render_markdown, SpreadsheetDocument,
};
pub use prompts::create_prompt;
