//! Error types for the ai-ocr library.
//!
//! Every failure is fatal for the single request it belongs to: there are no
//! pages to skip and nothing to retry, so one enum, [`OcrError`], covers the
//! whole pipeline. Variants are grouped by stage so callers can tell an
//! input problem (fix the file) from a provider problem (fix the key, wait
//! for quota) without parsing messages.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the ai-ocr library.
#[derive(Debug, Error)]
pub enum OcrError {
    // ── Config errors ─────────────────────────────────────────────────────
    /// No API key was supplied.
    #[error("Gemini API key is not set.\n{hint}")]
    MissingCredential { hint: String },

    /// The secrets file exists but could not be read or parsed.
    #[error("Invalid secrets file '{path}': {detail}")]
    SecretsFileInvalid { path: PathBuf, detail: String },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Input file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// Any other I/O failure while reading the input.
    #[error("Failed to read input file '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The filename extension does not map to a supported MIME type.
    #[error(
        "Unsupported file format: '{name}'\nSupported: .pdf .png .jpg .jpeg .tif .tiff .bmp .gif"
    )]
    UnsupportedFormat { name: String },

    /// Spreadsheet output cannot be streamed to stdout.
    #[error("xlsx output cannot be written to standard output.\nPass -outfile <PATH>.xlsx.")]
    SpreadsheetRequiresOutputPath,

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The request never got an HTTP response (DNS, TLS, connection reset).
    #[error("Could not reach the Gemini API: {message}\nCheck your internet connection.")]
    Transport { message: String },

    /// HTTP 401/403: key missing, invalid, or lacking permission.
    #[error("Authentication error from Gemini (HTTP {status}): {detail}")]
    AuthError { status: u16, detail: String },

    /// HTTP 429: quota exhausted or rate limited.
    #[error("Gemini quota or rate limit exceeded{}", retry_hint(.retry_after_secs))]
    RateLimitExceeded { retry_after_secs: Option<u64> },

    /// Any other non-success answer, or a body we could not decode.
    #[error("Gemini API error (HTTP {status}): {message}")]
    LlmApiError { status: u16, message: String },

    /// The model answered but produced no text (e.g. the prompt was blocked).
    #[error("Gemini returned no text: {reason}")]
    EmptyResponse { reason: String },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The xlsx writer rejected the document.
    #[error("Failed to write spreadsheet '{path}': {detail}")]
    SpreadsheetFailed { path: PathBuf, detail: String },

    /// The content has characters the target encoding cannot represent.
    #[error("Output cannot be encoded as {encoding}; set LANG to a UTF-8 locale or use another output type")]
    EncodingFailed { encoding: &'static str },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

fn retry_hint(retry_after_secs: &Option<u64>) -> String {
    match retry_after_secs {
        Some(secs) => format!(" (retry after {secs}s)"),
        None => String::new(),
    }
}
