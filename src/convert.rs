//! Top-level conversion entry points.
//!
//! ```text
//! InputFile ──▶ create_prompt ──▶ GenerativeModel::generate ──▶ ExtractedContent ──▶ write_output
//! ```
//!
//! [`convert`] covers the model round-trip for an already loaded file (the
//! web form uses it directly). [`convert_file`] is the CLI path: validate the
//! destination, read the file, convert, write.

use crate::error::OcrError;
use crate::output::{validate_destination, write_output, Destination, OutputKind};
use crate::pipeline::encode::encode_inline;
use crate::pipeline::extract::ExtractedContent;
use crate::pipeline::input::{read_file, InputFile};
use crate::pipeline::llm::{GenerativeModel, ModelResponse};
use crate::prompts::create_prompt;
use std::path::Path;
use tracing::{debug, info};

/// A file paired with the wanted output format.
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    pub input: InputFile,
    pub kind: OutputKind,
}

impl ConversionRequest {
    pub fn new(input: InputFile, kind: OutputKind) -> Self {
        Self { input, kind }
    }

    /// The instruction sent with this request.
    pub fn prompt(&self) -> String {
        create_prompt(self.input.mime_type, self.kind)
    }
}

/// Result of one model round-trip.
#[derive(Debug, Clone)]
pub struct ConversionOutput {
    pub content: ExtractedContent,
    pub response: ModelResponse,
}

/// Send the request to `model` and extract the file content from the answer.
pub async fn convert(
    model: &dyn GenerativeModel,
    request: &ConversionRequest,
) -> Result<ConversionOutput, OcrError> {
    let prompt = request.prompt();
    info!("Prompt: {}", prompt);

    let response = model
        .generate(&prompt, encode_inline(&request.input))
        .await?;
    info!(
        "{} answered: {} chars, {} tokens in / {} tokens out",
        model.name(),
        response.text.len(),
        response.prompt_tokens,
        response.output_tokens
    );
    debug!("Raw response:\n{}", response.text);

    let content = ExtractedContent::from_response(&response);
    Ok(ConversionOutput { content, response })
}

/// Read `input_path`, convert it to `kind`, and write the result.
///
/// `stdout` receives the content when `destination` is
/// [`Destination::Stdout`]. A spreadsheet without an output file is rejected
/// before the input is read.
pub async fn convert_file<W: std::io::Write>(
    model: &dyn GenerativeModel,
    input_path: impl AsRef<Path>,
    kind: OutputKind,
    destination: &Destination,
    stdout: &mut W,
) -> Result<ConversionOutput, OcrError> {
    validate_destination(kind, destination)?;

    let input = read_file(input_path).await?;
    let request = ConversionRequest::new(input, kind);
    let output = convert(model, &request).await?;

    write_output(&output.content.text, kind, destination, stdout)?;
    Ok(output)
}
