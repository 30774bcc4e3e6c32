//! Instruction prompts sent alongside the document.
//!
//! The model gets a single user turn: the file plus one sentence naming the
//! wanted format. Keeping the wording here makes prompt changes a one-file
//! edit and lets tests pin the exact text.

use crate::output::OutputKind;
use crate::pipeline::input::MimeType;

/// Extra sentence appended for HTML output.
pub const HTML_STYLE_SUFFIX: &str = " Style the tables with CSS so they are easy to read.";

/// Build the instruction for converting a document of `mime_type` to `kind`.
///
/// Spreadsheet output asks for Markdown; the tables in it are turned into
/// cells by [`crate::pipeline::spreadsheet`].
pub fn create_prompt(mime_type: MimeType, kind: OutputKind) -> String {
    let noun = if mime_type.is_pdf() { "PDF" } else { "image" };
    let mut prompt = format!(
        "Read this {noun} and output its contents in {} format.",
        kind.prompt_format_name()
    );
    if kind == OutputKind::Html {
        prompt.push_str(HTML_STYLE_SUFFIX);
    }
    prompt
}
