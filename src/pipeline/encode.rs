//! Inline-data encoding: raw file bytes → base64 part for the request body.
//!
//! Gemini accepts PDFs and images directly as `inline_data` parts, so the
//! file is sent as-is. No rasterisation, no re-compression.

use crate::pipeline::input::{InputFile, MimeType};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::debug;

/// A base64-encoded file plus its MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineData {
    pub mime_type: MimeType,
    pub data: String,
}

/// Encode an input file for the multimodal request.
pub fn encode_inline(input: &InputFile) -> InlineData {
    let data = STANDARD.encode(&input.bytes);
    debug!(
        "Encoded {} → {} bytes base64",
        input.name,
        data.len()
    );
    InlineData {
        mime_type: input.mime_type,
        data,
    }
}
