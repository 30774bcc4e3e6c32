//! Pipeline stages for document conversion.
//!
//! Each submodule implements exactly one step, so each can be tested on its
//! own and the model backend can change without touching the others.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ encode ──▶ llm ──▶ extract ──▶ (spreadsheet)
//! (file)    (base64)   (model) (fence)     (xlsx layout)
//! ```
//!
//! 1. [`input`]   — resolve the MIME type from the extension, read the bytes
//! 2. [`encode`]  — base64-wrap the bytes as an inline-data part
//! 3. [`llm`]     — one `generateContent` call; the only stage with network I/O
//! 4. [`extract`] — take the first fenced block of the answer
//! 5. [`spreadsheet`] — lay Markdown tables out as styled worksheet cells

pub mod encode;
pub mod extract;
pub mod input;
pub mod llm;
pub mod spreadsheet;
