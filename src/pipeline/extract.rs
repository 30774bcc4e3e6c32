//! Response content extraction: pull the file body out of the model's answer.
//!
//! Models tend to wrap the requested document in a fenced code block and add
//! a sentence or two around it ("Here is the CSV: ..."). The first fenced
//! block is the file; everything else is chatter. When no fence exists the
//! whole answer is used as-is.

use crate::pipeline::llm::ModelResponse;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

// Opening fence, optional tag line, lazily everything up to the next fence
// or end of input. An unterminated block runs to the end.
static RE_FIRST_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```(?:[^\n]*\n)?([\s\S]*?)(?:```|$)").unwrap());

/// Return the trimmed interior of the first fenced block, or `None` if the
/// text contains no opening fence.
pub fn extract_file_content(response_text: &str) -> Option<&str> {
    RE_FIRST_FENCE
        .captures(response_text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
}

/// The text that will be emitted for one conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedContent {
    pub text: String,
    /// `true` when `text` came from a fenced block rather than the full answer.
    pub fenced: bool,
}

impl ExtractedContent {
    /// Apply [`extract_file_content`], falling back to the full response.
    pub fn from_text(response_text: &str) -> Self {
        match extract_file_content(response_text) {
            Some(block) => Self {
                text: block.to_string(),
                fenced: true,
            },
            None => {
                debug!("No fenced block in response, using full text");
                Self {
                    text: response_text.to_string(),
                    fenced: false,
                }
            }
        }
    }

    pub fn from_response(response: &ModelResponse) -> Self {
        Self::from_text(&response.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_fence() {
        assert_eq!(extract_file_content("Here:\n```\nHELLO\n```\n"), Some("HELLO"));
    }

    #[test]
    fn language_tag_is_skipped() {
        let text = "Sure!\n```csv\na,b\n1,2\n```\nLet me know.";
        assert_eq!(extract_file_content(text), Some("a,b\n1,2"));
    }

    #[test]
    fn no_fence_is_none() {
        assert_eq!(extract_file_content("just some text\nwith lines"), None);
        assert_eq!(extract_file_content(""), None);
    }

    #[test]
    fn unterminated_fence_runs_to_end() {
        assert_eq!(extract_file_content("```\nABC"), Some("ABC"));
        assert_eq!(extract_file_content("```html\n<p>x</p>\n  "), Some("<p>x</p>"));
    }

    #[test]
    fn only_first_block_counts() {
        let text = "```\nfirst\n```\ntext\n```\nsecond\n```";
        assert_eq!(extract_file_content(text), Some("first"));
    }

    #[test]
    fn empty_block_is_found_but_empty() {
        assert_eq!(extract_file_content("```\n```"), Some(""));
        let c = ExtractedContent::from_text("```md\n```");
        assert!(c.fenced);
        assert_eq!(c.text, "");
    }

    #[test]
    fn fallback_keeps_full_text() {
        let c = ExtractedContent::from_text("| a | b |\n|---|---|");
        assert!(!c.fenced);
        assert_eq!(c.text, "| a | b |\n|---|---|");
    }
}
