//! Model invocation: one multimodal `generateContent` call per document.
//!
//! The rest of the crate talks to the model through [`GenerativeModel`], an
//! object-safe trait, so front ends hold an `Arc<dyn GenerativeModel>` built
//! once at start-up and tests can substitute a scripted model.
//!
//! The call is a single attempt with no client-side timeout. Every failure
//! comes back as a distinct [`OcrError`] variant and the caller decides what
//! to do with it.

use crate::config::{Credential, OcrConfig};
use crate::error::OcrError;
use crate::pipeline::encode::InlineData;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

/// Raw answer returned by the model for one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelResponse {
    pub text: String,
    pub prompt_tokens: u32,
    pub output_tokens: u32,
    pub finish_reason: Option<String>,
}

/// A hosted model that turns a document plus an instruction into text.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Model identifier, for logs.
    fn name(&self) -> &str;

    /// Send `document` and `prompt` as one user turn and return the answer.
    async fn generate(&self, prompt: &str, document: InlineData)
        -> Result<ModelResponse, OcrError>;
}

/// Gemini REST client.
pub struct GeminiClient {
    http: reqwest::Client,
    credential: Credential,
    config: OcrConfig,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("config", &self.config)
            .field("credential", &self.credential)
            .finish()
    }
}

impl GeminiClient {
    pub fn new(config: OcrConfig, credential: Credential) -> Result<Self, OcrError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("ai-ocr/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| OcrError::Internal(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            credential,
            config,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.api_base_url, self.config.model
        )
    }
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    fn name(&self) -> &str {
        &self.config.model
    }

    async fn generate(
        &self,
        prompt: &str,
        document: InlineData,
    ) -> Result<ModelResponse, OcrError> {
        let start = Instant::now();
        let body = build_request(prompt, document);

        info!("Calling {} …", self.config.model);
        let resp = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", self.credential.expose())
            .json(&body)
            .send()
            .await
            .map_err(|e| OcrError::Transport {
                message: e.to_string(),
            })?;

        let status = resp.status();
        let retry_after_secs = resp
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        let text = resp.text().await.map_err(|e| OcrError::Transport {
            message: e.to_string(),
        })?;

        if !status.is_success() {
            return Err(map_http_error(status, &text, retry_after_secs));
        }

        let parsed: GenerateContentResponse =
            serde_json::from_str(&text).map_err(|e| OcrError::LlmApiError {
                status: status.as_u16(),
                message: format!("undecodable response body: {e}"),
            })?;
        let response = parsed.into_model_response()?;

        debug!(
            "{}: {} input tokens, {} output tokens, {:?}",
            self.config.model,
            response.prompt_tokens,
            response.output_tokens,
            start.elapsed()
        );
        Ok(response)
    }
}

// ── Wire types ───────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<RequestPart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RequestPart {
    Inline { inline_data: Blob },
    Text { text: String },
}

#[derive(Debug, Serialize)]
struct Blob {
    mime_type: &'static str,
    data: String,
}

fn build_request(prompt: &str, document: InlineData) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: vec![Content {
            parts: vec![
                RequestPart::Inline {
                    inline_data: Blob {
                        mime_type: document.mime_type.as_str(),
                        data: document.data,
                    },
                },
                RequestPart::Text {
                    text: prompt.to_string(),
                },
            ],
        }],
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    prompt_token_count: Option<u32>,
    candidates_token_count: Option<u32>,
}

impl GenerateContentResponse {
    fn into_model_response(self) -> Result<ModelResponse, OcrError> {
        let (prompt_tokens, output_tokens) = self
            .usage_metadata
            .map(|u| {
                (
                    u.prompt_token_count.unwrap_or(0),
                    u.candidates_token_count.unwrap_or(0),
                )
            })
            .unwrap_or((0, 0));

        let Some(candidate) = self.candidates.into_iter().next() else {
            let reason = self
                .prompt_feedback
                .and_then(|f| f.block_reason)
                .map(|r| format!("prompt blocked ({r})"))
                .unwrap_or_else(|| "no candidates in response".to_string());
            return Err(OcrError::EmptyResponse { reason });
        };

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.is_empty() {
            let reason = match candidate.finish_reason.as_deref() {
                Some(r) => format!("finish reason {r}"),
                None => "candidate has no text parts".to_string(),
            };
            return Err(OcrError::EmptyResponse { reason });
        }

        Ok(ModelResponse {
            text,
            prompt_tokens,
            output_tokens,
            finish_reason: candidate.finish_reason,
        })
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Map a non-success HTTP answer to the matching error variant.
fn map_http_error(status: StatusCode, body: &str, retry_after_secs: Option<u64>) -> OcrError {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.trim().to_string());

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => OcrError::AuthError {
            status: status.as_u16(),
            detail: message,
        },
        StatusCode::TOO_MANY_REQUESTS => OcrError::RateLimitExceeded { retry_after_secs },
        _ => OcrError::LlmApiError {
            status: status.as_u16(),
            message,
        },
    }
}
