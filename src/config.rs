//! Configuration and credentials for talking to the hosted model.
//!
//! The model client is configured once at start-up from an [`OcrConfig`] and
//! a [`Credential`], then handed to every call site explicitly. Nothing here
//! reads or writes process-global state after start-up.

use crate::error::OcrError;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default Gemini model. Fast, cheap and multimodal (PDF + images).
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Default REST base URL of the Gemini API.
pub const DEFAULT_API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Default location of the web form's secrets file.
pub const DEFAULT_SECRETS_PATH: &str = ".streamlit/secrets.toml";

/// Client configuration for the hosted model.
///
/// # Example
/// ```rust
/// use ai_ocr::OcrConfig;
///
/// let config = OcrConfig::builder()
///     .model("gemini-2.5-flash")
///     .build()
///     .unwrap();
/// assert_eq!(config.model, "gemini-2.5-flash");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcrConfig {
    /// Model identifier. Default: [`DEFAULT_MODEL`].
    pub model: String,

    /// API base URL without trailing slash. Default: [`DEFAULT_API_BASE_URL`].
    ///
    /// Overridable so tests (and proxies) can point the client elsewhere.
    pub api_base_url: String,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
        }
    }
}

impl OcrConfig {
    /// Create a new builder for `OcrConfig`.
    pub fn builder() -> OcrConfigBuilder {
        OcrConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`OcrConfig`].
#[derive(Debug)]
pub struct OcrConfigBuilder {
    config: OcrConfig,
}

impl OcrConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<OcrConfig, OcrError> {
        let c = &self.config;
        if c.model.trim().is_empty() {
            return Err(OcrError::InvalidConfig("model must not be empty".into()));
        }
        if !(c.api_base_url.starts_with("http://") || c.api_base_url.starts_with("https://")) {
            return Err(OcrError::InvalidConfig(format!(
                "API base URL must start with http:// or https://, got '{}'",
                c.api_base_url
            )));
        }
        Ok(self.config)
    }
}

// ── Credential ───────────────────────────────────────────────────────────

/// An API key. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wrap a key, rejecting empty or whitespace-only values.
    pub fn new(key: impl Into<String>) -> Result<Self, OcrError> {
        let key = key.into();
        let key = key.trim();
        if key.is_empty() {
            return Err(OcrError::MissingCredential {
                hint: "The API key is empty.".into(),
            });
        }
        Ok(Self(key.to_string()))
    }

    /// Read the key from `GEMINI_API_KEY`.
    pub fn from_env() -> Result<Self, OcrError> {
        Self::from_env_value(std::env::var(API_KEY_ENV).ok())
    }

    fn from_env_value(value: Option<String>) -> Result<Self, OcrError> {
        match value {
            Some(v) if !v.trim().is_empty() => Self::new(v),
            _ => Err(OcrError::MissingCredential {
                hint: format!("Set it with: export {API_KEY_ENV}=<your-key>"),
            }),
        }
    }

    /// Read the key from a secrets TOML file (`[gemini] api_key = "..."`),
    /// falling back to `GEMINI_API_KEY` when the file does not exist.
    pub fn from_secrets_file(path: impl AsRef<Path>) -> Result<Self, OcrError> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(text) => {
                debug!("Loading secrets from {}", path.display());
                Self::from_secrets_toml(&text, path)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No secrets file at {}, trying {API_KEY_ENV}", path.display());
                Self::from_env().map_err(|_| OcrError::MissingCredential {
                    hint: format!(
                        "Add [gemini] api_key = \"...\" to {} or export {API_KEY_ENV}.",
                        path.display()
                    ),
                })
            }
            Err(e) => Err(OcrError::SecretsFileInvalid {
                path: path.to_path_buf(),
                detail: e.to_string(),
            }),
        }
    }

    fn from_secrets_toml(text: &str, path: &Path) -> Result<Self, OcrError> {
        let secrets: SecretsFile = toml::from_str(text).map_err(|e| OcrError::SecretsFileInvalid {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;
        let key = secrets.gemini.and_then(|g| g.api_key).unwrap_or_default();
        Self::new(key).map_err(|_| OcrError::MissingCredential {
            hint: format!("{} has no [gemini] api_key entry.", path.display()),
        })
    }

    /// The raw key, for building request headers.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

#[derive(Debug, Deserialize)]
struct SecretsFile {
    gemini: Option<GeminiSecrets>,
}

#[derive(Debug, Deserialize)]
struct GeminiSecrets {
    api_key: Option<String>,
}

/// Resolve the secrets path the web form should read.
pub fn secrets_path(explicit: Option<PathBuf>) -> PathBuf {
    explicit.unwrap_or_else(|| PathBuf::from(DEFAULT_SECRETS_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults() {
        let config = OcrConfig::builder().build().unwrap();
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
    }

    #[test]
    fn builder_trims_trailing_slash() {
        let config = OcrConfig::builder()
            .api_base_url("http://localhost:9000/v1beta/")
            .build()
            .unwrap();
        assert_eq!(config.api_base_url, "http://localhost:9000/v1beta");
    }

    #[test]
    fn builder_rejects_empty_model_and_bad_url() {
        assert!(matches!(
            OcrConfig::builder().model("  ").build(),
            Err(OcrError::InvalidConfig(_))
        ));
        assert!(matches!(
            OcrConfig::builder().api_base_url("ftp://example.com").build(),
            Err(OcrError::InvalidConfig(_))
        ));
    }

    #[test]
    fn credential_debug_is_redacted() {
        let c = Credential::new("super-secret").unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("super-secret"));
        assert_eq!(c.expose(), "super-secret");
    }

    #[test]
    fn missing_or_blank_env_value_is_a_config_error() {
        assert!(matches!(
            Credential::from_env_value(None),
            Err(OcrError::MissingCredential { .. })
        ));
        assert!(matches!(
            Credential::from_env_value(Some("   ".into())),
            Err(OcrError::MissingCredential { .. })
        ));
        assert_eq!(
            Credential::from_env_value(Some("k".into())).unwrap().expose(),
            "k"
        );
    }

    #[test]
    fn secrets_file_is_parsed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secrets.toml");
        std::fs::write(&path, "[gemini]\napi_key = \"abc123\"\n").unwrap();
        let c = Credential::from_secrets_file(&path).unwrap();
        assert_eq!(c.expose(), "abc123");
    }

    #[test]
    fn secrets_file_without_key_is_missing_credential() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secrets.toml");
        std::fs::write(&path, "[other]\nvalue = 1\n").unwrap();
        assert!(matches!(
            Credential::from_secrets_file(&path),
            Err(OcrError::MissingCredential { .. })
        ));
    }

    #[test]
    fn malformed_secrets_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secrets.toml");
        std::fs::write(&path, "[gemini\napi_key = ").unwrap();
        assert!(matches!(
            Credential::from_secrets_file(&path),
            Err(OcrError::SecretsFileInvalid { .. })
        ));
    }

    #[test]
    fn default_secrets_path() {
        assert_eq!(secrets_path(None), PathBuf::from(DEFAULT_SECRETS_PATH));
        assert_eq!(
            secrets_path(Some(PathBuf::from("/etc/ocr.toml"))),
            PathBuf::from("/etc/ocr.toml")
        );
    }
}
