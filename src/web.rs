//! Single-page web form: upload a PDF or image, see it rendered as HTML.
//!
//! `GET /` shows the form; `POST /convert` takes a multipart upload (field
//! `file`), asks the model for HTML and embeds the answer in a fixed-height,
//! scrollable `<iframe srcdoc>`. Each request is independent; the only
//! shared state is the model client built at start-up.

use crate::convert::{convert, ConversionRequest};
use crate::error::OcrError;
use crate::output::OutputKind;
use crate::pipeline::input::InputFile;
use crate::pipeline::llm::GenerativeModel;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tracing::{info, warn};

/// Height of the result frame in pixels.
pub const FRAME_HEIGHT: u32 = 600;

/// `accept` list of the upload control.
pub const ACCEPTED_EXTENSIONS: &str = ".pdf,.png,.jpg,.jpeg,.tif,.tiff,.bmp,.gif";

const TITLE: &str = "AI OCR: convert PDF and image files to HTML";

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub model: Arc<dyn GenerativeModel>,
}

/// Build the router. `max_upload_bytes` bounds the multipart body.
pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/convert", post(upload))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state)
}

async fn index() -> Html<String> {
    Html(render_page(None))
}

async fn upload(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    let mut file: Option<(String, Vec<u8>)> = None;

    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                if field.name() != Some("file") {
                    continue;
                }
                let name = field.file_name().unwrap_or_default().to_string();
                match field.bytes().await {
                    Ok(bytes) => file = Some((name, bytes.to_vec())),
                    Err(e) => return bad_request(&e.to_string()),
                }
            }
            Ok(None) => break,
            Err(e) => return bad_request(&e.to_string()),
        }
    }

    let Some((name, bytes)) = file else {
        return Html(render_page(Some(PageResult::Error(
            "Choose a PDF or image file to upload.".into(),
        ))))
        .into_response();
    };

    let result = match convert_upload(state.model.as_ref(), &name, bytes).await {
        Ok(html) => PageResult::Converted(html),
        Err(e) => {
            warn!("Conversion of '{}' failed: {}", name, e);
            PageResult::Error(user_message(&e))
        }
    };
    Html(render_page(Some(result))).into_response()
}

fn bad_request(detail: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Html(render_page(Some(PageResult::Error(format!(
            "Malformed upload: {detail}"
        ))))),
    )
        .into_response()
}

/// Convert one uploaded file to HTML.
pub async fn convert_upload(
    model: &dyn GenerativeModel,
    file_name: &str,
    bytes: Vec<u8>,
) -> Result<String, OcrError> {
    let input = InputFile::from_bytes(file_name, bytes)?;
    info!("Upload '{}' ({} bytes, {})", file_name, input.bytes.len(), input.mime_type);
    let output = convert(model, &ConversionRequest::new(input, OutputKind::Html)).await?;
    Ok(output.content.text)
}

fn user_message(e: &OcrError) -> String {
    match e {
        OcrError::UnsupportedFormat { .. } => "Unsupported file format.".to_string(),
        other => format!("Conversion failed: {other}"),
    }
}

/// What to show under the form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageResult {
    Converted(String),
    Error(String),
}

/// Render the whole page.
pub fn render_page(result: Option<PageResult>) -> String {
    let body = match result {
        None => String::new(),
        Some(PageResult::Converted(html)) => format!(
            "<h2>Converted HTML</h2>\n<iframe srcdoc=\"{}\" height=\"{FRAME_HEIGHT}\" \
             scrolling=\"yes\" style=\"width:100%;border:1px solid #ccc\"></iframe>",
            html_escape::encode_double_quoted_attribute(&html)
        ),
        Some(PageResult::Error(msg)) => format!(
            "<p class=\"error\">{}</p>",
            html_escape::encode_text(&msg)
        ),
    };

    format!(
        r#"<!doctype html>
<html>
<head>
<meta charset="utf-8">
<title>{TITLE}</title>
<style>
body {{ font-family: sans-serif; max-width: 960px; margin: 2rem auto; }}
.error {{ color: #b00020; background: #fdecea; padding: .75rem; }}
</style>
</head>
<body>
<h1>{TITLE}</h1>
<h2>Upload a file</h2>
<form action="/convert" method="post" enctype="multipart/form-data">
<input type="file" name="file" accept="{ACCEPTED_EXTENSIONS}" required>
<button type="submit">Convert</button>
</form>
{body}
</body>
</html>
"#
    )
}
