//! Input acquisition: load a local file or wrap an uploaded buffer.
//!
//! The MIME type is resolved from the filename extension before anything
//! else happens. An unknown extension is a typed error returned here, so no
//! bytes are read and no request is sent for a file the model cannot accept.

use crate::error::OcrError;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File types the model accepts as inline data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MimeType {
    Pdf,
    Jpeg,
    Png,
    Tiff,
    Bmp,
    Gif,
}

impl MimeType {
    /// Every supported type.
    pub const ALL: [MimeType; 6] = [
        MimeType::Pdf,
        MimeType::Jpeg,
        MimeType::Png,
        MimeType::Tiff,
        MimeType::Bmp,
        MimeType::Gif,
    ];

    /// The IANA media type string sent to the API.
    pub fn as_str(self) -> &'static str {
        match self {
            MimeType::Pdf => "application/pdf",
            MimeType::Jpeg => "image/jpeg",
            MimeType::Png => "image/png",
            MimeType::Tiff => "image/tiff",
            MimeType::Bmp => "image/bmp",
            MimeType::Gif => "image/gif",
        }
    }

    /// Map a filename extension (without the dot, any case).
    pub fn from_extension(ext: &str) -> Option<MimeType> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(MimeType::Pdf),
            "jpg" | "jpeg" => Some(MimeType::Jpeg),
            "png" => Some(MimeType::Png),
            "tif" | "tiff" => Some(MimeType::Tiff),
            "bmp" => Some(MimeType::Bmp),
            "gif" => Some(MimeType::Gif),
            _ => None,
        }
    }

    pub fn is_pdf(self) -> bool {
        self == MimeType::Pdf
    }
}

impl fmt::Display for MimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolve the MIME type of `path` from its extension.
pub fn get_mime_type(path: impl AsRef<Path>) -> Result<MimeType, OcrError> {
    let path = path.as_ref();
    path.extension()
        .and_then(|e| e.to_str())
        .and_then(MimeType::from_extension)
        .ok_or_else(|| OcrError::UnsupportedFormat {
            name: path.display().to_string(),
        })
}

/// A document ready to be sent: its bytes and resolved MIME type.
#[derive(Clone, PartialEq, Eq)]
pub struct InputFile {
    /// Filename or path the bytes came from, for logs and messages.
    pub name: String,
    pub bytes: Vec<u8>,
    pub mime_type: MimeType,
}

impl fmt::Debug for InputFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputFile")
            .field("name", &self.name)
            .field("bytes", &format_args!("<{} bytes>", self.bytes.len()))
            .field("mime_type", &self.mime_type)
            .finish()
    }
}

impl InputFile {
    /// Wrap an in-memory buffer (e.g. a web upload) named `name`.
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Result<Self, OcrError> {
        let name = name.into();
        let mime_type = get_mime_type(&name)?;
        Ok(Self {
            name,
            bytes,
            mime_type,
        })
    }
}

/// Read a local file, resolving its MIME type first.
pub async fn read_file(path: impl AsRef<Path>) -> Result<InputFile, OcrError> {
    let path = path.as_ref();
    let mime_type = get_mime_type(path)?;

    let bytes = tokio::fs::read(path).await.map_err(|e| read_error(path, e))?;
    debug!(
        "Read {} ({} bytes, {})",
        path.display(),
        bytes.len(),
        mime_type
    );

    Ok(InputFile {
        name: path.display().to_string(),
        bytes,
        mime_type,
    })
}

fn read_error(path: &Path, e: std::io::Error) -> OcrError {
    let path: PathBuf = path.to_path_buf();
    match e.kind() {
        std::io::ErrorKind::NotFound => OcrError::FileNotFound { path },
        std::io::ErrorKind::PermissionDenied => OcrError::PermissionDenied { path },
        _ => OcrError::ReadFailed { path, source: e },
    }
}
