//! Output kinds and the output dispatcher.
//!
//! [`write_output`] is the last pipeline stage: it takes the extracted text
//! and prints it, writes it to a file, or renders a spreadsheet. File writes
//! go through a sibling `.tmp` file and are moved into place with one
//! rename, so an interrupted run never leaves a half-written file.

use crate::error::OcrError;
use crate::pipeline::spreadsheet;
use encoding_rs::{Encoding, UTF_8};
use std::ffi::OsString;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Target format of a conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OutputKind {
    #[default]
    Text,
    Markdown,
    Csv,
    Html,
    /// `.xlsx` workbook rendered from Markdown tables.
    Spreadsheet,
}

impl OutputKind {
    pub const ALL: [OutputKind; 5] = [
        OutputKind::Text,
        OutputKind::Markdown,
        OutputKind::Csv,
        OutputKind::Html,
        OutputKind::Spreadsheet,
    ];

    /// File extension / CLI spelling.
    pub fn extension(self) -> &'static str {
        match self {
            OutputKind::Text => "txt",
            OutputKind::Markdown => "md",
            OutputKind::Csv => "csv",
            OutputKind::Html => "html",
            OutputKind::Spreadsheet => "xlsx",
        }
    }

    /// Parse an extension (without the dot, any case).
    pub fn from_extension(ext: &str) -> Option<OutputKind> {
        let ext = ext.to_ascii_lowercase();
        Self::ALL.into_iter().find(|k| k.extension() == ext)
    }

    /// Name of the format the model is asked to produce.
    pub fn prompt_format_name(self) -> &'static str {
        match self {
            OutputKind::Text => "plain text",
            OutputKind::Markdown | OutputKind::Spreadsheet => "Markdown",
            OutputKind::Csv => "CSV",
            OutputKind::Html => "HTML",
        }
    }

    /// Pick the output kind: explicit choice, else the output file's
    /// extension, else plain text.
    ///
    /// An output file with an unrecognised extension is written as plain text.
    pub fn resolve(explicit: Option<OutputKind>, output_path: Option<&Path>) -> OutputKind {
        if let Some(kind) = explicit {
            return kind;
        }
        let Some(path) = output_path else {
            return OutputKind::Text;
        };
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        OutputKind::from_extension(ext).unwrap_or_else(|| {
            warn!(
                "Unknown output extension '{}' for {}, writing plain text",
                ext,
                path.display()
            );
            OutputKind::Text
        })
    }
}

impl fmt::Display for OutputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Where the extracted content goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    Stdout,
    File(PathBuf),
}

impl Destination {
    pub fn from_option(path: Option<PathBuf>) -> Self {
        path.map_or(Destination::Stdout, Destination::File)
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Destination::Stdout => f.write_str("standard output"),
            Destination::File(p) => write!(f, "{}", p.display()),
        }
    }
}

/// Reject combinations that cannot be written. Called before any input is
/// read or any request is made.
pub fn validate_destination(kind: OutputKind, destination: &Destination) -> Result<(), OcrError> {
    if kind == OutputKind::Spreadsheet && *destination == Destination::Stdout {
        return Err(OcrError::SpreadsheetRequiresOutputPath);
    }
    Ok(())
}

/// Companion file holding the raw Markdown next to a spreadsheet:
/// `report.xlsx` → `report.xlsx.temp.md`.
pub fn companion_markdown_path(xlsx_path: &Path) -> PathBuf {
    let mut name: OsString = xlsx_path.as_os_str().to_owned();
    name.push(".temp.md");
    PathBuf::from(name)
}

/// Emit `content` as `kind` to `destination`, using `stdout` for
/// [`Destination::Stdout`].
pub fn write_output<W: Write>(
    content: &str,
    kind: OutputKind,
    destination: &Destination,
    stdout: &mut W,
) -> Result<(), OcrError> {
    validate_destination(kind, destination)?;

    match (kind, destination) {
        (_, Destination::Stdout) => {
            writeln!(stdout, "{content}")
                .and_then(|_| stdout.flush())
                .map_err(|e| OcrError::OutputWriteFailed {
                    path: PathBuf::from("<stdout>"),
                    source: e,
                })
        }
        (OutputKind::Spreadsheet, Destination::File(path)) => {
            spreadsheet::markdown_to_xlsx(content, path)?;
            let md_path = companion_markdown_path(path);
            write_atomic(&md_path, content.as_bytes())?;
            info!(
                "Wrote {} (Markdown source: {})",
                path.display(),
                md_path.display()
            );
            Ok(())
        }
        (OutputKind::Csv, Destination::File(path)) => {
            let encoding = locale_encoding();
            let bytes = encode_strict(content, encoding)?;
            write_atomic(path, &bytes)?;
            info!("Wrote {} ({})", path.display(), encoding.name());
            Ok(())
        }
        (_, Destination::File(path)) => {
            write_atomic(path, content.as_bytes())?;
            info!("Wrote {}", path.display());
            Ok(())
        }
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), OcrError> {
    let write_err = |source: std::io::Error| OcrError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    // Sibling temp file so the rename stays on one filesystem. A file we
    // replace keeps its permissions; a new one gets the umask default.
    let mut tmp_name: OsString = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);
    let existing = std::fs::metadata(path).ok().map(|m| m.permissions());

    let result = std::fs::write(&tmp_path, bytes)
        .and_then(|_| match existing {
            Some(perms) => std::fs::set_permissions(&tmp_path, perms),
            None => Ok(()),
        })
        .and_then(|_| std::fs::rename(&tmp_path, path));
    if let Err(e) = result {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(write_err(e));
    }
    Ok(())
}

// ── Locale encoding ──────────────────────────────────────────────────────

/// Encoding named by the process locale (`LC_ALL`, `LC_CTYPE`, `LANG`),
/// UTF-8 when none is set or the codeset is unknown.
pub fn locale_encoding() -> &'static Encoding {
    let locale = ["LC_ALL", "LC_CTYPE", "LANG"]
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|v| !v.is_empty());
    locale
        .as_deref()
        .and_then(encoding_for_locale)
        .unwrap_or(UTF_8)
}

/// Resolve the codeset part of `lang_TERRITORY.codeset@modifier`.
pub fn encoding_for_locale(locale: &str) -> Option<&'static Encoding> {
    let (_, rest) = locale.split_once('.')?;
    let codeset = rest.split('@').next().unwrap_or(rest);
    Encoding::for_label(codeset.as_bytes())
        .or_else(|| Encoding::for_label(normalise_codeset(codeset).as_bytes()))
}

// glibc spells some codesets without hyphens (`eucJP`, `utf8`).
fn normalise_codeset(codeset: &str) -> String {
    let lower = codeset.to_ascii_lowercase();
    match lower.as_str() {
        "utf8" => "utf-8".to_string(),
        "eucjp" => "euc-jp".to_string(),
        "euckr" => "euc-kr".to_string(),
        "sjis" => "shift_jis".to_string(),
        _ => lower,
    }
}

fn encode_strict(content: &str, encoding: &'static Encoding) -> Result<Vec<u8>, OcrError> {
    let (bytes, actual, had_errors) = encoding.encode(content);
    if had_errors {
        return Err(OcrError::EncodingFailed {
            encoding: actual.name(),
        });
    }
    Ok(bytes.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_from_extension() {
        assert_eq!(OutputKind::from_extension("xlsx"), Some(OutputKind::Spreadsheet));
        assert_eq!(OutputKind::from_extension("MD"), Some(OutputKind::Markdown));
        assert_eq!(OutputKind::from_extension("docx"), None);
    }

    #[test]
    fn resolve_prefers_explicit_then_extension_then_text() {
        assert_eq!(
            OutputKind::resolve(Some(OutputKind::Csv), Some(Path::new("a.xlsx"))),
            OutputKind::Csv
        );
        assert_eq!(
            OutputKind::resolve(None, Some(Path::new("Report.XLSX"))),
            OutputKind::Spreadsheet
        );
        assert_eq!(OutputKind::resolve(None, Some(Path::new("out.json"))), OutputKind::Text);
        assert_eq!(OutputKind::resolve(None, Some(Path::new("noext"))), OutputKind::Text);
        assert_eq!(OutputKind::resolve(None, None), OutputKind::Text);
    }

    #[test]
    fn spreadsheet_to_stdout_is_rejected() {
        let mut sink = Vec::new();
        let err = write_output("x", OutputKind::Spreadsheet, &Destination::Stdout, &mut sink)
            .unwrap_err();
        assert!(matches!(err, OcrError::SpreadsheetRequiresOutputPath));
        assert!(sink.is_empty());
    }

    #[test]
    fn stdout_gets_content_and_newline() {
        let mut sink = Vec::new();
        write_output("hello", OutputKind::Markdown, &Destination::Stdout, &mut sink).unwrap();
        assert_eq!(sink, b"hello\n");
    }

    #[test]
    fn file_output_is_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.html");
        let mut sink = Vec::new();
        write_output(
            "<p>日本語</p>",
            OutputKind::Html,
            &Destination::File(path.clone()),
            &mut sink,
        )
        .unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "<p>日本語</p>");
        assert!(sink.is_empty());
    }

    #[test]
    fn spreadsheet_writes_companion_markdown() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table.xlsx");
        let md = "| a | b |\n|---|---|\n| 1 | 2 |";
        let mut sink = Vec::new();
        write_output(md, OutputKind::Spreadsheet, &Destination::File(path.clone()), &mut sink)
            .unwrap();
        assert!(path.exists());
        let companion = dir.path().join("table.xlsx.temp.md");
        assert_eq!(companion_markdown_path(&path), companion);
        assert_eq!(std::fs::read_to_string(companion).unwrap(), md);
    }

    #[cfg(unix)]
    #[test]
    fn new_file_gets_umask_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let reference = dir.path().join("reference.html");
        std::fs::write(&reference, "x").unwrap();
        let path = dir.path().join("out.html");
        write_output("<p>x</p>", OutputKind::Html, &Destination::File(path.clone()), &mut Vec::<u8>::new())
            .unwrap();

        let mode = |p: &Path| std::fs::metadata(p).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode(&path), mode(&reference));
        assert!(!dir.path().join("out.html.tmp").exists());
    }

    #[cfg(unix)]
    #[test]
    fn overwrite_keeps_existing_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.md");
        std::fs::write(&path, "old").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o640)).unwrap();

        write_output("new", OutputKind::Markdown, &Destination::File(path.clone()), &mut Vec::<u8>::new())
            .unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new");
        assert_eq!(std::fs::metadata(&path).unwrap().permissions().mode() & 0o777, 0o640);
    }

    #[test]
    fn write_into_missing_directory_fails() {
        let mut sink = Vec::new();
        let err = write_output(
            "x",
            OutputKind::Text,
            &Destination::File(PathBuf::from("/definitely/not/a/dir/out.txt")),
            &mut sink,
        )
        .unwrap_err();
        assert!(matches!(err, OcrError::OutputWriteFailed { .. }));
    }

    #[test]
    fn locale_codesets() {
        assert_eq!(encoding_for_locale("ja_JP.UTF-8"), Some(UTF_8));
        assert_eq!(encoding_for_locale("en_US.utf8"), Some(UTF_8));
        assert_eq!(
            encoding_for_locale("ja_JP.eucJP"),
            Some(encoding_rs::EUC_JP)
        );
        assert_eq!(
            encoding_for_locale("ja_JP.SJIS"),
            Some(encoding_rs::SHIFT_JIS)
        );
        assert_eq!(
            encoding_for_locale("de_DE.ISO-8859-15@euro"),
            Some(encoding_rs::ISO_8859_15)
        );
        assert_eq!(encoding_for_locale("C"), None);
        assert_eq!(encoding_for_locale("xx_XX.nonsense"), None);
    }

    #[test]
    fn strict_encoding() {
        let sjis = encode_strict("品名,数量", encoding_rs::SHIFT_JIS).unwrap();
        let (decoded, _, _) = encoding_rs::SHIFT_JIS.decode(&sjis);
        assert_eq!(decoded, "品名,数量");
        assert!(matches!(
            encode_strict("emoji 😀", encoding_rs::SHIFT_JIS),
            Err(OcrError::EncodingFailed { .. })
        ));
    }
}
