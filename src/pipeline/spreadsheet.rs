//! Markdown → spreadsheet rendering.
//!
//! The model is asked for Markdown; this module lays that Markdown out as a
//! single worksheet. Only three constructs are recognised:
//!
//! * headings (`# Title`): bold text in column A
//! * pipe tables: a styled, bordered block starting at column B
//! * any other non-blank line: plain text in column A
//!
//! Rendering is split in two steps so layout can be tested without reading
//! xlsx files back: [`render_markdown`] produces a [`SpreadsheetDocument`]
//! (positioned cells + column widths), and [`SpreadsheetDocument::save`]
//! writes it with `rust_xlsxwriter`.
//!
//! ## Scanner
//!
//! ```text
//!            table row                      heading / text / blank / EOF
//! Scanning ───────────▶ InTable(rows) ─────────────────────────────────▶ flush ─▶ Scanning
//!                          │   ▲
//!                          └───┘ table row (separator rows are dropped)
//! ```
//!
//! Rows and columns below are 0-based (row 0 = Excel row 1, column 1 =
//! Excel column B).

use crate::error::OcrError;
use once_cell::sync::Lazy;
use regex::Regex;
use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, Workbook};
use std::path::Path;
use tracing::{debug, warn};

/// Widest a table column may become.
pub const MAX_COLUMN_WIDTH: usize = 50;

/// Header fill colour (pale green).
pub const HEADER_FILL: u32 = 0xEBF1DE;

/// Column for headings and plain lines.
const TEXT_COLUMN: u16 = 0;

/// First column of every table.
const TABLE_FIRST_COLUMN: u16 = 1;

/// Last column an xlsx worksheet can hold (XFD).
pub const LAST_XLSX_COLUMN: u16 = 16_383;

static RE_SEPARATOR_FIELD: Lazy<Regex> = Lazy::new(|| Regex::new(r"^:?-+:?$").unwrap());

/// How a cell is formatted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellStyle {
    /// Standalone line in column A.
    Text,
    /// Heading in column A, bold.
    Heading,
    /// Table header: bold, filled, centred, bordered.
    TableHeader,
    /// Table body: centred, wrapped, bordered.
    TableData,
    /// Body cell to the right of the header's last column: centred, wrapped,
    /// outside the border.
    TableOverflow,
}

/// One written cell. `value == None` is a bordered blank that fills a short
/// table row out to the header width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub row: u32,
    pub col: u16,
    pub value: Option<String>,
    pub style: CellStyle,
}

/// Rendered worksheet, ready to be saved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpreadsheetDocument {
    pub cells: Vec<Cell>,
    /// `(column, width)` for every column from B to the last used column.
    pub column_widths: Vec<(u16, usize)>,
}

impl SpreadsheetDocument {
    /// Cells in the given row, left to right.
    pub fn row(&self, row: u32) -> Vec<&Cell> {
        let mut cells: Vec<&Cell> = self.cells.iter().filter(|c| c.row == row).collect();
        cells.sort_by_key(|c| c.col);
        cells
    }

    /// Look up a single cell.
    pub fn cell(&self, row: u32, col: u16) -> Option<&Cell> {
        self.cells.iter().find(|c| c.row == row && c.col == col)
    }

    /// Write the document as a single-sheet workbook at `path`.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), OcrError> {
        let path = path.as_ref();
        let fail = |e: rust_xlsxwriter::XlsxError| OcrError::SpreadsheetFailed {
            path: path.to_path_buf(),
            detail: e.to_string(),
        };

        let heading = Format::new().set_bold();
        let border = Format::new()
            .set_border(FormatBorder::Thin)
            .set_align(FormatAlign::Center)
            .set_align(FormatAlign::VerticalCenter)
            .set_text_wrap();
        let header = Format::new()
            .set_bold()
            .set_background_color(Color::RGB(HEADER_FILL))
            .set_align(FormatAlign::Center)
            .set_align(FormatAlign::VerticalCenter)
            .set_border(FormatBorder::Thin);
        let overflow = Format::new()
            .set_align(FormatAlign::Center)
            .set_align(FormatAlign::VerticalCenter)
            .set_text_wrap();

        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();

        for cell in &self.cells {
            let format = match cell.style {
                CellStyle::Text => None,
                CellStyle::Heading => Some(&heading),
                CellStyle::TableHeader => Some(&header),
                CellStyle::TableData => Some(&border),
                CellStyle::TableOverflow => Some(&overflow),
            };
            match (&cell.value, format) {
                (Some(v), Some(f)) => {
                    sheet
                        .write_string_with_format(cell.row, cell.col, v, f)
                        .map_err(fail)?;
                }
                (Some(v), None) => {
                    sheet.write_string(cell.row, cell.col, v).map_err(fail)?;
                }
                (None, Some(f)) => {
                    sheet.write_blank(cell.row, cell.col, f).map_err(fail)?;
                }
                (None, None) => {}
            }
        }

        for &(col, width) in &self.column_widths {
            sheet.set_column_width(col, width as f64).map_err(fail)?;
        }

        workbook.save(path).map_err(fail)?;
        debug!(
            "Saved spreadsheet {} ({} cells)",
            path.display(),
            self.cells.len()
        );
        Ok(())
    }
}

/// `true` if every field is a Markdown header-separator field
/// (optional colon, dashes, optional colon).
pub fn is_markdown_table_separator<S: AsRef<str>>(fields: &[S]) -> bool {
    fields
        .iter()
        .all(|f| RE_SEPARATOR_FIELD.is_match(f.as_ref()))
}

/// Width for a column whose longest cell has `max_len` characters.
pub fn column_width(max_len: usize) -> usize {
    (max_len + 2).min(MAX_COLUMN_WIDTH)
}

/// Split a `|`-delimited line into trimmed cell values.
///
/// The fields before the first and after the last pipe are dropped;
/// `<br>` / `<BR>` become embedded newlines.
fn split_table_row(line: &str) -> Vec<String> {
    let fields: Vec<&str> = line.split('|').collect();
    let inner = match fields.len() {
        0..=2 => &[][..],
        n => &fields[1..n - 1],
    };
    inner
        .iter()
        .map(|f| f.trim().replace("<br>", "\n").replace("<BR>", "\n"))
        .collect()
}

/// Heading text if `line` is `#`… followed by a space.
fn heading_text(line: &str) -> Option<&str> {
    let rest = line.trim_start_matches('#');
    let level = line.len() - rest.len();
    if level > 0 && rest.starts_with(' ') {
        Some(rest.trim())
    } else {
        None
    }
}

enum ScanState {
    Scanning,
    InTable(Vec<Vec<String>>),
}

struct Renderer {
    doc: SpreadsheetDocument,
    row: u32,
    state: ScanState,
}

impl Renderer {
    fn new() -> Self {
        Self {
            doc: SpreadsheetDocument::default(),
            row: 0,
            state: ScanState::Scanning,
        }
    }

    fn line(&mut self, raw: &str) {
        let line = raw.trim();

        if let Some(text) = heading_text(line) {
            self.flush();
            self.standalone(text, CellStyle::Heading);
        } else if line.starts_with('|') {
            let fields = split_table_row(line);
            if is_markdown_table_separator(&fields) {
                return;
            }
            match &mut self.state {
                ScanState::InTable(rows) => rows.push(fields),
                ScanState::Scanning => self.state = ScanState::InTable(vec![fields]),
            }
        } else {
            self.flush();
            if !line.is_empty() {
                self.standalone(line, CellStyle::Text);
            }
        }
    }

    fn standalone(&mut self, text: &str, style: CellStyle) {
        self.doc.cells.push(Cell {
            row: self.row,
            col: TEXT_COLUMN,
            value: Some(text.to_string()),
            style,
        });
        self.row += 1;
    }

    /// Write the open table block, if any, and return to `Scanning`.
    fn flush(&mut self) {
        let ScanState::InTable(rows) = std::mem::replace(&mut self.state, ScanState::Scanning)
        else {
            return;
        };
        let start = self.row;
        let width = rows[0].len();

        let mut dropped = 0usize;

        for (offset, fields) in rows.iter().enumerate() {
            let row = start + offset as u32;
            let is_header = offset == 0;
            for (i, value) in fields.iter().enumerate() {
                let Some(col) = table_column(i) else {
                    dropped += fields.len() - i;
                    break;
                };
                let style = if is_header {
                    CellStyle::TableHeader
                } else if i < width {
                    CellStyle::TableData
                } else {
                    CellStyle::TableOverflow
                };
                self.doc.cells.push(Cell {
                    row,
                    col,
                    value: Some(value.clone()),
                    style,
                });
            }
            // Pad short rows so the border rectangle is closed.
            for col in (fields.len()..width).map_while(table_column) {
                self.doc.cells.push(Cell {
                    row,
                    col,
                    value: None,
                    style: CellStyle::TableData,
                });
            }
        }

        if dropped > 0 {
            warn!(
                "Table at row {}: {} cells past the last worksheet column were dropped",
                start + 1,
                dropped
            );
        }
        debug!(
            "Table at row {}: {} columns, {} data rows",
            start + 1,
            width,
            rows.len() - 1
        );
        self.row += rows.len() as u32 + 1;
    }

    fn finish(mut self) -> SpreadsheetDocument {
        self.flush();
        self.doc.column_widths = column_widths(&self.doc.cells);
        self.doc
    }
}

/// Worksheet column of the `i`-th table field, `None` past the last column.
fn table_column(i: usize) -> Option<u16> {
    u16::try_from(i)
        .ok()
        .and_then(|i| TABLE_FIRST_COLUMN.checked_add(i))
        .filter(|&col| col <= LAST_XLSX_COLUMN)
}

fn column_widths(cells: &[Cell]) -> Vec<(u16, usize)> {
    let Some(last) = cells.iter().map(|c| c.col).max() else {
        return Vec::new();
    };
    let mut longest = vec![0usize; usize::from(last) + 1];
    for cell in cells {
        if let Some(value) = &cell.value {
            let len = &mut longest[usize::from(cell.col)];
            *len = (*len).max(value.chars().count());
        }
    }
    (TABLE_FIRST_COLUMN..=last)
        .map(|col| (col, column_width(longest[usize::from(col)])))
        .collect()
}

/// Lay out Markdown text as a worksheet.
pub fn render_markdown(markdown: &str) -> SpreadsheetDocument {
    let mut renderer = Renderer::new();
    for line in markdown.lines() {
        renderer.line(line);
    }
    renderer.finish()
}

/// Render `markdown` and save it as an xlsx workbook at `path`.
pub fn markdown_to_xlsx(markdown: &str, path: impl AsRef<Path>) -> Result<(), OcrError> {
    render_markdown(markdown).save(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(doc: &SpreadsheetDocument, row: u32) -> Vec<Option<&str>> {
        doc.row(row).into_iter().map(|c| c.value.as_deref()).collect()
    }

    #[test]
    fn separator_detection() {
        assert!(is_markdown_table_separator(&["---", ":--:", "--:"]));
        assert!(is_markdown_table_separator(&[":---"]));
        assert!(!is_markdown_table_separator(&["---", "abc"]));
        assert!(!is_markdown_table_separator(&["- -"]));
        assert!(!is_markdown_table_separator(&["::"]));
        assert!(!is_markdown_table_separator(&[""]));
    }

    #[test]
    fn width_is_capped() {
        assert_eq!(column_width(60), 50);
        assert_eq!(column_width(48), 50);
        assert_eq!(column_width(10), 12);
        assert_eq!(column_width(0), 2);
    }

    #[test]
    fn heading_detection() {
        assert_eq!(heading_text("# Title"), Some("Title"));
        assert_eq!(heading_text("### Deep  "), Some("Deep"));
        assert_eq!(heading_text("#hashtag"), None);
        assert_eq!(heading_text("plain"), None);
    }

    #[test]
    fn row_splitting() {
        assert_eq!(split_table_row("| a | b |"), vec!["a", "b"]);
        assert_eq!(split_table_row("|x<br>y|z<BR>w|"), vec!["x\ny", "z\nw"]);
        assert_eq!(split_table_row("|"), Vec::<String>::new());
        assert_eq!(split_table_row("| || c |"), vec!["", "", "c"]);
    }

    #[test]
    fn two_column_table_renders_header_and_two_rows() {
        let md = "| Name | Qty |\n|:---|---:|\n| apple | 3 |\n| pear | 5 |";
        let doc = render_markdown(md);

        assert_eq!(doc.cells.len(), 6, "separator must contribute no cells");
        assert_eq!(values(&doc, 0), vec![Some("Name"), Some("Qty")]);
        assert_eq!(values(&doc, 1), vec![Some("apple"), Some("3")]);
        assert_eq!(values(&doc, 2), vec![Some("pear"), Some("5")]);
        assert!(doc.row(0).iter().all(|c| c.style == CellStyle::TableHeader));
        assert!(doc.row(1).iter().all(|c| c.style == CellStyle::TableData));
        assert!(doc.row(2).iter().all(|c| c.style == CellStyle::TableData));
        assert_eq!(doc.cell(0, 1).map(|c| c.col), Some(TABLE_FIRST_COLUMN));
        assert!(doc.cells.iter().all(|c| c.col >= TABLE_FIRST_COLUMN));
    }

    #[test]
    fn br_becomes_newline() {
        let doc = render_markdown("| Address |\n|---|\n| 1-2-3 Chiyoda<br>Tokyo |");
        assert_eq!(
            doc.cell(1, 1).and_then(|c| c.value.as_deref()),
            Some("1-2-3 Chiyoda\nTokyo")
        );
    }

    #[test]
    fn headings_and_text_use_column_a_and_advance_one_row() {
        let doc = render_markdown("# Invoice\nNo. 42\n\n## Items");
        assert_eq!(
            doc.cell(0, 0).map(|c| (c.value.as_deref(), c.style)),
            Some((Some("Invoice"), CellStyle::Heading))
        );
        assert_eq!(
            doc.cell(1, 0).map(|c| (c.value.as_deref(), c.style)),
            Some((Some("No. 42"), CellStyle::Text))
        );
        // The blank line outside a table does not advance the cursor.
        assert_eq!(
            doc.cell(2, 0).map(|c| c.value.as_deref()),
            Some(Some("Items"))
        );
        assert!(doc.column_widths.is_empty());
    }

    #[test]
    fn table_flush_leaves_a_blank_row() {
        let md = "# Title\n| a | b |\n|---|---|\n| 1 | 2 |\nafter";
        let doc = render_markdown(md);
        // Title at 0, table rows at 1..=2, blank at 3, "after" at 4.
        assert_eq!(values(&doc, 1), vec![Some("a"), Some("b")]);
        assert_eq!(values(&doc, 2), vec![Some("1"), Some("2")]);
        assert!(doc.row(3).is_empty());
        assert_eq!(values(&doc, 4), vec![Some("after")]);
    }

    #[test]
    fn heading_closes_open_table() {
        let doc = render_markdown("| h |\n| v |\n# Next");
        assert_eq!(doc.cell(0, 1).map(|c| c.style), Some(CellStyle::TableHeader));
        assert_eq!(doc.cell(1, 1).map(|c| c.style), Some(CellStyle::TableData));
        assert_eq!(
            doc.cell(3, 0).map(|c| (c.value.as_deref(), c.style)),
            Some((Some("Next"), CellStyle::Heading))
        );
    }

    #[test]
    fn blank_line_closes_table_and_next_rows_start_a_new_header() {
        let doc = render_markdown("| a |\n| 1 |\n\n| b |\n| 2 |");
        assert_eq!(doc.cell(0, 1).map(|c| c.style), Some(CellStyle::TableHeader));
        assert_eq!(
            doc.cell(3, 1).map(|c| (c.value.as_deref(), c.style)),
            Some((Some("b"), CellStyle::TableHeader))
        );
        assert_eq!(doc.cell(4, 1).map(|c| c.style), Some(CellStyle::TableData));
    }

    #[test]
    fn header_only_table_still_renders() {
        let doc = render_markdown("| Only | Header |\n|---|---|");
        assert_eq!(doc.cells.len(), 2);
        assert!(doc.cells.iter().all(|c| c.style == CellStyle::TableHeader));
    }

    #[test]
    fn lone_separator_never_opens_a_table() {
        let doc = render_markdown("|---|---|\ntext");
        assert_eq!(doc.cells.len(), 1);
        assert_eq!(
            doc.cell(0, 0).map(|c| c.value.as_deref()),
            Some(Some("text"))
        );
    }

    #[test]
    fn short_rows_are_padded_and_long_rows_overflow() {
        let doc = render_markdown("| a | b | c |\n| 1 |\n| 1 | 2 | 3 | 4 |");
        assert_eq!(values(&doc, 1), vec![Some("1"), None, None]);
        assert!(doc.row(1).iter().all(|c| c.style == CellStyle::TableData));
        assert_eq!(doc.cell(2, 4).map(|c| c.style), Some(CellStyle::TableOverflow));
        assert_eq!(doc.cell(2, 3).map(|c| c.style), Some(CellStyle::TableData));
    }

    #[test]
    fn fields_past_the_last_column_are_dropped() {
        assert_eq!(table_column(0), Some(1));
        assert_eq!(table_column(16_382), Some(LAST_XLSX_COLUMN));
        assert_eq!(table_column(16_383), None);
        assert_eq!(table_column(70_000), None);

        let wide = format!("|{}", "x|".repeat(70_000));
        let doc = render_markdown(&format!("| h |\n|---|\n{wide}"));
        let last = doc.cells.iter().map(|c| c.col).max().unwrap();
        assert_eq!(last, LAST_XLSX_COLUMN);
        assert_eq!(doc.row(1).len(), LAST_XLSX_COLUMN as usize);
        assert_eq!(doc.cell(1, 1).unwrap().value.as_deref(), Some("x"));
        assert_eq!(doc.column_widths.len(), LAST_XLSX_COLUMN as usize);
    }

    #[test]
    fn column_widths_follow_longest_cell() {
        let long = "x".repeat(60);
        let md = format!("| short | h |\n|---|---|\n| {long} | 1234567890 |");
        let doc = render_markdown(&md);
        assert_eq!(doc.column_widths, vec![(1, 50), (2, 12)]);
    }

    #[test]
    fn column_a_text_does_not_affect_widths() {
        let doc = render_markdown(&format!("{}\n| ab |", "y".repeat(80)));
        assert_eq!(doc.column_widths, vec![(1, 4)]);
    }

    #[test]
    fn save_writes_xlsx_zip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.xlsx");
        markdown_to_xlsx("# T\n| a | b |\n|---|---|\n| 1 |", &path).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..2], b"PK", "xlsx is a zip container");
    }

    #[test]
    fn save_into_missing_directory_fails() {
        let err = markdown_to_xlsx("x", "/definitely/not/a/dir/out.xlsx").unwrap_err();
        assert!(matches!(err, OcrError::SpreadsheetFailed { .. }));
    }
}
