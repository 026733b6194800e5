//! Best-effort table inference over raw OCR text.
//!
//! Lines are split on whitespace runs, tabs and pipes. The first line that
//! mentions a typical invoice column title becomes the header; rows are then
//! padded or truncated to a single width. Text with no column structure at
//! all degrades to one `Extracted Text` column so every input yields a table.

use tracing::debug;

use crate::model::{Table, TableOrigin};
use crate::table_parse::{
    collapse_whitespace, generated_columns, is_punctuation_noise, max_width,
    split_line_into_cells,
};
use crate::warning::{TableWarning, WarningCode};

pub const HEADER_KEYWORDS: [&str; 7] = [
    "item",
    "name",
    "qty",
    "quantity",
    "unit",
    "description",
    "product",
];

pub const FALLBACK_COLUMN: &str = "Extracted Text";

/// Cells padded onto a lone value that follows a detected header.
const SPARSE_ROW_PADDING: usize = 2;

pub(crate) struct SurvivingLine<'a> {
    pub(crate) trimmed: &'a str,
    pub(crate) collapsed: String,
}

/// Trims lines, drops blank ones and stray punctuation.
pub(crate) fn surviving_lines(text: &str) -> Vec<SurvivingLine<'_>> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|trimmed| SurvivingLine {
            trimmed,
            collapsed: collapse_whitespace(trimmed),
        })
        .filter(|line| !is_punctuation_noise(&line.collapsed))
        .collect()
}

fn mentions_header_keyword(line: &str) -> bool {
    let lowered = line.to_lowercase();
    HEADER_KEYWORDS
        .iter()
        .any(|keyword| lowered.contains(keyword))
}

/// Infers a table from OCR text. Never fails; empty or noise-only input
/// yields an empty table.
#[must_use]
pub fn infer_table(text: &str) -> Table {
    infer_table_with_warnings(text).0
}

/// Same as [`infer_table`], also reporting what the heuristics had to guess.
#[must_use]
pub fn infer_table_with_warnings(text: &str) -> (Table, Vec<TableWarning>) {
    let mut warnings = Vec::new();
    let lines = surviving_lines(text);
    if lines.is_empty() {
        warnings.push(TableWarning::new(
            WarningCode::NoTextFound,
            "no text survived preprocessing",
        ));
        return (Table::empty(), warnings);
    }

    let mut header: Option<Vec<String>> = None;
    let mut data_rows: Vec<Vec<String>> = Vec::new();

    for (index, line) in lines.iter().enumerate() {
        let cells = split_line_into_cells(line.trimmed);

        if header.is_none() && mentions_header_keyword(&line.collapsed) {
            debug!(line = index, cells = cells.len(), "accepted header row");
            header = Some(cells);
        } else if cells.len() >= 2 {
            data_rows.push(cells);
        } else if cells.len() == 1 && header.is_some() {
            let mut row = cells;
            row.extend(std::iter::repeat_n(String::new(), SPARSE_ROW_PADDING));
            data_rows.push(row);
        } else {
            debug!(line = index, "discarded line before table start");
        }
    }

    if data_rows.is_empty() {
        debug!(lines = lines.len(), "no data rows; falling back to single column");
        warnings.push(TableWarning::new(
            WarningCode::FellBackToSingleColumn,
            "no column structure found; one row per line",
        ));
        let rows = lines
            .into_iter()
            .map(|line| vec![line.collapsed])
            .collect::<Vec<_>>();
        let table = Table::new(vec![FALLBACK_COLUMN.to_string()], rows, TableOrigin::TextFallback);
        return (table, warnings);
    }

    let table = match header {
        Some(columns) => Table::new(columns, data_rows, TableOrigin::DetectedHeader),
        None => {
            warnings.push(TableWarning::new(
                WarningCode::NoHeaderDetected,
                "no header line found; generated column names",
            ));
            let width = max_width(&data_rows);
            Table::new(generated_columns(width), data_rows, TableOrigin::GeneratedHeader)
        }
    };

    (table, warnings)
}
