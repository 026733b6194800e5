use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::ScanError;
use crate::infer::{FALLBACK_COLUMN, infer_table_with_warnings, surviving_lines};
use crate::model::{Table, TableOrigin};
use crate::options::BuildOptions;
use crate::table_parse::{generated_columns, max_width, split_line_into_cells};
use crate::warning::{TableWarning, WarningCode};

/// How OCR text is arranged into a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum LayoutMode {
    /// One row per non-empty line.
    SingleColumn,
    /// Column detection with header keywords.
    #[default]
    AutoTable,
    /// The whole text in one cell.
    SingleCell,
    /// A user-declared column count.
    Manual {
        columns: NonZeroUsize,
        #[serde(default)]
        first_row_is_header: bool,
    },
}

/// Where a table comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TableSource {
    /// Raw text from an OCR engine.
    OcrText {
        text: String,
        #[serde(default)]
        layout: LayoutMode,
    },
    /// Headers and rows already structured by a vision model.
    Structured {
        #[serde(default)]
        headers: Vec<String>,
        #[serde(default)]
        rows: Vec<Vec<String>>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableReport {
    pub table: Table,
    pub warnings: Vec<TableWarning>,
}

fn single_column_table(text: &str) -> Table {
    let rows = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| vec![line.to_string()])
        .collect::<Vec<_>>();
    Table::new(vec![FALLBACK_COLUMN.to_string()], rows, TableOrigin::TextFallback)
}

fn single_cell_table(text: &str) -> Table {
    let rows = if text.trim().is_empty() {
        Vec::new()
    } else {
        vec![vec![text.to_string()]]
    };
    Table::new(vec![FALLBACK_COLUMN.to_string()], rows, TableOrigin::TextFallback)
}

fn note_reconciled_rows(rows: &[Vec<String>], width: usize, warnings: &mut Vec<TableWarning>) {
    for (index, row) in rows.iter().enumerate() {
        if row.len() != width {
            warn!(row = index, cells = row.len(), width, "row padded or truncated");
            warnings.push(
                TableWarning::new(
                    WarningCode::RowsReconciled,
                    format!("row had {} cells; reconciled to {width}", row.len()),
                )
                .with_row(index),
            );
        }
    }
}

fn manual_table(
    text: &str,
    columns: NonZeroUsize,
    first_row_is_header: bool,
    warnings: &mut Vec<TableWarning>,
) -> Table {
    let width = columns.get();
    let mut rows = surviving_lines(text)
        .into_iter()
        .map(|line| split_line_into_cells(line.trimmed))
        .collect::<Vec<_>>();

    let header = if first_row_is_header && !rows.is_empty() {
        let mut header = rows.remove(0);
        header.resize(width, String::new());
        for (index, name) in header.iter_mut().enumerate() {
            if name.is_empty() {
                *name = format!("Column {}", index + 1);
            }
        }
        header
    } else {
        generated_columns(width)
    };

    note_reconciled_rows(&rows, width, warnings);
    Table::new(header, rows, TableOrigin::Manual)
}

fn structured_table(
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    warnings: &mut Vec<TableWarning>,
) -> Table {
    let headers = if headers.is_empty() {
        generated_columns(max_width(&rows))
    } else {
        headers
    };
    note_reconciled_rows(&rows, headers.len(), warnings);
    Table::new(headers, rows, TableOrigin::Structured)
}

/// Builds a table from either source. Total: every input maps to a table.
#[must_use]
pub fn build_table(source: TableSource, options: &BuildOptions) -> TableReport {
    let mut warnings = Vec::new();
    let mut table = match source {
        TableSource::OcrText { text, layout } => {
            debug!(?layout, bytes = text.len(), "building table from OCR text");
            match layout {
                LayoutMode::AutoTable => {
                    let (table, inferred) = infer_table_with_warnings(&text);
                    warnings.extend(inferred);
                    table
                }
                LayoutMode::SingleColumn => single_column_table(&text),
                LayoutMode::SingleCell => single_cell_table(&text),
                LayoutMode::Manual {
                    columns,
                    first_row_is_header,
                } => manual_table(&text, columns, first_row_is_header, &mut warnings),
            }
        }
        TableSource::Structured { headers, rows } => {
            debug!(columns = headers.len(), rows = rows.len(), "accepting structured table");
            structured_table(headers, rows, &mut warnings)
        }
    };

    if options.evaluate_quantities {
        table.evaluate_quantity_columns();
    }

    TableReport { table, warnings }
}

fn strip_code_fence(response: &str) -> &str {
    let trimmed = response.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

fn cell_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[derive(Deserialize)]
struct StructuredResponse {
    #[serde(default)]
    headers: Vec<Value>,
    #[serde(default)]
    rows: Vec<Vec<Value>>,
}

/// Parses a vision model reply of the form `{"headers": [...], "rows": [[...]]}`,
/// optionally wrapped in a markdown code fence. Non-string cells are
/// stringified and `null` becomes an empty cell.
///
/// # Errors
///
/// Returns [`ScanError::StructuredJson`] when the reply is not that shape.
pub fn parse_structured_response(response: &str) -> Result<TableSource, ScanError> {
    let parsed: StructuredResponse = serde_json::from_str(strip_code_fence(response))?;
    Ok(TableSource::Structured {
        headers: parsed.headers.iter().map(cell_to_string).collect(),
        rows: parsed
            .rows
            .iter()
            .map(|row| row.iter().map(cell_to_string).collect())
            .collect(),
    })
}
