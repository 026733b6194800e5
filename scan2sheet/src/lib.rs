mod arith;
mod csv_out;
mod error;
mod infer;
mod layout;
mod model;
mod options;
mod session;
mod table_parse;
mod warning;
mod xlsx_out;

use std::path::Path;

use tracing::debug;

use crate::csv_out::{write_csv, write_csv_to_bytes};
use crate::xlsx_out::{write_xlsx, write_xlsx_to_bytes};

pub use arith::{ArithmeticError, auto_evaluate, evaluate, format_number};
pub use error::ScanError;
pub use infer::{FALLBACK_COLUMN, HEADER_KEYWORDS, infer_table, infer_table_with_warnings};
pub use layout::{LayoutMode, TableReport, TableSource, build_table, parse_structured_response};
pub use model::{ImageSize, RunMetadata, Table, TableOrigin};
pub use options::{
    BuildOptions, DEFAULT_FILENAME_PREFIX, ExportFormat, ExportOptions, export_filename,
};
pub use session::{SessionEvent, SessionState, apply};
pub use warning::{TableWarning, WarningCode};
pub use xlsx_out::{DATA_SHEET_NAME, MAX_CELL_CHARS, METADATA_SHEET_NAME};

fn check_delimiter(options: &ExportOptions) -> Result<(), ScanError> {
    if options.delimiter.is_ascii_alphanumeric() || options.delimiter == b'"' {
        return Err(ScanError::InvalidOption(format!(
            "delimiter '{}' cannot separate CSV fields",
            char::from(options.delimiter)
        )));
    }
    Ok(())
}

/// Writes `table` to `path` in `format`.
///
/// # Errors
///
/// Returns an error when the file cannot be written or the options are
/// unusable.
pub fn export_table(
    table: &Table,
    path: &Path,
    format: ExportFormat,
    options: &ExportOptions,
) -> Result<(), ScanError> {
    debug!(path = %path.display(), ?format, rows = table.row_count(), "exporting table");
    match format {
        ExportFormat::Csv => {
            check_delimiter(options)?;
            write_csv(path, table, options.delimiter)
        }
        ExportFormat::Xlsx => write_xlsx(path, table, options.metadata.as_ref()),
    }
}

/// Serializes `table` in `format` to an in-memory buffer.
///
/// # Errors
///
/// Returns an error when the workbook or CSV cannot be produced.
pub fn export_table_to_bytes(
    table: &Table,
    format: ExportFormat,
    options: &ExportOptions,
) -> Result<Vec<u8>, ScanError> {
    match format {
        ExportFormat::Csv => {
            check_delimiter(options)?;
            write_csv_to_bytes(table, options.delimiter)
        }
        ExportFormat::Xlsx => write_xlsx_to_bytes(table, options.metadata.as_ref()),
    }
}

#[cfg(test)]
mod tests {
    use super::{ExportFormat, ExportOptions, Table, export_table_to_bytes};

    #[test]
    fn rejects_alphanumeric_csv_delimiter() {
        let options = ExportOptions {
            delimiter: b'a',
            ..ExportOptions::default()
        };
        let err = export_table_to_bytes(&Table::empty(), ExportFormat::Csv, &options)
            .expect_err("letter delimiter should fail");
        assert!(err.to_string().contains("delimiter"));
    }

    #[test]
    fn xlsx_bytes_are_a_zip_archive() {
        let bytes = export_table_to_bytes(&Table::empty(), ExportFormat::Xlsx, &ExportOptions::default())
            .expect("workbook should serialize");
        assert!(bytes.starts_with(b"PK"));
    }
}
