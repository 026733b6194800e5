use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),

    #[error("XLSX write error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("invalid structured table: {0}")]
    StructuredJson(#[from] serde_json::Error),

    #[error("invalid option: {0}")]
    InvalidOption(String),

    #[error(
        "cell at row {row}, column {column} has {chars} characters; XLSX cells hold at most 32767 (export as CSV instead)"
    )]
    CellTooLong {
        row: usize,
        column: usize,
        chars: usize,
    },
}
