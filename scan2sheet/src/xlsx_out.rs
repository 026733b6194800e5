use std::path::Path;

use rust_xlsxwriter::{ColNum, Format, RowNum, Workbook, Worksheet};

use crate::arith::format_number;
use crate::error::ScanError;
use crate::model::{RunMetadata, Table};

pub const DATA_SHEET_NAME: &str = "Extracted Data";
pub const METADATA_SHEET_NAME: &str = "Metadata";
/// Longest string Excel stores in one cell.
pub const MAX_CELL_CHARS: usize = 32_767;

/// A cell becomes a number only when the number prints back as the same
/// text. Leading zeros, trailing zeros (`9.50`) and digit strings beyond
/// `f64` precision stay text.
fn numeric_value(cell: &str) -> Option<f64> {
    let trimmed = cell.trim();
    let digits = trimmed.strip_prefix('-').unwrap_or(trimmed);
    let has_leading_zero = digits.len() > 1
        && digits.starts_with('0')
        && !digits.starts_with("0.");
    if trimmed.is_empty() || trimmed.starts_with('+') || has_leading_zero {
        return None;
    }
    if !trimmed
        .chars()
        .all(|ch| ch.is_ascii_digit() || matches!(ch, '.' | '-'))
    {
        return None;
    }
    trimmed
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite() && format_number(*value) == trimmed)
}

fn check_cell_length(row: usize, column: usize, cell: &str) -> Result<(), ScanError> {
    let chars = cell.chars().count();
    if chars > MAX_CELL_CHARS {
        return Err(ScanError::CellTooLong { row, column, chars });
    }
    Ok(())
}

fn position(row: usize, column: usize) -> Result<(RowNum, ColNum), ScanError> {
    let row = RowNum::try_from(row)
        .map_err(|_| ScanError::InvalidOption(format!("row {row} exceeds the sheet limit")))?;
    let column = ColNum::try_from(column).map_err(|_| {
        ScanError::InvalidOption(format!("column {column} exceeds the sheet limit"))
    })?;
    Ok((row, column))
}

fn write_header(worksheet: &mut Worksheet, columns: &[String]) -> Result<(), ScanError> {
    let header_format = Format::new().set_bold();
    for (index, name) in columns.iter().enumerate() {
        check_cell_length(0, index + 1, name)?;
        let (row, column) = position(0, index)?;
        worksheet.write_string_with_format(row, column, name, &header_format)?;
    }
    Ok(())
}

fn write_grid(
    worksheet: &mut Worksheet,
    columns: &[String],
    rows: &[Vec<String>],
) -> Result<(), ScanError> {
    write_header(worksheet, columns)?;

    for (row_index, cells) in rows.iter().enumerate() {
        for (col_index, cell) in cells.iter().enumerate() {
            if cell.is_empty() {
                continue;
            }
            check_cell_length(row_index + 1, col_index + 1, cell)?;
            let (row, column) = position(row_index + 1, col_index)?;
            match numeric_value(cell) {
                Some(value) => worksheet.write_number(row, column, value)?,
                None => worksheet.write_string(row, column, cell)?,
            };
        }
    }

    Ok(())
}

fn build_workbook(table: &Table, metadata: Option<&RunMetadata>) -> Result<Workbook, ScanError> {
    let mut workbook = Workbook::new();

    let data_sheet = workbook.add_worksheet();
    data_sheet.set_name(DATA_SHEET_NAME)?;
    write_grid(data_sheet, table.columns(), table.rows())?;

    if let Some(metadata) = metadata {
        let columns = ["Metadata".to_string(), "Value".to_string()];
        let rows = metadata
            .entries()
            .into_iter()
            .map(|(label, value)| vec![label.to_string(), value])
            .collect::<Vec<_>>();

        let metadata_sheet = workbook.add_worksheet();
        metadata_sheet.set_name(METADATA_SHEET_NAME)?;
        write_header(metadata_sheet, &columns)?;
        // Always text, so a numeric file name is not turned into a number.
        for (row_index, cells) in rows.iter().enumerate() {
            for (col_index, cell) in cells.iter().enumerate() {
                let (row, column) = position(row_index + 1, col_index)?;
                metadata_sheet.write_string(row, column, cell)?;
            }
        }
    }

    Ok(workbook)
}

pub(crate) fn write_xlsx(
    path: &Path,
    table: &Table,
    metadata: Option<&RunMetadata>,
) -> Result<(), ScanError> {
    let mut workbook = build_workbook(table, metadata)?;
    workbook.save(path)?;
    Ok(())
}

pub(crate) fn write_xlsx_to_bytes(
    table: &Table,
    metadata: Option<&RunMetadata>,
) -> Result<Vec<u8>, ScanError> {
    let mut workbook = build_workbook(table, metadata)?;
    Ok(workbook.save_to_buffer()?)
}
