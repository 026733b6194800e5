use std::io::Write;
use std::path::Path;

use csv::{Writer, WriterBuilder};

use crate::error::ScanError;
use crate::model::Table;

fn write_records<W: Write>(writer: &mut Writer<W>, table: &Table) -> Result<(), ScanError> {
    if table.columns().is_empty() {
        return Ok(());
    }

    writer.write_record(table.columns())?;
    for row in table.rows() {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}

pub(crate) fn write_csv(path: &Path, table: &Table, delimiter: u8) -> Result<(), ScanError> {
    let mut writer = WriterBuilder::new().delimiter(delimiter).from_path(path)?;
    write_records(&mut writer, table)
}

pub(crate) fn write_csv_to_bytes(table: &Table, delimiter: u8) -> Result<Vec<u8>, ScanError> {
    let mut writer = WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(Vec::<u8>::new());
    write_records(&mut writer, table)?;

    writer
        .into_inner()
        .map_err(|error| ScanError::Io(error.into_error()))
}
