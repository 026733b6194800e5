use std::io::Write;
use std::process::{Command, Stdio};

use calamine::{Data, Reader, Xlsx, open_workbook};
use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use scan2sheet::{
    BuildOptions, DATA_SHEET_NAME, ExportFormat, ExportOptions, ImageSize, LayoutMode,
    METADATA_SHEET_NAME, RunMetadata, Table, TableOrigin, TableSource, build_table, export_table,
};
use tempfile::tempdir;

const INVOICE_TEXT: &str = "\
ACME OFFICE SUPPLY
Invoice #00417

Item            Qty     Unit Price
Stapler         2+1     7.99
Paper A4        10      4.50
  --
Thank you for your business
";

fn invoice_report() -> scan2sheet::TableReport {
    build_table(
        TableSource::OcrText {
            text: INVOICE_TEXT.to_string(),
            layout: LayoutMode::AutoTable,
        },
        &BuildOptions::default(),
    )
}

fn read_sheet(path: &std::path::Path, name: &str) -> Vec<Vec<Data>> {
    let mut workbook: Xlsx<_> = open_workbook(path).expect("workbook should open");
    let range = workbook
        .worksheet_range(name)
        .expect("worksheet should exist");
    range.rows().map(<[Data]>::to_vec).collect()
}

#[test]
fn invoice_text_becomes_header_and_rows() {
    let report = invoice_report();
    let table = &report.table;

    assert_eq!(table.origin(), TableOrigin::DetectedHeader);
    assert_eq!(table.columns(), ["Item", "Qty", "Unit Price"]);
    assert_eq!(
        table.rows(),
        [
            vec!["Stapler".to_string(), "2+1".to_string(), "7.99".to_string()],
            vec!["Paper A4".to_string(), "10".to_string(), "4.50".to_string()],
            vec![
                "Thank you for your business".to_string(),
                String::new(),
                String::new()
            ],
        ]
    );
}

#[test]
fn writes_csv_file() {
    let dir = tempdir().expect("tempdir should be created");
    let output = dir.path().join("invoice.csv");

    let report = invoice_report();
    export_table(&report.table, &output, ExportFormat::Csv, &ExportOptions::default())
        .expect("csv export should succeed");

    let csv = std::fs::read_to_string(&output).expect("CSV should be readable");
    assert!(csv.starts_with("Item,Qty,Unit Price\n"), "unexpected CSV: {csv:?}");
    assert!(csv.contains("Stapler,2+1,7.99"), "unexpected CSV: {csv:?}");
}

#[test]
fn writes_xlsx_with_metadata_sheet() {
    let dir = tempdir().expect("tempdir should be created");
    let output = dir.path().join("invoice.xlsx");

    let extracted_at = NaiveDate::from_ymd_opt(2024, 3, 9)
        .and_then(|date| date.and_hms_opt(8, 5, 0))
        .expect("valid timestamp");
    let options = ExportOptions {
        metadata: Some(
            RunMetadata::new("invoice.jpg", extracted_at).with_image_size(ImageSize {
                width: 1240,
                height: 1754,
            }),
        ),
        ..ExportOptions::default()
    };

    let report = invoice_report();
    export_table(&report.table, &output, ExportFormat::Xlsx, &options)
        .expect("xlsx export should succeed");

    let data = read_sheet(&output, DATA_SHEET_NAME);
    assert_eq!(data[0][0], Data::String("Item".to_string()));
    assert_eq!(data[1][0], Data::String("Stapler".to_string()));
    assert_eq!(data[1][1], Data::String("2+1".to_string()));
    assert_eq!(data[2][1], Data::Float(10.0));
    assert_eq!(data.len(), 4);

    let metadata = read_sheet(&output, METADATA_SHEET_NAME);
    assert_eq!(metadata[0][0], Data::String("Metadata".to_string()));
    assert_eq!(metadata[1][1], Data::String("invoice.jpg".to_string()));
    assert_eq!(metadata[2][1], Data::String("2024-03-09 08:05:00".to_string()));
    assert_eq!(metadata[3][1], Data::String("1240 x 1754".to_string()));
}

#[test]
fn xlsx_keeps_identifiers_and_trailing_zeros_as_text() {
    let dir = tempdir().expect("tempdir should be created");
    let output = dir.path().join("ids.xlsx");

    let table = Table::new(
        vec!["Account".to_string(), "Price".to_string(), "Qty".to_string()],
        vec![vec![
            "12345678901234567891".to_string(),
            "9.50".to_string(),
            "12".to_string(),
        ]],
        TableOrigin::Structured,
    );
    export_table(&table, &output, ExportFormat::Xlsx, &ExportOptions::default())
        .expect("xlsx export should succeed");

    let data = read_sheet(&output, DATA_SHEET_NAME);
    assert_eq!(
        data[1],
        vec![
            Data::String("12345678901234567891".to_string()),
            Data::String("9.50".to_string()),
            Data::Float(12.0),
        ]
    );
}

#[test]
fn xlsx_without_metadata_has_one_sheet() {
    let dir = tempdir().expect("tempdir should be created");
    let output = dir.path().join("plain.xlsx");

    let report = invoice_report();
    export_table(&report.table, &output, ExportFormat::Xlsx, &ExportOptions::default())
        .expect("xlsx export should succeed");

    let workbook: Xlsx<_> = open_workbook(&output).expect("workbook should open");
    assert_eq!(workbook.sheet_names(), vec![DATA_SHEET_NAME.to_string()]);
}

#[test]
fn cli_extracts_text_file_to_csv() {
    let dir = tempdir().expect("tempdir should be created");
    let input = dir.path().join("ocr.txt");
    let output = dir.path().join("ocr.csv");
    std::fs::write(&input, INVOICE_TEXT).expect("fixture should be written");

    let status = Command::new(env!("CARGO_BIN_EXE_text2sheet"))
        .args([
            "extract",
            "-i",
            &input.to_string_lossy(),
            "-o",
            &output.to_string_lossy(),
        ])
        .status()
        .expect("CLI should run");

    assert_eq!(status.code(), Some(0));
    let csv = std::fs::read_to_string(&output).expect("CSV should be readable");
    assert!(csv.contains("Paper A4,10,4.50"), "unexpected CSV: {csv:?}");
}

#[test]
fn cli_exits_with_code_2_when_no_rows() {
    let dir = tempdir().expect("tempdir should be created");
    let output = dir.path().join("empty.xlsx");

    let mut child = Command::new(env!("CARGO_BIN_EXE_text2sheet"))
        .args(["extract", "-i", "-", "-o", &output.to_string_lossy()])
        .stdin(Stdio::piped())
        .spawn()
        .expect("CLI should run");
    child
        .stdin
        .take()
        .expect("stdin should be piped")
        .write_all(b"  \n--\n")
        .expect("stdin should accept input");
    let status = child.wait().expect("CLI should finish");

    assert_eq!(status.code(), Some(2));
}

#[test]
fn cli_rejects_manual_layout_without_columns() {
    let dir = tempdir().expect("tempdir should be created");
    let input = dir.path().join("ocr.txt");
    let output = dir.path().join("ocr.csv");
    std::fs::write(&input, INVOICE_TEXT).expect("fixture should be written");

    let status = Command::new(env!("CARGO_BIN_EXE_text2sheet"))
        .args([
            "extract",
            "-i",
            &input.to_string_lossy(),
            "-o",
            &output.to_string_lossy(),
            "--layout",
            "manual",
        ])
        .status()
        .expect("CLI should run");

    assert_eq!(status.code(), Some(1));
}

#[test]
fn cli_exports_structured_reply() {
    let dir = tempdir().expect("tempdir should be created");
    let input = dir.path().join("reply.json");
    let output = dir.path().join("reply.csv");
    std::fs::write(
        &input,
        r#"{"headers": ["Description", "Quantity"], "rows": [["Toner", "2*2"], ["Drum", 1]]}"#,
    )
    .expect("fixture should be written");

    let status = Command::new(env!("CARGO_BIN_EXE_text2sheet"))
        .args([
            "structured",
            "-i",
            &input.to_string_lossy(),
            "-o",
            &output.to_string_lossy(),
            "--evaluate",
        ])
        .status()
        .expect("CLI should run");

    assert_eq!(status.code(), Some(0));
    let csv = std::fs::read_to_string(&output).expect("CSV should be readable");
    assert_eq!(csv, "Description,Quantity\nToner,4\nDrum,1\n");
}

#[test]
fn cli_evaluates_expression() {
    let output = Command::new(env!("CARGO_BIN_EXE_text2sheet"))
        .args(["eval", "12*3-1"])
        .output()
        .expect("CLI should run");
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "35");

    let status = Command::new(env!("CARGO_BIN_EXE_text2sheet"))
        .args(["eval", "10/0"])
        .status()
        .expect("CLI should run");
    assert_eq!(status.code(), Some(1));
}
