use std::path::Path;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::model::RunMetadata;

pub const DEFAULT_FILENAME_PREFIX: &str = "extracted_text";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildOptions {
    /// Evaluate arithmetic already present in quantity columns. Off by
    /// default: OCR text such as `10-12` or `2024-01-02` is kept verbatim.
    pub evaluate_quantities: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    #[default]
    Xlsx,
}

impl ExportFormat {
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Xlsx => "xlsx",
        }
    }

    #[must_use]
    pub const fn content_type(self) -> &'static str {
        match self {
            Self::Csv => "text/csv; charset=utf-8",
            Self::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        }
    }

    /// Picks the format from a file extension.
    ///
    /// # Errors
    ///
    /// Returns a message when the path has no supported extension.
    pub fn from_path(path: &Path) -> Result<Self, String> {
        let extension = path
            .extension()
            .and_then(|value| value.to_str())
            .ok_or_else(|| format!("cannot infer export format from '{}'", path.display()))?;
        extension.parse()
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        match spec.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "xlsx" => Ok(Self::Xlsx),
            other => Err(format!("unsupported export format '{other}', expected csv or xlsx")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOptions {
    pub delimiter: u8,
    /// Written as a second worksheet; ignored for CSV.
    pub metadata: Option<RunMetadata>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            metadata: None,
        }
    }
}

/// `extracted_text_20240131_154500.xlsx` style download name.
#[must_use]
pub fn export_filename(prefix: &str, now: NaiveDateTime, format: ExportFormat) -> String {
    format!(
        "{prefix}_{}.{}",
        now.format("%Y%m%d_%H%M%S"),
        format.extension()
    )
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::str::FromStr;

    use chrono::NaiveDate;

    use super::{DEFAULT_FILENAME_PREFIX, ExportFormat, export_filename};

    #[test]
    fn parses_export_format() {
        assert_eq!(ExportFormat::from_str("XLSX"), Ok(ExportFormat::Xlsx));
        assert_eq!(ExportFormat::from_str(" csv "), Ok(ExportFormat::Csv));
        let err = ExportFormat::from_str("pdf").expect_err("pdf should be rejected");
        assert!(err.contains("unsupported export format"));
    }

    #[test]
    fn infers_format_from_path() {
        assert_eq!(
            ExportFormat::from_path(Path::new("out/invoice.csv")),
            Ok(ExportFormat::Csv)
        );
        assert!(ExportFormat::from_path(Path::new("invoice")).is_err());
    }

    #[test]
    fn builds_timestamped_filename() {
        let now = NaiveDate::from_ymd_opt(2024, 1, 31)
            .and_then(|date| date.and_hms_opt(15, 45, 0))
            .expect("valid timestamp");
        assert_eq!(
            export_filename(DEFAULT_FILENAME_PREFIX, now, ExportFormat::Xlsx),
            "extracted_text_20240131_154500.xlsx"
        );
    }
}
