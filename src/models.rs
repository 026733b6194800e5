use scan2sheet::{
    BuildOptions, RunMetadata, SessionEvent, SessionState, TableOrigin, TableReport,
    TableSource, TableWarning,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_INPUT_BYTES: usize = 1024 * 1024;
pub const MAX_INPUT_BYTES_VAR: &str = "MAX_INPUT_BYTES";
pub const FILENAME_PREFIX_VAR: &str = "EXPORT_FILENAME_PREFIX";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TableRequest {
    pub source: TableSource,
    #[serde(default)]
    pub options: BuildOptions,
    /// Only used by the export route.
    #[serde(default)]
    pub metadata: Option<RunMetadata>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableResponse {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub origin: TableOrigin,
    pub warnings: Vec<TableWarning>,
}

impl From<TableReport> for TableResponse {
    fn from(report: TableReport) -> Self {
        let origin = report.table.origin();
        let (columns, rows) = report.table.into_parts();
        Self {
            columns,
            rows,
            origin,
            warnings: report.warnings,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EvaluateRequest {
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EvaluateResponse {
    pub value: String,
    pub evaluated: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SessionRequest {
    #[serde(default)]
    pub state: SessionState,
    pub event: SessionEvent,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}
