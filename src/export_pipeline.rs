use chrono::NaiveDateTime;
use scan2sheet::{
    ExportFormat, ExportOptions, SessionState, apply, auto_evaluate, build_table,
    export_filename, export_table_to_bytes,
};
use serde::de::DeserializeOwned;

use crate::error::ApiError;
use crate::models::{
    EvaluateRequest, EvaluateResponse, SessionRequest, TableRequest, TableResponse,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFile {
    pub filename: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

pub fn check_body_size(len: usize, limit: usize) -> Result<(), ApiError> {
    if len > limit {
        return Err(ApiError::PayloadTooLarge(format!(
            "request body is {len} bytes; limit is {limit}"
        )));
    }
    Ok(())
}

/// Checks the declared `Content-Length` so oversized uploads are refused
/// before the body is buffered. A missing or unparsable header is left to
/// [`check_body_size`].
pub fn check_content_length(header: Option<&str>, limit: usize) -> Result<(), ApiError> {
    match header.and_then(|value| value.trim().parse::<usize>().ok()) {
        Some(len) => check_body_size(len, limit),
        None => Ok(()),
    }
}

pub fn parse_json_body<T>(body: &str) -> Result<T, ApiError>
where
    T: DeserializeOwned,
{
    if body.trim().is_empty() {
        return Err(ApiError::BadRequest("request body is empty".to_string()));
    }
    Ok(serde_json::from_str(body)?)
}

pub fn table_response(request: TableRequest) -> TableResponse {
    build_table(request.source, &request.options).into()
}

pub fn render_export(
    request: TableRequest,
    format: ExportFormat,
    filename_prefix: &str,
    now: NaiveDateTime,
) -> Result<ExportedFile, ApiError> {
    let report = build_table(request.source, &request.options);
    let options = ExportOptions {
        metadata: request.metadata,
        ..ExportOptions::default()
    };
    let bytes = export_table_to_bytes(&report.table, format, &options)?;

    Ok(ExportedFile {
        filename: export_filename(filename_prefix, now, format),
        content_type: format.content_type(),
        bytes,
    })
}

pub fn evaluate_response(request: &EvaluateRequest) -> EvaluateResponse {
    let value = auto_evaluate(&request.value);
    let evaluated = value != request.value;
    EvaluateResponse { value, evaluated }
}

pub fn session_response(request: SessionRequest) -> SessionState {
    apply(request.state, request.event)
}
