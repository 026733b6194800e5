use chrono::Utc;
use regex::Regex;
use scan2sheet::{DEFAULT_FILENAME_PREFIX, ExportFormat};
use serde::Serialize;
use url::Url;
use worker::{Context, Env, Request, Response, Result, RouteContext, Router};

use crate::error::ApiError;
use crate::export_pipeline::{
    self, ExportedFile, check_body_size, check_content_length, parse_json_body, render_export,
};
use crate::models::{
    DEFAULT_MAX_INPUT_BYTES, EvaluateRequest, FILENAME_PREFIX_VAR, MAX_INPUT_BYTES_VAR,
    SessionRequest, TableRequest,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppState {
    pub max_input_bytes: usize,
    pub filename_prefix: String,
}

impl AppState {
    /// Unset or unusable variables fall back to the defaults.
    pub fn from_vars(max_input_bytes: Option<&str>, filename_prefix: Option<&str>) -> Self {
        let max_input_bytes = max_input_bytes
            .and_then(|raw| raw.trim().parse::<usize>().ok())
            .filter(|limit| *limit > 0)
            .unwrap_or(DEFAULT_MAX_INPUT_BYTES);
        let filename_prefix = filename_prefix
            .map(sanitize_filename_prefix)
            .filter(|prefix| !prefix.is_empty())
            .unwrap_or_else(|| DEFAULT_FILENAME_PREFIX.to_string());

        Self {
            max_input_bytes,
            filename_prefix,
        }
    }
}

pub async fn handle(req: Request, env: Env, _ctx: Context) -> Result<Response> {
    let max_input_bytes = env.var(MAX_INPUT_BYTES_VAR).map(|value| value.to_string()).ok();
    let filename_prefix = env.var(FILENAME_PREFIX_VAR).map(|value| value.to_string()).ok();
    let state = AppState::from_vars(max_input_bytes.as_deref(), filename_prefix.as_deref());

    Router::with_data(state)
        .post_async("/api/v1/table", table_route)
        .post_async("/api/v1/export", export_route)
        .post_async("/api/v1/evaluate", evaluate_route)
        .post_async("/api/v1/session", session_route)
        .run(req, env)
        .await
}

async fn table_route(mut req: Request, ctx: RouteContext<AppState>) -> Result<Response> {
    let result = read_body(&mut req, ctx.data.max_input_bytes)
        .await
        .and_then(|body| parse_json_body::<TableRequest>(&body))
        .map(export_pipeline::table_response);
    match result {
        Ok(response) => json_response(&response),
        Err(error) => error.into_response(),
    }
}

async fn export_route(mut req: Request, ctx: RouteContext<AppState>) -> Result<Response> {
    match export_response(&mut req, &ctx.data).await {
        Ok(response) => Ok(response),
        Err(error) => error.into_response(),
    }
}

async fn evaluate_route(mut req: Request, ctx: RouteContext<AppState>) -> Result<Response> {
    let result = read_body(&mut req, ctx.data.max_input_bytes)
        .await
        .and_then(|body| parse_json_body::<EvaluateRequest>(&body))
        .map(|request| export_pipeline::evaluate_response(&request));
    match result {
        Ok(response) => json_response(&response),
        Err(error) => error.into_response(),
    }
}

async fn session_route(mut req: Request, ctx: RouteContext<AppState>) -> Result<Response> {
    let result = read_body(&mut req, ctx.data.max_input_bytes)
        .await
        .and_then(|body| parse_json_body::<SessionRequest>(&body))
        .map(export_pipeline::session_response);
    match result {
        Ok(state) => json_response(&state),
        Err(error) => error.into_response(),
    }
}

async fn export_response(req: &mut Request, state: &AppState) -> Result<Response, ApiError> {
    let format = export_format_from_url(&req.url()?)?;
    let body = read_body(req, state.max_input_bytes).await?;
    let request = parse_json_body::<TableRequest>(&body)?;
    let file = render_export(
        request,
        format,
        &state.filename_prefix,
        Utc::now().naive_utc(),
    )?;

    worker::console_log!(
        "table export completed: format={}, bytes={}",
        format.extension(),
        file.bytes.len()
    );

    file_response(file)
}

async fn read_body(req: &mut Request, limit: usize) -> Result<String, ApiError> {
    let declared = req.headers().get("Content-Length")?;
    check_content_length(declared.as_deref(), limit)?;
    let bytes = req.bytes().await?;
    check_body_size(bytes.len(), limit)?;
    Ok(String::from_utf8(bytes)?)
}

fn file_response(file: ExportedFile) -> Result<Response, ApiError> {
    let mut response = Response::from_bytes(file.bytes)?;
    response.headers_mut().set("Content-Type", file.content_type)?;
    response
        .headers_mut()
        .set("Content-Disposition", &content_disposition(&file.filename))?;
    response.headers_mut().set("Cache-Control", "no-store")?;
    Ok(response)
}

fn json_response<T>(payload: &T) -> Result<Response>
where
    T: Serialize,
{
    let mut response = Response::from_json(payload)?;
    response.headers_mut().set("Cache-Control", "no-store")?;
    Ok(response)
}

/// `?format=csv|xlsx`; XLSX when absent.
pub fn export_format_from_url(url: &Url) -> Result<ExportFormat, ApiError> {
    let Some((_, raw)) = url.query_pairs().find(|(key, _)| key == "format") else {
        return Ok(ExportFormat::default());
    };
    raw.parse::<ExportFormat>().map_err(ApiError::BadRequest)
}

pub fn sanitize_filename_prefix(prefix: &str) -> String {
    let unsafe_chars = Regex::new(r"[^A-Za-z0-9_-]+").expect("hardcoded filename regex is valid");
    unsafe_chars
        .replace_all(prefix.trim(), "_")
        .trim_matches('_')
        .to_string()
}

pub fn content_disposition(filename: &str) -> String {
    format!(
        "attachment; filename=\"{filename}\"; filename*=UTF-8''{}",
        urlencoding::encode(filename)
    )
}
