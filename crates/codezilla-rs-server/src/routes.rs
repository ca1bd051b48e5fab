//! `/api/fs/*` handlers.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, Request, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, middleware, routing};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use codezilla_rs_fs::{FileService, FsError};
use codezilla_rs_protocol::FileEntry;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub files: FileService,
}

/// Content encodings accepted and produced by the API.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    #[default]
    Utf8,
    Base64,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub dir: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PathQuery {
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WriteRequest {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub encoding: Encoding,
}

#[derive(Debug, Deserialize)]
pub struct MkdirRequest {
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub entries: Vec<FileEntry>,
}

#[derive(Debug, Serialize)]
pub struct ReadResponse {
    pub content: String,
    pub encoding: Encoding,
}

/// A 400 response with `{ "error": message }`.
#[derive(Debug)]
pub struct ApiError(String);

impl ApiError {
    fn missing_path() -> Self {
        Self("Missing path".to_string())
    }
}

impl From<FsError> for ApiError {
    fn from(err: FsError) -> Self {
        Self(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        warn!("file request failed (error={})", self.0);
        (StatusCode::BAD_REQUEST, Json(json!({ "error": self.0 }))).into_response()
    }
}

/// Build the router for the file API.
pub fn router(files: FileService) -> Router {
    Router::new()
        .route("/api/fs/list", routing::get(list))
        .route("/api/fs/read", routing::get(read))
        .route("/api/fs/write", routing::post(write))
        .route("/api/fs/mkdir", routing::post(mkdir))
        .layer(middleware::from_fn(no_store))
        .with_state(AppState { files })
}

/// Responses reflect live filesystem state and must never be cached.
async fn no_store(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

fn required_path(path: Option<String>) -> Result<String, ApiError> {
    path.filter(|path| !path.is_empty())
        .ok_or_else(ApiError::missing_path)
}

async fn list(
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<ListResponse>, ApiError> {
    let Query(query) = query?;
    let dir = query.dir.unwrap_or_default();
    let entries = state.files.list_directory(&dir).await?;
    debug!("list request served (dir={}, entries={})", dir, entries.len());
    Ok(Json(ListResponse { entries }))
}

async fn read(
    State(state): State<AppState>,
    query: Result<Query<PathQuery>, QueryRejection>,
) -> Result<Json<ReadResponse>, ApiError> {
    let Query(query) = query?;
    let path = required_path(query.path)?;
    let bytes = state.files.read_file(&path).await?;
    Ok(Json(encode_content(bytes)))
}

async fn write(
    State(state): State<AppState>,
    body: Result<Json<WriteRequest>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Json(body) = body?;
    let path = required_path(body.path)?;
    let content = match body.encoding {
        Encoding::Utf8 => body.content.into_bytes(),
        Encoding::Base64 => STANDARD
            .decode(body.content.as_bytes())
            .map_err(|err| ApiError(format!("invalid base64 content: {err}")))?,
    };
    state.files.write_file(&path, &content).await?;
    Ok(Json(json!({ "ok": true })))
}

async fn mkdir(
    State(state): State<AppState>,
    body: Result<Json<MkdirRequest>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Json(body) = body?;
    let path = required_path(body.path)?;
    state.files.make_directory(&path).await?;
    Ok(Json(json!({ "ok": true })))
}

/// UTF-8 content is returned as text, anything else as base64.
fn encode_content(bytes: Vec<u8>) -> ReadResponse {
    match String::from_utf8(bytes) {
        Ok(content) => ReadResponse {
            content,
            encoding: Encoding::Utf8,
        },
        Err(err) => ReadResponse {
            content: STANDARD.encode(err.into_bytes()),
            encoding: Encoding::Base64,
        },
    }
}
