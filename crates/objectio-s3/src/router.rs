//! A thin `axum` router translating a minimal S3-style REST surface onto
//! the C9 coordinator (§4.11). No request signing, no bucket policy, no
//! multipart upload manager — those are out of scope.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, put};
use axum::Router;
use objectio_common::Error;
use objectio_coordinator::Coordinator;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<Coordinator>,
    /// The disk root this adapter uses for bucket directory markers and
    /// the best-effort bucket listing below.
    pub bucket_root: Option<PathBuf>,
}

/// Build the router. Mount under the gateway's axum app, or serve
/// standalone for a minimal single-node deployment.
#[must_use]
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(list_buckets))
        .route("/{bucket}", put(create_bucket))
        .route("/{bucket}/{*key}", put(put_object).get(get_object).head(head_object).delete(delete_object))
        .with_state(state)
}

fn xml_error(err: &Error) -> Response {
    let body = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<Error><Code>{}</Code><Message>{}</Message></Error>",
        err.s3_error_code(),
        escape_xml(&err.to_string()),
    );
    let status = StatusCode::from_u16(err.http_status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, [(header::CONTENT_TYPE, "application/xml")], body).into_response()
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

async fn put_object(State(state): State<AppState>, Path((bucket, key)): Path<(String, String)>, headers: HeaderMap, body: Bytes) -> Response {
    let content_type = headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok());
    tracing::debug!(%bucket, %key, size = body.len(), "s3 adapter: put object");
    match state.coordinator.put(&bucket, &key, &body, content_type).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => xml_error(&e),
    }
}

async fn get_object(State(state): State<AppState>, Path((bucket, key)): Path<(String, String)>) -> Response {
    match state.coordinator.get(&bucket, &key).await {
        Ok(data) => {
            let content_type = state
                .coordinator
                .head(&bucket, &key)
                .await
                .ok()
                .and_then(|meta| meta.meta.get("content-type").cloned())
                .unwrap_or_else(|| "application/octet-stream".to_string());
            ([(header::CONTENT_TYPE, content_type)], data).into_response()
        }
        Err(e) => xml_error(&e),
    }
}

async fn head_object(State(state): State<AppState>, Path((bucket, key)): Path<(String, String)>) -> Response {
    match state.coordinator.head(&bucket, &key).await {
        Ok(meta) => ([(header::CONTENT_LENGTH, meta.stat.size.to_string())], StatusCode::OK).into_response(),
        Err(e) => xml_error(&e),
    }
}

async fn delete_object(State(state): State<AppState>, Path((bucket, key)): Path<(String, String)>) -> Response {
    match state.coordinator.delete(&bucket, &key).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => xml_error(&e),
    }
}

/// `PUT /{bucket}`: create a bucket directory marker on the configured
/// disk root. Not coordinated across a placement — a single local marker.
async fn create_bucket(State(state): State<AppState>, Path(bucket): Path<String>) -> Response {
    let Some(root) = state.bucket_root.clone() else {
        return xml_error(&Error::unsupported("s3 adapter: no bucket root configured"));
    };
    let result = tokio::task::spawn_blocking(move || std::fs::create_dir_all(root.join(bucket)))
        .await
        .map_err(|e| Error::internal(e.to_string()))
        .and_then(|r| r.map_err(Error::DiskIo));
    match result {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => xml_error(&e),
    }
}

/// `GET /`: best-effort bucket listing by walking the bucket root's
/// top-level directories. Explicitly not the full ListObjectsV2 contract.
async fn list_buckets(State(state): State<AppState>) -> Response {
    let Some(root) = state.bucket_root.clone() else {
        return xml_error(&Error::unsupported("s3 adapter: no bucket root configured"));
    };
    let names = tokio::task::spawn_blocking(move || list_bucket_names(&root)).await;
    match names {
        Ok(Ok(names)) => {
            let entries: String = names
                .iter()
                .map(|n| format!("<Bucket><Name>{}</Name></Bucket>", escape_xml(n)))
                .collect();
            let body = format!(
                "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<ListAllMyBucketsResult><Buckets>{entries}</Buckets></ListAllMyBucketsResult>"
            );
            ([(header::CONTENT_TYPE, "application/xml")], body).into_response()
        }
        Ok(Err(e)) => xml_error(&e),
        Err(e) => xml_error(&Error::internal(e.to_string())),
    }
}

fn list_bucket_names(root: &std::path::Path) -> objectio_common::Result<Vec<String>> {
    let mut names = Vec::new();
    let entries = std::fs::read_dir(root).map_err(Error::DiskIo)?;
    for entry in entries {
        let entry = entry.map_err(Error::DiskIo)?;
        if entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
            let name = entry.file_name().to_string_lossy().to_string();
            if name != ".buckets.sys" {
                names.push(name);
            }
        }
    }
    names.sort();
    Ok(names)
}
