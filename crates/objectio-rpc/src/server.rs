//! Server side of the RPC shim: handlers an OSD process mounts under
//! `/rpc/*` so remote peers can reach its local disks (§4.10).

use crate::types::{
    Empty, ReadChunkRequest, ReadChunkResponse, ReadXlMetaRequest, ReadXlMetaResponse, RpcResult, WriteChunkRequest,
    WriteXlMetaRequest,
};
use axum::extract::Json;
use axum::routing::post;
use axum::Router;
use objectio_common::{Error, Result};
use objectio_storage::layout;
use std::path::Path;

fn to_rpc<T>(result: Result<T>) -> Json<RpcResult<T>> {
    Json(match result {
        Ok(v) => RpcResult::Ok(v),
        Err(e) => RpcResult::Err {
            error_code: e.error_code().to_string(),
            message: e.to_string(),
        },
    })
}

async fn write_chunk(Json(req): Json<WriteChunkRequest>) -> Json<RpcResult<Empty>> {
    to_rpc(write_chunk_inner(&req))
}

fn write_chunk_inner(req: &WriteChunkRequest) -> Result<Empty> {
    let disk_root = Path::new(&req.disk_path);
    let path = layout::part_path(disk_root, &req.bucket, &req.object, req.chunk_index as usize);
    let bytes = req.decode_payload().map_err(|e| Error::Corrupt(e.to_string()))?;
    objectio_storage::write_atomic(&path, &bytes)?;
    Ok(Empty::default())
}

async fn read_chunk(Json(req): Json<ReadChunkRequest>) -> Json<RpcResult<ReadChunkResponse>> {
    to_rpc(read_chunk_inner(&req))
}

fn read_chunk_inner(req: &ReadChunkRequest) -> Result<ReadChunkResponse> {
    let disk_root = Path::new(&req.disk_path);
    let path = layout::part_path(disk_root, &req.bucket, &req.object, req.chunk_index as usize);
    let bytes = objectio_storage::read_all(&path)?;
    Ok(ReadChunkResponse::new(&bytes))
}

async fn write_xl_meta(Json(req): Json<WriteXlMetaRequest>) -> Json<RpcResult<Empty>> {
    to_rpc(write_xl_meta_inner(&req))
}

fn write_xl_meta_inner(req: &WriteXlMetaRequest) -> Result<Empty> {
    let disk_root = Path::new(&req.disk_path);
    let path = layout::xl_meta_path(disk_root, &req.bucket, &req.object);
    let bytes = serde_json::to_vec(&req.xl_meta).map_err(|e| Error::Serialization(e.to_string()))?;
    objectio_storage::write_atomic(&path, &bytes)?;
    Ok(Empty::default())
}

async fn read_xl_meta(Json(req): Json<ReadXlMetaRequest>) -> Json<RpcResult<ReadXlMetaResponse>> {
    to_rpc(read_xl_meta_inner(&req))
}

fn read_xl_meta_inner(req: &ReadXlMetaRequest) -> Result<ReadXlMetaResponse> {
    let disk_root = Path::new(&req.disk_path);
    let path = layout::xl_meta_path(disk_root, &req.bucket, &req.object);
    let bytes = objectio_storage::read_all(&path)?;
    let xl_meta = serde_json::from_slice(&bytes).map_err(|e| Error::Corrupt(e.to_string()))?;
    Ok(ReadXlMetaResponse { xl_meta })
}

/// Build the `/rpc/*` router. Each disk is addressed by the `disk_path`
/// carried in the request body, so a single router serves every disk a
/// node hosts.
#[must_use]
pub fn router() -> Router {
    Router::new()
        .route("/rpc/writeChunk", post(write_chunk))
        .route("/rpc/readChunk", post(read_chunk))
        .route("/rpc/writeXlMeta", post(write_xl_meta))
        .route("/rpc/readXlMeta", post(read_xl_meta))
}
