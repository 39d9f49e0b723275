//! Wire types for the four RPC methods (§4.10).

use base64::Engine as _;
use serde::{Deserialize, Serialize};

/// `storage.writeChunk` request: a base64-framed payload for one chunk.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WriteChunkRequest {
    pub bucket: String,
    pub object: String,
    pub disk_path: String,
    pub chunk_index: u32,
    pub chunk_size: u64,
    pub payload: String,
}

impl WriteChunkRequest {
    #[must_use]
    pub fn new(bucket: impl Into<String>, object: impl Into<String>, disk_path: impl Into<String>, chunk_index: u32, data: &[u8]) -> Self {
        Self {
            bucket: bucket.into(),
            object: object.into(),
            disk_path: disk_path.into(),
            chunk_index,
            chunk_size: data.len() as u64,
            payload: base64::engine::general_purpose::STANDARD.encode(data),
        }
    }

    pub fn decode_payload(&self) -> Result<Vec<u8>, base64::DecodeError> {
        base64::engine::general_purpose::STANDARD.decode(&self.payload)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReadChunkRequest {
    pub bucket: String,
    pub object: String,
    pub disk_path: String,
    pub chunk_index: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReadChunkResponse {
    pub payload: String,
}

impl ReadChunkResponse {
    #[must_use]
    pub fn new(data: &[u8]) -> Self {
        Self {
            payload: base64::engine::general_purpose::STANDARD.encode(data),
        }
    }

    pub fn decode_payload(&self) -> Result<Vec<u8>, base64::DecodeError> {
        base64::engine::general_purpose::STANDARD.decode(&self.payload)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WriteXlMetaRequest {
    pub bucket: String,
    pub object: String,
    pub disk_path: String,
    /// JSON-encoded `xl.meta` document, passed through verbatim.
    pub xl_meta: serde_json::Value,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReadXlMetaRequest {
    pub bucket: String,
    pub object: String,
    pub disk_path: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReadXlMetaResponse {
    pub xl_meta: serde_json::Value,
}

/// The envelope every RPC response is wrapped in: either a method's own
/// success body, or `{error_code, message}`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RpcResult<T> {
    Ok(T),
    Err { error_code: String, message: String },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Empty {
    pub success: bool,
}

impl Default for Empty {
    fn default() -> Self {
        Self { success: true }
    }
}
