//! HTTP client for the distributed RPC shim (C10, §4.10).

use crate::types::{
    Empty, ReadChunkRequest, ReadChunkResponse, ReadXlMetaRequest, ReadXlMetaResponse, RpcResult, WriteChunkRequest,
    WriteXlMetaRequest,
};
use objectio_common::{Error, Result};
use objectio_endpoint::{Endpoint, UrlEndpoint};
use std::time::Duration;

/// Maps an RPC error-code token back to the local `Error` taxonomy.
/// The inverse of [`objectio_common::Error::error_code`].
fn error_from_code(error_code: &str, message: String) -> Error {
    match error_code {
        "NOMEM" => Error::OutOfMemory,
        "INVALID_ARG" => Error::InvalidArgument(message),
        "NOT_FOUND" => Error::NotFound(message),
        "EXISTS" => Error::Exists(message),
        "IO" => Error::Storage(message),
        "NETWORK" => Error::Network(message),
        "TIMEOUT" => Error::Timeout,
        "QUORUM" => Error::Quorum { needed: 0, got: 0 },
        "CORRUPT" => Error::Corrupt(message),
        "UNSUPPORTED" => Error::Unsupported(message),
        "CRYPTO" => Error::Crypto(message),
        _ => Error::Network(format!("{error_code}: {message}")),
    }
}

/// The remote node's reachable base URL, derived by stripping the path
/// component from a `UrlEndpoint` (§4.10: "extracted from the placement
/// entry by stripping the path component").
fn base_url(endpoint: &UrlEndpoint) -> String {
    let host = if endpoint.host.contains(':') {
        format!("[{}]", endpoint.host)
    } else {
        endpoint.host.clone()
    };
    format!("{}://{host}:{}", endpoint.scheme, endpoint.port)
}

/// Thin wrapper over `reqwest::Client` speaking the four storage methods.
#[derive(Clone)]
pub struct RpcClient {
    http: reqwest::Client,
}

impl RpcClient {
    #[must_use]
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("reqwest client builder"),
        }
    }

    /// Resolve a configured [`Endpoint`] to an `RpcClient` target; fails
    /// `INVALID_ARG` for local path endpoints, which never go over RPC.
    pub fn target(endpoint: &Endpoint) -> Result<&UrlEndpoint> {
        match endpoint {
            Endpoint::Url(u) => Ok(u),
            Endpoint::Path(_) => Err(Error::invalid_argument("rpc: endpoint is local, not remote")),
        }
    }

    pub async fn write_chunk(&self, target: &UrlEndpoint, req: &WriteChunkRequest) -> Result<()> {
        let _: Empty = self.call(target, "storage.writeChunk", req).await?;
        Ok(())
    }

    pub async fn read_chunk(&self, target: &UrlEndpoint, req: &ReadChunkRequest) -> Result<Vec<u8>> {
        let resp: ReadChunkResponse = self.call(target, "storage.readChunk", req).await?;
        resp.decode_payload().map_err(|e| Error::Corrupt(e.to_string()))
    }

    pub async fn write_xl_meta(&self, target: &UrlEndpoint, req: &WriteXlMetaRequest) -> Result<()> {
        let _: Empty = self.call(target, "storage.writeXlMeta", req).await?;
        Ok(())
    }

    pub async fn read_xl_meta(&self, target: &UrlEndpoint, req: &ReadXlMetaRequest) -> Result<serde_json::Value> {
        let resp: ReadXlMetaResponse = self.call(target, "storage.readXlMeta", req).await?;
        Ok(resp.xl_meta)
    }

    async fn call<Req, Resp>(&self, target: &UrlEndpoint, method: &str, body: &Req) -> Result<Resp>
    where
        Req: serde::Serialize,
        Resp: serde::de::DeserializeOwned,
    {
        let url = format!("{}/rpc/{}", base_url(target), method.trim_start_matches("storage."));
        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::Network(format!("{method} to {url}: {e}")))?;

        let result: RpcResult<Resp> = response
            .json()
            .await
            .map_err(|e| Error::Network(format!("{method} response decode: {e}")))?;

        match result {
            RpcResult::Ok(value) => Ok(value),
            RpcResult::Err { error_code, message } => Err(error_from_code(&error_code, message)),
        }
    }
}

impl Default for RpcClient {
    fn default() -> Self {
        Self::new()
    }
}
