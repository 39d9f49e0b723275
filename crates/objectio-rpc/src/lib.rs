//! The distributed RPC shim (C10): chunk and `xl.meta` read/write against
//! a non-local disk, layered over the system's HTTP transport.

pub mod client;
pub mod server;
pub mod types;

pub use client::RpcClient;
pub use server::router;
pub use types::{
    Empty, ReadChunkRequest, ReadChunkResponse, ReadXlMetaRequest, ReadXlMetaResponse, RpcResult, WriteChunkRequest,
    WriteXlMetaRequest,
};
