//! Thin S3-style HTTP adapter over the object coordinator (§4.11).

pub mod router;

pub use router::{router, AppState};
