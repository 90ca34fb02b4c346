//! Replica Response Model
//!
//! Typed store responses carrying LSN, global committed LSN, read region
//! count and sub-status. Wire headers (`http::HeaderMap`) are converted at the
//! transport edge and never travel further.

pub mod headers;
mod lsn;
mod status;
mod store_response;

pub use lsn::Lsn;
pub use status::{StatusCode, SubStatusCode};
pub use store_response::LogicalStoreResponse;
