//! HTTP transport: a single request/response exchange with the inference server.
//!
//! Retries live one layer up in [`crate::client`]; this layer only performs one attempt and
//! reports whether the exchange completed.

mod http;
mod response;

pub use http::{HttpTransport, Method, RequestBody};
pub use response::RawResponse;
