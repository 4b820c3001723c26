//! Client for the inference server HTTP API.
//!
//! Every public operation follows the same path: build the request, run it through the
//! retrying request engine, classify the status, project the response, notify telemetry.
//! Implementation details are split into submodules under `src/client/`.

mod blobs;
pub mod builder;
pub mod chat;
pub mod core;
mod error_classification;
mod generate;
mod models;
pub mod policy;

pub use blobs::{sha256_digest, validate_digest};
pub use builder::OllamaClientBuilder;
pub use chat::ChatRequestBuilder;
pub use core::OllamaClient;
pub use error_classification::{check_stream_lines, classify_status, reason_for_status};
pub use policy::{Attempted, RetryPolicy};
