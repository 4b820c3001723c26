//! # ollama-lib-rust
//!
//! 本地推理服务器（Ollama 风格 HTTP API）的异步 Rust 客户端。
//!
//! Async client for a local inference server: model management, generation, chat,
//! embeddings and blob upload over the server's HTTP API.
//!
//! ## Overview
//!
//! The endpoints themselves are a thin mapping onto REST calls. The library's weight is in
//! three mechanisms every operation shares:
//!
//! - **Request engine**: one outbound call with a per-attempt timeout, a bounded fixed-backoff
//!   retry on transport failures, a cancellation token, and classification of the outcome
//!   into a closed [`Error`] taxonomy.
//! - **Response projection**: a [`FieldSpec`] picks the value a caller wants out of the
//!   response, decoding JSON strings and newline-delimited progress streams on the way.
//! - **State**: a TTL [`cache::MetadataCache`] in front of model listings and details, and a
//!   file-backed [`store::ConversationStore`] that keeps chat history per user and chat.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ollama_lib_rust::{CallOptions, OllamaClient};
//!
//! #[tokio::main]
//! async fn main() -> ollama_lib_rust::Result<()> {
//!     let client = OllamaClient::new()?;
//!
//!     let models = client.list_models(CallOptions::default()).await?;
//!     println!("{}", models);
//!
//!     let reply = client
//!         .chat()
//!         .model("llama3.2")
//!         .conversation("alice", "travel")
//!         .message("Suggest a weekend trip from Lyon")
//!         .send()
//!         .await?;
//!     println!("{}", reply);
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | [`OllamaClient`], its builder, retry policy and per-endpoint operations |
//! | [`config`] | [`ClientConfig`] from defaults, environment or YAML |
//! | [`projection`] | [`FieldSpec`], [`Action`] and response projection |
//! | [`cache`] | TTL metadata cache with pluggable backends |
//! | [`store`] | File-backed conversation store |
//! | [`transport`] | Single-attempt HTTP exchange and the raw response |
//! | [`telemetry`] | Request lifecycle events and sinks |
//! | [`types`] | Request bodies, chat messages, call options |

pub mod cache;
pub mod client;
pub mod config;
pub mod projection;
pub mod store;
pub mod telemetry;
pub mod transport;
pub mod types;
pub mod utils;

// Re-export main types for convenience
pub use client::{ChatRequestBuilder, OllamaClient, OllamaClientBuilder};
pub use config::ClientConfig;
pub use projection::{Action, FieldSpec};
pub use store::{ConversationStore, DeleteOutcome, DeleteScope};
pub use types::{
    message::{ChatMessage, MessageRole},
    CallOptions,
};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext, ErrorKind, OrRaise};
