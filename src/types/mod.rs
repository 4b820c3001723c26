//! 类型模块：请求体、聊天消息与调用选项。
//!
//! # Types Module
//!
//! | Type | Description |
//! |------|-------------|
//! | [`ChatMessage`] | Chat message with role, text and optional images |
//! | [`MessageRole`] | system, user, assistant, tool |
//! | [`GenerateRequest`] | Body for `/api/generate` |
//! | [`EmbedRequest`] / [`EmbeddingsRequest`] | Bodies for `/api/embed` and `/api/embeddings` |
//! | [`CreateModelRequest`] | Body for `/api/create` |
//! | [`CallOptions`] | Field spec, output form, retries, timeout, cancellation |

pub mod message;
pub mod options;
pub mod request;

pub use message::{ChatMessage, MessageRole};
pub use options::CallOptions;
pub use request::{
    ChatRequestBody, CreateModelRequest, EmbedRequest, EmbeddingsRequest, GenerateRequest,
};
