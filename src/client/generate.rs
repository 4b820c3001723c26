//! Completion and embedding operations.

use crate::client::core::OllamaClient;
use crate::projection::Action;
use crate::transport::RequestBody;
use crate::types::{CallOptions, EmbedRequest, EmbeddingsRequest, GenerateRequest};
use crate::{Error, Result};
use serde::Serialize;
use serde_json::Value;

fn encode<T: Serialize>(action: Action, body: &T) -> Result<RequestBody> {
    serde_json::to_value(body)
        .map(RequestBody::Json)
        .map_err(|e| Error::client("request_encode", format!("Cannot encode {} request: {}", action, e)))
}

impl OllamaClient {
    /// One non-streamed completion. An empty model name uses the configured default.
    pub async fn generate(&self, request: GenerateRequest, opts: CallOptions) -> Result<Value> {
        let model = self.model_or_default(&request.model).to_string();
        let request = GenerateRequest {
            model: model.clone(),
            stream: false,
            ..request
        };
        let body = encode(Action::Generate, &request)?;
        self.run_with_model(Action::Generate, body, &opts, &model).await
    }

    /// Embeddings for one string or a list of strings (`/api/embed`).
    pub async fn embed(&self, request: EmbedRequest, opts: CallOptions) -> Result<Value> {
        let model = self.model_or_default(&request.model).to_string();
        let request = EmbedRequest {
            model: model.clone(),
            ..request
        };
        let body = encode(Action::Embed, &request)?;
        self.run_with_model(Action::Embed, body, &opts, &model).await
    }

    /// Single-prompt embedding on the older `/api/embeddings` endpoint.
    pub async fn embeddings(&self, request: EmbeddingsRequest, opts: CallOptions) -> Result<Value> {
        let model = self.model_or_default(&request.model).to_string();
        let request = EmbeddingsRequest {
            model: model.clone(),
            ..request
        };
        let body = encode(Action::Embeddings, &request)?;
        self.run_with_model(Action::Embeddings, body, &opts, &model)
            .await
    }
}
