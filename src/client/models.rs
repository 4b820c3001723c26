//! Model management operations.

use crate::client::core::OllamaClient;
use crate::client::error_classification::check_stream_lines;
use crate::projection::{project, Action};
use crate::transport::RequestBody;
use crate::types::{CallOptions, CreateModelRequest};
use crate::{Error, Result};
use serde_json::{json, Value};
use tracing::debug;

impl OllamaClient {
    /// Models available locally (`GET /api/tags`). Served from the metadata cache.
    pub async fn list_models(&self, opts: CallOptions) -> Result<Value> {
        let key = self.cache_key(Action::ListModels);
        self.run_cached(Action::ListModels, key, RequestBody::Empty, &opts)
            .await
    }

    /// Details of one model (`POST /api/show`). Served from the metadata cache.
    pub async fn show_model(&self, model: &str, opts: CallOptions) -> Result<Value> {
        let model = self.model_or_default(model);
        let key = self.cache_key(Action::ShowModel).with_model(model);
        self.run_cached(
            Action::ShowModel,
            key,
            RequestBody::Json(json!({ "model": model })),
            &opts,
        )
        .await
    }

    /// Models currently loaded in memory (`GET /api/ps`).
    pub async fn running_models(&self, opts: CallOptions) -> Result<Value> {
        self.run(
            Action::RunningModels,
            Action::RunningModels.path(),
            RequestBody::Empty,
            &opts,
        )
        .await
    }

    /// Server version string.
    pub async fn version(&self, opts: CallOptions) -> Result<Value> {
        self.run(Action::Version, Action::Version.path(), RequestBody::Empty, &opts)
            .await
    }

    pub async fn create_model(&self, request: CreateModelRequest, opts: CallOptions) -> Result<Value> {
        if request.model.trim().is_empty() {
            return Err(Error::invalid("missing_model", "create_model needs a model name"));
        }
        let body = serde_json::to_value(CreateModelRequest {
            stream: false,
            ..request
        })
        .map_err(|e| Error::client("request_encode", format!("Cannot encode create request: {}", e)))?;
        let out = self
            .run(Action::CreateModel, Action::CreateModel.path(), RequestBody::Json(body), &opts)
            .await;
        self.models_changed();
        out
    }

    pub async fn copy_model(&self, source: &str, destination: &str, opts: CallOptions) -> Result<Value> {
        let body = json!({ "source": source, "destination": destination });
        let out = self
            .run(Action::CopyModel, Action::CopyModel.path(), RequestBody::Json(body), &opts)
            .await;
        self.models_changed();
        out
    }

    /// `DELETE /api/delete`. A missing model is `Error::Http` with status 404.
    pub async fn delete_model(&self, model: &str, opts: CallOptions) -> Result<Value> {
        let body = json!({ "model": model });
        let out = self
            .run(Action::DeleteModel, Action::DeleteModel.path(), RequestBody::Json(body), &opts)
            .await;
        self.models_changed();
        out
    }

    /// Download a model. Progress lines are returned as a list; a line carrying `"error"`
    /// fails the call with `Error::Pull`.
    pub async fn pull_model(&self, model: &str, opts: CallOptions) -> Result<Value> {
        let model = self.model_or_default(model);
        self.transfer(Action::PullModel, model, opts).await
    }

    /// Upload a model to a registry. Same stream handling as [`pull_model`](Self::pull_model).
    pub async fn push_model(&self, model: &str, opts: CallOptions) -> Result<Value> {
        self.transfer(Action::PushModel, model, opts).await
    }

    /// Load a model into memory with an empty generate request.
    pub async fn load_model(&self, model: &str, opts: CallOptions) -> Result<Value> {
        let model = self.model_or_default(model);
        self.run(
            Action::LoadModel,
            Action::LoadModel.path(),
            RequestBody::Json(json!({ "model": model })),
            &opts,
        )
        .await
    }

    /// Evict a model from memory (`keep_alive: 0`).
    pub async fn unload_model(&self, model: &str, opts: CallOptions) -> Result<Value> {
        let model = self.model_or_default(model);
        self.run(
            Action::UnloadModel,
            Action::UnloadModel.path(),
            RequestBody::Json(json!({ "model": model, "keep_alive": 0 })),
            &opts,
        )
        .await
    }

    async fn transfer(&self, action: Action, model: &str, opts: CallOptions) -> Result<Value> {
        let body = RequestBody::Json(json!({ "model": model, "stream": true }));
        let scope = self.begin(action, action.path()).await;
        let result = match self.exchange(&scope, &body, &opts).await {
            Ok(response) => check_stream_lines(action, &response.body)
                .and_then(|_| project(&response, &opts.field, action, opts.short)),
            Err(e) => Err(e),
        };
        self.models_changed();
        self.finish(&scope, result, None).await
    }

    /// Forget cached model lists and details for this server.
    fn models_changed(&self) {
        let dropped = self.cache.invalidate_server(&self.base_url);
        if dropped > 0 {
            debug!(base_url = %self.base_url, dropped, "metadata cache invalidated");
        }
    }
}
