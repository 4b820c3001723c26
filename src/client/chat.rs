use crate::projection::{project, Action};
use crate::store::PendingTurn;
use crate::transport::RequestBody;
use crate::types::message::encode_image_file;
use crate::types::{CallOptions, ChatMessage, ChatRequestBody};
use crate::utils::json_path::PathMapper;
use crate::{Error, Result};
use serde_json::Value;
use std::path::PathBuf;
use tracing::{error, warn};

use super::core::OllamaClient;

/// Builder for chat requests.
///
/// Without [`conversation`](Self::conversation) the request is stateless: the messages
/// given here are all the server sees. With it, the stored history of that chat is sent
/// first and the new turn is persisted once the server answered.
pub struct ChatRequestBuilder<'a> {
    pub(crate) client: &'a OllamaClient,
    pub(crate) model: Option<String>,
    pub(crate) messages: Vec<ChatMessage>,
    pub(crate) text: Option<String>,
    pub(crate) images: Vec<String>,
    pub(crate) image_files: Vec<PathBuf>,
    pub(crate) conversation: Option<(String, String)>,
    pub(crate) options: Option<Value>,
    pub(crate) format: Option<Value>,
    pub(crate) keep_alive: Option<Value>,
    pub(crate) call_options: CallOptions,
}

impl OllamaClient {
    /// Start a chat request.
    pub fn chat(&self) -> ChatRequestBuilder<'_> {
        ChatRequestBuilder::new(self)
    }
}

impl<'a> ChatRequestBuilder<'a> {
    pub(crate) fn new(client: &'a OllamaClient) -> Self {
        Self {
            client,
            model: None,
            messages: Vec::new(),
            text: None,
            images: Vec::new(),
            image_files: Vec::new(),
            conversation: None,
            options: None,
            format: None,
            keep_alive: None,
            call_options: CallOptions::default(),
        }
    }

    /// Model to chat with. Defaults to the configured model.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// The new user message.
    pub fn message(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Messages sent before the stored history and the new user message
    /// (typically a system prompt, or the whole history for stateless calls).
    pub fn messages(mut self, messages: Vec<ChatMessage>) -> Self {
        self.messages = messages;
        self
    }

    /// Persist this turn under `user_id` / `chat_id` in the client's conversation store.
    pub fn conversation(mut self, user_id: impl Into<String>, chat_id: impl Into<String>) -> Self {
        self.conversation = Some((user_id.into(), chat_id.into()));
        self
    }

    /// Base64-encoded images attached to the new user message.
    pub fn images(mut self, images: Vec<String>) -> Self {
        self.images = images;
        self
    }

    /// Image file read and encoded when the request is sent.
    pub fn image_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.image_files.push(path.into());
        self
    }

    /// Model parameters (`temperature`, `num_ctx`, ...).
    pub fn options(mut self, options: Value) -> Self {
        self.options = Some(options);
        self
    }

    /// `"json"` or a JSON schema for structured output.
    pub fn format(mut self, format: Value) -> Self {
        self.format = Some(format);
        self
    }

    pub fn keep_alive(mut self, keep_alive: impl Into<Value>) -> Self {
        self.keep_alive = Some(keep_alive.into());
        self
    }

    pub fn call_options(mut self, opts: CallOptions) -> Self {
        self.call_options = opts;
        self
    }

    async fn new_user_message(&self, text: &str) -> Result<ChatMessage> {
        let mut msg = ChatMessage::user(text);
        msg.images.extend(self.images.iter().cloned());
        for path in &self.image_files {
            msg.images.push(encode_image_file(path).await?);
        }
        Ok(msg)
    }

    /// Send the request and return the projected answer
    /// (by default the assistant's text).
    pub async fn send(self) -> Result<Value> {
        let client = self.client;
        let model = client
            .model_or_default(self.model.as_deref().unwrap_or(""))
            .to_string();

        let mut messages = self.messages.clone();
        let pending = match (&self.conversation, &self.text) {
            (Some((user_id, chat_id)), Some(text)) => {
                let pending = client
                    .store
                    .append_turn(user_id, chat_id, &model, text)
                    .await?;
                messages.extend(pending.history.iter().map(|m| m.to_chat_message()));
                messages.push(self.new_user_message(text).await?);
                Some(pending)
            }
            (Some(_), None) => {
                return Err(Error::invalid(
                    "missing_message",
                    "A conversation turn needs a user message; call message(..) first",
                ));
            }
            (None, Some(text)) => {
                messages.push(self.new_user_message(text).await?);
                None
            }
            (None, None) => None,
        };
        if messages.is_empty() {
            return Err(Error::invalid("missing_message", "chat needs at least one message"));
        }

        let body = ChatRequestBody {
            model: model.clone(),
            messages,
            format: self.format,
            options: self.options,
            keep_alive: self.keep_alive,
            tools: None,
            stream: false,
        };
        let body = serde_json::to_value(&body)
            .map(RequestBody::Json)
            .map_err(|e| Error::client("request_encode", format!("Cannot encode chat request: {}", e)))?;

        let opts = &self.call_options;
        let scope = client.begin(Action::Chat, Action::Chat.path()).await;
        let result = match client.exchange_or_pull(&scope, &body, opts, &model).await {
            Ok(response) => {
                if let Some(pending) = &pending {
                    commit(client, pending, &response.body).await;
                }
                project(&response, &opts.field, Action::Chat, opts.short)
            }
            Err(e) => Err(e),
        };
        client.finish(&scope, result, None).await
    }
}

/// Persist a successful turn. Failures are logged; the caller still gets the answer.
async fn commit(client: &OllamaClient, pending: &PendingTurn, body: &Value) {
    let reply = match PathMapper::get_path(body, "message.content") {
        Some(Value::String(text)) => text.clone(),
        Some(other) if !other.is_null() => other.to_string(),
        _ => {
            warn!(
                user_id = %pending.user_id,
                chat_id = %pending.chat_id,
                "chat reply has no message.content, turn not persisted"
            );
            return;
        }
    };
    if let Err(e) = client.store.commit_turn(pending, &reply).await {
        error!(
            user_id = %pending.user_id,
            chat_id = %pending.chat_id,
            reason = e.reason(),
            "failed to persist chat turn: {}",
            e
        );
    }
}
