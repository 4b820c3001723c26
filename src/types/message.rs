//! Chat message format for `/api/chat`.

use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
    /// Base64-encoded images for multimodal models.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
}

impl ChatMessage {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            images: Vec::new(),
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::new(MessageRole::System, text)
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(MessageRole::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, text)
    }

    pub fn with_image_base64(mut self, data: impl Into<String>) -> Self {
        self.images.push(data.into());
        self
    }

    pub async fn with_image_file(self, path: impl AsRef<Path>) -> crate::Result<Self> {
        let data = encode_image_file(path).await?;
        Ok(self.with_image_base64(data))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
    Tool,
}

/// Read an image and return it base64-encoded, as the server expects.
pub async fn encode_image_file(path: impl AsRef<Path>) -> crate::Result<String> {
    let path = path.as_ref();
    let bytes = tokio::fs::read(path).await.map_err(|e| {
        crate::Error::file_with_context(
            "io",
            format!("Failed to read image {}: {}", path.display(), e),
            crate::ErrorContext::new()
                .with_field_path(path.display().to_string())
                .with_source("images"),
        )
    })?;
    Ok(base64::engine::general_purpose::STANDARD.encode(bytes))
}
