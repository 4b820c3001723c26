use crate::types::message::{ChatMessage, MessageRole};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The persisted document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Root {
    pub chats: BTreeMap<String, BTreeMap<String, Chat>>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Root {
    pub fn empty() -> Self {
        Self {
            chats: BTreeMap::new(),
            created_at: Utc::now(),
        }
    }

    pub fn chat(&self, user_id: &str, chat_id: &str) -> Option<&Chat> {
        self.chats.get(user_id).and_then(|chats| chats.get(chat_id))
    }

    pub fn chat_count(&self) -> usize {
        self.chats.values().map(|c| c.len()).sum()
    }
}

impl Default for Root {
    fn default() -> Self {
        Self::empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chat {
    pub name: String,
    pub model: String,
    pub messages: Vec<StoredMessage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Chat {
    pub fn new(name: impl Into<String>, model: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            model: model.into(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// History in request form.
    pub fn to_chat_messages(&self) -> Vec<ChatMessage> {
        self.messages.iter().map(StoredMessage::to_chat_message).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMessage {
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl StoredMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn to_chat_message(&self) -> ChatMessage {
        ChatMessage::new(self.role, self.content.clone())
    }
}

/// What a delete call targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteScope {
    /// Every chat of every user. Requires confirmation.
    All,
    /// Every chat of one user. Requires confirmation.
    User(String),
    /// One chat.
    Chat { user_id: String, chat_id: String },
}

impl DeleteScope {
    pub fn user(user_id: impl Into<String>) -> Self {
        DeleteScope::User(user_id.into())
    }

    pub fn chat(user_id: impl Into<String>, chat_id: impl Into<String>) -> Self {
        DeleteScope::Chat {
            user_id: user_id.into(),
            chat_id: chat_id.into(),
        }
    }

    pub fn requires_confirmation(&self) -> bool {
        matches!(self, DeleteScope::All | DeleteScope::User(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    AlreadyAbsent,
}
