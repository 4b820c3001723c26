use super::types::{Chat, DeleteOutcome, DeleteScope, Root, StoredMessage};
use crate::types::message::ChatMessage;
use crate::{Error, ErrorContext, Result};
use chrono::Utc;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// A user message that has not been persisted yet.
///
/// Produced by [`ConversationStore::append_turn`]; written together with the reply by
/// [`ConversationStore::commit_turn`] once the remote call succeeded.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingTurn {
    pub user_id: String,
    pub chat_id: String,
    pub model: String,
    pub user_message: StoredMessage,
    /// Messages already stored for this chat, oldest first.
    pub history: Vec<StoredMessage>,
}

impl PendingTurn {
    /// History followed by the new user message, ready for `/api/chat`.
    pub fn request_messages(&self) -> Vec<ChatMessage> {
        self.history
            .iter()
            .chain(std::iter::once(&self.user_message))
            .map(StoredMessage::to_chat_message)
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct ConversationStore {
    path: Arc<PathBuf>,
    write_lock: Arc<Mutex<()>>,
}

impl ConversationStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Arc::new(path.into()),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ctx(&self) -> ErrorContext {
        ErrorContext::new()
            .with_field_path(self.path.display().to_string())
            .with_source("conversation_store")
    }

    /// Read the whole store. A missing file is created empty and returned.
    pub async fn load(&self) -> Result<Root> {
        let _guard = self.write_lock.lock().await;
        self.load_unlocked().await
    }

    async fn load_unlocked(&self) -> Result<Root> {
        let raw = match tokio::fs::read(self.path.as_ref()).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "creating empty conversation store");
                let root = Root::empty();
                self.save_unlocked(&root).await?;
                return Ok(root);
            }
            Err(e) => {
                return Err(Error::file_with_context(
                    "io",
                    format!("Failed to read conversation store {}: {}", self.path.display(), e),
                    self.ctx(),
                ))
            }
        };

        serde_json::from_slice::<Root>(&raw).map_err(|e| {
            Error::file_with_context(
                "decode",
                format!(
                    "Conversation store {} is not a valid document: {}",
                    self.path.display(),
                    e
                ),
                self.ctx(),
            )
        })
    }

    async fn save_unlocked(&self, root: &Root) -> Result<()> {
        let write_err = |e: std::io::Error| {
            Error::file_with_context(
                "io",
                format!("Failed to write conversation store {}: {}", self.path.display(), e),
                self.ctx(),
            )
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
            }
        }

        let encoded = serde_json::to_vec_pretty(root).map_err(|e| {
            Error::file_with_context(
                "encode",
                format!("Failed to encode conversation store: {}", e),
                self.ctx(),
            )
        })?;

        let mut tmp = self.path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        tokio::fs::write(&tmp, &encoded).await.map_err(write_err)?;
        tokio::fs::rename(&tmp, self.path.as_ref())
            .await
            .map_err(write_err)
    }

    /// Replace the stored document.
    pub async fn save(&self, root: &Root) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.save_unlocked(root).await
    }

    /// File-integrity probe: the file exists, decodes as JSON and has a `"chats"` key.
    pub async fn verify(&self) -> Result<()> {
        let raw = tokio::fs::read(self.path.as_ref()).await.map_err(|e| {
            Error::file_with_context(
                if e.kind() == std::io::ErrorKind::NotFound { "enoent" } else { "io" },
                format!("Cannot read conversation store {}: {}", self.path.display(), e),
                self.ctx(),
            )
        })?;
        let doc: serde_json::Value = serde_json::from_slice(&raw).map_err(|e| {
            Error::file_with_context(
                "decode",
                format!("Conversation store {} is not JSON: {}", self.path.display(), e),
                self.ctx(),
            )
        })?;
        if doc.get("chats").map(|c| c.is_object()).unwrap_or(false) {
            Ok(())
        } else {
            Err(Error::file_with_context(
                "missing_chats",
                format!(
                    "Conversation store {} has no \"chats\" map",
                    self.path.display()
                ),
                self.ctx(),
            ))
        }
    }

    /// Prepare a turn: read the chat history and stamp the new user message. Nothing is
    /// written until [`commit_turn`](Self::commit_turn).
    pub async fn append_turn(
        &self,
        user_id: &str,
        chat_id: &str,
        model: &str,
        user_text: &str,
    ) -> Result<PendingTurn> {
        let root = self.load().await?;
        let history = root
            .chat(user_id, chat_id)
            .map(|c| c.messages.clone())
            .unwrap_or_default();
        Ok(PendingTurn {
            user_id: user_id.to_string(),
            chat_id: chat_id.to_string(),
            model: model.to_string(),
            user_message: StoredMessage::user(user_text),
            history,
        })
    }

    /// Append the user message and the assistant reply, creating the user and chat entries
    /// when absent, and persist the whole store.
    pub async fn commit_turn(&self, pending: &PendingTurn, assistant_text: &str) -> Result<Chat> {
        let _guard = self.write_lock.lock().await;
        let mut root = self.load_unlocked().await?;

        let chat = root
            .chats
            .entry(pending.user_id.clone())
            .or_default()
            .entry(pending.chat_id.clone())
            .or_insert_with(|| Chat::new(pending.chat_id.clone(), pending.model.clone()));

        chat.messages.push(pending.user_message.clone());
        chat.messages.push(StoredMessage::assistant(assistant_text));
        chat.model = pending.model.clone();
        chat.updated_at = Utc::now();
        let committed = chat.clone();

        self.save_unlocked(&root).await?;
        debug!(
            user_id = %pending.user_id,
            chat_id = %pending.chat_id,
            messages = committed.messages.len(),
            "chat turn committed"
        );
        Ok(committed)
    }

    /// Remove chats. Bulk scopes (`All`, `User`) need `confirm == true`.
    pub async fn delete(&self, scope: DeleteScope, confirm: bool) -> Result<DeleteOutcome> {
        if scope.requires_confirmation() && !confirm {
            let (what, call) = match &scope {
                DeleteScope::User(u) => (
                    format!("all chats of user '{}'", u),
                    format!("DeleteScope::user({:?})", u),
                ),
                _ => ("all chats".to_string(), "DeleteScope::All".to_string()),
            };
            return Err(Error::invalid_with_context(
                "confirmation_required",
                format!(
                    "Deleting {} is destructive; call delete({}, true) to confirm",
                    what, call
                ),
                self.ctx(),
            ));
        }

        let _guard = self.write_lock.lock().await;
        let mut root = self.load_unlocked().await?;

        let outcome = match &scope {
            DeleteScope::All => {
                if root.chats.is_empty() {
                    DeleteOutcome::AlreadyAbsent
                } else {
                    root.chats = BTreeMap::new();
                    DeleteOutcome::Deleted
                }
            }
            DeleteScope::User(user_id) => match root.chats.remove(user_id) {
                Some(_) => DeleteOutcome::Deleted,
                None => DeleteOutcome::AlreadyAbsent,
            },
            DeleteScope::Chat { user_id, chat_id } => {
                let removed = root
                    .chats
                    .get_mut(user_id)
                    .and_then(|chats| chats.remove(chat_id))
                    .is_some();
                if root.chats.get(user_id).map(|c| c.is_empty()).unwrap_or(false) {
                    root.chats.remove(user_id);
                }
                if removed {
                    DeleteOutcome::Deleted
                } else {
                    DeleteOutcome::AlreadyAbsent
                }
            }
        };

        if outcome == DeleteOutcome::Deleted {
            self.save_unlocked(&root).await?;
        }
        Ok(outcome)
    }

    pub async fn list_users(&self) -> Result<Vec<String>> {
        Ok(self.load().await?.chats.into_keys().collect())
    }

    pub async fn list_chats(&self, user_id: &str) -> Result<BTreeMap<String, Chat>> {
        Ok(self
            .load()
            .await?
            .chats
            .remove(user_id)
            .unwrap_or_default())
    }

    pub async fn get_chat(&self, user_id: &str, chat_id: &str) -> Result<Option<Chat>> {
        Ok(self.load().await?.chat(user_id, chat_id).cloned())
    }

    /// Returns `false` when the chat does not exist.
    pub async fn rename_chat(&self, user_id: &str, chat_id: &str, name: &str) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let mut root = self.load_unlocked().await?;
        let Some(chat) = root.chats.get_mut(user_id).and_then(|c| c.get_mut(chat_id)) else {
            return Ok(false);
        };
        chat.name = name.to_string();
        chat.updated_at = Utc::now();
        self.save_unlocked(&root).await?;
        Ok(true)
    }
}
