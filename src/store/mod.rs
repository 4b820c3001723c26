//! 会话存储模块：以单个 JSON 文件持久化的用户 → 会话 → 消息结构。
//!
//! # Conversation Store
//!
//! A file-backed, two-level keyed structure: `user_id → chat_id → Chat`. The whole document
//! is read, changed in memory and written back on every mutation. Writes go to a sibling
//! temporary file that is renamed over the original, so the file on disk is always a
//! complete snapshot.
//!
//! Clones of a [`ConversationStore`] share one async mutex, which serializes mutations made
//! inside this process. Separate processes writing the same file still race with
//! last-write-wins semantics.
//!
//! ## Example
//!
//! ```rust,no_run
//! use ollama_lib_rust::store::{ConversationStore, DeleteScope};
//!
//! # async fn demo() -> ollama_lib_rust::Result<()> {
//! let store = ConversationStore::new("/tmp/chats.json");
//! let pending = store.append_turn("u1", "c1", "llama3.2", "hello").await?;
//! store.commit_turn(&pending, "hi").await?;
//! store.delete(DeleteScope::user("u1"), true).await?;
//! # Ok(())
//! # }
//! ```

mod file;
mod types;

pub use file::{ConversationStore, PendingTurn};
pub use types::{Chat, DeleteOutcome, DeleteScope, Root, StoredMessage};
