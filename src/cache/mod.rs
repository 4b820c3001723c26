//! 元数据缓存模块：为变化缓慢的服务端元数据（模型列表、模型详情）提供带 TTL 的缓存。
//!
//! # Metadata Cache Module
//!
//! Model lists and model details change rarely, so repeated lookups within a short window
//! are answered from memory instead of the server.
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`MetadataCache`] | `get_or_fetch` with a per-call TTL and hit/miss statistics |
//! | [`CacheBackend`] | Trait for entry storage |
//! | [`MemoryCache`] | Bounded in-memory backend |
//! | [`NullCache`] | No-op backend for disabling caching |
//! | [`CacheKey`] | Endpoint + server + optional model name |
//!
//! ## Semantics
//!
//! - A hit is returned only while `now - fetched_at < ttl`.
//! - Entries are replaced whole, never edited in place.
//! - A failed fetch leaves the cache untouched (no negative caching).
//! - Keys are independent; there are no cross-key transactions.
//!
//! ## Example
//!
//! ```rust
//! use ollama_lib_rust::cache::{CacheKey, MetadataCache};
//! use ollama_lib_rust::transport::RawResponse;
//! use std::time::Duration;
//!
//! # async fn demo() -> ollama_lib_rust::Result<()> {
//! let cache = MetadataCache::in_memory(256);
//! let key = CacheKey::new("/api/tags", "http://127.0.0.1:11434");
//! let resp = cache
//!     .get_or_fetch(&key, Duration::from_secs(60), || async {
//!         Ok(RawResponse::new(200, serde_json::json!({"models": []})))
//!     })
//!     .await?;
//! assert_eq!(resp.status, 200);
//! # Ok(())
//! # }
//! ```

mod backend;
mod key;
mod manager;

pub use backend::{CacheBackend, CacheEntry, MemoryCache, NullCache};
pub use key::CacheKey;
pub use manager::{CacheStats, MetadataCache};
