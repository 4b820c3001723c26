use crate::cache::MetadataCache;
use crate::client::core::OllamaClient;
use crate::config::ClientConfig;
use crate::store::ConversationStore;
use crate::telemetry::EventSink;
use crate::transport::HttpTransport;
use crate::Result;
use std::sync::Arc;

/// Builder for creating clients with custom configuration.
///
/// Keep this surface area small and predictable (developer-friendly).
pub struct OllamaClientBuilder {
    config: Option<ClientConfig>,
    events: Option<Arc<dyn EventSink>>,
    cache: Option<Arc<MetadataCache>>,
    store: Option<ConversationStore>,
    /// Override base URL (primarily for testing with mock servers)
    base_url_override: Option<String>,
}

impl OllamaClientBuilder {
    pub fn new() -> Self {
        Self {
            config: None,
            events: None,
            cache: None,
            store: None,
            base_url_override: None,
        }
    }

    /// Use this configuration instead of [`ClientConfig::from_env`].
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Inject an event sink. Default is the global sink ([`crate::telemetry::get_event_sink`]).
    pub fn event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.events = Some(sink);
        self
    }

    /// Use a private metadata cache. Default is [`MetadataCache::global`].
    pub fn metadata_cache(mut self, cache: Arc<MetadataCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Share a conversation store handle (and its write lock) with other clients.
    pub fn conversation_store(mut self, store: ConversationStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Override the base URL derived from the configured host and port.
    ///
    /// This is primarily for testing with mock servers.
    pub fn base_url_override(mut self, base_url: impl Into<String>) -> Self {
        self.base_url_override = Some(base_url.into());
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<OllamaClient> {
        let config = self.config.unwrap_or_else(ClientConfig::from_env);
        let base_url = self
            .base_url_override
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| config.base_url());
        let store = self
            .store
            .unwrap_or_else(|| ConversationStore::new(config.store_path.clone()));

        Ok(OllamaClient {
            base_url,
            transport: Arc::new(HttpTransport::new()?),
            cache: self.cache.unwrap_or_else(MetadataCache::global),
            events: self.events.unwrap_or_else(crate::telemetry::get_event_sink),
            store,
            config: Arc::new(config),
        })
    }
}

impl Default for OllamaClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn override_wins_over_config() {
        let client = OllamaClientBuilder::new()
            .config(ClientConfig::default().with_port(9999))
            .base_url_override("http://127.0.0.1:1234/")
            .build()
            .unwrap();
        assert_eq!(client.base_url(), "http://127.0.0.1:1234");
        assert_eq!(client.config().port, 9999);
    }

    #[test]
    fn store_follows_config_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chats.json");
        let client = OllamaClientBuilder::new()
            .config(
                ClientConfig::default()
                    .with_store_path(&path)
                    .with_timeout(Duration::from_secs(5)),
            )
            .build()
            .unwrap();
        assert_eq!(client.store().path(), path.as_path());
    }

    #[test]
    fn default_cache_is_shared() {
        let a = OllamaClientBuilder::new()
            .config(ClientConfig::default())
            .build()
            .unwrap();
        let b = OllamaClientBuilder::new()
            .config(ClientConfig::default())
            .build()
            .unwrap();
        assert!(Arc::ptr_eq(a.cache(), b.cache()));
    }
}
