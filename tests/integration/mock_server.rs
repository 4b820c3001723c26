//! Mock HTTP server setup for integration tests

use mockito::{Matcher, Mock, Server, ServerGuard};
use ollama_lib_rust::cache::MetadataCache;
use ollama_lib_rust::telemetry::InMemoryEventSink;
use ollama_lib_rust::{ClientConfig, OllamaClient};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Test fixture that manages a mock server, a scratch store directory and an isolated
/// cache and event sink per client.
pub struct MockServerFixture {
    pub server: ServerGuard,
    pub base_url: String,
    pub dir: TempDir,
    pub events: Arc<InMemoryEventSink>,
}

impl MockServerFixture {
    pub async fn new() -> Self {
        let server = Server::new_async().await;
        let base_url = server.url();
        Self {
            server,
            base_url,
            dir: tempfile::tempdir().expect("tempdir"),
            events: Arc::new(InMemoryEventSink::new(256)),
        }
    }

    pub fn config(&self) -> ClientConfig {
        ClientConfig::default()
            .with_default_model("tiny")
            .with_store_path(self.dir.path().join("chats.json"))
            .with_retries(0)
            .with_retry_backoff(Duration::from_millis(10))
            .with_timeout(Duration::from_secs(5))
    }

    /// Client pointed at the mock server with its own cache and event sink.
    pub fn client(&self) -> OllamaClient {
        self.client_with(self.config())
    }

    pub fn client_with(&self, config: ClientConfig) -> OllamaClient {
        OllamaClient::builder()
            .config(config)
            .base_url_override(&self.base_url)
            .metadata_cache(Arc::new(MetadataCache::in_memory(64)))
            .event_sink(self.events.clone())
            .build()
            .expect("client")
    }

    /// Create a mock for a JSON response
    pub async fn mock_json(&mut self, method: &str, path: &str, status: usize, body: &str) -> Mock {
        self.server
            .mock(method, path)
            .with_status(status)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await
    }

    /// Create a JSON mock that only answers requests whose body contains `partial`.
    pub async fn mock_json_matching(
        &mut self,
        method: &str,
        path: &str,
        partial: serde_json::Value,
        status: usize,
        body: &str,
    ) -> Mock {
        self.server
            .mock(method, path)
            .match_body(Matcher::PartialJson(partial))
            .with_status(status)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await
    }

    /// Create a mock answering with newline-delimited JSON progress lines
    pub async fn mock_ndjson(&mut self, path: &str, lines: &[&str]) -> Mock {
        let body = lines.iter().map(|l| format!("{}\n", l)).collect::<String>();
        self.server
            .mock("POST", path)
            .with_status(200)
            .with_header("content-type", "application/x-ndjson")
            .with_body(body)
            .create_async()
            .await
    }
}
