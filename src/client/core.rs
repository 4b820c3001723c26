use crate::cache::{CacheKey, MetadataCache};
use crate::client::error_classification::{classify_status, is_missing_model};
use crate::client::policy::RetryPolicy;
use crate::config::ClientConfig;
use crate::projection::{project, Action};
use crate::store::ConversationStore;
use crate::telemetry::{self, EventSink, TelemetryEvent};
use crate::transport::{HttpTransport, RawResponse, RequestBody};
use crate::types::CallOptions;
use crate::Result;
use serde_json::Value;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

/// Client for one inference server.
///
/// Cheap to clone: the configuration snapshot, connection pool, metadata cache and
/// conversation store are shared between clones.
#[derive(Clone)]
pub struct OllamaClient {
    pub(crate) config: Arc<ClientConfig>,
    pub(crate) base_url: String,
    pub(crate) transport: Arc<HttpTransport>,
    pub(crate) cache: Arc<MetadataCache>,
    pub(crate) store: ConversationStore,
    pub(crate) events: Arc<dyn EventSink>,
}

/// One public operation as seen by telemetry: a request id, a clock and an attempt count.
pub(crate) struct RequestScope {
    pub(crate) action: Action,
    pub(crate) request_id: String,
    url: String,
    started: Instant,
    attempts: AtomicU32,
    status: AtomicU32,
}

impl RequestScope {
    fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::Relaxed)
    }

    fn duration_ms(&self) -> f64 {
        self.started.elapsed().as_secs_f64() * 1000.0
    }
}

/// Whether an answer came from the metadata cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CacheUse {
    Hit,
    Miss,
    Refresh,
}

impl CacheUse {
    fn as_str(&self) -> &'static str {
        match self {
            CacheUse::Hit => "hit",
            CacheUse::Miss => "miss",
            CacheUse::Refresh => "refresh",
        }
    }
}

impl OllamaClient {
    /// Client configured from the environment with the process-wide cache.
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    pub fn builder() -> crate::client::builder::OllamaClientBuilder {
        crate::client::builder::OllamaClientBuilder::new()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    pub fn cache(&self) -> &Arc<MetadataCache> {
        &self.cache
    }

    /// The model used when a request leaves it empty.
    pub(crate) fn model_or_default<'a>(&'a self, model: &'a str) -> &'a str {
        if model.trim().is_empty() {
            &self.config.default_model
        } else {
            model
        }
    }

    pub(crate) fn cache_key(&self, action: Action) -> CacheKey {
        CacheKey::new(action.path(), self.base_url.clone())
    }

    async fn notify(&self, event: TelemetryEvent) {
        if let Err(e) = self.events.notify(event).await {
            debug!("event sink rejected event: {}", e);
        }
    }

    /// Open a request scope and announce it.
    pub(crate) async fn begin(&self, action: Action, path: &str) -> RequestScope {
        let scope = RequestScope {
            action,
            request_id: Uuid::new_v4().to_string(),
            url: format!("{}{}", self.base_url, path),
            started: Instant::now(),
            attempts: AtomicU32::new(0),
            status: AtomicU32::new(0),
        };
        debug!(
            action = action.name(),
            method = %action.method(),
            url = %scope.url,
            request_id = %scope.request_id,
            "request start"
        );
        self.notify(
            TelemetryEvent::new(telemetry::REQUEST_START)
                .with_metadata("action", action.name())
                .with_metadata("method", action.method().as_str())
                .with_metadata("url", scope.url.clone())
                .with_metadata("request_id", scope.request_id.clone()),
        )
        .await;
        scope
    }

    /// Run the retrying exchange for `scope` and classify the completed response.
    pub(crate) async fn exchange(
        &self,
        scope: &RequestScope,
        body: &RequestBody,
        opts: &CallOptions,
    ) -> Result<RawResponse> {
        let policy = RetryPolicy::new(
            opts.retries.unwrap_or(self.config.retries),
            self.config.retry_backoff,
        );
        let timeout = opts.timeout.unwrap_or(self.config.timeout);
        let method = scope.action.method();
        let url = scope.url.as_str();

        let outcome = policy
            .run(opts.cancel.as_ref(), move |attempt| async move {
                scope.attempts.fetch_add(1, Ordering::Relaxed);
                if attempt > 1 {
                    self.notify(
                        TelemetryEvent::new(telemetry::REQUEST_RETRY)
                            .with_measurement("attempt", attempt as f64)
                            .with_metadata("action", scope.action.name())
                            .with_metadata("request_id", scope.request_id.clone()),
                    )
                    .await;
                }
                self.transport.send(method, url, body, timeout).await
            })
            .await;

        let response = outcome.result?;
        scope.status.store(response.status as u32, Ordering::Relaxed);
        classify_status(scope.action, &response)?;
        Ok(response)
    }

    /// [`exchange`](Self::exchange), pulling `model` once and trying again when the server
    /// reports it missing and `auto_pull` is on. The pull honours the caller's cancellation
    /// token, timeout and retry budget.
    pub(crate) async fn exchange_or_pull(
        &self,
        scope: &RequestScope,
        body: &RequestBody,
        opts: &CallOptions,
        model: &str,
    ) -> Result<RawResponse> {
        match self.exchange(scope, body, opts).await {
            Err(e) if self.config.auto_pull && scope.action.uses_model() && is_missing_model(&e) => {
                info!(model, action = scope.action.name(), "model not on server, pulling it");
                let pull_opts = CallOptions {
                    retries: opts.retries,
                    timeout: opts.timeout,
                    cancel: opts.cancel.clone(),
                    ..CallOptions::new()
                };
                self.pull_model(model, pull_opts).await?;
                self.exchange(scope, body, opts).await
            }
            other => other,
        }
    }

    /// Announce how the operation ended and hand the result back.
    pub(crate) async fn finish<T>(
        &self,
        scope: &RequestScope,
        result: Result<T>,
        cache: Option<CacheUse>,
    ) -> Result<T> {
        match &result {
            Ok(_) => {
                let mut event = TelemetryEvent::new(telemetry::REQUEST_STOP)
                    .with_measurement("duration_ms", scope.duration_ms())
                    .with_measurement("attempts", scope.attempts() as f64)
                    .with_metadata("action", scope.action.name())
                    .with_metadata("request_id", scope.request_id.clone())
                    .with_metadata("outcome", "ok");
                let status = scope.status.load(Ordering::Relaxed);
                if status != 0 {
                    event = event.with_metadata("status", status.to_string());
                }
                if let Some(c) = cache {
                    event = event.with_metadata("cache", c.as_str());
                }
                self.notify(event).await;
            }
            Err(e) => {
                debug!(
                    action = scope.action.name(),
                    request_id = %scope.request_id,
                    kind = %e.kind(),
                    reason = e.reason(),
                    "request failed: {}",
                    e
                );
                self.notify(
                    TelemetryEvent::new(telemetry::REQUEST_EXCEPTION)
                        .with_measurement("duration_ms", scope.duration_ms())
                        .with_measurement("attempts", scope.attempts() as f64)
                        .with_metadata("action", scope.action.name())
                        .with_metadata("request_id", scope.request_id.clone())
                        .with_metadata("kind", e.kind().to_string())
                        .with_metadata("reason", e.reason()),
                )
                .await;
            }
        }
        result
    }

    /// Execute, classify and project one uncached operation.
    pub(crate) async fn run(
        &self,
        action: Action,
        path: &str,
        body: RequestBody,
        opts: &CallOptions,
    ) -> Result<Value> {
        let scope = self.begin(action, path).await;
        let result = match self.exchange(&scope, &body, opts).await {
            Ok(response) => project(&response, &opts.field, action, opts.short),
            Err(e) => Err(e),
        };
        self.finish(&scope, result, None).await
    }

    /// [`run`](Self::run) for operations that need a model on the server.
    pub(crate) async fn run_with_model(
        &self,
        action: Action,
        body: RequestBody,
        opts: &CallOptions,
        model: &str,
    ) -> Result<Value> {
        let scope = self.begin(action, action.path()).await;
        let result = match self.exchange_or_pull(&scope, &body, opts, model).await {
            Ok(response) => project(&response, &opts.field, action, opts.short),
            Err(e) => Err(e),
        };
        self.finish(&scope, result, None).await
    }

    /// [`run`](Self::run) with the raw response served from the metadata cache when fresh.
    ///
    /// The cache holds unprojected responses, so different field specs share one entry.
    pub(crate) async fn run_cached(
        &self,
        action: Action,
        key: CacheKey,
        body: RequestBody,
        opts: &CallOptions,
    ) -> Result<Value> {
        let scope = self.begin(action, action.path()).await;
        let fetch = || self.exchange(&scope, &body, opts);

        let fetched = if opts.refresh {
            self.cache.fetch_and_store(&key, fetch).await
        } else {
            self.cache
                .get_or_fetch(&key, self.config.cache_ttl, fetch)
                .await
        };
        let cache_use = match (opts.refresh, scope.attempts()) {
            (true, _) => CacheUse::Refresh,
            (false, 0) => CacheUse::Hit,
            (false, _) => CacheUse::Miss,
        };

        let result = match fetched {
            Ok(response) => project(&response, &opts.field, action, opts.short),
            Err(e) => Err(e),
        };
        self.finish(&scope, result, Some(cache_use)).await
    }
}
