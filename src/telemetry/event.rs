//! Core telemetry types.
//!
//! The client notifies an [`EventSink`] with `(name, measurements, metadata)` triples. What
//! happens to them (metrics, tracing spans, nothing) is up to the sink.

use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

pub const REQUEST_START: &str = "ollama.request.start";
pub const REQUEST_RETRY: &str = "ollama.request.retry";
pub const REQUEST_STOP: &str = "ollama.request.stop";
pub const REQUEST_EXCEPTION: &str = "ollama.request.exception";

fn timestamp() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryEvent {
    pub name: String,
    pub measurements: BTreeMap<String, f64>,
    pub metadata: BTreeMap<String, String>,
    pub timestamp: f64,
}

impl TelemetryEvent {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            measurements: BTreeMap::new(),
            metadata: BTreeMap::new(),
            timestamp: timestamp(),
        }
    }

    pub fn with_measurement(mut self, key: impl Into<String>, value: f64) -> Self {
        self.measurements.insert(key.into(), value);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn request_id(&self) -> Option<&str> {
        self.metadata.get("request_id").map(|s| s.as_str())
    }
}

/// Event sink trait.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn notify(&self, event: TelemetryEvent) -> Result<()>;
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Default sink; drops everything.
pub struct NoopEventSink;

#[async_trait]
impl EventSink for NoopEventSink {
    async fn notify(&self, _: TelemetryEvent) -> Result<()> {
        Ok(())
    }
}

pub fn noop_sink() -> Arc<dyn EventSink> {
    Arc::new(NoopEventSink)
}
