//! 遥测模块：向外部钩子发送结构化的请求事件。
//!
//! Telemetry Module.
//!
//! The client emits structured request events through an [`EventSink`]. Nothing is collected
//! unless the application installs a sink.
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`TelemetryEvent`] | Event name, numeric measurements, string metadata |
//! | [`EventSink`] | Trait for event destinations |
//! | [`NoopEventSink`] | Default no-op sink |
//! | [`InMemoryEventSink`] | In-memory sink for testing |
//! | [`TracingEventSink`] | Forwards events to `tracing` |
//! | [`CompositeEventSink`] | Multi-destination composite sink |

mod event;

pub use event::{
    noop_sink, EventSink, NoopEventSink, TelemetryEvent, REQUEST_EXCEPTION, REQUEST_RETRY,
    REQUEST_START, REQUEST_STOP,
};

use crate::Result;
use async_trait::async_trait;
use std::sync::{Arc, PoisonError, RwLock};

/// In-memory sink for testing.
pub struct InMemoryEventSink {
    events: RwLock<Vec<TelemetryEvent>>,
    max_events: usize,
}

impl InMemoryEventSink {
    pub fn new(max: usize) -> Self {
        Self {
            events: RwLock::new(Vec::new()),
            max_events: max.max(1),
        }
    }

    pub fn get_events(&self) -> Vec<TelemetryEvent> {
        self.events
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn get_events_by_name(&self, name: &str) -> Vec<TelemetryEvent> {
        self.events
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|e| e.name == name)
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.events
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn len(&self) -> usize {
        self.events
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl EventSink for InMemoryEventSink {
    async fn notify(&self, event: TelemetryEvent) -> Result<()> {
        let mut events = self.events.write().unwrap_or_else(PoisonError::into_inner);
        events.push(event);
        if events.len() > self.max_events {
            events.remove(0);
        }
        Ok(())
    }
}

/// Logs each event at debug level.
#[derive(Default)]
pub struct TracingEventSink;

#[async_trait]
impl EventSink for TracingEventSink {
    async fn notify(&self, event: TelemetryEvent) -> Result<()> {
        tracing::debug!(
            event = %event.name,
            measurements = ?event.measurements,
            metadata = ?event.metadata,
            "telemetry"
        );
        Ok(())
    }
}

/// Composite sink for multiple destinations.
pub struct CompositeEventSink {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl CompositeEventSink {
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    pub fn add_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl Default for CompositeEventSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventSink for CompositeEventSink {
    async fn notify(&self, event: TelemetryEvent) -> Result<()> {
        for s in &self.sinks {
            let _ = s.notify(event.clone()).await;
        }
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        for s in &self.sinks {
            let _ = s.close().await;
        }
        Ok(())
    }
}

static GLOBAL_SINK: once_cell::sync::Lazy<RwLock<Arc<dyn EventSink>>> =
    once_cell::sync::Lazy::new(|| RwLock::new(Arc::new(NoopEventSink)));

/// Returns the globally configured event sink.
pub fn get_event_sink() -> Arc<dyn EventSink> {
    GLOBAL_SINK
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

/// Sets the global event sink. Clients built afterwards without an explicit sink use it.
pub fn set_event_sink(sink: Arc<dyn EventSink>) {
    *GLOBAL_SINK.write().unwrap_or_else(PoisonError::into_inner) = sink;
}
