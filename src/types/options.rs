use crate::projection::FieldSpec;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Per-call knobs shared by every operation.
///
/// Defaults: short (projected) output with the action's default field, retries and timeout
/// from the client configuration, no cancellation.
#[derive(Debug, Clone)]
pub struct CallOptions {
    pub field: FieldSpec,
    /// `false` returns the whole response (`status`, `headers`, `body`).
    pub short: bool,
    pub retries: Option<u32>,
    pub timeout: Option<Duration>,
    pub cancel: Option<CancellationToken>,
    /// Bypass the metadata cache lookup (the fresh answer still replaces the entry).
    pub refresh: bool,
}

impl Default for CallOptions {
    fn default() -> Self {
        Self {
            field: FieldSpec::None,
            short: true,
            retries: None,
            timeout: None,
            cancel: None,
            refresh: false,
        }
    }
}

impl CallOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, field: impl Into<FieldSpec>) -> Self {
        self.field = field.into();
        self
    }

    pub fn raw(mut self) -> Self {
        self.short = false;
        self
    }

    pub fn retries(mut self, retries: u32) -> Self {
        self.retries = Some(retries);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn refresh(mut self) -> Self {
        self.refresh = true;
        self
    }
}
