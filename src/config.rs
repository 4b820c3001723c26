//! Client configuration snapshot.
//!
//! A [`ClientConfig`] is built once (defaults, environment, or a YAML file) and shared
//! read-only by every call made through a client handle.

use crate::{Error, ErrorContext, Result};
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 11434;
pub const DEFAULT_MODEL: &str = "llama3.2";

#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub scheme: String,
    pub host: String,
    pub port: u16,
    pub default_model: String,
    /// Per-attempt timeout.
    pub timeout: Duration,
    /// Transport-failure retries after the first attempt.
    pub retries: u32,
    pub retry_backoff: Duration,
    pub store_path: PathBuf,
    pub cache_ttl: Duration,
    /// Pull a missing model once and retry generate/chat/embed calls.
    pub auto_pull: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            scheme: "http".to_string(),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            default_model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(120),
            retries: 2,
            retry_backoff: Duration::from_millis(200),
            store_path: default_store_path(),
            cache_ttl: Duration::from_secs(60),
            auto_pull: false,
        }
    }
}

fn default_store_path() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("ollama-lib-rust").join("chats.json"))
        .unwrap_or_else(|| PathBuf::from("chats.json"))
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.trim().parse::<T>().ok())
}

fn env_flag(key: &str) -> Option<bool> {
    env::var(key)
        .ok()
        .map(|s| matches!(s.trim().to_lowercase().as_str(), "1" | "true" | "yes"))
}

/// On-disk shape. Every key is optional and falls back to the defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    host: Option<String>,
    port: Option<u16>,
    default_model: Option<String>,
    timeout_secs: Option<u64>,
    retries: Option<u32>,
    retry_backoff_ms: Option<u64>,
    store_path: Option<PathBuf>,
    cache_ttl_secs: Option<u64>,
    auto_pull: Option<bool>,
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overlaid with `OLLAMA_*` environment variables.
    ///
    /// Unparsable values are ignored rather than rejected.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(host) = env::var("OLLAMA_HOST") {
            cfg.apply_host(&host);
        }
        if let Some(port) = env_parse::<u16>("OLLAMA_PORT") {
            cfg.port = port;
        }
        if let Ok(model) = env::var("OLLAMA_MODEL") {
            if !model.trim().is_empty() {
                cfg.default_model = model.trim().to_string();
            }
        }
        if let Some(secs) = env_parse::<u64>("OLLAMA_TIMEOUT_SECS") {
            cfg.timeout = Duration::from_secs(secs.max(1));
        }
        if let Some(retries) = env_parse::<u32>("OLLAMA_RETRIES") {
            cfg.retries = retries;
        }
        if let Some(ms) = env_parse::<u64>("OLLAMA_RETRY_BACKOFF_MS") {
            cfg.retry_backoff = Duration::from_millis(ms);
        }
        if let Ok(path) = env::var("OLLAMA_CHAT_STORE") {
            if !path.trim().is_empty() {
                cfg.store_path = PathBuf::from(path.trim());
            }
        }
        if let Some(secs) = env_parse::<u64>("OLLAMA_CACHE_TTL_SECS") {
            cfg.cache_ttl = Duration::from_secs(secs);
        }
        if let Some(flag) = env_flag("OLLAMA_AUTO_PULL") {
            cfg.auto_pull = flag;
        }
        cfg
    }

    /// Load a YAML file; keys that are absent keep their defaults.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::file_with_context(
                "io",
                format!("Failed to read config file {}: {}", path.display(), e),
                ErrorContext::new()
                    .with_field_path(path.display().to_string())
                    .with_source("config"),
            )
        })?;
        Self::from_yaml_str(&raw).map_err(|e| match e {
            Error::File {
                reason, message, ..
            } => Error::file_with_context(
                reason,
                message,
                ErrorContext::new()
                    .with_field_path(path.display().to_string())
                    .with_source("config"),
            ),
            other => other,
        })
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        let file: ConfigFile = serde_yaml::from_str(raw).map_err(|e| {
            Error::file_with_context(
                "decode",
                format!("Invalid config file: {}", e),
                ErrorContext::new().with_source("config"),
            )
        })?;

        let mut cfg = Self::default();
        if let Some(host) = file.host {
            cfg.apply_host(&host);
        }
        if let Some(port) = file.port {
            cfg.port = port;
        }
        if let Some(model) = file.default_model {
            cfg.default_model = model;
        }
        if let Some(secs) = file.timeout_secs {
            cfg.timeout = Duration::from_secs(secs.max(1));
        }
        if let Some(retries) = file.retries {
            cfg.retries = retries;
        }
        if let Some(ms) = file.retry_backoff_ms {
            cfg.retry_backoff = Duration::from_millis(ms);
        }
        if let Some(path) = file.store_path {
            cfg.store_path = path;
        }
        if let Some(secs) = file.cache_ttl_secs {
            cfg.cache_ttl = Duration::from_secs(secs);
        }
        if let Some(flag) = file.auto_pull {
            cfg.auto_pull = flag;
        }
        Ok(cfg)
    }

    /// Accepts `host`, `host:port` or a full `scheme://host:port` URL.
    fn apply_host(&mut self, raw: &str) {
        let raw = raw.trim().trim_end_matches('/');
        if raw.is_empty() {
            return;
        }
        if raw.contains("://") {
            if let Ok(url) = Url::parse(raw) {
                self.scheme = url.scheme().to_string();
                if let Some(host) = url.host_str() {
                    self.host = host.to_string();
                }
                if let Some(port) = url.port() {
                    self.port = port;
                }
            }
            return;
        }
        match raw.rsplit_once(':') {
            Some((host, port)) if !host.contains(':') => {
                if let Ok(p) = port.parse::<u16>() {
                    self.host = host.to_string();
                    self.port = p;
                } else {
                    self.host = raw.to_string();
                }
            }
            _ => self.host = raw.to_string(),
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.apply_host(&host.into());
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    pub fn with_store_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.store_path = path.into();
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_auto_pull(mut self, enable: bool) -> Self {
        self.auto_pull = enable;
        self
    }

    /// `scheme://host:port` without a trailing slash.
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.host, self.port)
    }
}
