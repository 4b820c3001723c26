//! Cache key generation.

use std::fmt;

/// Identifies one cached server answer: which endpoint, on which server, for which model.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    pub endpoint: String,
    pub base_url: String,
    pub model: Option<String>,
}

impl CacheKey {
    pub fn new(endpoint: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            base_url: base_url.into(),
            model: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.model {
            Some(m) => write!(f, "{}{}#{}", self.base_url, self.endpoint, m),
            None => write!(f, "{}{}", self.base_url, self.endpoint),
        }
    }
}
