use super::RawResponse;
use crate::{Error, ErrorContext, Result};
use bytes::Bytes;
use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Head,
    Post,
    /// DELETE carrying a JSON body (`/api/delete`).
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(serde_json::Value),
    Bytes(Bytes),
}

pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        // Timeouts are applied per attempt, not on the shared client.
        let builder = reqwest::Client::builder()
            .pool_max_idle_per_host(
                env::var("OLLAMA_HTTP_POOL_MAX_IDLE_PER_HOST")
                    .ok()
                    .and_then(|s| s.parse::<usize>().ok())
                    .unwrap_or(8),
            )
            .pool_idle_timeout(Some(Duration::from_secs(90)));

        let client = builder.build().map_err(|e| {
            Error::client_with_context(
                "client_build",
                format!("Failed to create HTTP client: {}", e),
                ErrorContext::new().with_source("transport"),
            )
        })?;

        Ok(Self { client })
    }

    /// Perform exactly one exchange.
    ///
    /// Any completed exchange is returned as data, whatever its status. Only failures to
    /// complete the exchange are errors.
    pub async fn send(
        &self,
        method: Method,
        url: &str,
        body: &RequestBody,
        timeout: Duration,
    ) -> Result<RawResponse> {
        let mut req = match method {
            Method::Get => self.client.get(url),
            Method::Head => self.client.head(url),
            Method::Post => self.client.post(url),
            Method::Delete => self.client.delete(url),
        };
        req = req.timeout(timeout);
        req = match body {
            RequestBody::Empty => req,
            RequestBody::Json(v) => req.json(v),
            RequestBody::Bytes(b) => req
                .header("content-type", "application/octet-stream")
                .body(b.clone()),
        };

        let response = req.send().await.map_err(|e| classify(e, method, url))?;

        let status = response.status().as_u16();
        let mut headers = BTreeMap::new();
        for (name, value) in response.headers() {
            if let Ok(v) = value.to_str() {
                headers.insert(name.as_str().to_lowercase(), v.to_string());
            }
        }

        let text = response.text().await.map_err(|e| classify(e, method, url))?;

        Ok(RawResponse {
            status,
            headers,
            body: RawResponse::decode_body(&text),
        })
    }
}

/// Map a reqwest failure into the taxonomy: transport-level failures are `network`,
/// request construction problems are `client`, everything else is `unknown`.
fn classify(e: reqwest::Error, method: Method, url: &str) -> Error {
    let ctx = ErrorContext::new()
        .with_details(format!("{} {}", method, url))
        .with_source("transport");
    if e.is_timeout() {
        Error::network_with_context("timeout", format!("Request timed out: {}", e), ctx)
    } else if e.is_connect() {
        Error::network_with_context("econnrefused", format!("Connection failed: {}", e), ctx)
    } else if e.is_request() {
        Error::network_with_context("transport", format!("Request failed: {}", e), ctx)
    } else if e.is_builder() {
        Error::client_with_context("request_build", format!("Invalid request: {}", e), ctx)
    } else {
        Error::unknown_with_context("unexpected", format!("Unexpected HTTP failure: {}", e), ctx)
    }
}
