//! Content-addressed blob upload.

use crate::client::core::OllamaClient;
use crate::projection::{project, Action};
use crate::transport::RequestBody;
use crate::types::CallOptions;
use crate::{Error, ErrorContext, Result};
use bytes::Bytes;
use once_cell::sync::OnceCell;
use regex::Regex;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fmt::Write;
use std::path::Path;

const DIGEST_PATTERN: &str = r"^(?:sha256:)?[0-9a-fA-F]{64}$";

fn digest_regex() -> Result<&'static Regex> {
    static DIGEST: OnceCell<Regex> = OnceCell::new();
    DIGEST.get_or_try_init(|| {
        Regex::new(DIGEST_PATTERN)
            .map_err(|e| Error::unknown("regex", format!("Bad digest pattern: {}", e)))
    })
}

/// Check a SHA-256 digest and return it as `sha256:<lowercase hex>`.
///
/// Accepts the bare 64-character hex form or the `sha256:`-prefixed form.
pub fn validate_digest(digest: &str) -> Result<String> {
    let trimmed = digest.trim();
    if !digest_regex()?.is_match(trimmed) {
        return Err(Error::invalid_with_context(
            "invalid_digest",
            format!(
                "Invalid digest format: expected 64 hex characters, got '{}'",
                digest
            ),
            ErrorContext::new()
                .with_field_path("digest")
                .with_source("blobs"),
        ));
    }
    let hex = trimmed.trim_start_matches("sha256:").to_ascii_lowercase();
    Ok(format!("sha256:{}", hex))
}

/// `sha256:<hex>` digest of `data`.
pub fn sha256_digest(data: &[u8]) -> String {
    let hash = Sha256::digest(data);
    let mut out = String::with_capacity(7 + 64);
    out.push_str("sha256:");
    for b in hash.iter() {
        let _ = write!(out, "{:02x}", b);
    }
    out
}

fn blob_path(digest: &str) -> String {
    format!("{}/{}", Action::CheckBlob.path(), digest)
}

impl OllamaClient {
    /// Whether the server already has the blob. A 404 is a plain `false`.
    ///
    /// The digest is validated before any network call.
    pub async fn check_blob(&self, digest: &str, opts: CallOptions) -> Result<bool> {
        let digest = validate_digest(digest)?;
        let scope = self.begin(Action::CheckBlob, &blob_path(&digest)).await;
        let result = self
            .exchange(&scope, &RequestBody::Empty, &opts)
            .await
            .map(|response| response.status == 200);
        self.finish(&scope, result, None).await
    }

    /// Upload raw bytes under `digest`. The server verifies the digest against the bytes.
    pub async fn push_blob(&self, digest: &str, data: Bytes, opts: CallOptions) -> Result<Value> {
        let digest = validate_digest(digest)?;
        let scope = self.begin(Action::PushBlob, &blob_path(&digest)).await;
        let result = match self.exchange(&scope, &RequestBody::Bytes(data), &opts).await {
            Ok(response) => project(&response, &opts.field, Action::PushBlob, opts.short),
            Err(e) => Err(e),
        };
        self.finish(&scope, result, None).await
    }

    /// Hash a local file, upload it unless the server already has it, and return the digest.
    pub async fn push_blob_file(&self, path: impl AsRef<Path>, opts: CallOptions) -> Result<String> {
        let path = path.as_ref();
        let data = tokio::fs::read(path).await.map_err(|e| {
            let err = Error::from(e);
            Error::file_with_context(
                err.reason(),
                format!("Cannot read blob file {}: {}", path.display(), err.message()),
                ErrorContext::new()
                    .with_field_path(path.display().to_string())
                    .with_source("blobs"),
            )
        })?;
        let digest = sha256_digest(&data);
        if !self.check_blob(&digest, opts.clone()).await? {
            self.push_blob(&digest, Bytes::from(data), opts).await?;
        }
        Ok(digest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    const EMPTY_SHA: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    #[test]
    fn digest_forms() {
        assert_eq!(validate_digest(EMPTY_SHA).unwrap(), format!("sha256:{}", EMPTY_SHA));
        assert_eq!(
            validate_digest(&format!("sha256:{}", EMPTY_SHA.to_uppercase())).unwrap(),
            format!("sha256:{}", EMPTY_SHA)
        );
    }

    #[test]
    fn bad_digests_are_invalid() {
        for bad in ["not-a-digest", "", "sha256:", &EMPTY_SHA[..63], "md5:abc", format!("{}0", EMPTY_SHA).as_str()] {
            let err = validate_digest(bad).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Invalid, "{bad}");
            assert_eq!(err.reason(), "invalid_digest");
        }
    }

    #[test]
    fn hashes_bytes() {
        assert_eq!(sha256_digest(b""), format!("sha256:{}", EMPTY_SHA));
    }
}
