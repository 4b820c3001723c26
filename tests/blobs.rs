//! Blob digest validation and upload.

mod integration;

use integration::mock_server::MockServerFixture;
use mockito::Matcher;
use ollama_lib_rust::client::sha256_digest;
use ollama_lib_rust::{CallOptions, ErrorKind};

#[tokio::test]
async fn malformed_digest_never_reaches_the_server() {
    let mut fx = MockServerFixture::new().await;
    let head = fx.server.mock("HEAD", Matcher::Any).expect(0).create_async().await;
    let post = fx.server.mock("POST", Matcher::Any).expect(0).create_async().await;
    let client = fx.client();

    for bad in ["not-a-digest", "sha256:1234", ""] {
        let err = client.check_blob(bad, CallOptions::default()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Invalid);
        assert_eq!(err.reason(), "invalid_digest");
    }
    let err = client
        .push_blob("zz", bytes::Bytes::from_static(b"data"), CallOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Invalid);
    head.assert_async().await;
    post.assert_async().await;
}

#[tokio::test]
async fn blob_presence_follows_status() {
    let mut fx = MockServerFixture::new().await;
    let present = sha256_digest(b"present");
    let absent = sha256_digest(b"absent");
    let _p = fx
        .server
        .mock("HEAD", format!("/api/blobs/{}", present).as_str())
        .with_status(200)
        .create_async()
        .await;
    let _a = fx
        .server
        .mock("HEAD", format!("/api/blobs/{}", absent).as_str())
        .with_status(404)
        .create_async()
        .await;
    let client = fx.client();

    assert!(client.check_blob(&present, CallOptions::default()).await.unwrap());
    assert!(!client.check_blob(&absent, CallOptions::default()).await.unwrap());
}

#[tokio::test]
async fn push_blob_file_uploads_missing_blob() {
    let mut fx = MockServerFixture::new().await;
    let path = fx.dir.path().join("adapter.bin");
    tokio::fs::write(&path, b"weights").await.unwrap();
    let digest = sha256_digest(b"weights");
    let blob_path = format!("/api/blobs/{}", digest);

    let head = fx
        .server
        .mock("HEAD", blob_path.as_str())
        .with_status(404)
        .expect(1)
        .create_async()
        .await;
    let upload = fx
        .server
        .mock("POST", blob_path.as_str())
        .match_body("weights")
        .with_status(201)
        .expect(1)
        .create_async()
        .await;
    let client = fx.client();

    let pushed = client.push_blob_file(&path, CallOptions::default()).await.unwrap();
    assert_eq!(pushed, digest);
    head.assert_async().await;
    upload.assert_async().await;
}
