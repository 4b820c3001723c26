//! Integration tests for OllamaClient against a mockito server.

mod integration;

use integration::mock_server::MockServerFixture;
use mockito::Matcher;
use ollama_lib_rust::telemetry::REQUEST_STOP;
use ollama_lib_rust::types::{CreateModelRequest, EmbedRequest, GenerateRequest};
use ollama_lib_rust::{CallOptions, ChatMessage, ErrorKind, FieldSpec};
use serde_json::json;

const TAGS: &str = r#"{"models":[{"name":"tiny:latest","size":1024,"details":{"family":"llama"}}]}"#;

#[tokio::test]
async fn list_models_is_cached_within_ttl() {
    let mut fx = MockServerFixture::new().await;
    let tags = fx
        .server
        .mock("GET", "/api/tags")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(TAGS)
        .expect(1)
        .create_async()
        .await;
    let client = fx.client();

    let first = client.list_models(CallOptions::default()).await.unwrap();
    let second = client
        .list_models(CallOptions::new().field(FieldSpec::path("models", ["0", "details", "family"])))
        .await
        .unwrap();

    assert_eq!(first[0]["name"], "tiny:latest");
    assert_eq!(second, json!("llama"));
    tags.assert_async().await;

    let stops = fx.events.get_events_by_name(REQUEST_STOP);
    let cache: Vec<_> = stops.iter().map(|e| e.metadata["cache"].as_str()).collect();
    assert_eq!(cache, ["miss", "hit"]);
}

#[tokio::test]
async fn refresh_bypasses_the_cache() {
    let mut fx = MockServerFixture::new().await;
    let tags = fx
        .server
        .mock("GET", "/api/tags")
        .with_status(200)
        .with_body(TAGS)
        .expect(2)
        .create_async()
        .await;
    let client = fx.client();

    client.list_models(CallOptions::default()).await.unwrap();
    client.list_models(CallOptions::default()).await.unwrap();
    client.list_models(CallOptions::new().refresh()).await.unwrap();
    tags.assert_async().await;
}

#[tokio::test]
async fn show_model_404_is_an_http_error_and_not_cached() {
    let mut fx = MockServerFixture::new().await;
    let show = fx
        .server
        .mock("POST", "/api/show")
        .match_body(Matcher::PartialJson(json!({"model": "ghost"})))
        .with_status(404)
        .with_body(r#"{"error":"model 'ghost' not found"}"#)
        .expect(2)
        .create_async()
        .await;
    let client = fx.client();

    for _ in 0..2 {
        let err = client.show_model("ghost", CallOptions::default()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Http);
        assert_eq!(err.status(), Some(404));
        assert_eq!(err.to_string(), "model 'ghost' not found");
    }
    show.assert_async().await;
}

#[tokio::test]
async fn long_form_returns_status_headers_and_body() {
    let mut fx = MockServerFixture::new().await;
    let _m = fx.mock_json("GET", "/api/version", 200, r#"{"version":"0.5.7"}"#).await;
    let client = fx.client();

    let short = client.version(CallOptions::default()).await.unwrap();
    assert_eq!(short, json!("0.5.7"));

    let full = client.version(CallOptions::new().raw()).await.unwrap();
    assert_eq!(full["status"], 200);
    assert_eq!(full["headers"]["content-type"], "application/json");
    assert_eq!(full["body"]["version"], "0.5.7");
}

#[tokio::test]
async fn generate_uses_default_model_and_disables_streaming() {
    let mut fx = MockServerFixture::new().await;
    let m = fx
        .server
        .mock("POST", "/api/generate")
        .match_body(Matcher::PartialJson(json!({"model": "tiny", "prompt": "2+2?", "stream": false})))
        .with_status(200)
        .with_body(r#"{"model":"tiny","response":"4","done":true}"#)
        .expect(1)
        .create_async()
        .await;
    let client = fx.client();

    let out = client
        .generate(GenerateRequest::new("", "2+2?"), CallOptions::default())
        .await
        .unwrap();
    // "4" parses as JSON, so it comes back as a number.
    assert_eq!(out, json!(4));
    m.assert_async().await;
}

#[tokio::test]
async fn embed_returns_vectors() {
    let mut fx = MockServerFixture::new().await;
    let _m = fx
        .mock_json_matching(
            "POST",
            "/api/embed",
            json!({"model": "tiny", "input": ["a", "b"]}),
            200,
            r#"{"model":"tiny","embeddings":[[0.1,0.2],[0.3,0.4]]}"#,
        )
        .await;
    let client = fx.client();

    let out = client
        .embed(EmbedRequest::new("tiny", json!(["a", "b"])), CallOptions::default())
        .await
        .unwrap();
    assert_eq!(out, json!([[0.1, 0.2], [0.3, 0.4]]));
}

#[tokio::test]
async fn success_body_with_error_is_a_server_error() {
    let mut fx = MockServerFixture::new().await;
    let _m = fx
        .mock_json("POST", "/api/generate", 200, r#"{"error":"context window exceeded"}"#)
        .await;
    let client = fx.client();

    let err = client
        .generate(GenerateRequest::new("tiny", "long"), CallOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Server);
    assert_eq!(err.message(), "context window exceeded");
}

#[tokio::test]
async fn pull_progress_lines_become_a_list() {
    let mut fx = MockServerFixture::new().await;
    let _m = fx
        .mock_ndjson(
            "/api/pull",
            &[r#"{"status":"pulling manifest"}"#, r#"{"status":"success"}"#],
        )
        .await;
    let client = fx.client();

    let out = client.pull_model("tiny", CallOptions::default()).await.unwrap();
    assert_eq!(out, json!([{"status": "pulling manifest"}, {"status": "success"}]));
}

#[tokio::test]
async fn pull_error_line_fails_and_invalidates_cache() {
    let mut fx = MockServerFixture::new().await;
    let tags = fx
        .server
        .mock("GET", "/api/tags")
        .with_status(200)
        .with_body(TAGS)
        .expect(2)
        .create_async()
        .await;
    let _pull = fx
        .mock_ndjson(
            "/api/pull",
            &[
                r#"{"status":"pulling manifest"}"#,
                r#"{"error":"pull model manifest: file does not exist"}"#,
            ],
        )
        .await;
    let client = fx.client();

    client.list_models(CallOptions::default()).await.unwrap();
    let err = client.pull_model("nope", CallOptions::default()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Pull);
    assert_eq!(err.reason(), "pull_failed");
    assert_eq!(err.message(), "pull model manifest: file does not exist");

    client.list_models(CallOptions::default()).await.unwrap();
    tags.assert_async().await;
}

#[tokio::test]
async fn delete_model_reports_status() {
    let mut fx = MockServerFixture::new().await;
    let _m = fx
        .mock_json_matching("DELETE", "/api/delete", json!({"model": "tiny"}), 200, "")
        .await;
    let client = fx.client();

    let status = client.delete_model("tiny", CallOptions::default()).await.unwrap();
    assert_eq!(status, json!(200));
}

#[tokio::test]
async fn missing_model_without_auto_pull_is_not_pulled() {
    let mut fx = MockServerFixture::new().await;
    let _gen = fx
        .mock_json("POST", "/api/generate", 404, r#"{"error":"model 'tiny' not found, try pulling it first"}"#)
        .await;
    let pull = fx.server.mock("POST", "/api/pull").expect(0).create_async().await;
    let client = fx.client();

    let err = client
        .generate(GenerateRequest::new("tiny", "hi"), CallOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(404));
    pull.assert_async().await;
}

#[tokio::test]
async fn missing_model_with_auto_pull_pulls_once() {
    let mut fx = MockServerFixture::new().await;
    let generate = fx
        .server
        .mock("POST", "/api/generate")
        .with_status(404)
        .with_body(r#"{"error":"model 'tiny' not found, try pulling it first"}"#)
        .expect(1)
        .create_async()
        .await;
    let pull = fx
        .server
        .mock("POST", "/api/pull")
        .match_body(Matcher::PartialJson(json!({"model": "tiny"})))
        .with_status(200)
        .with_body("{\"status\":\"pulling manifest\"}\n{\"error\":\"registry unreachable\"}\n")
        .expect(1)
        .create_async()
        .await;
    let client = fx.client_with(fx.config().with_auto_pull(true));

    let err = client
        .generate(GenerateRequest::new("tiny", "hi"), CallOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Pull);
    generate.assert_async().await;
    pull.assert_async().await;
}

#[tokio::test]
async fn chat_turns_are_stored_and_replayed() {
    let mut fx = MockServerFixture::new().await;
    let first = fx
        .mock_json_matching(
            "POST",
            "/api/chat",
            json!({"model": "tiny", "stream": false, "messages": [{"role": "user", "content": "hello"}]}),
            200,
            r#"{"message":{"role":"assistant","content":"hi"},"done":true}"#,
        )
        .await;
    let second = fx
        .mock_json_matching(
            "POST",
            "/api/chat",
            json!({"messages": [
                {"role": "user", "content": "hello"},
                {"role": "assistant", "content": "hi"},
                {"role": "user", "content": "again"}
            ]}),
            200,
            r#"{"message":{"role":"assistant","content":"hi again"},"done":true}"#,
        )
        .await;
    let client = fx.client();

    let reply = client.chat().conversation("u1", "c1").message("hello").send().await.unwrap();
    assert_eq!(reply, json!("hi"));
    let reply = client.chat().conversation("u1", "c1").message("again").send().await.unwrap();
    assert_eq!(reply, json!("hi again"));
    first.assert_async().await;
    second.assert_async().await;

    let chat = client.store().get_chat("u1", "c1").await.unwrap().unwrap();
    let texts: Vec<_> = chat.messages.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(texts, ["hello", "hi", "again", "hi again"]);
    assert_eq!(chat.model, "tiny");
}

#[tokio::test]
async fn failed_chat_persists_nothing() {
    let mut fx = MockServerFixture::new().await;
    let _m = fx
        .mock_json("POST", "/api/chat", 500, r#"{"error":"model crashed"}"#)
        .await;
    let client = fx.client();

    let err = client.chat().conversation("u1", "c1").message("hello").send().await.unwrap_err();
    assert_eq!(err.status(), Some(500));
    assert!(client.store().get_chat("u1", "c1").await.unwrap().is_none());
}

#[tokio::test]
async fn stateless_chat_sends_given_messages() {
    let mut fx = MockServerFixture::new().await;
    let m = fx
        .mock_json_matching(
            "POST",
            "/api/chat",
            json!({"messages": [
                {"role": "system", "content": "be brief"},
                {"role": "user", "content": "why?"}
            ]}),
            200,
            r#"{"message":{"role":"assistant","content":"because"},"done":true}"#,
        )
        .await;
    let client = fx.client();

    let reply = client
        .chat()
        .messages(vec![ChatMessage::system("be brief")])
        .message("why?")
        .send()
        .await
        .unwrap();
    assert_eq!(reply, json!("because"));
    m.assert_async().await;
    assert!(client.store().list_users().await.unwrap().is_empty());
}

#[tokio::test]
async fn conversation_without_message_is_rejected_locally() {
    let fx = MockServerFixture::new().await;
    let client = fx.client();
    let err = client.chat().conversation("u1", "c1").send().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Invalid);
    assert_eq!(err.reason(), "missing_message");
}

#[tokio::test]
async fn concurrent_chats_share_one_store_safely() {
    let mut fx = MockServerFixture::new().await;
    let m = fx
        .server
        .mock("POST", "/api/chat")
        .with_status(200)
        .with_body(r#"{"message":{"role":"assistant","content":"ok"},"done":true}"#)
        .expect(6)
        .create_async()
        .await;
    let client = fx.client();

    let sends = (0..6).map(|i| {
        let client = client.clone();
        async move {
            client
                .chat()
                .conversation("u1", format!("c{i}"))
                .message("ping")
                .send()
                .await
        }
    });
    for reply in futures::future::join_all(sends).await {
        assert_eq!(reply.unwrap(), json!("ok"));
    }
    m.assert_async().await;

    assert_eq!(client.store().list_chats("u1").await.unwrap().len(), 6);
}

#[tokio::test]
async fn model_lifecycle_defaults() {
    let mut fx = MockServerFixture::new().await;
    let create = fx
        .mock_json_matching(
            "POST",
            "/api/create",
            json!({"model": "mario", "from": "tiny", "stream": false}),
            200,
            r#"{"status":"success"}"#,
        )
        .await;
    let copy = fx
        .mock_json_matching(
            "POST",
            "/api/copy",
            json!({"source": "mario", "destination": "luigi"}),
            200,
            "",
        )
        .await;
    let load = fx
        .mock_json_matching(
            "POST",
            "/api/generate",
            json!({"model": "tiny"}),
            200,
            r#"{"model":"tiny","response":"","done":true}"#,
        )
        .await;
    let unload = fx
        .mock_json_matching(
            "POST",
            "/api/generate",
            json!({"model": "luigi", "keep_alive": 0}),
            200,
            r#"{"model":"luigi","response":"","done":true,"done_reason":"unload"}"#,
        )
        .await;
    let ps = fx
        .mock_json("GET", "/api/ps", 200, r#"{"models":[{"name":"tiny:latest"}]}"#)
        .await;
    let client = fx.client();

    let created = client
        .create_model(CreateModelRequest::new("mario").from_model("tiny"), CallOptions::default())
        .await
        .unwrap();
    assert_eq!(created, json!({"status": "success"}));
    assert_eq!(
        client.copy_model("mario", "luigi", CallOptions::default()).await.unwrap(),
        json!(200)
    );
    assert_eq!(client.load_model("", CallOptions::default()).await.unwrap(), json!(true));
    assert_eq!(
        client.unload_model("luigi", CallOptions::default()).await.unwrap(),
        json!("unload")
    );
    let running = client.running_models(CallOptions::default()).await.unwrap();
    assert_eq!(running[0]["name"], "tiny:latest");

    for m in [create, copy, load, unload, ps] {
        m.assert_async().await;
    }
}

#[tokio::test]
async fn create_model_without_a_name_is_rejected_locally() {
    let fx = MockServerFixture::new().await;
    let err = fx
        .client()
        .create_model(CreateModelRequest::new(" "), CallOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Invalid);
    assert_eq!(err.reason(), "missing_model");
}

#[tokio::test]
async fn turn_is_stored_even_when_projection_fails() {
    let mut fx = MockServerFixture::new().await;
    let _m = fx
        .mock_json(
            "POST",
            "/api/chat",
            200,
            r#"{"message":{"role":"assistant","content":"hi"},"done":true}"#,
        )
        .await;
    let client = fx.client();

    let err = client
        .chat()
        .conversation("u1", "c1")
        .message("hello")
        .call_options(CallOptions::new().field(FieldSpec::nested("done", "x")))
        .send()
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Invalid);
    assert_eq!(err.reason(), "field_spec");

    let chat = client.store().get_chat("u1", "c1").await.unwrap().unwrap();
    let texts: Vec<_> = chat.messages.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(texts, ["hello", "hi"]);
}

#[tokio::test]
async fn reply_survives_a_failed_store_write() {
    let mut fx = MockServerFixture::new().await;
    let _m = fx
        .mock_json(
            "POST",
            "/api/chat",
            200,
            r#"{"message":{"role":"assistant","content":"still here"},"done":true}"#,
        )
        .await;
    let client = fx.client();

    // Reads keep working; the temporary file used for writes cannot be created.
    client.store().load().await.unwrap();
    let before = tokio::fs::read(client.store().path()).await.unwrap();
    let mut tmp = client.store().path().as_os_str().to_owned();
    tmp.push(".tmp");
    tokio::fs::create_dir(&tmp).await.unwrap();

    let reply = client
        .chat()
        .conversation("u1", "c1")
        .message("hello")
        .send()
        .await
        .unwrap();
    assert_eq!(reply, json!("still here"));
    assert_eq!(tokio::fs::read(client.store().path()).await.unwrap(), before);
    assert!(client.store().get_chat("u1", "c1").await.unwrap().is_none());
}

#[tokio::test]
async fn reply_without_content_is_not_stored() {
    let mut fx = MockServerFixture::new().await;
    let _m = fx
        .mock_json("POST", "/api/chat", 200, r#"{"done":true}"#)
        .await;
    let client = fx.client();

    let reply = client
        .chat()
        .conversation("u1", "c1")
        .message("hello")
        .send()
        .await
        .unwrap();
    assert_eq!(reply, serde_json::Value::Null);
    assert!(client.store().get_chat("u1", "c1").await.unwrap().is_none());
}
