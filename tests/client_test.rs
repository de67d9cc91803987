use anyhow::Result;
use envelope_client::{
    ApiClient, ClientError, Envelope, MemoryTokenStore, Notifier, SessionHandler, StaticToken,
    StoredToken, TokenStore, AUTHORIZATION_KEY,
};
use httpmock::prelude::*;
use serde::Deserialize;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct Recorder {
    messages: Mutex<Vec<String>>,
    expired: AtomicUsize,
}

impl Recorder {
    fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }

    fn expired(&self) -> usize {
        self.expired.load(Ordering::SeqCst)
    }
}

impl Notifier for Recorder {
    fn error(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }
}

impl SessionHandler for Recorder {
    fn on_session_expired(&self) {
        self.expired.fetch_add(1, Ordering::SeqCst);
    }
}

struct Harness {
    client: ApiClient,
    recorder: Arc<Recorder>,
    store: Arc<MemoryTokenStore>,
}

/// token 來自存儲，403 清除後下一個請求即不帶 Authorization
fn harness(server: &MockServer, token: Option<&str>) -> Harness {
    let recorder = Arc::new(Recorder::default());
    let store = Arc::new(MemoryTokenStore::new());
    if let Some(token) = token {
        store.set(AUTHORIZATION_KEY, token).unwrap();
    }

    let client = ApiClient::builder()
        .base_url(server.base_url())
        .auth_provider(Arc::new(StoredToken::new(store.clone())))
        .token_store(store.clone())
        .notifier(recorder.clone())
        .session_handler(recorder.clone())
        .build()
        .unwrap();

    Harness {
        client,
        recorder,
        store,
    }
}

fn has_authorization(req: &HttpMockRequest) -> bool {
    req.headers
        .as_ref()
        .map(|headers| {
            headers
                .iter()
                .any(|(name, _)| name.eq_ignore_ascii_case("authorization"))
        })
        .unwrap_or(false)
}

fn has_empty_body(req: &HttpMockRequest) -> bool {
    req.body.as_ref().map(|body| body.is_empty()).unwrap_or(true)
}

#[tokio::test]
async fn test_post_resolves_to_full_envelope() -> Result<()> {
    let server = MockServer::start();
    let h = harness(&server, Some("Bearer xyz"));

    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/api/items")
            .header("authorization", "Bearer xyz")
            .json_body(json!({"name": "x"}));
        then.status(200)
            .json_body(json!({"code": 200, "message": "ok", "id": 42}));
    });

    let envelope: Envelope = h.client.post("/api/items", &json!({"name": "x"})).await?;

    mock.assert();
    assert_eq!(
        serde_json::to_value(&envelope)?,
        json!({"code": 200, "message": "ok", "id": 42})
    );
    assert!(h.recorder.messages().is_empty());
    assert_eq!(h.recorder.expired(), 0);
    assert_eq!(
        h.store.get(AUTHORIZATION_KEY)?.as_deref(),
        Some("Bearer xyz")
    );
    Ok(())
}

#[tokio::test]
async fn test_get_sends_no_body() -> Result<()> {
    let server = MockServer::start();
    let h = harness(&server, None);

    let mock = server.mock(|when, then| {
        when.method(GET).path("/api/items/1").matches(has_empty_body);
        then.status(200)
            .json_body(json!({"code": 200, "message": "Success", "name": "x"}));
    });

    let envelope: Envelope = h.client.get("/api/items/1").await?;

    mock.assert();
    assert_eq!(envelope.code, 200);
    assert_eq!(envelope.payload.get("name"), Some(&json!("x")));
    Ok(())
}

#[tokio::test]
async fn test_put_and_delete_send_json_bodies() -> Result<()> {
    let server = MockServer::start();
    let h = harness(&server, Some("Bearer xyz"));

    let put_mock = server.mock(|when, then| {
        when.method(PUT)
            .path("/api/config")
            .header("content-type", "application/json")
            .json_body(json!({"general": {"multi_login": true}}));
        then.status(200).json_body(json!({"code": 200, "message": "saved"}));
    });

    let delete_mock = server.mock(|when, then| {
        when.method(DELETE)
            .path("/api/task")
            .json_body(json!({"ids": [1, 2]}));
        then.status(200).json_body(json!({"code": 204, "message": "deleted"}));
    });

    let saved: Envelope = h
        .client
        .put("/api/config", &json!({"general": {"multi_login": true}}))
        .await?;
    let deleted: Envelope = h.client.delete("/api/task", &json!({"ids": [1, 2]})).await?;

    put_mock.assert();
    delete_mock.assert();
    assert_eq!(saved.message, "saved");
    assert_eq!(deleted.code, 204);
    Ok(())
}

#[tokio::test]
async fn test_delete_with_null_body_sends_no_body() -> Result<()> {
    let server = MockServer::start();
    let h = harness(&server, None);

    let mock = server.mock(|when, then| {
        when.method(DELETE).path("/api/task/7").matches(has_empty_body);
        then.status(200).json_body(json!({"code": 200, "message": "deleted"}));
    });

    let envelope: Envelope = h
        .client
        .delete("/api/task/7", &serde_json::Value::Null)
        .await?;

    mock.assert();
    assert_eq!(envelope.message, "deleted");
    Ok(())
}

#[tokio::test]
async fn test_typed_payload() -> Result<()> {
    #[derive(Debug, Deserialize, PartialEq)]
    struct Item {
        id: u64,
        name: String,
    }

    let server = MockServer::start();
    let h = harness(&server, None);

    server.mock(|when, then| {
        when.method(GET).path("/api/items/42");
        then.status(200)
            .json_body(json!({"code": 200, "message": "ok", "id": 42, "name": "x"}));
    });

    let envelope: Envelope<Item> = h.client.get("/api/items/42").await?;
    assert_eq!(
        envelope.into_payload(),
        Item {
            id: 42,
            name: "x".to_string()
        }
    );
    Ok(())
}

#[tokio::test]
async fn test_no_authorization_header_without_token() -> Result<()> {
    let server = MockServer::start();
    let h = harness(&server, None);

    let with_header = server.mock(|when, then| {
        when.method(GET).path("/api/version").matches(has_authorization);
        then.status(200).json_body(json!({"code": 500, "message": "unexpected header"}));
    });
    let without_header = server.mock(|when, then| {
        when.method(GET)
            .path("/api/version")
            .matches(|req| !has_authorization(req));
        then.status(200).json_body(json!({"code": 200, "message": "ok"}));
    });

    let envelope: Envelope = h.client.get("/api/version").await?;

    assert_eq!(envelope.message, "ok");
    with_header.assert_hits(0);
    without_header.assert();
    Ok(())
}

#[tokio::test]
async fn test_empty_token_sends_no_header() -> Result<()> {
    let server = MockServer::start();
    let recorder = Arc::new(Recorder::default());
    let client = ApiClient::builder()
        .base_url(server.base_url())
        .auth_provider(Arc::new(StaticToken::new("")))
        .notifier(recorder.clone())
        .build()?;

    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/api/version")
            .matches(|req| !has_authorization(req));
        then.status(200).json_body(json!({"code": 200, "message": "ok"}));
    });

    let _: Envelope = client.get("/api/version").await?;
    mock.assert();
    Ok(())
}

#[tokio::test]
async fn test_application_failure_notifies_once() -> Result<()> {
    let server = MockServer::start();
    let h = harness(&server, Some("Bearer xyz"));

    server.mock(|when, then| {
        when.method(POST).path("/api/login");
        then.status(200)
            .json_body(json!({"code": 400, "message": "invalid username or password"}));
    });

    let result: envelope_client::Result<Envelope> = h
        .client
        .post("/api/login", &json!({"username": "a", "password": "b"}))
        .await;

    let err = result.unwrap_err();
    assert_eq!(err.to_string(), "invalid username or password");
    assert!(matches!(err, ClientError::Api { code: 400, .. }));
    assert_eq!(
        h.recorder.messages(),
        vec!["invalid username or password".to_string()]
    );
    assert_eq!(h.recorder.expired(), 0);
    assert_eq!(
        h.store.get(AUTHORIZATION_KEY)?.as_deref(),
        Some("Bearer xyz")
    );
    Ok(())
}

#[tokio::test]
async fn test_null_message_still_notifies() -> Result<()> {
    let server = MockServer::start();
    let h = harness(&server, None);

    server.mock(|when, then| {
        when.method(GET).path("/api/task");
        then.status(200).json_body(json!({"code": 500, "message": null}));
    });

    let result: envelope_client::Result<Envelope> = h.client.get("/api/task").await;

    assert!(matches!(result, Err(ClientError::Api { code: 500, .. })));
    assert_eq!(h.recorder.messages(), vec![String::new()]);
    Ok(())
}

#[tokio::test]
async fn test_forbidden_invalidates_session() -> Result<()> {
    let server = MockServer::start();
    let h = harness(&server, Some("Bearer xyz"));

    let forbidden = server.mock(|when, then| {
        when.method(GET)
            .path("/api/items/1")
            .header("authorization", "Bearer xyz");
        then.status(403)
            .json_body(json!({"code": 403, "message": "expired"}));
    });

    let result: envelope_client::Result<Envelope> = h.client.get("/api/items/1").await;

    forbidden.assert();
    let err = result.unwrap_err();
    assert_eq!(err.to_string(), "expired");
    assert!(err.is_session_expired());
    assert_eq!(h.recorder.messages(), vec!["expired".to_string()]);
    assert_eq!(h.recorder.expired(), 1);
    assert_eq!(h.store.get(AUTHORIZATION_KEY)?, None);

    // 清除後的下一個請求不再帶 token
    let anonymous = server.mock(|when, then| {
        when.method(GET)
            .path("/api/version")
            .matches(|req| !has_authorization(req));
        then.status(200).json_body(json!({"code": 200, "message": "ok"}));
    });
    let _: Envelope = h.client.get("/api/version").await?;
    anonymous.assert();
    Ok(())
}

#[tokio::test]
async fn test_http_status_is_ignored_in_favor_of_envelope_code() -> Result<()> {
    let server = MockServer::start();
    let h = harness(&server, None);

    server.mock(|when, then| {
        when.method(GET).path("/api/task");
        then.status(500).json_body(json!({"code": 200, "message": "ok", "tasks": []}));
    });

    let envelope: Envelope = h.client.get("/api/task").await?;
    assert!(envelope.is_success());
    assert!(h.recorder.messages().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_invalid_json_is_a_parse_error_without_side_effects() -> Result<()> {
    let server = MockServer::start();
    let h = harness(&server, Some("Bearer xyz"));

    server.mock(|when, then| {
        when.method(GET).path("/index.html");
        then.status(200).body("<html></html>");
    });

    let result: envelope_client::Result<Envelope> = h.client.get("/index.html").await;

    assert!(matches!(result, Err(ClientError::Serialization(_))));
    assert!(h.recorder.messages().is_empty());
    assert_eq!(h.recorder.expired(), 0);
    assert!(h.store.get(AUTHORIZATION_KEY)?.is_some());
    Ok(())
}

#[tokio::test]
async fn test_transport_failure_keeps_token() -> Result<()> {
    let recorder = Arc::new(Recorder::default());
    let store = Arc::new(MemoryTokenStore::new());
    store.set(AUTHORIZATION_KEY, "Bearer xyz")?;

    // 沒有服務監聽的埠
    let client = ApiClient::builder()
        .base_url("http://127.0.0.1:1")
        .auth_provider(Arc::new(StoredToken::new(store.clone())))
        .token_store(store.clone())
        .notifier(recorder.clone())
        .session_handler(recorder.clone())
        .build()?;

    let result: envelope_client::Result<Envelope> = client.get("/api/task").await;

    assert!(matches!(result, Err(ClientError::Transport(_))));
    assert!(recorder.messages().is_empty());
    assert_eq!(recorder.expired(), 0);
    assert_eq!(store.get(AUTHORIZATION_KEY)?.as_deref(), Some("Bearer xyz"));
    Ok(())
}

#[tokio::test]
async fn test_concurrent_requests_are_independent() -> Result<()> {
    let server = MockServer::start();
    let h = harness(&server, Some("Bearer xyz"));

    server.mock(|when, then| {
        when.method(GET).path("/api/a");
        then.status(200).json_body(json!({"code": 200, "message": "a"}));
    });
    server.mock(|when, then| {
        when.method(GET).path("/api/b");
        then.status(200).json_body(json!({"code": 500, "message": "b failed"}));
    });

    let (a, b): (
        envelope_client::Result<Envelope>,
        envelope_client::Result<Envelope>,
    ) = tokio::join!(h.client.get("/api/a"), h.client.get("/api/b"));

    assert_eq!(a?.message, "a");
    assert_eq!(b.unwrap_err().to_string(), "b failed");
    assert_eq!(h.recorder.messages(), vec!["b failed".to_string()]);
    Ok(())
}
