//! Dispatcher against the live mock server over real HTTP.
//!
//! # Design
//! Each test binds the mock server to a random port on the test's own runtime
//! and drives calls through the default reqwest transport, so request
//! encoding, caching and response decoding are checked end-to-end.

use std::sync::Arc;

use api_handler_core::{
    ApiError, Call, ClientConfig, CompatMode, Dispatcher, MemoryCache, RequestEncoding,
    TransportErrorKind,
};
use mock_server::{AppState, Echo};
use serde_json::{json, Value};

async fn start_server() -> (String, AppState) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let state = AppState::default();
    tokio::spawn(mock_server::run(listener, state.clone()));
    (format!("http://{addr}"), state)
}

fn dispatcher(config: ClientConfig) -> Dispatcher {
    Dispatcher::new(config).unwrap()
}

fn echo_of(body: Option<Value>) -> Echo {
    serde_json::from_value(body.expect("echo body")).unwrap()
}

#[tokio::test]
async fn get_sends_no_body_even_with_parameters() {
    let (base, _) = start_server().await;
    let d = dispatcher(ClientConfig::new(base));

    let outcome = d.call(Call::get("/echo").parameter("q", "ignored")).await;
    assert_eq!(outcome.status, 200);
    assert!(outcome.error.is_none());

    let echo = echo_of(outcome.body);
    assert_eq!(echo.method, "GET");
    assert!(echo.body.is_empty());
}

#[tokio::test]
async fn post_json_round_trips() {
    let (base, _) = start_server().await;
    let d = dispatcher(ClientConfig::new(base));

    let outcome = d
        .call(Call::post("/echo").parameter("a", 1).parameter("b", "x"))
        .await;
    let echo = echo_of(outcome.body);
    assert_eq!(echo.method, "POST");
    assert_eq!(echo.headers["content-type"], "application/json");
    assert_eq!(echo.headers["accept"], "application/json");
    let sent: Value = serde_json::from_str(&echo.body).unwrap();
    assert_eq!(sent, json!({"a": 1, "b": "x"}));
}

#[tokio::test]
async fn put_urlencoded_keeps_order() {
    let (base, _) = start_server().await;
    let d = dispatcher(ClientConfig::new(base));

    let outcome = d
        .call(
            Call::put("/echo")
                .encoding(RequestEncoding::UrlEncoded)
                .parameter("a", "1")
                .parameter("b", "2"),
        )
        .await;
    let echo = echo_of(outcome.body);
    assert_eq!(echo.body, "a=1&b=2");
    assert_eq!(
        echo.headers["content-type"],
        "application/x-www-form-urlencoded"
    );
}

#[tokio::test]
async fn multipart_boundary_matches_declared_one() {
    let (base, _) = start_server().await;
    let d = dispatcher(ClientConfig::new(base));

    let outcome = d
        .call(
            Call::post("/echo")
                .encoding(RequestEncoding::FormData)
                .parameter("f", "v"),
        )
        .await;
    let echo = echo_of(outcome.body);
    let boundary = echo.headers["content-type"]
        .strip_prefix("multipart/form-data; boundary=")
        .unwrap()
        .to_string();
    assert!(echo
        .body
        .contains(&format!("--{boundary}\r\nContent-Disposition: form-data; name=\"f\"\r\n\r\nv\r\n")));
    assert!(echo.body.ends_with(&format!("--{boundary}--\r\n")));
}

#[tokio::test]
async fn caller_header_wins_over_json_content_type() {
    let (base, _) = start_server().await;
    let d = dispatcher(ClientConfig::new(base));

    let outcome = d
        .call(
            Call::post("/echo")
                .parameter("a", 1)
                .header("Content-Type", "text/plain"),
        )
        .await;
    let echo = echo_of(outcome.body);
    assert_eq!(echo.headers["content-type"], "text/plain");
}

#[tokio::test]
async fn error_status_is_a_response_not_an_error() {
    let (base, _) = start_server().await;
    let d = dispatcher(ClientConfig::new(base));

    let outcome = d.call(Call::get("/status/404")).await;
    assert_eq!(outcome.status, 404);
    assert!(outcome.error.is_none());
    assert_eq!(outcome.body, Some(json!({"status": 404})));
}

#[tokio::test]
async fn cached_calls_hit_the_network_once() {
    let (base, state) = start_server().await;
    let d = Dispatcher::builder(ClientConfig::new(base))
        .cache(Arc::new(MemoryCache::new()))
        .build();

    let first = d.call(Call::get("/counter").cache(true)).await;
    let second = d.call(Call::get("/counter").cache(true)).await;

    assert_eq!(first.body, Some(json!({"hits": 1})));
    assert_eq!(second.body, Some(json!({"hits": 1})));
    assert_eq!(second.status, 200);
    assert_eq!(state.hits(), 1);
}

#[tokio::test]
async fn uncached_calls_always_hit_the_network() {
    let (base, state) = start_server().await;
    let d = dispatcher(ClientConfig::new(base));

    d.call(Call::get("/counter")).await;
    let second = d.call(Call::get("/counter")).await;

    assert_eq!(second.body, Some(json!({"hits": 2})));
    assert_eq!(state.hits(), 2);
}

#[tokio::test]
async fn non_json_body_depends_on_mode() {
    let (base, _) = start_server().await;

    let strict = dispatcher(ClientConfig::new(base.clone()));
    let outcome = strict.call(Call::get("/plain")).await;
    assert_eq!(outcome.status, 200);
    assert!(matches!(outcome.error, Some(ApiError::DecodingFailed(_))));

    let legacy = dispatcher(ClientConfig::new(base).with_mode(CompatMode::Legacy));
    let outcome = legacy.call(Call::get("/plain")).await;
    assert_eq!(outcome.status, 200);
    assert!(outcome.error.is_none());
    assert!(outcome.body.is_none());
}

#[tokio::test]
async fn refused_connection_is_a_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let d = dispatcher(ClientConfig::new(format!("http://{addr}")));
    let outcome = d.call(Call::get("/echo")).await;
    assert_eq!(outcome.status, 0);
    assert!(outcome.body.is_none());
    match outcome.error {
        Some(ApiError::Transport(err)) => assert_eq!(err.kind, TransportErrorKind::Connect),
        other => panic!("expected transport error, got {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn spawned_calls_each_resolve() {
    let (base, state) = start_server().await;
    let d = dispatcher(ClientConfig::new(base));

    let handles: Vec<_> = (0..4).map(|_| d.spawn(Call::get("/counter"))).collect();
    for handle in handles {
        let outcome = handle.await;
        assert_eq!(outcome.status, 200);
    }
    assert_eq!(state.hits(), 4);
}
