//! Tests for the dispatch loop against a scripted transport.

mod test_utils;

use futures::future::join_all;
use serde::Deserialize;
use serde_json::{Value as JsonValue, json};
use sluice_core::{Method, RequestDescriptor};
use sluice_error::{DispatchErrorKind, RateLimitScope, SERVER_ERROR_MESSAGE, SluiceError};
use sluice_http::{Dispatcher, TransportResponse};
use sluice_rate_limit::{DispatchConfig, GLOBAL_HEADER};
use std::time::Duration;
use test_utils::{ScriptedTransport, dispatcher_with};
use tokio::time::Instant;

fn api_path(path: &str) -> String {
    format!("/api/v9{}", path)
}

fn send_message(dispatcher: &Dispatcher, channel: &str) -> RequestDescriptor {
    dispatcher
        .descriptor(Method::Post, "/channels/{channel_id}/messages")
        .param("channel_id", channel)
        .body(json!({ "content": "hello" }))
        .build()
        .expect("valid descriptor")
}

fn edit_message(dispatcher: &Dispatcher, channel: &str, message: u64) -> RequestDescriptor {
    dispatcher
        .descriptor(Method::Patch, "/channels/{channel_id}/messages/{message_id}")
        .param("channel_id", channel)
        .param("message_id", message)
        .body(json!({ "content": "edited" }))
        .build()
        .expect("valid descriptor")
}

fn rate_limited(retry_after: f64) -> TransportResponse {
    TransportResponse::json(
        429,
        &json!({ "message": "You are being rate limited.", "retry_after": retry_after }),
    )
}

fn kind(err: &SluiceError) -> &DispatchErrorKind {
    err.dispatch_kind().expect("dispatch error")
}

#[tokio::test(start_paused = true)]
async fn test_local_rate_limit_retries_after_server_delay() {
    let transport = ScriptedTransport::new();
    let path = api_path("/channels/C1/messages");
    transport.push(&path, rate_limited(0.5));
    transport.push(&path, TransportResponse::json(200, &json!({ "id": "10" })));
    let dispatcher = dispatcher_with(&transport, DispatchConfig::default());

    let body = dispatcher
        .request(send_message(&dispatcher, "C1"))
        .await
        .expect("succeeds on retry");

    assert_eq!(body["id"], "10");
    let sent = transport.sent();
    assert_eq!(sent.len(), 2);
    let gap = sent[1].at - sent[0].at;
    assert!(gap >= Duration::from_millis(500), "retried too early: {gap:?}");
    assert!(gap < Duration::from_millis(600), "retried too late: {gap:?}");
    assert!(dispatcher.gate().is_open());
}

#[tokio::test(start_paused = true)]
async fn test_global_rate_limit_suspends_every_bucket() {
    let transport = ScriptedTransport::new();
    let limited = api_path("/channels/A/messages");
    let other = api_path("/channels/B/messages");
    transport.push(
        &limited,
        TransportResponse::json(429, &json!({ "retry_after": 1.0, "global": true }))
            .with_header(GLOBAL_HEADER, "true"),
    );
    let dispatcher = dispatcher_with(&transport, DispatchConfig::default());
    let start = Instant::now();

    let first = {
        let dispatcher = dispatcher.clone();
        tokio::spawn(async move { dispatcher.request(send_message(&dispatcher, "A")).await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(!dispatcher.gate().is_open(), "global limit closes the gate");

    let second = {
        let dispatcher = dispatcher.clone();
        tokio::spawn(async move { dispatcher.request(send_message(&dispatcher, "B")).await })
    };
    tokio::time::sleep(Duration::from_millis(490)).await;
    assert!(transport.sent_to(&other).is_empty(), "other bucket must wait");

    first.await.expect("task panicked").expect("first call succeeds");
    second.await.expect("task panicked").expect("second call succeeds");

    let resumed = transport.sent_to(&other);
    assert_eq!(resumed.len(), 1);
    assert!(resumed[0].at - start >= Duration::from_secs(1));
    assert!(resumed[0].at - start < Duration::from_millis(1100));
    assert_eq!(transport.sent_to(&limited).len(), 2);
    assert!(dispatcher.gate().is_open());
}

#[tokio::test]
async fn test_client_error_fails_without_retry() {
    let transport = ScriptedTransport::new();
    let path = api_path("/channels/C1/messages");
    transport.push(
        &path,
        TransportResponse::json(404, &json!({ "message": "Unknown Channel", "code": 10003 })),
    );
    let dispatcher = dispatcher_with(&transport, DispatchConfig::default());

    let err = dispatcher
        .request(send_message(&dispatcher, "C1"))
        .await
        .unwrap_err();

    assert_eq!(
        kind(&err),
        &DispatchErrorKind::ClientError {
            status: 404,
            message: "Unknown Channel".to_string(),
        }
    );
    assert_eq!(transport.sent().len(), 1);
}

#[tokio::test]
async fn test_server_errors_exhaust_budget() {
    let transport = ScriptedTransport::new();
    let path = api_path("/channels/C1/messages");
    transport.push_n(&path, TransportResponse::new(503, ""), 5);
    let dispatcher = dispatcher_with(&transport, DispatchConfig::default());

    let err = dispatcher
        .request(send_message(&dispatcher, "C1"))
        .await
        .unwrap_err();

    assert_eq!(
        kind(&err),
        &DispatchErrorKind::ServerError {
            status: 503,
            message: SERVER_ERROR_MESSAGE.to_string(),
        }
    );
    assert_eq!(transport.sent().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_rate_limits_exhaust_budget() {
    let transport = ScriptedTransport::new();
    let path = api_path("/channels/C1/messages");
    transport.push_n(&path, rate_limited(0.1), 3);
    let config = DispatchConfig {
        max_attempts: 3,
        ..DispatchConfig::default()
    };
    let dispatcher = dispatcher_with(&transport, config);

    let err = dispatcher
        .request(send_message(&dispatcher, "C1"))
        .await
        .unwrap_err();

    assert_eq!(
        kind(&err),
        &DispatchErrorKind::RateLimited {
            scope: RateLimitScope::Local,
            retry_after: Duration::from_millis(100),
        }
    );
    assert_eq!(transport.sent().len(), 3);
}

#[tokio::test]
async fn test_unknown_status_after_budget() {
    let transport = ScriptedTransport::new();
    let path = api_path("/channels/C1/messages");
    transport.push_n(&path, TransportResponse::new(999, ""), 3);
    let dispatcher = dispatcher_with(&transport, DispatchConfig::default());

    let err = dispatcher
        .request(send_message(&dispatcher, "C1"))
        .await
        .unwrap_err();

    assert_eq!(kind(&err), &DispatchErrorKind::Unknown { status: 999 });
    assert_eq!(transport.sent().len(), 3);
}

#[tokio::test]
async fn test_transport_failure_releases_bucket() {
    let transport = ScriptedTransport::new();
    transport.push_failure(&api_path("/channels/C1/messages"), "connection reset");
    let dispatcher = dispatcher_with(&transport, DispatchConfig::default());
    let descriptor = send_message(&dispatcher, "C1");

    let err = dispatcher.request(descriptor.clone()).await.unwrap_err();
    assert_eq!(
        kind(&err),
        &DispatchErrorKind::Transport("connection reset".to_string())
    );
    assert_eq!(transport.sent().len(), 1);

    assert!(dispatcher.registry().try_acquire(descriptor.bucket()).await.is_some());
    let retry = tokio::time::timeout(Duration::from_secs(1), dispatcher.request(descriptor)).await;
    assert!(matches!(retry, Ok(Ok(_))));
}

#[tokio::test(start_paused = true)]
async fn test_queued_bucket_call_waits_for_gate_closed_meanwhile() {
    let transport = ScriptedTransport::new();
    let local = api_path("/channels/B/messages");
    let global = api_path("/channels/A/messages");
    transport.push(&local, rate_limited(0.3));
    transport.push(&global, rate_limited(1.0).with_header(GLOBAL_HEADER, "true"));
    let dispatcher = dispatcher_with(&transport, DispatchConfig::default());
    let start = Instant::now();

    // One call holds bucket B through its local wait while another queues on it.
    let queued: Vec<_> = (0..2)
        .map(|_| {
            let dispatcher = dispatcher.clone();
            tokio::spawn(async move { dispatcher.request(send_message(&dispatcher, "B")).await })
        })
        .collect();
    tokio::time::sleep(Duration::from_millis(10)).await;
    let limiter = {
        let dispatcher = dispatcher.clone();
        tokio::spawn(async move { dispatcher.request(send_message(&dispatcher, "A")).await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(!dispatcher.gate().is_open(), "global limit closes the gate");

    limiter.await.expect("task panicked").expect("limited call succeeds");
    for call in queued {
        call.await.expect("task panicked").expect("queued call succeeds");
    }

    let sent = transport.sent_to(&local);
    assert_eq!(sent.len(), 3);
    assert!(sent[0].at - start < Duration::from_millis(10));
    for retry in &sent[1..] {
        let at = retry.at - start;
        assert!(
            at >= Duration::from_millis(1010),
            "bucket B sent at {at:?} while the gate was closed"
        );
    }
    assert!(dispatcher.gate().is_open());
}

#[tokio::test]
async fn test_path_params_are_encoded_on_the_wire_only() {
    let transport = ScriptedTransport::new();
    let dispatcher = dispatcher_with(&transport, DispatchConfig::default());
    let descriptor = dispatcher
        .descriptor(
            Method::Put,
            "/channels/{channel_id}/messages/{message_id}/reactions/{emoji}/@me",
        )
        .param("channel_id", "C1")
        .param("message_id", 42)
        .param("emoji", "blob/wave:123")
        .build()
        .expect("valid descriptor");
    let bucket = descriptor.bucket().clone();

    dispatcher.request(descriptor).await.expect("sent");

    let sent = transport.sent();
    assert_eq!(
        sent[0].request.url().path(),
        "/api/v9/channels/C1/messages/42/reactions/blob%2Fwave%3A123/@me"
    );
    assert_eq!(bucket.channel_id().as_deref(), Some("C1"));
    assert_eq!(
        bucket.path(),
        "/channels/C1/messages/{message_id}/reactions/{emoji}/@me"
    );
    assert!(dispatcher.registry().contains(&bucket).await);
}

#[tokio::test(start_paused = true)]
async fn test_same_bucket_sends_never_overlap() {
    let transport = ScriptedTransport::new();
    transport.set_latency(Duration::from_millis(10));
    let dispatcher = dispatcher_with(&transport, DispatchConfig::default());
    let start = Instant::now();

    let calls = (0..8).map(|message| {
        let dispatcher = dispatcher.clone();
        async move { dispatcher.request(edit_message(&dispatcher, "C1", message)).await }
    });
    let results = join_all(calls).await;

    assert!(results.iter().all(Result::is_ok));
    assert_eq!(transport.max_in_flight(), 1);
    assert!(start.elapsed() >= Duration::from_millis(80));
    assert_eq!(dispatcher.registry().len().await, 1);
}

#[tokio::test(start_paused = true)]
async fn test_different_buckets_run_in_parallel() {
    let transport = ScriptedTransport::new();
    transport.set_latency(Duration::from_millis(100));
    let dispatcher = dispatcher_with(&transport, DispatchConfig::default());
    let start = Instant::now();

    let calls = ["C1", "C2", "C3", "C4"].map(|channel| {
        let dispatcher = dispatcher.clone();
        async move { dispatcher.request(send_message(&dispatcher, channel)).await }
    });
    let results = join_all(calls).await;

    assert!(results.iter().all(Result::is_ok));
    assert_eq!(transport.max_in_flight(), 4);
    assert!(start.elapsed() < Duration::from_millis(150));
}

#[tokio::test(start_paused = true)]
async fn test_descriptor_deadline_times_out() {
    let transport = ScriptedTransport::new();
    transport.set_latency(Duration::from_secs(5));
    let dispatcher = dispatcher_with(&transport, DispatchConfig::default());
    let descriptor = dispatcher
        .descriptor(Method::Get, "/channels/{channel_id}")
        .param("channel_id", "C1")
        .timeout(Duration::from_secs(1))
        .build()
        .expect("valid descriptor");

    let err = dispatcher.request(descriptor.clone()).await.unwrap_err();

    assert_eq!(kind(&err), &DispatchErrorKind::Timeout(Duration::from_secs(1)));
    assert!(dispatcher.registry().try_acquire(descriptor.bucket()).await.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_configured_deadline_times_out() {
    let transport = ScriptedTransport::new();
    transport.set_latency(Duration::from_secs(2));
    let config = DispatchConfig {
        request_timeout_secs: Some(0.5),
        ..DispatchConfig::default()
    };
    let dispatcher = dispatcher_with(&transport, config);

    let err = dispatcher
        .request(send_message(&dispatcher, "C1"))
        .await
        .unwrap_err();

    assert_eq!(kind(&err), &DispatchErrorKind::Timeout(Duration::from_millis(500)));
}

#[tokio::test(start_paused = true)]
async fn test_cancel_reopens_gate_closed_by_call() {
    let transport = ScriptedTransport::new();
    transport.push(
        &api_path("/channels/C1/messages"),
        rate_limited(60.0).with_header(GLOBAL_HEADER, "true"),
    );
    let dispatcher = dispatcher_with(&transport, DispatchConfig::default());

    let err = dispatcher
        .request_with_cancel(
            send_message(&dispatcher, "C1"),
            tokio::time::sleep(Duration::from_secs(1)),
        )
        .await
        .unwrap_err();

    assert_eq!(kind(&err), &DispatchErrorKind::Cancelled);
    assert!(dispatcher.gate().is_open());
    assert_eq!(transport.sent().len(), 1);
}

#[tokio::test]
async fn test_registration_can_spend_an_attempt() {
    let transport = ScriptedTransport::new();
    let path = api_path("/channels/C1/messages");
    transport.push_n(&path, TransportResponse::new(500, ""), 5);
    let config = DispatchConfig {
        count_registration_as_attempt: true,
        ..DispatchConfig::default()
    };
    let dispatcher = dispatcher_with(&transport, config);

    assert!(dispatcher.request(send_message(&dispatcher, "C1")).await.is_err());
    assert_eq!(transport.sent().len(), 2, "first attempt registers the bucket");

    assert!(dispatcher.request(send_message(&dispatcher, "C1")).await.is_err());
    assert_eq!(transport.sent().len(), 5, "known bucket spends every attempt");
}

#[tokio::test]
async fn test_other_client_statuses_return_body_unless_strict() {
    let body = json!({ "message": "Invalid Form Body", "code": 50035 });
    let path = api_path("/channels/C1/messages");

    let transport = ScriptedTransport::new();
    transport.push(&path, TransportResponse::json(400, &body));
    let lenient = dispatcher_with(&transport, DispatchConfig::default());
    let returned = lenient
        .request(send_message(&lenient, "C1"))
        .await
        .expect("returned as data");
    assert_eq!(returned, body);

    let transport = ScriptedTransport::new();
    transport.push(&path, TransportResponse::json(400, &body));
    let config = DispatchConfig {
        strict_client_errors: true,
        ..DispatchConfig::default()
    };
    let strict = dispatcher_with(&transport, config);
    let err = strict
        .request(send_message(&strict, "C1"))
        .await
        .unwrap_err();
    assert_eq!(kind(&err).status(), Some(400));
}

#[tokio::test]
async fn test_body_decoding() {
    let transport = ScriptedTransport::new();
    let path = api_path("/channels/C1/messages");
    transport.push(&path, TransportResponse::new(204, ""));
    transport.push(&path, TransportResponse::new(200, "plain text"));
    let dispatcher = dispatcher_with(&transport, DispatchConfig::default());

    let empty = dispatcher.request(send_message(&dispatcher, "C1")).await;
    assert_eq!(empty.expect("no content"), JsonValue::Null);

    let text = dispatcher.request(send_message(&dispatcher, "C1")).await;
    assert_eq!(text.expect("text body"), json!("plain text"));
}

#[derive(Debug, Deserialize, PartialEq)]
struct Channel {
    id: String,
    name: String,
}

#[tokio::test]
async fn test_request_as_decodes_typed_body() {
    let transport = ScriptedTransport::new();
    let path = api_path("/channels/C1");
    transport.push(
        &path,
        TransportResponse::json(200, &json!({ "id": "C1", "name": "general", "type": 0 })),
    );
    transport.push(&path, TransportResponse::json(200, &json!({ "id": 7 })));
    let dispatcher = dispatcher_with(&transport, DispatchConfig::default());
    let descriptor = dispatcher
        .descriptor(Method::Get, "/channels/{channel_id}")
        .param("channel_id", "C1")
        .build()
        .expect("valid descriptor");

    let channel: Channel = dispatcher
        .request_as(descriptor.clone())
        .await
        .expect("decodes");
    assert_eq!(
        channel,
        Channel {
            id: "C1".to_string(),
            name: "general".to_string(),
        }
    );

    let err = dispatcher
        .request_as::<Channel>(descriptor)
        .await
        .unwrap_err();
    assert!(matches!(kind(&err), DispatchErrorKind::Decode(_)));
}

#[tokio::test]
async fn test_prepared_request_carries_headers_query_and_body() {
    let transport = ScriptedTransport::new();
    let dispatcher = dispatcher_with(&transport, DispatchConfig::default());
    let descriptor = dispatcher
        .descriptor(Method::Put, "/guilds/{guild_id}/bans/{user_id}")
        .param("guild_id", "G1")
        .param("user_id", "U9")
        .query("delete_message_seconds", 3600)
        .body(json!({ "delete_message_seconds": 3600 }))
        .reason("spam, again")
        .header("X-Trace", "abc")
        .build()
        .expect("valid descriptor");

    dispatcher.request(descriptor).await.expect("sent");

    let sent = transport.sent();
    let request = &sent[0].request;
    assert_eq!(*request.method(), Method::Put);
    assert_eq!(request.url().path(), "/api/v9/guilds/G1/bans/U9");
    assert_eq!(request.url().query(), Some("delete_message_seconds=3600"));
    assert_eq!(request.body(), &Some(json!({ "delete_message_seconds": 3600 })));

    let headers = request.headers();
    assert_eq!(headers["authorization"], "Bot test-token");
    assert_eq!(headers["content-type"], "application/json");
    assert_eq!(headers["x-ratelimit-precision"], "millisecond");
    assert_eq!(headers["x-audit-log-reason"], "spam%2C again");
    assert_eq!(headers["x-trace"], "abc");
    assert!(
        headers["user-agent"]
            .to_str()
            .expect("ascii")
            .starts_with("SluiceBot (")
    );
}

#[tokio::test]
async fn test_method_in_bucket_is_configurable() {
    let transport = ScriptedTransport::new();
    let shared = dispatcher_with(&transport, DispatchConfig::default());
    shared.request(send_message(&shared, "C1")).await.expect("sent");
    let read = shared
        .descriptor(Method::Get, "/channels/{channel_id}/messages")
        .param("channel_id", "C1")
        .build()
        .expect("valid descriptor");
    shared.request(read).await.expect("sent");
    assert_eq!(shared.registry().len().await, 1);

    let config = DispatchConfig {
        include_method_in_bucket: true,
        ..DispatchConfig::default()
    };
    let split = dispatcher_with(&transport, config);
    split.request(send_message(&split, "C1")).await.expect("sent");
    let read = split
        .descriptor(Method::Get, "/channels/{channel_id}/messages")
        .param("channel_id", "C1")
        .build()
        .expect("valid descriptor");
    split.request(read).await.expect("sent");
    assert_eq!(split.registry().len().await, 2);
}

#[tokio::test]
async fn test_close_reaches_transport() {
    let transport = ScriptedTransport::new();
    let dispatcher = dispatcher_with(&transport, DispatchConfig::default());

    dispatcher.close().await;
    assert_eq!(transport.closes(), 1);
    assert!(dispatcher.request(send_message(&dispatcher, "C1")).await.is_ok());
}

#[test]
fn test_invalid_config_rejected() {
    let transport = ScriptedTransport::new();
    let config = DispatchConfig {
        max_attempts: 0,
        ..DispatchConfig::default()
    };
    assert!(Dispatcher::with_transport("token", config, transport).is_err());
}
