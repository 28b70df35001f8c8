//! Subscription lifecycle tests against a scripted transport under paused time.

mod common;

use chrono::DateTime;
use common::*;
use easydeploy::auth::{AuthContext, AuthError, KeyValueStore, TOKEN_STORAGE_KEY};
use easydeploy::config::StreamConfig;
use easydeploy::stream::{LinkState, ReconnectConfig, StreamError, TransportError};
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn test_transport_error_reconnects_once_after_delay() {
    let transport = MockTransport::new(vec![Step::Refuse(TransportError::Status(502))]);
    let (_, auth) = auth_with_token(TEST_TOKEN);
    let client = client(transport.clone(), auth, StreamConfig::default());

    let mut logs = client.container_logs("c-1");
    logs.enable().unwrap();

    let mut link = logs.link();
    wait_for(&mut link, |s| *s == LinkState::ReconnectWait).await;
    assert_eq!(transport.connects(), 1);
    assert_eq!(
        logs.snapshot().connection.last_error.as_deref(),
        Some("HTTP error: 502")
    );

    // Nothing happens before the 5 s delay elapses
    tokio::time::sleep(Duration::from_millis(4_900)).await;
    assert_eq!(transport.connects(), 1);

    wait_for(&mut link, |s| *s == LinkState::Open).await;
    assert_eq!(transport.connects(), 2);

    // The second transport stays open: no further attempts
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(transport.connects(), 2);
    assert!(logs.snapshot().connection.is_connected);
    assert!(logs.snapshot().connection.last_error.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_disable_during_reconnect_wait_stops_retries() {
    let transport = MockTransport::refusing();
    let (_, auth) = auth_with_token(TEST_TOKEN);
    let client = client(transport.clone(), auth, StreamConfig::default());

    let mut metrics = client.dashboard_metrics();
    metrics.enable().unwrap();

    let mut link = metrics.link();
    wait_for(&mut link, |s| *s == LinkState::ReconnectWait).await;
    metrics.disable();

    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(transport.connects(), 1);
    assert_eq!(metrics.link_state(), LinkState::Closed);
    assert!(!metrics.is_enabled());
}

#[tokio::test(start_paused = true)]
async fn test_drop_closes_subscription() {
    let transport = MockTransport::refusing();
    let (_, auth) = auth_with_token(TEST_TOKEN);
    let client = client(transport.clone(), auth, StreamConfig::default());

    let mut logs = client.container_logs("c-1");
    logs.enable().unwrap();
    let mut link = logs.link();
    wait_for(&mut link, |s| *s == LinkState::ReconnectWait).await;
    drop(logs);

    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(transport.connects(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_missing_token_builds_no_transport() {
    let transport = MockTransport::new(vec![]);
    let client = client(transport.clone(), AuthContext::in_memory(), StreamConfig::default());

    let mut logs = client.container_logs("c-1");
    let err = logs.enable().unwrap_err();
    assert!(matches!(err, StreamError::Auth(AuthError::MissingToken)));

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(transport.connects(), 0);
    assert!(!logs.is_enabled());
    let snapshot = logs.snapshot();
    assert!(!snapshot.connection.is_connected);
    assert!(snapshot.connection.last_error.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_flat_storage_token_is_used() {
    let transport = MockTransport::new(vec![]);
    let (_, auth) = auth_with_token("flat-token");
    let client = client(transport.clone(), auth, StreamConfig::default());

    let mut logs = client.container_logs("c-1");
    logs.enable().unwrap();
    let mut link = logs.link();
    wait_for(&mut link, |s| *s == LinkState::Open).await;

    let urls = transport.urls();
    assert_eq!(urls.len(), 1);
    assert_eq!(urls[0].path(), "/api/containers/c-1/logs/stream");
    assert_eq!(urls[0].query(), Some("auth_token=flat-token"));
}

#[tokio::test(start_paused = true)]
async fn test_malformed_batch_is_dropped_and_stream_continues() {
    let transport = MockTransport::new(vec![Step::Stream(vec![
        logs_frame(&[("t1", "first")]),
        frame("logs", "{not json"),
        logs_frame(&[("t2", "second")]),
    ])]);
    let (_, auth) = auth_with_token(TEST_TOKEN);
    let client = client(transport.clone(), auth, StreamConfig::default());

    let mut logs = client.container_logs("c-1");
    logs.enable().unwrap();

    let mut rx = logs.watch();
    let snapshot = wait_for(&mut rx, |s| s.data.len() == 2).await;
    let messages: Vec<_> = snapshot.data.iter().map(|e| e.message.as_str()).collect();
    assert_eq!(messages, vec!["first", "second"]);
    assert!(snapshot.connection.is_connected);
    assert!(snapshot.connection.last_error.is_none());
    assert_eq!(transport.connects(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_metrics_reading_and_last_update_change_together() {
    let transport = MockTransport::new(vec![Step::Stream(vec![
        frame("heartbeat", "ping"),
        metrics_frame(1_000),
    ])]);
    let (_, auth) = auth_with_token(TEST_TOKEN);
    let client = client(transport.clone(), auth, StreamConfig::default());

    let mut metrics = client.dashboard_metrics();
    let mut rx = metrics.watch();
    metrics.enable().unwrap();

    // Every published snapshot either has both or neither
    let snapshot = wait_for(&mut rx, |s| {
        assert_eq!(s.data.is_some(), s.connection.last_update.is_some());
        s.data.is_some()
    })
    .await;

    assert_eq!(snapshot.data.as_ref().unwrap().timestamp, 1_000);
    assert_eq!(
        snapshot.connection.last_update,
        DateTime::from_timestamp_millis(1_000)
    );
    assert!(snapshot.connection.is_connected);
}

#[tokio::test(start_paused = true)]
async fn test_overlapping_batches_are_deduplicated() {
    let transport = MockTransport::new(vec![Step::Stream(vec![
        logs_frame(&[("t1", "a"), ("t2", "b")]),
        logs_frame(&[("t2", "b-updated"), ("t3", "c")]),
    ])]);
    let (_, auth) = auth_with_token(TEST_TOKEN);
    let client = client(transport.clone(), auth, StreamConfig::default());

    let mut logs = client.container_logs("c-1");
    logs.enable().unwrap();

    let mut rx = logs.watch();
    let snapshot = wait_for(&mut rx, |s| s.data.iter().any(|e| e.timestamp == "t3")).await;
    let entries: Vec<_> = snapshot
        .data
        .iter()
        .map(|e| (e.timestamp.as_str(), e.message.as_str()))
        .collect();
    assert_eq!(entries, vec![("t1", "a"), ("t2", "b-updated"), ("t3", "c")]);
}

#[tokio::test(start_paused = true)]
async fn test_buffer_keeps_only_most_recent_entries() {
    let config = StreamConfig {
        log_buffer_capacity: 2,
        ..Default::default()
    };
    let transport = MockTransport::new(vec![Step::Stream(vec![logs_frame(&[
        ("t1", "a"),
        ("t2", "b"),
        ("t3", "c"),
    ])])]);
    let (_, auth) = auth_with_token(TEST_TOKEN);
    let client = client(transport.clone(), auth, config);

    let mut logs = client.container_logs("c-1");
    logs.enable().unwrap();

    let mut rx = logs.watch();
    let snapshot = wait_for(&mut rx, |s| !s.data.is_empty()).await;
    let timestamps: Vec<_> = snapshot.data.iter().map(|e| e.timestamp.as_str()).collect();
    assert_eq!(timestamps, vec!["t2", "t3"]);
}

#[tokio::test(start_paused = true)]
async fn test_server_close_triggers_reconnect() {
    let transport = MockTransport::new(vec![Step::StreamThenClose(vec![logs_frame(&[(
        "t1", "a",
    )])])]);
    let (_, auth) = auth_with_token(TEST_TOKEN);
    let client = client(transport.clone(), auth, StreamConfig::default());

    let mut logs = client.container_logs("c-1");
    logs.enable().unwrap();

    let mut rx = logs.watch();
    let snapshot = wait_for(&mut rx, |s| s.connection.last_error.is_some()).await;
    assert!(!snapshot.connection.is_connected);
    // Data survives the disconnect
    assert_eq!(snapshot.data.len(), 1);

    let mut link = logs.link();
    wait_for(&mut link, |s| *s == LinkState::Open).await;
    assert_eq!(transport.connects(), 2);
    assert_eq!(logs.snapshot().data.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_rotated_token_used_on_reconnect() {
    let transport = MockTransport::new(vec![Step::StreamThenClose(vec![])]);
    let (store, auth) = auth_with_token("token-1");
    let client = client(transport.clone(), auth, StreamConfig::default());

    let mut logs = client.container_logs("c-1");
    logs.enable().unwrap();

    let mut link = logs.link();
    wait_for(&mut link, |s| *s == LinkState::ReconnectWait).await;
    store.set(TOKEN_STORAGE_KEY, "token-2").unwrap();

    wait_for(&mut link, |s| *s == LinkState::Open).await;
    let urls = transport.urls();
    assert_eq!(urls.len(), 2);
    assert_eq!(urls[0].query(), Some("auth_token=token-1"));
    assert_eq!(urls[1].query(), Some("auth_token=token-2"));
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_reuses_token_when_reresolve_disabled() {
    let config = StreamConfig {
        reresolve_token_on_reconnect: false,
        ..Default::default()
    };
    let transport = MockTransport::new(vec![Step::StreamThenClose(vec![])]);
    let (store, auth) = auth_with_token("token-1");
    let client = client(transport.clone(), auth, config);

    let mut logs = client.container_logs("c-1");
    logs.enable().unwrap();

    let mut link = logs.link();
    wait_for(&mut link, |s| *s == LinkState::ReconnectWait).await;
    store.set(TOKEN_STORAGE_KEY, "token-2").unwrap();

    wait_for(&mut link, |s| *s == LinkState::Open).await;
    let urls = transport.urls();
    assert_eq!(urls[1].query(), Some("auth_token=token-1"));
}

#[tokio::test(start_paused = true)]
async fn test_token_removed_before_reconnect_closes() {
    let transport = MockTransport::refusing();
    let (store, auth) = auth_with_token(TEST_TOKEN);
    let client = client(transport.clone(), auth, StreamConfig::default());

    let mut logs = client.container_logs("c-1");
    logs.enable().unwrap();

    let mut link = logs.link();
    wait_for(&mut link, |s| *s == LinkState::ReconnectWait).await;
    store.remove(TOKEN_STORAGE_KEY).unwrap();

    wait_for(&mut link, |s| *s == LinkState::Closed).await;
    assert_eq!(transport.connects(), 1);
    assert!(logs
        .snapshot()
        .connection
        .last_error
        .unwrap()
        .contains("no authentication token"));
}

#[tokio::test(start_paused = true)]
async fn test_max_attempts_exhausts() {
    let config = StreamConfig {
        reconnect: ReconnectConfig {
            max_attempts: Some(3),
            ..ReconnectConfig::fixed(Duration::from_secs(1))
        },
        ..Default::default()
    };
    let transport = MockTransport::refusing();
    let (_, auth) = auth_with_token(TEST_TOKEN);
    let client = client(transport.clone(), auth, config);

    let mut metrics = client.dashboard_metrics();
    metrics.enable().unwrap();

    let mut link = metrics.link();
    wait_for(&mut link, |s| *s == LinkState::Exhausted).await;
    assert_eq!(transport.connects(), 3);

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(transport.connects(), 3);
    assert!(!metrics.is_enabled());
}

#[tokio::test(start_paused = true)]
async fn test_accept_then_hang_up_exhausts_retry_budget() {
    let config = StreamConfig {
        reconnect: ReconnectConfig {
            max_attempts: Some(3),
            ..ReconnectConfig::fixed(Duration::from_secs(1))
        },
        ..Default::default()
    };
    let transport = MockTransport::with_fallback(vec![], Step::StreamThenClose(vec![]));
    let (_, auth) = auth_with_token(TEST_TOKEN);
    let client = client(transport.clone(), auth, config);

    let mut metrics = client.dashboard_metrics();
    metrics.enable().unwrap();

    let mut link = metrics.link();
    wait_for(&mut link, |s| *s == LinkState::Exhausted).await;
    assert_eq!(transport.connects(), 3);
    assert_eq!(
        metrics.snapshot().connection.last_error.as_deref(),
        Some("stream closed by server")
    );
}

#[tokio::test(start_paused = true)]
async fn test_received_event_resets_retry_budget() {
    let config = StreamConfig {
        reconnect: ReconnectConfig {
            max_attempts: Some(3),
            ..ReconnectConfig::fixed(Duration::from_secs(1))
        },
        ..Default::default()
    };
    let transport = MockTransport::with_fallback(
        vec![
            Step::StreamThenClose(vec![]),
            Step::StreamThenClose(vec![]),
            Step::StreamThenClose(vec![metrics_frame(1_000)]),
        ],
        Step::StreamThenClose(vec![]),
    );
    let (_, auth) = auth_with_token(TEST_TOKEN);
    let client = client(transport.clone(), auth, config);

    let mut metrics = client.dashboard_metrics();
    metrics.enable().unwrap();

    let mut link = metrics.link();
    wait_for(&mut link, |s| *s == LinkState::Exhausted).await;
    // Two empty hang-ups, one good stream, then three more failures in a row
    assert_eq!(transport.connects(), 5);
    assert_eq!(metrics.snapshot().data.unwrap().timestamp, 1_000);
}

#[tokio::test(start_paused = true)]
async fn test_enable_twice_keeps_single_transport() {
    let transport = MockTransport::new(vec![]);
    let (_, auth) = auth_with_token(TEST_TOKEN);
    let client = client(transport.clone(), auth, StreamConfig::default());

    let mut logs = client.container_logs("c-1");
    logs.enable().unwrap();
    let mut link = logs.link();
    wait_for(&mut link, |s| *s == LinkState::Open).await;

    logs.enable().unwrap();
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(transport.connects(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_re_enable_after_disable_reconnects() {
    let transport = MockTransport::new(vec![]);
    let (_, auth) = auth_with_token(TEST_TOKEN);
    let client = client(transport.clone(), auth, StreamConfig::default());

    let mut logs = client.container_logs("c-1");
    logs.set_enabled(true).unwrap();
    let mut link = logs.link();
    wait_for(&mut link, |s| *s == LinkState::Open).await;

    logs.set_enabled(false).unwrap();
    assert_eq!(logs.link_state(), LinkState::Closed);
    assert!(!logs.snapshot().connection.is_connected);

    logs.set_enabled(true).unwrap();
    wait_for(&mut link, |s| *s == LinkState::Open).await;
    assert_eq!(transport.connects(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_app_logs_blob_replaced() {
    let transport = MockTransport::new(vec![Step::Stream(vec![
        frame("app-logs", "\"line 1\\n\""),
        frame("app-logs", "{\"logs\": \"line 1\\nline 2\\n\"}"),
    ])]);
    let (_, auth) = auth_with_token(TEST_TOKEN);
    let client = client(transport.clone(), auth, StreamConfig::default());

    let mut app = client.app_logs("app-1");
    app.enable().unwrap();

    let mut rx = app.watch();
    let snapshot = wait_for(&mut rx, |s| s.data.contains("line 2")).await;
    assert_eq!(snapshot.data, "line 1\nline 2\n");
    assert_eq!(transport.urls()[0].path(), "/api/apps/app-1/logs/stream");
}
