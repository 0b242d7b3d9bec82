//! WebSocket passthrough.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::{Error as WsError, Message};

use service_gateway::observability::SpanOutcome;

mod common;

use common::{config_with, service, start_gateway, RecordingTracing};

#[tokio::test]
async fn websocket_messages_round_trip_through_gateway() {
    let backend = common::start_ws_echo_backend().await;
    let tracing = Arc::new(RecordingTracing::default());
    let gateway = start_gateway(
        config_with(vec![service("live", backend, "/live")]),
        tracing.clone(),
    )
    .await;

    let url = format!("ws://{}/live/feed", gateway.addr);
    let (mut ws, response) = tokio_tungstenite::connect_async(url).await.unwrap();
    assert_eq!(response.status(), 101);

    ws.send(Message::text("ping")).await.unwrap();
    let reply = tokio::time::timeout(Duration::from_secs(2), ws.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(reply.into_text().unwrap().as_str(), "ping");

    ws.send(Message::binary(vec![1u8, 2, 3])).await.unwrap();
    let reply = tokio::time::timeout(Duration::from_secs(2), ws.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(reply.into_data().as_ref(), &[1u8, 2, 3]);

    ws.close(None).await.unwrap();

    // The client span covers the handshake only.
    assert!(tracing.wait_balanced(Duration::from_secs(2)).await);
    assert_eq!(tracing.outcomes(), vec![SpanOutcome::Status(101)]);

    gateway.shutdown.trigger();
}

#[tokio::test]
async fn upgrade_to_unmatched_path_is_rejected() {
    let backend = common::start_ws_echo_backend().await;
    let gateway = start_gateway(
        config_with(vec![service("live", backend, "/live")]),
        Arc::new(service_gateway::observability::NoopTracing),
    )
    .await;

    let url = format!("ws://{}/elsewhere", gateway.addr);
    assert!(tokio_tungstenite::connect_async(url).await.is_err());

    gateway.shutdown.trigger();
}

#[tokio::test]
async fn backend_hangup_after_101_closes_client() {
    let backend = common::start_hangup_ws_backend().await;
    let tracing = Arc::new(RecordingTracing::default());
    let gateway = start_gateway(
        config_with(vec![service("live", backend, "/live")]),
        tracing.clone(),
    )
    .await;

    let url = format!("ws://{}/live", gateway.addr);
    let (mut ws, response) = tokio_tungstenite::connect_async(url).await.unwrap();
    assert_eq!(response.status(), 101);

    let next = tokio::time::timeout(Duration::from_secs(2), ws.next())
        .await
        .expect("client side closed with the backend");
    assert!(!matches!(
        next,
        Some(Ok(Message::Text(_) | Message::Binary(_)))
    ));

    assert!(tracing.wait_balanced(Duration::from_secs(2)).await);
    assert_eq!(tracing.outcomes(), vec![SpanOutcome::Status(101)]);

    gateway.shutdown.trigger();
}

#[tokio::test]
async fn upgrade_to_unreachable_backend_is_502() {
    let dead = common::unused_addr().await;
    let tracing = Arc::new(RecordingTracing::default());
    let gateway = start_gateway(
        config_with(vec![service("live", dead, "/live")]),
        tracing.clone(),
    )
    .await;

    let url = format!("ws://{}/live", gateway.addr);
    match tokio_tungstenite::connect_async(url).await {
        Err(WsError::Http(response)) => assert_eq!(response.status(), 502),
        other => panic!("expected an HTTP error, got {:?}", other.err()),
    }

    assert!(tracing.wait_balanced(Duration::from_secs(2)).await);
    assert_eq!(
        tracing.outcomes(),
        vec![SpanOutcome::Failed("upstream_unreachable".into())]
    );

    gateway.shutdown.trigger();
}
