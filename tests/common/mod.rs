//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Bytes;
use axum::http::{HeaderMap, Method, Uri};
use axum::Json;
use futures_util::{SinkExt, StreamExt};
use opentelemetry::Context;
use serde_json::{json, Value};
use tokio::net::TcpListener;

use service_gateway::config::{GatewayConfig, ProxyDescriptor, ServiceConfig};
use service_gateway::observability::{
    ClientSpanStart, OtelTracing, SpanHandle, SpanOutcome, TracingProvider,
};
use service_gateway::{HttpServer, Shutdown};

async fn echo(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Json<Value> {
    let mut seen = BTreeMap::new();
    for name in headers.keys() {
        let values: Vec<&str> = headers
            .get_all(name)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect();
        seen.insert(name.as_str().to_string(), values.join(", "));
    }

    Json(json!({
        "method": method.as_str(),
        "uri": uri.to_string(),
        "headers": seen,
        "body": String::from_utf8_lossy(&body),
    }))
}

/// Start a backend that answers every request with a JSON description of it.
pub async fn start_echo_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = axum::Router::new().fallback(echo);

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

/// Start a backend that waits `delay` before answering 200.
pub async fn start_slow_backend(delay: Duration) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = axum::Router::new().fallback(move || async move {
        tokio::time::sleep(delay).await;
        "late"
    });

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

/// What a watched backend's handler got through.
#[derive(Default)]
pub struct HandlerLifecycle {
    pub started: AtomicBool,
    pub finished: AtomicBool,
    pub dropped: AtomicBool,
}

impl HandlerLifecycle {
    /// Wait until the handler future has been dropped, or `deadline` passes.
    pub async fn wait_dropped(&self, deadline: Duration) -> bool {
        let poll = async {
            while !self.dropped.load(Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        };
        tokio::time::timeout(deadline, poll).await.is_ok()
    }
}

struct DropFlag(Arc<HandlerLifecycle>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.dropped.store(true, Ordering::SeqCst);
    }
}

/// Like [`start_slow_backend`], but records whether the handler ran to completion.
///
/// hyper drops the handler future when the caller goes away, so `dropped`
/// without `finished` means the outbound request was canceled.
pub async fn start_watched_backend(delay: Duration) -> (SocketAddr, Arc<HandlerLifecycle>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let lifecycle = Arc::new(HandlerLifecycle::default());

    let watched = Arc::clone(&lifecycle);
    let app = axum::Router::new().fallback(move || {
        let watched = Arc::clone(&watched);
        async move {
            watched.started.store(true, Ordering::SeqCst);
            let _flag = DropFlag(Arc::clone(&watched));
            tokio::time::sleep(delay).await;
            watched.finished.store(true, Ordering::SeqCst);
            "late"
        }
    });

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (addr, lifecycle)
}

/// Start a backend that accepts any upgrade with `101` and then hangs up.
pub async fn start_hangup_ws_backend() -> SocketAddr {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio_tungstenite::tungstenite::handshake::derive_accept_key;

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut head = Vec::new();
                let mut buf = [0u8; 1024];
                while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                    match stream.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => head.extend_from_slice(&buf[..n]),
                    }
                }

                let head = String::from_utf8_lossy(&head);
                let key = head
                    .lines()
                    .filter_map(|line| line.split_once(':'))
                    .find(|(name, _)| name.trim().eq_ignore_ascii_case("sec-websocket-key"))
                    .map(|(_, value)| value.trim().to_string())
                    .unwrap_or_default();

                let reply = format!(
                    "HTTP/1.1 101 Switching Protocols\r\n\
                     Upgrade: websocket\r\n\
                     Connection: Upgrade\r\n\
                     Sec-WebSocket-Accept: {}\r\n\r\n",
                    derive_accept_key(key.as_bytes())
                );
                let _ = stream.write_all(reply.as_bytes()).await;
                let _ = stream.shutdown().await;
            });
        }
    });
    addr
}

/// Start a WebSocket server that echoes text and binary messages.
pub async fn start_ws_echo_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
                    return;
                };
                while let Some(Ok(message)) = ws.next().await {
                    if message.is_text() || message.is_binary() {
                        if ws.send(message).await.is_err() {
                            break;
                        }
                    } else if message.is_close() {
                        break;
                    }
                }
            });
        }
    });
    addr
}

/// An address nothing listens on.
pub async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

pub fn service(id: &str, origin: SocketAddr, prefix: &str) -> ServiceConfig {
    ServiceConfig {
        id: Some(id.to_string()),
        origin: format!("http://{origin}"),
        proxy: Some(ProxyDescriptor {
            prefix: prefix.to_string(),
            enabled: true,
        }),
    }
}

pub fn config_with(services: Vec<ServiceConfig>) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.services = services;
    config
}

/// A running gateway; dropping it does not stop the server, `shutdown` does.
pub struct TestGateway {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
}

impl TestGateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

pub async fn start_gateway(config: GatewayConfig, tracing: Arc<dyn TracingProvider>) -> TestGateway {
    let server = HttpServer::with_tracing(config, tracing).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    TestGateway { addr, shutdown }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .pool_max_idle_per_host(0)
        .build()
        .unwrap()
}

/// OpenTelemetry provider that also counts span starts and records end outcomes.
#[derive(Default)]
pub struct RecordingTracing {
    inner: OtelTracing,
    started: AtomicUsize,
    outcomes: Mutex<Vec<SpanOutcome>>,
}

impl RecordingTracing {
    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    pub fn outcomes(&self) -> Vec<SpanOutcome> {
        self.outcomes.lock().unwrap().clone()
    }

    /// Wait until every started span has been ended, or `deadline` passes.
    pub async fn wait_balanced(&self, deadline: Duration) -> bool {
        let poll = async {
            loop {
                if self.started() == self.outcomes.lock().unwrap().len() {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        };
        tokio::time::timeout(deadline, poll).await.is_ok()
    }
}

impl TracingProvider for RecordingTracing {
    fn extract_context(&self, headers: &HeaderMap) -> Option<Context> {
        self.inner.extract_context(headers)
    }

    fn start_span_client(&self, url: &str, method: &Method, parent: Option<&Context>) -> ClientSpanStart {
        let start = self.inner.start_span_client(url, method, parent);
        if start.span.is_some() {
            self.started.fetch_add(1, Ordering::SeqCst);
        }
        start
    }

    fn end_span_client(&self, span: SpanHandle, outcome: &SpanOutcome) {
        self.outcomes.lock().unwrap().push(outcome.clone());
        self.inner.end_span_client(span, outcome);
    }
}
