//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use bytes::Bytes;
use geoproxy::config::{MountConfig, ServerConfig, UpstreamConfig};
use geoproxy::proxy::{Exchange, ExchangeError, ExchangeResult, OutgoingRequest};
use geoproxy::{HttpServer, Shutdown};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

/// A request as seen on the wire by the mock upstream.
#[derive(Debug, Clone)]
pub struct Captured {
    pub head: String,
    pub body: Vec<u8>,
}

impl Captured {
    /// Value of the first header called `name` (case-insensitive).
    pub fn header(&self, name: &str) -> Option<String> {
        self.head.lines().skip(1).find_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.trim().eq_ignore_ascii_case(name).then(|| value.trim().to_string())
        })
    }

    pub fn request_line(&self) -> &str {
        self.head.lines().next().unwrap_or_default()
    }
}

/// Start a mock upstream that answers every request with `response`
/// (a complete raw HTTP/1.1 response) and reports what it received.
pub async fn start_mock_upstream(response: &'static str) -> (SocketAddr, mpsc::UnboundedReceiver<Captured>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let tx = tx.clone();
            tokio::spawn(async move {
                let mut buf = Vec::new();
                let mut chunk = [0u8; 4096];
                let head_end = loop {
                    match socket.read(&mut chunk).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => buf.extend_from_slice(&chunk[..n]),
                    }
                    if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                        break pos + 4;
                    }
                };

                let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
                let mut captured = Captured { head, body: Vec::new() };
                let length = captured
                    .header("content-length")
                    .and_then(|v| v.parse::<usize>().ok())
                    .unwrap_or(0);
                while buf.len() < head_end + length {
                    match socket.read(&mut chunk).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => buf.extend_from_slice(&chunk[..n]),
                    }
                }
                captured.body = buf[head_end..].to_vec();

                let _ = tx.send(captured);
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    (addr, rx)
}

/// Start the relay on an ephemeral port.
pub async fn start_proxy(config: ServerConfig) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server = HttpServer::new(config).unwrap();
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, rx).await;
    });
    (addr, shutdown)
}

pub fn mount(prefix: &str, upstream: Option<UpstreamConfig>) -> MountConfig {
    MountConfig {
        prefix: prefix.to_string(),
        upstream,
        preserve_host: None,
        allow_auth: None,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

/// In-process `Exchange` that records outgoing requests.
#[derive(Default)]
pub struct RecordingExchange {
    pub requests: Mutex<Vec<OutgoingRequest>>,
    pub response: Mutex<Option<ExchangeResult>>,
}

impl RecordingExchange {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn responding(status: StatusCode, headers: &[(&'static str, &'static str)], body: &'static str) -> Arc<Self> {
        let mut map = HeaderMap::new();
        for (k, v) in headers {
            map.append(*k, HeaderValue::from_static(*v));
        }
        let exchange = Self::default();
        *exchange.response.lock().unwrap() = Some(ExchangeResult {
            status,
            headers: map,
            body: Bytes::from_static(body.as_bytes()),
        });
        Arc::new(exchange)
    }

    pub fn last(&self) -> OutgoingRequest {
        self.requests.lock().unwrap().last().cloned().expect("no outgoing request")
    }

    pub fn count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Exchange for RecordingExchange {
    async fn send(&self, request: OutgoingRequest) -> Result<ExchangeResult, ExchangeError> {
        self.requests.lock().unwrap().push(request);
        let response = self.response.lock().unwrap().clone();
        Ok(response.unwrap_or(ExchangeResult {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Bytes::from_static(b"ok"),
        }))
    }
}
