//! Upstream exchange.
//!
//! # Responsibilities
//! - Issue exactly one upstream call per inbound request
//! - Wait for the complete upstream response (status, headers, body)
//! - Cancel the in-flight call when the inbound request goes away
//!
//! # Design Decisions
//! - The HTTP client is a capability behind the `Exchange` trait
//! - No retries and no redirects; 4xx/5xx are results, not errors
//! - The call runs as its own task, raced against a `CancellationToken`
//!   whose drop guard lives in the inbound handler

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::{HeaderMap, StatusCode};
use bytes::Bytes;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::config::TimeoutConfig;
use crate::proxy::error::ProxyError;
use crate::proxy::outgoing::OutgoingRequest;

/// Transport-level failure of the HTTP client capability.
#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("upstream timed out: {0}")]
    Timeout(String),

    #[error("invalid outgoing request: {0}")]
    Request(String),

    #[error("failed to read upstream body: {0}")]
    Body(String),

    #[error("exchange task failed: {0}")]
    Task(String),
}

/// A fully received upstream response.
#[derive(Debug, Clone)]
pub struct ExchangeResult {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// The externally provided "issue a request, get a response" capability.
#[async_trait]
pub trait Exchange: Send + Sync + 'static {
    async fn send(&self, request: OutgoingRequest) -> Result<ExchangeResult, ExchangeError>;
}

/// `Exchange` backed by a `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestExchange {
    client: reqwest::Client,
}

impl ReqwestExchange {
    pub fn new(timeouts: &TimeoutConfig) -> Result<Self, ExchangeError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .redirect(reqwest::redirect::Policy::none())
            .no_proxy()
            .build()
            .map_err(|e| ExchangeError::Request(e.to_string()))?;
        Ok(Self { client })
    }

    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Exchange for ReqwestExchange {
    async fn send(&self, request: OutgoingRequest) -> Result<ExchangeResult, ExchangeError> {
        let OutgoingRequest { method, url, mut headers, credentials, body } = request;

        // URL userinfo wins over a forwarded Authorization header.
        if credentials.is_some() {
            headers.remove(axum::http::header::AUTHORIZATION);
        }

        let mut builder = self.client.request(method, url).headers(headers).body(body);
        if let Some(creds) = credentials {
            builder = builder.basic_auth(creds.username, creds.password);
        }

        let response = builder.send().await.map_err(classify)?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(|e| ExchangeError::Body(e.to_string()))?;

        Ok(ExchangeResult { status, headers, body })
    }
}

fn classify(err: reqwest::Error) -> ExchangeError {
    if err.is_timeout() {
        ExchangeError::Timeout(err.to_string())
    } else if err.is_builder() {
        ExchangeError::Request(err.to_string())
    } else {
        ExchangeError::Connect(err.to_string())
    }
}

/// Runs exchanges under the inbound request's cancellation token.
#[derive(Clone)]
pub struct Executor {
    exchange: Arc<dyn Exchange>,
}

impl Executor {
    pub fn new(exchange: Arc<dyn Exchange>) -> Self {
        Self { exchange }
    }

    /// Perform the exchange, or stop it as soon as `cancel` fires.
    pub async fn execute(
        &self,
        request: OutgoingRequest,
        cancel: CancellationToken,
    ) -> Result<ExchangeResult, ProxyError> {
        let exchange = Arc::clone(&self.exchange);
        let task_cancel = cancel.clone();

        let task = tokio::spawn(async move {
            tokio::select! {
                _ = task_cancel.cancelled() => Err(ProxyError::Cancelled),
                result = exchange.send(request) => result.map_err(ProxyError::from),
            }
        });

        match task.await {
            Ok(result) => result,
            Err(e) => Err(ProxyError::UpstreamUnreachable(ExchangeError::Task(e.to_string()))),
        }
    }
}

impl std::fmt::Debug for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    use axum::http::Method;
    use url::Url;

    fn request() -> OutgoingRequest {
        OutgoingRequest {
            method: Method::GET,
            url: Url::parse("http://geo.example/wms").unwrap(),
            headers: HeaderMap::new(),
            credentials: None,
            body: Bytes::new(),
        }
    }

    struct Fixed(StatusCode);

    #[async_trait]
    impl Exchange for Fixed {
        async fn send(&self, _request: OutgoingRequest) -> Result<ExchangeResult, ExchangeError> {
            Ok(ExchangeResult {
                status: self.0,
                headers: HeaderMap::new(),
                body: Bytes::from_static(b"upstream"),
            })
        }
    }

    struct Refused;

    #[async_trait]
    impl Exchange for Refused {
        async fn send(&self, _request: OutgoingRequest) -> Result<ExchangeResult, ExchangeError> {
            Err(ExchangeError::Connect("connection refused".into()))
        }
    }

    /// Never completes; flags when its future is dropped.
    struct Hanging(Arc<AtomicBool>);

    struct DropFlag(Arc<AtomicBool>);

    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl Exchange for Hanging {
        async fn send(&self, _request: OutgoingRequest) -> Result<ExchangeResult, ExchangeError> {
            let _flag = DropFlag(self.0.clone());
            std::future::pending::<()>().await;
            unreachable!()
        }
    }

    #[tokio::test]
    async fn upstream_error_status_is_a_result() {
        let executor = Executor::new(Arc::new(Fixed(StatusCode::SERVICE_UNAVAILABLE)));
        let result = executor.execute(request(), CancellationToken::new()).await.unwrap();
        assert_eq!(result.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(&result.body[..], b"upstream");
    }

    #[tokio::test]
    async fn transport_failure_is_unreachable() {
        let executor = Executor::new(Arc::new(Refused));
        let err = executor.execute(request(), CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, ProxyError::UpstreamUnreachable(ExchangeError::Connect(_))));
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn cancellation_stops_in_flight_call() {
        let dropped = Arc::new(AtomicBool::new(false));
        let executor = Executor::new(Arc::new(Hanging(dropped.clone())));
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let err = executor.execute(request(), cancel).await.unwrap_err();
        assert!(matches!(err, ProxyError::Cancelled));
        assert!(dropped.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn dropping_the_guard_cancels_detached_task() {
        let dropped = Arc::new(AtomicBool::new(false));
        let executor = Executor::new(Arc::new(Hanging(dropped.clone())));
        let cancel = CancellationToken::new();

        let handler = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                let _guard = cancel.clone().drop_guard();
                executor.execute(request(), cancel).await
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        handler.abort();
        let _ = handler.await;

        tokio::time::timeout(Duration::from_secs(1), async {
            while !dropped.load(Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("upstream call was not cancelled");
        assert!(cancel.is_cancelled());
    }
}
