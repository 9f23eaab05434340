//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router with one handler set per mount
//! - Wire up middleware (tracing, timeout, request ID)
//! - Bind server to listener, plain or TLS
//! - Graceful shutdown on the lifecycle broadcast

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use axum::{body::Body, http::Request, routing::any, Router};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ServerConfig;
use crate::http::request::{MakeRequestUuidV4, X_REQUEST_ID};
use crate::net::tls::load_tls_config;
use crate::proxy::exchange::{Exchange, ExchangeError, Executor, ReqwestExchange};
use crate::proxy::handler::{relay, RelaySettings, RelayState};
use crate::proxy::mount::{Mount, MountError};

/// Errors raised while assembling the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("invalid mount {prefix}: {source}")]
    Mount { prefix: String, source: MountError },

    #[error("duplicate mount prefix: {0}")]
    DuplicatePrefix(String),

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] ExchangeError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// HTTP server for the relay.
pub struct HttpServer {
    router: Router,
    config: ServerConfig,
}

impl HttpServer {
    /// Create a server relaying through a `reqwest` client.
    pub fn new(config: ServerConfig) -> Result<Self, ServerError> {
        let exchange = ReqwestExchange::new(&config.timeouts)?;
        Self::with_exchange(config, Arc::new(exchange))
    }

    /// Create a server relaying through the given HTTP client capability.
    pub fn with_exchange(config: ServerConfig, exchange: Arc<dyn Exchange>) -> Result<Self, ServerError> {
        let mounts = config
            .mounts
            .iter()
            .map(|m| {
                m.to_mount().map_err(|source| ServerError::Mount {
                    prefix: m.prefix.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut seen = HashSet::new();
        for mount in &mounts {
            if !seen.insert(mount.prefix().to_string()) {
                return Err(ServerError::DuplicatePrefix(mount.label().to_string()));
            }
        }

        let settings = Arc::new(RelaySettings {
            listener_scheme: config.listener.scheme().to_string(),
            trust_forwarded_proto: config.listener.trust_forwarded_proto,
            max_body_size: config.security.max_body_size,
        });

        let router = build_router(
            mounts,
            Executor::new(exchange),
            settings,
            Duration::from_secs(config.timeouts.request_secs),
        );
        Ok(Self { router, config })
    }

    /// The fully layered router, for serving or driving in tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(self, listener: TcpListener, shutdown: broadcast::Receiver<()>) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;

        if let Some(tls) = &self.config.listener.tls {
            let tls_config = load_tls_config(tls).await?;
            let std_listener = listener.into_std()?;
            tracing::info!(address = %addr, "HTTPS server starting");

            let handle = axum_server::Handle::new();
            let shutdown_handle = handle.clone();
            tokio::spawn(async move {
                wait(shutdown).await;
                shutdown_handle.graceful_shutdown(Some(Duration::from_secs(10)));
            });

            axum_server::from_tcp_rustls(std_listener, tls_config)
                .handle(handle)
                .serve(self.router.into_make_service())
                .await?;
        } else {
            tracing::info!(address = %addr, "HTTP server starting");
            axum::serve(listener, self.router)
                .with_graceful_shutdown(wait(shutdown))
                .await?;
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

/// Build the Axum router with all mounts and middleware layers.
pub fn build_router(
    mounts: Vec<Mount>,
    executor: Executor,
    settings: Arc<RelaySettings>,
    request_timeout: Duration,
) -> Router {
    let mut router = Router::new();

    for mount in mounts {
        let state = RelayState {
            mount,
            executor: executor.clone(),
            settings: settings.clone(),
        };
        let prefix = state.mount.prefix().to_string();
        tracing::info!(
            prefix = %state.mount.label(),
            upstream = ?state.mount.config().base_url().map(|u| u.as_str()),
            preserve_host = state.mount.config().preserve_host(),
            allow_auth = state.mount.config().allow_auth(),
            "Mounting proxy"
        );

        let handler = any(move |request: Request<Body>| relay(state.clone(), request));
        router = if prefix.is_empty() {
            router.route("/", handler.clone()).route("/{*rest}", handler)
        } else {
            router
                .route(&prefix, handler.clone())
                .route(&format!("{prefix}/"), handler.clone())
                .route(&format!("{prefix}/{{*rest}}"), handler)
        };
    }

    #[allow(deprecated)]
    let timeout = TimeoutLayer::new(request_timeout);

    router.layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuidV4))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(timeout),
    )
}

async fn wait(mut shutdown: broadcast::Receiver<()>) {
    let _ = shutdown.recv().await;
    tracing::info!("Shutdown signal received");
}
