//! Per-request relay pipeline.
//!
//! `Receive → Validate → BuildOutgoing → Execute → AssembleResponse → Respond`
//!
//! Validation is the only branch point; any `ProxyError` short-circuits into
//! its HTTP response. Nothing survives the request except the mount's
//! immutable configuration.

use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::http::Request;
use axum::response::{IntoResponse, Response};
use tokio_util::sync::CancellationToken;

use crate::http::request::{inbound_scheme, read_body, request_id};
use crate::http::response::assemble;
use crate::observability::metrics;
use crate::proxy::error::ProxyError;
use crate::proxy::exchange::Executor;
use crate::proxy::mount::Mount;
use crate::proxy::outgoing::{wants_body, OutgoingRequest};

/// Listener-wide settings every mount needs.
#[derive(Debug, Clone)]
pub struct RelaySettings {
    /// Scheme of the listener (`http` or `https`).
    pub listener_scheme: String,
    pub trust_forwarded_proto: bool,
    pub max_body_size: usize,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            listener_scheme: "http".to_string(),
            trust_forwarded_proto: false,
            max_body_size: 2 * 1024 * 1024,
        }
    }
}

/// State captured by one mounted handler.
#[derive(Debug, Clone)]
pub struct RelayState {
    pub mount: Mount,
    pub executor: Executor,
    pub settings: Arc<RelaySettings>,
}

/// Relay one inbound request.
///
/// The outgoing call is cancelled if this future is dropped before it
/// completes (caller disconnected or the request timed out).
pub async fn relay(state: RelayState, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let request_id = request_id(request.headers());
    let method = request.method().clone();

    let cancel = CancellationToken::new();
    let _cancel_on_drop = cancel.clone().drop_guard();

    let response = match forward(&state, request, cancel, &request_id).await {
        Ok(response) => response,
        Err(err) => {
            match &err {
                ProxyError::UpstreamUnreachable(e) => {
                    tracing::error!(request_id = %request_id, mount = %state.mount.label(), error = %e, "Upstream error");
                }
                ProxyError::Cancelled => {
                    tracing::debug!(request_id = %request_id, "Relay cancelled");
                }
                e => {
                    tracing::warn!(request_id = %request_id, mount = %state.mount.label(), error = %e, "Rejected request");
                }
            }
            err.into_response()
        }
    };

    metrics::record_request(method.as_str(), response.status().as_u16(), state.mount.label(), start_time);
    response
}

async fn forward(
    state: &RelayState,
    request: Request<Body>,
    cancel: CancellationToken,
    request_id: &str,
) -> Result<Response, ProxyError> {
    let (parts, body) = request.into_parts();

    let scheme = inbound_scheme(
        &parts.uri,
        &parts.headers,
        &state.settings.listener_scheme,
        state.settings.trust_forwarded_proto,
    );
    let target = state.mount.resolve(&scheme, parts.uri.path(), parts.uri.query())?;

    let body = if wants_body(&parts.method, &parts.headers) {
        Some(read_body(body, state.settings.max_body_size).await?)
    } else {
        None
    };

    let outgoing = OutgoingRequest::build(
        &parts.method,
        &parts.uri,
        &parts.headers,
        body,
        &target,
        state.mount.config(),
    );

    tracing::debug!(
        request_id = %request_id,
        method = %parts.method,
        mount = %state.mount.label(),
        target = %outgoing.url,
        "Relaying request"
    );

    let result = state.executor.execute(outgoing, cancel).await?;

    tracing::debug!(request_id = %request_id, status = %result.status, "Upstream responded");
    Ok(assemble(result, state.mount.config()))
}
