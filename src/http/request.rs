//! Inbound request handling.
//!
//! # Responsibilities
//! - Generate unique request IDs (UUID v4)
//! - Resolve the scheme the caller used
//! - Read forwardable bodies within the configured size limit
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - `X-Forwarded-Proto` is only trusted when configured
//! - Bodies are buffered once; the same bytes go upstream

use axum::body::Body;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Request, Uri};
use bytes::Bytes;
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

use crate::proxy::error::ProxyError;

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");
const X_FORWARDED_PROTO: HeaderName = HeaderName::from_static("x-forwarded-proto");

/// Request ID generator for `SetRequestIdLayer`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuidV4;

impl MakeRequestId for MakeRequestUuidV4 {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Read the request ID stamped by the request-id layer.
pub fn request_id(headers: &HeaderMap) -> String {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string()
}

/// Scheme the caller used to reach us.
///
/// Absolute-form URIs carry it directly; otherwise a trusted
/// `X-Forwarded-Proto` is consulted before falling back to the listener.
pub fn inbound_scheme(uri: &Uri, headers: &HeaderMap, listener_scheme: &str, trust_forwarded: bool) -> String {
    if let Some(scheme) = uri.scheme_str() {
        return scheme.to_ascii_lowercase();
    }
    if trust_forwarded {
        let forwarded = headers
            .get(X_FORWARDED_PROTO)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(|v| v.trim().to_ascii_lowercase())
            .filter(|v| !v.is_empty());
        if let Some(scheme) = forwarded {
            return scheme;
        }
    }
    listener_scheme.to_string()
}

/// Buffer a request body, failing once it exceeds `limit` bytes.
pub async fn read_body(body: Body, limit: usize) -> Result<Bytes, ProxyError> {
    axum::body::to_bytes(body, limit).await.map_err(|e| {
        let message = e.to_string();
        if is_length_limit(&e) {
            ProxyError::BodyTooLarge { limit }
        } else {
            ProxyError::UnreadableBody(message)
        }
    })
}

fn is_length_limit(err: &axum::Error) -> bool {
    let mut source = Some(err as &(dyn std::error::Error + 'static));
    while let Some(e) = source {
        if e.is::<http_body_util::LengthLimitError>() {
            return true;
        }
        source = e.source();
    }
    false
}
