//! Proxy error taxonomy.
//!
//! Every error detected while relaying is resolved into a well-formed HTTP
//! response here; nothing escapes the handler boundary.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::proxy::exchange::ExchangeError;

pub const MISSING_URL_MESSAGE: &str = "Request must contain url parameter.";
pub const SCHEME_MISMATCH_MESSAGE: &str =
    "The url parameter value must be absolute url with same scheme as request.";

/// Errors that short-circuit the relay pipeline.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// No target URL was supplied.
    #[error("Request must contain url parameter.")]
    MissingParameter,

    /// Target URL is unparsable, relative, or uses another scheme than the caller.
    #[error("The url parameter value must be absolute url with same scheme as request.")]
    SchemeMismatch,

    /// Path remainder on a path-rewrite mount would climb out of the base path.
    #[error("Request path must not contain dot segments.")]
    DotSegment,

    /// Inbound body exceeds the configured limit.
    #[error("Request body exceeds {limit} bytes")]
    BodyTooLarge { limit: usize },

    /// Inbound body could not be read.
    #[error("Failed to read request body: {0}")]
    UnreadableBody(String),

    /// The outgoing call failed at the transport level.
    #[error("Upstream unreachable: {0}")]
    UpstreamUnreachable(#[from] ExchangeError),

    /// The inbound request was abandoned before the exchange finished.
    #[error("Request cancelled by caller")]
    Cancelled,
}

impl ProxyError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingParameter
            | Self::SchemeMismatch
            | Self::DotSegment
            | Self::UnreadableBody(_) => StatusCode::BAD_REQUEST,
            Self::BodyTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::UpstreamUnreachable(_) => StatusCode::BAD_GATEWAY,
            // Nobody is listening anymore; the status only shows up in logs and metrics.
            Self::Cancelled => StatusCode::REQUEST_TIMEOUT,
        }
    }

    /// True for errors caused by the caller rather than the upstream.
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match self {
            Self::UpstreamUnreachable(_) => "Upstream request failed".to_string(),
            other => other.to_string(),
        };
        (status, body).into_response()
    }
}
