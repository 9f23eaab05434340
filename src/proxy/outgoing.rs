//! Outgoing request construction.
//!
//! # Responsibilities
//! - Rewrite `Host` unless the mount preserves it
//! - Withhold `Authorization`/`Cookie` unless the mount allows auth
//! - Attach a body only for PUT/POST with a declared `Content-Length`
//! - Carry URL userinfo separately as basic-auth credentials

use axum::http::{header, HeaderMap, HeaderValue, Method, Uri};
use bytes::Bytes;
use url::Url;

use crate::http::request::X_REQUEST_ID;
use crate::proxy::mount::ProxyConfig;
use crate::proxy::url::UrlDescriptor;
use crate::security::headers;

/// Transport-level basic-auth credentials taken from the target URL.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Everything the exchange needs to issue one upstream call.
#[derive(Debug, Clone)]
pub struct OutgoingRequest {
    pub method: Method,
    /// Credential-free, fragment-free target.
    pub url: Url,
    pub headers: HeaderMap,
    pub credentials: Option<Credentials>,
    pub body: Bytes,
}

/// Whether an inbound request's body is forwarded at all.
pub fn wants_body(method: &Method, headers: &HeaderMap) -> bool {
    (*method == Method::PUT || *method == Method::POST) && headers.contains_key(header::CONTENT_LENGTH)
}

impl OutgoingRequest {
    /// Combine the inbound request with the target and mount options.
    ///
    /// `body` is ignored unless [`wants_body`] holds for the inbound request.
    pub fn build(
        method: &Method,
        inbound_uri: &Uri,
        inbound_headers: &HeaderMap,
        body: Option<Bytes>,
        target: &UrlDescriptor,
        config: &ProxyConfig,
    ) -> Self {
        let mut out = inbound_headers.clone();
        headers::strip_hop_by_hop(&mut out);
        // The request ID belongs to this relay only.
        out.remove(X_REQUEST_ID);
        // Framing is recomputed from the body actually sent.
        out.remove(header::CONTENT_LENGTH);

        if config.preserve_host() {
            if !out.contains_key(header::HOST) {
                if let Some(value) = inbound_uri
                    .authority()
                    .and_then(|a| HeaderValue::from_str(a.as_str()).ok())
                {
                    out.insert(header::HOST, value);
                }
            }
        } else {
            match HeaderValue::from_str(&target.authority()) {
                Ok(value) => {
                    out.insert(header::HOST, value);
                }
                Err(_) => {
                    out.remove(header::HOST);
                }
            }
        }

        if !config.allow_auth() {
            headers::strip(&mut out, &headers::REQUEST_CREDENTIALS);
        }

        let body = if wants_body(method, inbound_headers) {
            body.unwrap_or_default()
        } else {
            Bytes::new()
        };

        let credentials = target.username.clone().map(|username| Credentials {
            username,
            password: target.password.clone(),
        });

        Self {
            method: method.clone(),
            url: target.target_url(),
            headers: out,
            credentials,
            body,
        }
    }
}
