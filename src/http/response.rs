//! Response assembly.
//!
//! # Responsibilities
//! - Relay upstream status, headers and body to the caller
//! - Remove `WWW-Authenticate`/`Set-Cookie` unless the mount allows auth
//! - Strip hop-by-hop headers
//!
//! # Design Decisions
//! - Upstream 4xx/5xx are relayed verbatim, never rewritten
//! - The buffered upstream body is handed over without another copy

use axum::body::Body;
use axum::http::Response;

use crate::proxy::exchange::ExchangeResult;
use crate::proxy::mount::ProxyConfig;
use crate::security::headers;

/// Turn an upstream result into the response for the caller.
pub fn assemble(result: ExchangeResult, config: &ProxyConfig) -> Response<Body> {
    let ExchangeResult { status, headers: mut relayed, body } = result;

    headers::strip_hop_by_hop(&mut relayed);
    if !config.allow_auth() {
        headers::strip(&mut relayed, &headers::RESPONSE_CREDENTIALS);
    }

    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    *response.headers_mut() = relayed;
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
    use bytes::Bytes;

    fn upstream() -> ExchangeResult {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/vnd.ogc.se_xml"));
        headers.insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Basic realm=\"GeoServer\""));
        headers.append(header::SET_COOKIE, HeaderValue::from_static("JSESSIONID=1"));
        headers.append(header::SET_COOKIE, HeaderValue::from_static("route=2"));
        headers.insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        ExchangeResult {
            status: StatusCode::UNAUTHORIZED,
            headers,
            body: Bytes::from_static(b"<ServiceExceptionReport/>"),
        }
    }

    #[tokio::test]
    async fn strips_auth_headers_by_default() {
        let cfg = ProxyConfig::query_parameter().build().unwrap();
        let resp = assemble(upstream(), &cfg);

        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert!(resp.headers().get(header::WWW_AUTHENTICATE).is_none());
        assert!(resp.headers().get(header::SET_COOKIE).is_none());
        assert!(resp.headers().get(header::TRANSFER_ENCODING).is_none());
        assert_eq!(resp.headers().get(header::CONTENT_TYPE).unwrap(), "application/vnd.ogc.se_xml");

        let body = axum::body::to_bytes(resp.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"<ServiceExceptionReport/>");
    }

    #[test]
    fn allow_auth_keeps_auth_headers() {
        let cfg = ProxyConfig::query_parameter().allow_auth(true).build().unwrap();
        let resp = assemble(upstream(), &cfg);

        assert!(resp.headers().get(header::WWW_AUTHENTICATE).is_some());
        assert_eq!(resp.headers().get_all(header::SET_COOKIE).iter().count(), 2);
    }
}
