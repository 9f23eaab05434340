//! Header stripping rules.
//!
//! # Responsibilities
//! - Strip hop-by-hop headers in both directions
//! - Strip credential headers on the way out unless auth is allowed
//! - Strip auth challenges and cookies on the way back unless auth is allowed
//!
//! # Design Decisions
//! - Rules are fixed name lists applied declaratively, never ad hoc
//! - Headers named by `Connection` are hop-by-hop too

use axum::http::header::{self, HeaderMap, HeaderName};

/// Connection-scoped headers that are never relayed.
pub const HOP_BY_HOP: [HeaderName; 9] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    HeaderName::from_static("proxy-connection"),
    header::PROXY_AUTHORIZATION,
    header::PROXY_AUTHENTICATE,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Request headers withheld from the upstream when auth is not allowed.
pub const REQUEST_CREDENTIALS: [HeaderName; 2] = [header::AUTHORIZATION, header::COOKIE];

/// Response headers withheld from the caller when auth is not allowed.
pub const RESPONSE_CREDENTIALS: [HeaderName; 2] = [header::WWW_AUTHENTICATE, header::SET_COOKIE];

/// Remove every value of every listed header.
pub fn strip(headers: &mut HeaderMap, names: &[HeaderName]) {
    for name in names {
        headers.remove(name);
    }
}

/// Remove hop-by-hop headers, including those nominated by `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let nominated: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|token| HeaderName::from_bytes(token.trim().as_bytes()).ok())
        .collect();

    strip(headers, &nominated);
    strip(headers, &HOP_BY_HOP);
}
