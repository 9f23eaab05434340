//! Mountable proxy factory.
//!
//! # Responsibilities
//! - Normalize mount options into one immutable `ProxyConfig`
//! - Build the two proxy variants: query-parameter and path-rewrite
//! - Resolve the upstream target for a request on a given mount
//!
//! # Design Decisions
//! - `ProxyConfig` is created once per mount and shared read-only via `Arc`
//! - The path-rewrite base URL is validated when the mount is built, not per request

use std::sync::Arc;

use thiserror::Error;
use url::Url;

use crate::proxy::error::ProxyError;
use crate::proxy::guard;
use crate::proxy::url::UrlDescriptor;

/// Errors raised while building a mount.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MountError {
    #[error("mount prefix must start with '/': {0}")]
    InvalidPrefix(String),

    #[error("mount prefix may not contain route syntax ('{{', '}}', '*', ':'): {0}")]
    RouteSyntax(String),

    #[error("query-parameter mount cannot have a fixed upstream: {0}")]
    UnexpectedUpstream(String),

    #[error("upstream url is not absolute: {0}")]
    InvalidUpstream(String),

    #[error("upstream url must use http or https: {0}")]
    UnsupportedScheme(String),
}

/// Where a mount sends its traffic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Target taken from the `url` query parameter of each request.
    QueryParameter,
    /// Fixed upstream; the request path after the prefix is appended.
    Fixed(Url),
}

/// Immutable per-mount proxy options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    target: Target,
    preserve_host: bool,
    allow_auth: bool,
}

impl ProxyConfig {
    /// Options for a query-parameter proxy.
    pub fn query_parameter() -> ProxyConfigBuilder {
        ProxyConfigBuilder {
            upstream: None,
            preserve_host: false,
            allow_auth: false,
        }
    }

    /// Options for a path-rewrite proxy bound to `upstream`.
    pub fn builder(upstream: impl Into<String>) -> ProxyConfigBuilder {
        ProxyConfigBuilder {
            upstream: Some(upstream.into()),
            preserve_host: false,
            allow_auth: false,
        }
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn base_url(&self) -> Option<&Url> {
        match &self.target {
            Target::Fixed(url) => Some(url),
            Target::QueryParameter => None,
        }
    }

    pub fn preserve_host(&self) -> bool {
        self.preserve_host
    }

    pub fn allow_auth(&self) -> bool {
        self.allow_auth
    }
}

impl TryFrom<&str> for ProxyConfig {
    type Error = MountError;

    /// Bare string shorthand for `{ url = "..." }`.
    fn try_from(upstream: &str) -> Result<Self, Self::Error> {
        ProxyConfig::builder(upstream).build()
    }
}

/// Builder normalizing both configuration forms.
#[derive(Debug, Clone)]
pub struct ProxyConfigBuilder {
    upstream: Option<String>,
    preserve_host: bool,
    allow_auth: bool,
}

impl ProxyConfigBuilder {
    pub fn preserve_host(mut self, preserve: bool) -> Self {
        self.preserve_host = preserve;
        self
    }

    pub fn allow_auth(mut self, allow: bool) -> Self {
        self.allow_auth = allow;
        self
    }

    pub fn build(self) -> Result<ProxyConfig, MountError> {
        let target = match self.upstream {
            None => Target::QueryParameter,
            Some(raw) => Target::Fixed(parse_upstream(&raw)?),
        };
        Ok(ProxyConfig {
            target,
            preserve_host: self.preserve_host,
            allow_auth: self.allow_auth,
        })
    }
}

/// Parse and check a fixed upstream base URL.
pub fn parse_upstream(raw: &str) -> Result<Url, MountError> {
    let descriptor =
        UrlDescriptor::parse(raw).map_err(|_| MountError::InvalidUpstream(raw.to_string()))?;
    match descriptor.scheme.as_str() {
        "http" | "https" => {}
        _ => return Err(MountError::UnsupportedScheme(raw.to_string())),
    }
    // Userinfo stays in the base so every request inherits it.
    Url::parse(raw.trim()).map_err(|_| MountError::InvalidUpstream(raw.to_string()))
}

/// A proxy bound to a path prefix.
#[derive(Debug, Clone)]
pub struct Mount {
    prefix: String,
    config: Arc<ProxyConfig>,
}

impl Mount {
    /// Query-parameter proxy at `prefix`.
    pub fn query_parameter(prefix: &str, config: ProxyConfig) -> Result<Self, MountError> {
        if let Some(base) = config.base_url() {
            return Err(MountError::UnexpectedUpstream(base.to_string()));
        }
        Self::new(prefix, config)
    }

    /// Path-rewrite proxy at `prefix`; `config` must carry a fixed upstream.
    pub fn path_rewrite(prefix: &str, config: ProxyConfig) -> Result<Self, MountError> {
        if config.base_url().is_none() {
            return Err(MountError::InvalidUpstream("<none>".to_string()));
        }
        Self::new(prefix, config)
    }

    /// Mount at `prefix`; the variant follows `config.target()`.
    pub fn new(prefix: &str, config: ProxyConfig) -> Result<Self, MountError> {
        Ok(Self {
            prefix: normalize_prefix(prefix)?,
            config: Arc::new(config),
        })
    }

    /// Prefix without trailing slash (`""` for the root mount).
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Prefix for logs and metric labels.
    pub fn label(&self) -> &str {
        if self.prefix.is_empty() {
            "/"
        } else {
            &self.prefix
        }
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    /// Resolve and validate the upstream target for one request.
    pub fn resolve(
        &self,
        inbound_scheme: &str,
        path: &str,
        query: Option<&str>,
    ) -> Result<UrlDescriptor, ProxyError> {
        match self.config.target() {
            Target::QueryParameter => {
                let raw = guard::url_parameter(query);
                guard::validate_target(inbound_scheme, raw.as_deref())
            }
            Target::Fixed(base) => {
                let remainder = path.strip_prefix(self.prefix.as_str()).unwrap_or(path);
                if has_dot_segment(remainder) {
                    return Err(ProxyError::DotSegment);
                }
                let joined = rewrite_target(base, remainder, query);
                UrlDescriptor::parse(&joined).map_err(|e| {
                    tracing::warn!(target_url = %joined, error = %e, "Rewritten target does not parse");
                    ProxyError::SchemeMismatch
                })
            }
        }
    }
}

/// Normalize a mount prefix: leading `/` required, trailing `/` dropped.
pub fn normalize_prefix(prefix: &str) -> Result<String, MountError> {
    if !prefix.starts_with('/') {
        return Err(MountError::InvalidPrefix(prefix.to_string()));
    }
    if prefix.contains(['{', '}', '*', ':']) {
        return Err(MountError::RouteSyntax(prefix.to_string()));
    }
    Ok(prefix.trim_end_matches('/').to_string())
}

/// True when `remainder` has a `.` or `..` segment, plain or percent-encoded.
///
/// URL parsing resolves such segments, which would escape the base path.
pub fn has_dot_segment(remainder: &str) -> bool {
    remainder.split('/').any(|segment| {
        let decoded = segment.to_ascii_lowercase().replace("%2e", ".");
        decoded == "." || decoded == ".."
    })
}

/// Append the request's path remainder and query to a fixed base URL.
pub fn rewrite_target(base: &Url, remainder: &str, query: Option<&str>) -> String {
    let mut base = base.clone();
    base.set_fragment(None);
    let mut base_str = String::from(base);
    let base_query = match base_str.find('?') {
        Some(idx) => {
            let q = base_str[idx + 1..].to_string();
            base_str.truncate(idx);
            Some(q)
        }
        None => None,
    };

    let remainder = remainder.trim_start_matches('/');
    let mut target = if remainder.is_empty() {
        base_str
    } else {
        format!("{}/{}", base_str.trim_end_matches('/'), remainder)
    };

    let query = match (base_query.filter(|q| !q.is_empty()), query.filter(|q| !q.is_empty())) {
        (Some(b), Some(r)) => Some(format!("{b}&{r}")),
        (b, r) => b.or(r.map(str::to_string)),
    };
    if let Some(q) = query {
        target.push('?');
        target.push_str(&q);
    }
    target
}
