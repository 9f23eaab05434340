//! Target URL parsing.
//!
//! # Responsibilities
//! - Parse an absolute URL into its parts
//! - Lift `user:password@` userinfo out of the URL into separate fields
//! - Normalize an empty path to `/` and a missing port to `None`

use thiserror::Error;
use url::Url;

/// Raised when a string is not an absolute URL with a host.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid url: {reason}")]
pub struct InvalidUrl {
    pub reason: String,
}

impl InvalidUrl {
    fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

/// A parsed, credential-free target URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlDescriptor {
    /// Canonical URL. Never contains userinfo.
    url: Url,
    pub scheme: String,
    pub host: String,
    /// `None` means "default port for the scheme".
    pub port: Option<u16>,
    pub path: String,
    pub query: Option<String>,
    pub fragment: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl UrlDescriptor {
    pub fn parse(input: &str) -> Result<Self, InvalidUrl> {
        let mut url = Url::parse(input.trim()).map_err(|e| InvalidUrl::new(e.to_string()))?;

        let host = match url.host_str() {
            Some(h) if !h.is_empty() => h.to_string(),
            _ => return Err(InvalidUrl::new("url has no host")),
        };

        let username = Some(url.username())
            .filter(|u| !u.is_empty())
            .map(decode_userinfo);
        let password = url.password().map(decode_userinfo);

        if username.is_some() || password.is_some() {
            url.set_username("")
                .and_then(|_| url.set_password(None))
                .map_err(|_| InvalidUrl::new("cannot strip userinfo"))?;
        }

        let path = match url.path() {
            "" => "/".to_string(),
            p => p.to_string(),
        };

        Ok(Self {
            scheme: url.scheme().to_string(),
            host,
            port: url.port(),
            path,
            query: url.query().map(str::to_string),
            fragment: url.fragment().map(str::to_string),
            username,
            password,
            url,
        })
    }

    /// Canonical URL string, credentials removed.
    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }

    /// The URL to put on the wire: credential-free and without fragment.
    pub fn target_url(&self) -> Url {
        let mut url = self.url.clone();
        url.set_fragment(None);
        url
    }

    /// `host[:port]`, as sent in the `Host` header.
    pub fn authority(&self) -> String {
        match self.port {
            Some(port) => format!("{}:{}", self.host, port),
            None => self.host.clone(),
        }
    }

    pub fn has_credentials(&self) -> bool {
        self.username.is_some()
    }
}

impl std::fmt::Display for UrlDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn decode_userinfo(raw: &str) -> String {
    urlencoding::decode(raw)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}
