//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::proxy::mount::{Mount, MountError, ProxyConfig};

/// Root configuration for the relay.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener configuration (bind address, TLS).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Request size limits.
    pub security: SecurityConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Proxy mount points.
    pub mounts: Vec<MountConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listener: ListenerConfig::default(),
            timeouts: TimeoutConfig::default(),
            security: SecurityConfig::default(),
            observability: ObservabilityConfig::default(),
            mounts: vec![MountConfig {
                prefix: "/proxy".to_string(),
                upstream: None,
                preserve_host: None,
                allow_auth: None,
            }],
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,

    /// Honour `X-Forwarded-Proto` when resolving the caller's scheme.
    /// Only enable behind a trusted TLS-terminating front.
    pub trust_forwarded_proto: bool,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            tls: None,
            trust_forwarded_proto: false,
        }
    }
}

impl ListenerConfig {
    /// Scheme of requests arriving on this listener.
    pub fn scheme(&self) -> &'static str {
        if self.tls.is_some() {
            "https"
        } else {
            "http"
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Upstream connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Whole inbound request timeout in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            request_secs: 30,
        }
    }
}

/// Request size limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum forwarded request body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// One proxy mount point.
///
/// Without `upstream` this is a query-parameter proxy. Options may be given
/// on the mount itself or inside an `upstream` table; the table wins.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MountConfig {
    /// Path prefix (e.g., "/geoserver/").
    pub prefix: String,

    /// Fixed upstream for a path-rewrite proxy.
    #[serde(default)]
    pub upstream: Option<UpstreamConfig>,

    #[serde(default)]
    pub preserve_host: Option<bool>,

    #[serde(default)]
    pub allow_auth: Option<bool>,
}

/// Upstream given either as a bare URL or as a table.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum UpstreamConfig {
    Url(String),
    Detailed {
        url: String,
        #[serde(default)]
        preserve_host: Option<bool>,
        #[serde(default)]
        allow_auth: Option<bool>,
    },
}

impl UpstreamConfig {
    pub fn url(&self) -> &str {
        match self {
            UpstreamConfig::Url(url) => url,
            UpstreamConfig::Detailed { url, .. } => url,
        }
    }
}

impl MountConfig {
    /// Normalize into a typed proxy configuration.
    pub fn proxy_config(&self) -> Result<ProxyConfig, MountError> {
        let (builder, preserve_host, allow_auth) = match &self.upstream {
            None => (ProxyConfig::query_parameter(), self.preserve_host, self.allow_auth),
            Some(UpstreamConfig::Url(url)) => {
                (ProxyConfig::builder(url.as_str()), self.preserve_host, self.allow_auth)
            }
            Some(UpstreamConfig::Detailed { url, preserve_host, allow_auth }) => (
                ProxyConfig::builder(url.as_str()),
                preserve_host.or(self.preserve_host),
                allow_auth.or(self.allow_auth),
            ),
        };
        builder
            .preserve_host(preserve_host.unwrap_or(false))
            .allow_auth(allow_auth.unwrap_or(false))
            .build()
    }

    /// Build the mount this entry describes.
    pub fn to_mount(&self) -> Result<Mount, MountError> {
        Mount::new(&self.prefix, self.proxy_config()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_mount_a_query_parameter_proxy() {
        let config = ServerConfig::default();
        assert_eq!(config.mounts.len(), 1);
        let mount = config.mounts[0].to_mount().unwrap();
        assert_eq!(mount.prefix(), "/proxy");
        assert!(mount.config().base_url().is_none());
        assert_eq!(config.listener.scheme(), "http");
    }

    #[test]
    fn string_and_table_upstreams_normalize() {
        let config: ServerConfig = toml::from_str(
            r#"
            [[mounts]]
            prefix = "/tiles/"
            upstream = "https://tiles.example/"

            [[mounts]]
            prefix = "/geoserver/"
            upstream = { url = "https://upstream.example/geoserver/", preserve_host = true }

            [[mounts]]
            prefix = "/csw"
            upstream = "https://catalog.example/csw"
            allow_auth = true
            "#,
        )
        .unwrap();

        let tiles = config.mounts[0].proxy_config().unwrap();
        assert!(!tiles.preserve_host());
        assert_eq!(tiles.base_url().unwrap().as_str(), "https://tiles.example/");

        let geoserver = config.mounts[1].proxy_config().unwrap();
        assert!(geoserver.preserve_host());
        assert!(!geoserver.allow_auth());

        let csw = config.mounts[2].proxy_config().unwrap();
        assert!(csw.allow_auth());
    }
}
