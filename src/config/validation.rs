//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Check mounts: prefixes well-formed and unique, upstreams absolute http(s)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::ServerConfig;
use crate::proxy::mount::{normalize_prefix, MountError};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid bind address: {0}")]
    BindAddress(String),

    #[error("invalid metrics address: {0}")]
    MetricsAddress(String),

    #[error("timeouts.request_secs must be greater than zero")]
    ZeroRequestTimeout,

    #[error("security.max_body_size must be greater than zero")]
    ZeroBodyLimit,

    #[error("no mounts configured")]
    NoMounts,

    #[error("mount #{index}: {source}")]
    Mount { index: usize, source: MountError },

    #[error("duplicate mount prefix: {0}")]
    DuplicatePrefix(String),
}

pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(config.observability.metrics_address.clone()));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroRequestTimeout);
    }
    if config.security.max_body_size == 0 {
        errors.push(ValidationError::ZeroBodyLimit);
    }
    if config.mounts.is_empty() {
        errors.push(ValidationError::NoMounts);
    }

    let mut seen = HashSet::new();
    for (index, mount) in config.mounts.iter().enumerate() {
        if let Err(source) = mount.to_mount() {
            errors.push(ValidationError::Mount { index, source });
            continue;
        }
        if let Ok(prefix) = normalize_prefix(&mount.prefix) {
            if !seen.insert(prefix.clone()) {
                errors.push(ValidationError::DuplicatePrefix(mount.prefix.clone()));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
