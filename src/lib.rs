//! Same-origin HTTP forwarding proxy for browser GIS clients.
//!
//! Lets a web map fetch WMS/WFS/CSW endpoints and tile servers that lack
//! CORS support by relaying the request through the page's own origin.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod proxy;
pub mod security;

pub use config::ServerConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use proxy::{Mount, ProxyConfig};
