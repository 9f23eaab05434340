//! Same-origin forwarding proxy.
//!
//! # Data Flow
//! ```text
//! Inbound request (method, scheme, headers, query, path, body)
//!     → mount.rs   (which variant? query `url=` or fixed upstream + path)
//!     → guard.rs   (url present? absolute? same scheme as caller?)
//!     → url.rs     (UrlDescriptor: host, port, path, userinfo lifted out)
//!     → outgoing.rs (Host rewrite, credential stripping, body rule)
//!     → exchange.rs (one upstream call, cancellable)
//!     → http/response.rs (response header stripping)
//!     → Caller
//! ```
//!
//! # Design Decisions
//! - Single hop, single attempt: no pooling policy, caching or retries
//! - Per-mount `ProxyConfig` is immutable and shared read-only
//! - All proxy errors become HTTP responses at the handler boundary

pub mod error;
pub mod exchange;
pub mod guard;
pub mod handler;
pub mod mount;
pub mod outgoing;
pub mod url;

pub use error::ProxyError;
pub use exchange::{Exchange, ExchangeError, ExchangeResult, Executor, ReqwestExchange};
pub use handler::{relay, RelaySettings, RelayState};
pub use mount::{Mount, MountError, ProxyConfig, Target};
pub use outgoing::{Credentials, OutgoingRequest};
pub use self::url::{InvalidUrl, UrlDescriptor};
