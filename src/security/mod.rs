//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Outgoing request:
//!     → headers.rs (drop hop-by-hop, drop Authorization/Cookie unless allow_auth)
//!     → upstream
//!
//! Relayed response:
//!     → headers.rs (drop hop-by-hop, drop WWW-Authenticate/Set-Cookie unless allow_auth)
//!     → caller
//! ```
//!
//! # Design Decisions
//! - Credentials never cross origins unless the mount opts in
//! - No host allow-listing here; that belongs to the integration layer

pub mod headers;
