//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, middleware, one route set per mount)
//!     → request.rs (request ID, caller scheme, bounded body read)
//!     → [proxy pipeline: guard, outgoing, exchange]
//!     → response.rs (strip headers, relay status and body)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{MakeRequestUuidV4, X_REQUEST_ID};
pub use server::{build_router, HttpServer, ServerError};
