//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID and trace layers)
//!     → forwarder.rs (snapshot, route, headers, upstream call)
//!     → headers.rs (drop set and custom header policy)
//!     → response.rs (filter framing headers, stream body)
//!     → Send to client
//! ```

pub mod forwarder;
pub mod headers;
pub mod request;
pub mod response;
pub mod server;

pub use forwarder::{Forwarder, UpstreamClients};
pub use request::{RequestIdExt, UuidRequestId, X_REQUEST_ID};
pub use server::HttpServer;
