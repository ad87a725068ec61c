//! Prefix-routed reverse proxy library.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;

pub use config::{ConfigStore, ProxyConfig};
pub use error::ProxyError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
