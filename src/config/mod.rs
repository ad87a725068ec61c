//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (JSON)
//!     → source.rs (content + modification marker)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → store.rs (shared via ArcSwap to all request handlers)
//!
//! On every reload tick:
//!     reloader.rs compares the source's marker with the last loaded one
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → atomic swap of Arc<ProxyConfig> in the store
//!     → requests started after the swap observe the new config
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - A failed reload never replaces the active snapshot

pub mod loader;
pub mod reloader;
pub mod schema;
pub mod source;
pub mod store;
pub mod validation;

pub use loader::{load_config, load_from_source, parse_config, ConfigError};
pub use reloader::{ConfigReloader, ReloadOutcome};
pub use schema::{BasePath, HeaderDropSet, HeaderOverwrite, ProxyConfig, RouteConfig, RouteProxy, ServerConfig};
pub use source::{ConfigSource, FileSource};
pub use store::ConfigStore;
