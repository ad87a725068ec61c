//! Shared holder of the active configuration snapshot.
//!
//! # Design Decisions
//! - Lock-free reads via `ArcSwap`; a reader gets an `Arc<ProxyConfig>` and
//!   keeps it for the whole request
//! - Replacement swaps the pointer; the old snapshot lives until its last
//!   reader drops it
//! - Cloning the store clones the handle, not the configuration

use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::config::schema::ProxyConfig;

/// Atomically swappable configuration snapshot.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    current: Arc<ArcSwap<ProxyConfig>>,
}

impl ConfigStore {
    pub fn new(config: ProxyConfig) -> Self {
        Self {
            current: Arc::new(ArcSwap::from_pointee(config)),
        }
    }

    /// The snapshot visible right now.
    pub fn load(&self) -> Arc<ProxyConfig> {
        self.current.load_full()
    }

    /// Make `config` the visible snapshot, returning the one it replaced.
    pub fn replace(&self, config: ProxyConfig) -> Arc<ProxyConfig> {
        self.current.swap(Arc::new(config))
    }
}
