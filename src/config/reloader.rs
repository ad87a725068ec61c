//! Periodic configuration reloader for hot reload.
//!
//! ```text
//! Idle ──tick──▶ CheckModified ──marker <= last──▶ Idle
//!                      │
//!                      └─marker > last──▶ Reloading ──ok──▶ replace, Idle
//!                                             └──err──▶ keep current, Idle
//! ```
//!
//! The last-loaded marker is private to the reloader; the only thing it
//! shares with request handlers is the [`ConfigStore`].

use std::time::{Duration, SystemTime};

use tokio::sync::broadcast;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::config::loader::{parse_config, ConfigError};
use crate::config::source::ConfigSource;
use crate::config::store::ConfigStore;
use crate::observability::metrics;

/// Result of a single reload check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadOutcome {
    /// Marker did not advance.
    Unchanged,
    /// A newer document was parsed and is now visible.
    Reloaded,
    /// The marker or document could not be used; the current snapshot stays.
    Failed,
}

impl ReloadOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            ReloadOutcome::Unchanged => "unchanged",
            ReloadOutcome::Reloaded => "reloaded",
            ReloadOutcome::Failed => "failed",
        }
    }
}

/// Polls a [`ConfigSource`] and swaps newer documents into a [`ConfigStore`].
pub struct ConfigReloader<S> {
    source: S,
    store: ConfigStore,
    period: Duration,
    last_marker: SystemTime,
}

impl<S: ConfigSource> ConfigReloader<S> {
    /// `loaded_marker` is the marker of the snapshot currently in `store`.
    pub fn new(source: S, store: ConfigStore, period: Duration, loaded_marker: SystemTime) -> Self {
        Self {
            source,
            store,
            period,
            last_marker: loaded_marker,
        }
    }

    /// Marker of the last successfully loaded document.
    pub fn last_marker(&self) -> SystemTime {
        self.last_marker
    }

    /// Run one check: compare markers and reload if the source is newer.
    pub fn check(&mut self) -> ReloadOutcome {
        let marker = match self.source.modified() {
            Ok(marker) => marker,
            Err(e) => {
                tracing::warn!(
                    source = %self.source.describe(),
                    error = %e,
                    "Failed to read config modification time"
                );
                return self.finish(ReloadOutcome::Failed);
            }
        };

        if marker <= self.last_marker {
            return ReloadOutcome::Unchanged;
        }

        tracing::info!(source = %self.source.describe(), "Config change detected, reloading...");

        let loaded = self
            .source
            .read()
            .map_err(ConfigError::from)
            .and_then(|content| parse_config(&content));

        match loaded {
            Ok(config) => {
                let routes = config.routes.len();
                self.store.replace(config);
                self.last_marker = marker;
                tracing::info!(routes, "Configuration reloaded");
                self.finish(ReloadOutcome::Reloaded)
            }
            Err(e) => {
                tracing::error!(
                    source = %self.source.describe(),
                    "Failed to reload config: {}. Keeping current configuration.",
                    e
                );
                self.finish(ReloadOutcome::Failed)
            }
        }
    }

    fn finish(&self, outcome: ReloadOutcome) -> ReloadOutcome {
        metrics::record_config_reload(outcome.as_str());
        outcome
    }

    /// Run the polling loop until shutdown is signalled.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            source = %self.source.describe(),
            period_secs = self.period.as_secs_f64(),
            "Config reloader started"
        );

        let mut ticker = time::interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    // Source I/O is blocking; keep it off the async workers.
                    match tokio::task::spawn_blocking(move || {
                        self.check();
                        self
                    })
                    .await
                    {
                        Ok(reloader) => self = reloader,
                        Err(e) => {
                            tracing::error!(error = %e, "Config reload check aborted, stopping reloader");
                            break;
                        }
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Config reloader received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}
