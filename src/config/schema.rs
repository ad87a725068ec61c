//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! The on-disk format is JSON; every field is optional and falls back to the
//! defaults below.
//!
//! Route-level settings that may inherit a global value are modelled as
//! explicit three-state enums ([`HeaderOverwrite`], [`RouteProxy`]) and are
//! resolved through methods rather than by coalescing `Option`s at the point
//! of use.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::time::Duration;

use serde::Deserialize;

/// Root configuration for the reverse proxy.
///
/// A `ProxyConfig` is an immutable snapshot: it is replaced wholesale on
/// reload and never mutated while visible to requests.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener and runtime settings.
    pub server: ServerConfig,

    /// Upstream proxy used when a route does not choose one.
    /// An empty string is treated the same as `null`.
    #[serde(deserialize_with = "empty_as_none")]
    pub global_proxy: Option<String>,

    /// Global default for whether custom headers replace client headers.
    pub force_header_overwrite: bool,

    /// Header names stripped from every inbound request.
    pub headers_to_drop: HeaderDropSet,

    /// Route key (first path segment) to route definition.
    pub routes: HashMap<String, RouteConfig>,
}

/// Listener and runtime configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind.
    pub host: String,

    /// Port to bind.
    pub port: u16,

    /// Log the routing narrative of every request.
    pub log_requests: bool,

    /// Prefix removed from every request path before routing.
    pub base_path: BasePath,

    /// Reload polling period in seconds: negative disables, 0 polls every second.
    pub reload_interval: i64,

    /// Deadline for the whole upstream exchange, in seconds.
    pub upstream_timeout_secs: u64,

    /// Prometheus exporter bind address; metrics are not exported when unset.
    pub metrics_address: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_requests: true,
            base_path: BasePath::default(),
            reload_interval: -1,
            upstream_timeout_secs: 180,
            metrics_address: None,
        }
    }
}

impl ServerConfig {
    /// Address the listener binds to, e.g. `0.0.0.0:3000`.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Polling period of the reloader, or `None` when hot reload is disabled.
    pub fn reload_period(&self) -> Option<Duration> {
        match self.reload_interval {
            n if n < 0 => None,
            0 => Some(Duration::from_secs(1)),
            n => Some(Duration::from_secs(n as u64)),
        }
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs)
    }
}

/// A normalized base path: either empty, or starting with `/` and never
/// ending with `/`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub struct BasePath(String);

impl BasePath {
    /// Normalize a raw base path. `"api/"`, `"/api"` and `"//api//"` all
    /// become `"/api"`; `""` and `"/"` disable the base path.
    pub fn new(raw: &str) -> Self {
        let trimmed = raw.trim().trim_matches('/');
        if trimmed.is_empty() {
            Self(String::new())
        } else {
            Self(format!("/{}", trimmed))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for BasePath {
    fn from(raw: String) -> Self {
        Self::new(&raw)
    }
}

impl fmt::Display for BasePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lower-cased set of header names to strip from inbound requests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "Vec<String>")]
pub struct HeaderDropSet(HashSet<String>);

impl HeaderDropSet {
    /// Case-insensitive membership test.
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(&name.to_ascii_lowercase())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Names in sorted order, for display.
    pub fn sorted(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.0.iter().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl<S: AsRef<str>> FromIterator<S> for HeaderDropSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|name| name.as_ref().trim().to_ascii_lowercase())
                .filter(|name| !name.is_empty())
                .collect(),
        )
    }
}

impl From<Vec<String>> for HeaderDropSet {
    fn from(names: Vec<String>) -> Self {
        names.into_iter().collect()
    }
}

/// Route configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RouteConfig {
    /// Disabled routes resolve to "not found".
    pub enabled: bool,

    /// The rest of the path after the route key is itself the target URL.
    pub universal_proxy: bool,

    /// Base upstream URL; only consulted for standard routes.
    pub target_url: Option<String>,

    /// Headers added to (or overwriting) the forwarded request.
    pub custom_headers: BTreeMap<String, String>,

    /// Route-level override of the global header overwrite policy.
    pub force_header_overwrite: HeaderOverwrite,

    /// Route-level upstream proxy choice.
    pub proxy: RouteProxy,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            universal_proxy: false,
            target_url: None,
            custom_headers: BTreeMap::new(),
            force_header_overwrite: HeaderOverwrite::Inherit,
            proxy: RouteProxy::Inherit,
        }
    }
}

impl RouteConfig {
    /// A standard route forwarding to `target_url`.
    pub fn standard(target_url: impl Into<String>) -> Self {
        Self {
            target_url: Some(target_url.into()),
            ..Self::default()
        }
    }

    /// A universal route taking its target from the request path.
    pub fn universal() -> Self {
        Self {
            universal_proxy: true,
            ..Self::default()
        }
    }
}

/// Per-route header overwrite policy.
///
/// JSON `true`/`false` force the policy; `null` or an absent field inherits
/// the global `force_header_overwrite`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "Option<bool>")]
pub enum HeaderOverwrite {
    #[default]
    Inherit,
    Always,
    Never,
}

impl HeaderOverwrite {
    /// Effective policy given the global default.
    pub fn resolve(self, global: bool) -> bool {
        match self {
            HeaderOverwrite::Inherit => global,
            HeaderOverwrite::Always => true,
            HeaderOverwrite::Never => false,
        }
    }
}

impl From<Option<bool>> for HeaderOverwrite {
    fn from(value: Option<bool>) -> Self {
        match value {
            None => HeaderOverwrite::Inherit,
            Some(true) => HeaderOverwrite::Always,
            Some(false) => HeaderOverwrite::Never,
        }
    }
}

/// Per-route upstream proxy choice.
///
/// `null` or an absent field inherits `global_proxy`, an empty string forces
/// a direct connection, anything else is the proxy URL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "Option<String>")]
pub enum RouteProxy {
    #[default]
    Inherit,
    Direct,
    Via(String),
}

impl RouteProxy {
    /// Proxy URL to use for this route, or `None` for a direct connection.
    pub fn resolve<'a>(&'a self, global: Option<&'a str>) -> Option<&'a str> {
        match self {
            RouteProxy::Inherit => global.filter(|url| !url.is_empty()),
            RouteProxy::Direct => None,
            RouteProxy::Via(url) => Some(url),
        }
    }
}

impl From<Option<String>> for RouteProxy {
    fn from(value: Option<String>) -> Self {
        match value {
            None => RouteProxy::Inherit,
            Some(url) if url.trim().is_empty() => RouteProxy::Direct,
            Some(url) => RouteProxy::Via(url.trim().to_string()),
        }
    }
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty()))
}
