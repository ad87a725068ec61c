//! Startup orchestration.
//!
//! # Responsibilities
//! - Summarize the loaded configuration once at startup
//! - Render the route table as plain lines so it can be logged or printed
//!
//! # Design Decisions
//! - Rendering is pure; only [`log_startup_summary`] touches the logger
//! - Proxy credentials are masked wherever a proxy URL is displayed

use url::Url;

use crate::config::{HeaderOverwrite, ProxyConfig, RouteProxy, ServerConfig};

/// Human-readable reload mode.
pub fn describe_reload(server: &ServerConfig) -> String {
    match server.reload_interval {
        n if n < 0 => "disabled".to_string(),
        0 => "enabled (every second)".to_string(),
        n => format!("enabled (every {} seconds)", n),
    }
}

/// One line per route, sorted by key.
///
/// ```text
/// [on]  /api -> http://backend:8080  (force overwrite, proxy: socks5://127.0.0.1:1080)
/// [off] /any -> [universal]
/// ```
pub fn describe_routes(config: &ProxyConfig) -> Vec<String> {
    let mut keys: Vec<&String> = config.routes.keys().collect();
    keys.sort();

    keys.into_iter()
        .map(|key| {
            let route = &config.routes[key];
            let status = if route.enabled { "[on] " } else { "[off]" };
            let target = if route.universal_proxy {
                "[universal]".to_string()
            } else {
                route
                    .target_url
                    .clone()
                    .unwrap_or_else(|| "[missing target_url]".to_string())
            };

            let mut tags = Vec::new();
            match route.force_header_overwrite {
                HeaderOverwrite::Always => tags.push("force overwrite".to_string()),
                HeaderOverwrite::Never => tags.push("prefer client headers".to_string()),
                HeaderOverwrite::Inherit => {}
            }
            match &route.proxy {
                RouteProxy::Via(url) => tags.push(format!("proxy: {}", mask_credentials(url))),
                RouteProxy::Direct => tags.push("direct".to_string()),
                RouteProxy::Inherit => {}
            }

            if tags.is_empty() {
                format!("{} /{} -> {}", status, key, target)
            } else {
                format!("{} /{} -> {}  ({})", status, key, target, tags.join(", "))
            }
        })
        .collect()
}

/// Replace any password in a proxy URL with `***`.
pub fn mask_credentials(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(mut url) if url.password().is_some() => {
            let _ = url.set_password(Some("***"));
            url.to_string()
        }
        _ => raw.to_string(),
    }
}

/// Log the startup dashboard.
pub fn log_startup_summary(config: &ProxyConfig, source: &str) {
    let server = &config.server;
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %source,
        listen = %format!("http://{}", server.bind_address()),
        base_path = %server.base_path,
        log_requests = server.log_requests,
        reload = %describe_reload(server),
        "Prefix proxy starting"
    );

    tracing::info!(
        header_policy = if config.force_header_overwrite {
            "force overwrite"
        } else {
            "prefer client"
        },
        global_proxy = %config
            .global_proxy
            .as_deref()
            .map(mask_credentials)
            .unwrap_or_else(|| "none".to_string()),
        headers_to_drop = %config.headers_to_drop.sorted().join(", "),
        upstream_timeout_secs = server.upstream_timeout_secs,
        "Global settings"
    );

    if config.routes.is_empty() {
        tracing::warn!("No routes configured");
        return;
    }
    for line in describe_routes(config) {
        tracing::info!("route {}", line);
    }
}
