//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check route keys can be produced by a request path
//! - Validate URLs (targets, proxies) and custom header tokens
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system
//! - A standard route without `target_url` is accepted here and rejected per
//!   request, so one half-edited route never blocks a reload

use axum::http::{HeaderName, HeaderValue};
use thiserror::Error;
use url::Url;

use crate::config::schema::{ProxyConfig, RouteProxy};

/// A single semantic problem in a configuration document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("route key must not be empty")]
    EmptyRouteKey,

    #[error("route key '{0}' must not contain '/'")]
    RouteKeyContainsSlash(String),

    #[error("route '{route}': invalid target_url '{url}': {reason}")]
    InvalidTargetUrl {
        route: String,
        url: String,
        reason: String,
    },

    #[error("{scope}: invalid proxy URL '{url}': {reason}")]
    InvalidProxyUrl {
        scope: String,
        url: String,
        reason: String,
    },

    #[error("route '{route}': invalid custom header name '{name}'")]
    InvalidHeaderName { route: String, name: String },

    #[error("route '{route}': invalid value for custom header '{name}'")]
    InvalidHeaderValue { route: String, name: String },

    #[error("server.upstream_timeout_secs must be greater than 0")]
    ZeroUpstreamTimeout,
}

const TARGET_SCHEMES: &[&str] = &["http", "https"];
const PROXY_SCHEMES: &[&str] = &["http", "https", "socks5", "socks5h"];

/// Validate a deserialized configuration.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.upstream_timeout_secs == 0 {
        errors.push(ValidationError::ZeroUpstreamTimeout);
    }

    if let Some(proxy) = &config.global_proxy {
        if let Err(reason) = check_url(proxy, PROXY_SCHEMES) {
            errors.push(ValidationError::InvalidProxyUrl {
                scope: "global_proxy".to_string(),
                url: proxy.clone(),
                reason,
            });
        }
    }

    let mut keys: Vec<&String> = config.routes.keys().collect();
    keys.sort();

    for key in keys {
        let route = &config.routes[key];

        if key.is_empty() {
            errors.push(ValidationError::EmptyRouteKey);
        } else if key.contains('/') {
            errors.push(ValidationError::RouteKeyContainsSlash(key.clone()));
        }

        if !route.universal_proxy {
            if let Some(target) = route.target_url.as_deref().filter(|t| !t.is_empty()) {
                if let Err(reason) = check_url(target, TARGET_SCHEMES) {
                    errors.push(ValidationError::InvalidTargetUrl {
                        route: key.clone(),
                        url: target.to_string(),
                        reason,
                    });
                }
            }
        }

        if let RouteProxy::Via(proxy) = &route.proxy {
            if let Err(reason) = check_url(proxy, PROXY_SCHEMES) {
                errors.push(ValidationError::InvalidProxyUrl {
                    scope: format!("route '{}'", key),
                    url: proxy.clone(),
                    reason,
                });
            }
        }

        for (name, value) in &route.custom_headers {
            if HeaderName::from_bytes(name.as_bytes()).is_err() {
                errors.push(ValidationError::InvalidHeaderName {
                    route: key.clone(),
                    name: name.clone(),
                });
            } else if HeaderValue::from_str(value).is_err() {
                errors.push(ValidationError::InvalidHeaderValue {
                    route: key.clone(),
                    name: name.clone(),
                });
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_url(raw: &str, schemes: &[&str]) -> Result<(), String> {
    let url = Url::parse(raw).map_err(|e| e.to_string())?;
    if !schemes.contains(&url.scheme()) {
        return Err(format!("unsupported scheme '{}'", url.scheme()));
    }
    if url.host_str().is_none() {
        return Err("missing host".to_string());
    }
    Ok(())
}
