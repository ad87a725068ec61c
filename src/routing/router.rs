//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Strip the base path and extract the route key
//! - Look up the route in a configuration snapshot
//! - Compute the final upstream URL (standard or universal mode)
//! - Return a typed error per failure so the caller can pick a status code
//!
//! # Design Decisions
//! - Pure function of (path, query, snapshot); no I/O, no locks
//! - The resolution borrows the route from the snapshot it was resolved
//!   against, so it cannot outlive or mix snapshots
//! - Explicit errors rather than silent defaults

use axum::http::StatusCode;
use thiserror::Error;
use url::form_urlencoded;

use crate::config::{ProxyConfig, RouteConfig};
use crate::routing::path::{effective_path, join_target, split_route_key};

/// Why a request path could not be turned into an upstream URL.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("Request path is empty after removing the base path.")]
    EmptyPath,

    #[error("Route '{key}' not found or is disabled.")]
    RouteNotFound { key: String },

    #[error("Invalid target URL format: '{target}'.")]
    InvalidTargetUrl { target: String },

    #[error("Route '{key}' is missing 'target_url' configuration.")]
    MissingTargetUrl { key: String },
}

impl RouteError {
    /// Status code reported to the client.
    pub fn status_code(&self) -> StatusCode {
        match self {
            RouteError::EmptyPath | RouteError::InvalidTargetUrl { .. } => StatusCode::BAD_REQUEST,
            RouteError::RouteNotFound { .. } => StatusCode::NOT_FOUND,
            RouteError::MissingTargetUrl { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteMode {
    Standard,
    Universal,
}

/// Outcome of a successful route resolution.
#[derive(Debug, Clone)]
pub struct Resolution<'a> {
    pub final_url: String,
    pub route_key: String,
    pub route: &'a RouteConfig,
    pub mode: RouteMode,
    /// Query parameters to send as structured parameters (standard mode only).
    pub query_params: Option<Vec<(String, String)>>,
}

/// Resolve a request path and query against a configuration snapshot.
pub fn resolve<'a>(
    raw_path: &str,
    raw_query: Option<&str>,
    config: &'a ProxyConfig,
) -> Result<Resolution<'a>, RouteError> {
    let effective = effective_path(raw_path, &config.server.base_path);
    if effective.is_empty() {
        return Err(RouteError::EmptyPath);
    }

    let (key, remainder) = split_route_key(effective);

    let route = config
        .routes
        .get(key)
        .filter(|route| route.enabled)
        .ok_or_else(|| RouteError::RouteNotFound { key: key.to_string() })?;

    let raw_query = raw_query.filter(|q| !q.is_empty());

    if route.universal_proxy {
        let target = remainder.unwrap_or_default();
        if !(target.starts_with("http://") || target.starts_with("https://")) {
            return Err(RouteError::InvalidTargetUrl {
                target: target.to_string(),
            });
        }

        // The client's query string belongs to the literal target URL.
        let final_url = match raw_query {
            Some(query) => format!("{}?{}", target, query),
            None => target.to_string(),
        };

        return Ok(Resolution {
            final_url,
            route_key: key.to_string(),
            route,
            mode: RouteMode::Universal,
            query_params: None,
        });
    }

    let target_url = route
        .target_url
        .as_deref()
        .filter(|t| !t.is_empty())
        .ok_or_else(|| RouteError::MissingTargetUrl { key: key.to_string() })?;

    let query_params = raw_query.map(|query| {
        form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .collect::<Vec<_>>()
    });

    Ok(Resolution {
        final_url: join_target(target_url, remainder.unwrap_or_default()),
        route_key: key.to_string(),
        route,
        mode: RouteMode::Standard,
        query_params,
    })
}
