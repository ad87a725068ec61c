//! Request forwarding to upstreams.
//!
//! # Data Flow
//! ```text
//! inbound request
//!     → ConfigStore::load (one snapshot for the whole request)
//!     → routing::resolve (final URL, route, query params)
//!     → headers::merge (drop set, Host, custom headers)
//!     → proxy choice (route override or global proxy)
//!     → reqwest client for that proxy (pooled)
//!     → response::relay (status, filtered headers, streamed body)
//! ```

use std::time::Duration;

use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use dashmap::DashMap;
use reqwest::redirect::Policy;
use tokio::time;

use crate::config::ConfigStore;
use crate::error::ProxyError;
use crate::http::headers::{self, HeaderAction};
use crate::http::request::RequestIdExt;
use crate::http::response::{self, UPSTREAM_EXCLUDED_REQUEST_HEADERS};
use crate::routing::{self, RouteMode};

/// One upstream client per distinct proxy choice and read timeout.
///
/// `reqwest` binds proxies and timeouts to the client, so routes using
/// different proxies need different clients; each keeps its own connection
/// pool.
#[derive(Debug, Default)]
pub struct UpstreamClients {
    clients: DashMap<ClientKey, reqwest::Client>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ClientKey {
    proxy: Option<String>,
    read_timeout: Duration,
}

impl UpstreamClients {
    pub fn new() -> Self {
        Self::default()
    }

    /// Client for `proxy`, or for direct connections when `None`.
    ///
    /// `read_timeout` bounds the silence between two reads, so a response
    /// body may stream for longer than it as long as data keeps arriving.
    pub fn get(
        &self,
        proxy: Option<&str>,
        read_timeout: Duration,
    ) -> Result<reqwest::Client, ProxyError> {
        let key = ClientKey {
            proxy: proxy.map(str::to_owned),
            read_timeout,
        };
        if let Some(client) = self.clients.get(&key) {
            return Ok(client.value().clone());
        }

        let client = build_client(proxy, read_timeout)?;
        Ok(self.clients.entry(key).or_insert(client).value().clone())
    }

    /// Number of distinct clients built so far.
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

fn build_client(proxy: Option<&str>, read_timeout: Duration) -> Result<reqwest::Client, ProxyError> {
    let builder = reqwest::Client::builder()
        .redirect(Policy::none())
        .read_timeout(read_timeout);

    let builder = match proxy {
        Some(url) => {
            let proxy = reqwest::Proxy::all(url).map_err(|e| ProxyError::InvalidProxy {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
            builder.proxy(proxy)
        }
        // Direct also ignores HTTP_PROXY and friends from the environment.
        None => builder.no_proxy(),
    };

    builder.build().map_err(ProxyError::Client)
}

/// Forwards requests according to the current configuration snapshot.
#[derive(Debug)]
pub struct Forwarder {
    store: ConfigStore,
    clients: UpstreamClients,
}

impl Forwarder {
    pub fn new(store: ConfigStore) -> Self {
        Self {
            store,
            clients: UpstreamClients::new(),
        }
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    pub fn clients(&self) -> &UpstreamClients {
        &self.clients
    }

    /// Forward one request and relay the upstream response.
    pub async fn forward(&self, request: Request<Body>) -> Result<Response, ProxyError> {
        let snapshot = self.store.load();
        let log_requests = snapshot.server.log_requests;
        let request_id = request.request_id().to_string();

        let (parts, body) = request.into_parts();

        let resolution = routing::resolve(parts.uri.path(), parts.uri.query(), &snapshot)?;
        let route = resolution.route;

        if log_requests {
            tracing::info!(
                request_id = %request_id,
                method = %parts.method,
                uri = %parts.uri,
                route = %resolution.route_key,
                universal = resolution.mode == RouteMode::Universal,
                target = %resolution.final_url,
                query_params = ?resolution.query_params,
                "Forwarding request"
            );
        }

        let proxy = route.proxy.resolve(snapshot.global_proxy.as_deref());
        if log_requests {
            if let Some(proxy) = proxy {
                tracing::info!(request_id = %request_id, proxy = %proxy, "Using upstream proxy");
            }
        }

        let overwrite = route
            .force_header_overwrite
            .resolve(snapshot.force_header_overwrite);
        let merged = headers::merge(
            &parts.headers,
            &snapshot.headers_to_drop,
            &route.custom_headers,
            overwrite,
        );
        if log_requests {
            for decision in &merged.decisions {
                let verdict = match decision.action {
                    HeaderAction::Added => "added",
                    HeaderAction::Overwritten => "overwritten",
                    HeaderAction::Kept => "kept client value",
                };
                tracing::info!(
                    request_id = %request_id,
                    header = %decision.name,
                    overwrite,
                    "Custom header {}",
                    verdict
                );
            }
        }

        let timeout = snapshot.server.upstream_timeout();
        let client = self.clients.get(proxy, timeout)?;

        let body = axum::body::to_bytes(body, usize::MAX)
            .await
            .map_err(ProxyError::RequestBody)?;

        let outbound_headers =
            response::filter_headers(&merged.headers, &UPSTREAM_EXCLUDED_REQUEST_HEADERS);

        let mut outbound = client
            .request(parts.method.clone(), resolution.final_url.as_str())
            .headers(outbound_headers)
            .body(body);

        if let Some(params) = &resolution.query_params {
            outbound = outbound.query(params);
        }

        // The deadline covers the exchange up to the response headers; the
        // body is only bounded by the client's read timeout.
        let upstream = match time::timeout(timeout, outbound.send()).await {
            Ok(sent) => sent.map_err(|e| ProxyError::from_upstream(e, &resolution.final_url))?,
            Err(_) => {
                return Err(ProxyError::UpstreamTimeout {
                    url: resolution.final_url,
                })
            }
        };

        if log_requests {
            tracing::info!(
                request_id = %request_id,
                status = upstream.status().as_u16(),
                "Upstream responded"
            );
        }

        Ok(response::relay(upstream))
    }
}
