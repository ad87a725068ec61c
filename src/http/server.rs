//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the info and proxy handlers
//! - Wire up middleware (tracing, request ID)
//! - Bind server to listener and drain on shutdown
//! - Record per-request metrics

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::{IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;

use crate::config::{ConfigStore, ProxyConfig};
use crate::http::forwarder::Forwarder;
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::observability::metrics;
use crate::routing::path::{effective_path, split_route_key};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub forwarder: Arc<Forwarder>,
}

/// HTTP server for the reverse proxy.
pub struct HttpServer {
    router: Router,
    store: ConfigStore,
}

impl HttpServer {
    /// Create a server reading its configuration from `store` per request.
    pub fn new(store: ConfigStore) -> Self {
        let state = AppState {
            forwarder: Arc::new(Forwarder::new(store.clone())),
        };
        let router = Self::build_router(state);
        Self { router, store }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/", get(root_handler).fallback(proxy_handler))
            .route("/{*path}", any(proxy_handler))
            .with_state(state)
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id_layer())
    }

    /// The assembled router, for driving the server without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    /// Serve on `listener` until `shutdown` fires, then drain in-flight
    /// requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Liveness and info payload.
async fn root_handler(State(state): State<AppState>) -> Json<Value> {
    let snapshot = state.forwarder.store().load();
    Json(info_payload(&snapshot))
}

fn info_payload(config: &ProxyConfig) -> Value {
    let mut routes: Vec<&str> = config
        .routes
        .iter()
        .filter(|(_, route)| route.enabled)
        .map(|(key, _)| key.as_str())
        .collect();
    routes.sort_unstable();

    json!({
        "message": "Prefix proxy is running.",
        "version": env!("CARGO_PKG_VERSION"),
        "base_path": config.server.base_path.as_str(),
        "routes": routes,
    })
}

/// Main proxy handler.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let route = route_label(&state.forwarder.store().load(), request.uri().path());

    let response = match state.forwarder.forward(request).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    };

    metrics::record_request(&method, response.status().as_u16(), &route, start);
    response
}

/// Metrics label for a request path: the route key when it names a
/// configured route, `none` otherwise.
fn route_label(config: &ProxyConfig, path: &str) -> String {
    let (key, _) = split_route_key(effective_path(path, &config.server.base_path));
    if config.routes.contains_key(key) {
        key.to_string()
    } else {
        "none".to_string()
    }
}
