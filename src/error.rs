//! Request-level error handling.
//!
//! Every failure on the request path ends up as a [`ProxyError`], which
//! renders as a status code and a JSON `{"error": ...}` body. Nothing on the
//! request path panics or retries.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::routing::RouteError;

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error(transparent)]
    Route(#[from] RouteError),

    #[error("Failed to read request body: {0}")]
    RequestBody(#[source] axum::Error),

    #[error("Invalid upstream proxy '{url}': {reason}")]
    InvalidProxy { url: String, reason: String },

    #[error("Failed to build upstream client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("Upstream request to '{url}' timed out")]
    UpstreamTimeout { url: String },

    #[error("Proxy failed to connect to the target server '{url}': {source}")]
    UpstreamUnreachable {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl ProxyError {
    /// Classify a failed upstream exchange.
    pub fn from_upstream(error: reqwest::Error, url: &str) -> Self {
        if error.is_builder() {
            // reqwest rejected the URL itself, e.g. `http://` with no host.
            ProxyError::Route(RouteError::InvalidTargetUrl {
                target: url.to_string(),
            })
        } else if error.is_timeout() {
            ProxyError::UpstreamTimeout {
                url: url.to_string(),
            }
        } else {
            ProxyError::UpstreamUnreachable {
                url: url.to_string(),
                source: error,
            }
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::Route(e) => e.status_code(),
            ProxyError::RequestBody(_) => StatusCode::BAD_REQUEST,
            ProxyError::InvalidProxy { .. } | ProxyError::Client(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ProxyError::UpstreamTimeout { .. } | ProxyError::UpstreamUnreachable { .. } => {
                StatusCode::BAD_GATEWAY
            }
        }
    }

    /// Message shown to the client. Proxy URLs may carry credentials and
    /// are only logged.
    fn client_message(&self) -> String {
        match self {
            ProxyError::InvalidProxy { .. } | ProxyError::Client(_) => {
                "Upstream proxy is misconfigured.".to_string()
            }
            ProxyError::UpstreamTimeout { .. } => {
                "Proxy timed out waiting for the target server.".to_string()
            }
            ProxyError::UpstreamUnreachable { .. } => {
                "Proxy failed to connect to the target server.".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(status = %status, error = %self, "Request failed");
        } else {
            tracing::warn!(status = %status, error = %self, "Request rejected");
        }
        (status, Json(json!({ "error": self.client_message() }))).into_response()
    }
}
