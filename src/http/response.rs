//! Response handling and transformation.
//!
//! # Responsibilities
//! - Relay the upstream status and headers to the client
//! - Stream the upstream body without buffering
//! - Drop the framing headers the serving layer recomputes
//!
//! # Design Decisions
//! - Streaming responses avoid buffering entire body
//! - The upstream client decodes compressed bodies, so `content-encoding`
//!   and `content-length` no longer describe what is sent and are dropped
//! - Redirects are relayed as-is; the client never follows them

use axum::body::Body;
use axum::http::header::{
    HeaderMap, HeaderName, ACCEPT_ENCODING, CONNECTION, CONTENT_ENCODING, CONTENT_LENGTH,
    TRANSFER_ENCODING,
};
use axum::response::Response;

/// Upstream response headers never copied to the client.
pub const EXCLUDED_RESPONSE_HEADERS: [HeaderName; 4] =
    [CONTENT_ENCODING, CONTENT_LENGTH, TRANSFER_ENCODING, CONNECTION];

/// Request headers never sent upstream as received.
///
/// The body is re-framed when it is sent upstream, and the upstream client
/// advertises only the content encodings it can decode, since the response
/// reaches the client decoded and without `content-encoding`.
pub const UPSTREAM_EXCLUDED_REQUEST_HEADERS: [HeaderName; 4] =
    [CONTENT_LENGTH, TRANSFER_ENCODING, CONNECTION, ACCEPT_ENCODING];

/// Copy `headers`, skipping every name in `excluded`.
pub fn filter_headers(headers: &HeaderMap, excluded: &[HeaderName]) -> HeaderMap {
    let mut filtered = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        if !excluded.contains(name) {
            filtered.append(name.clone(), value.clone());
        }
    }
    filtered
}

/// Turn an upstream response into a client response with a streamed body.
pub fn relay(upstream: reqwest::Response) -> Response {
    let status = upstream.status();
    let headers = filter_headers(upstream.headers(), &EXCLUDED_RESPONSE_HEADERS);

    let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}
