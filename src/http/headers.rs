//! Outbound request header policy.
//!
//! # Responsibilities
//! - Copy inbound headers minus the configured drop set
//! - Remove `Host` so the client regenerates it for the new target
//! - Merge route custom headers under the overwrite policy
//! - Report which branch was taken for each custom header
//!
//! # Design Decisions
//! - Pure function over an already-loaded snapshot
//! - Header names compared case-insensitively (`HeaderName` is lower-case)
//! - The drop set applies to the inbound copy only; a custom header may
//!   deliberately re-add a dropped name

use std::collections::{BTreeMap, HashSet};

use axum::http::header::{HeaderMap, HeaderName, HeaderValue, HOST};

use crate::config::HeaderDropSet;

/// What happened to one custom header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderAction {
    /// Not sent by the client; added.
    Added,
    /// Sent by the client; replaced by the configured value.
    Overwritten,
    /// Sent by the client; client value kept, configured value discarded.
    Kept,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderDecision {
    pub name: HeaderName,
    pub action: HeaderAction,
}

/// Headers to send upstream, with the per-header decisions that built them.
#[derive(Debug, Clone)]
pub struct MergedHeaders {
    pub headers: HeaderMap,
    pub decisions: Vec<HeaderDecision>,
}

/// Build the outbound header set.
pub fn merge(
    inbound: &HeaderMap,
    drop_set: &HeaderDropSet,
    custom_headers: &BTreeMap<String, String>,
    overwrite: bool,
) -> MergedHeaders {
    let mut headers = HeaderMap::with_capacity(inbound.len() + custom_headers.len());
    for (name, value) in inbound {
        if !drop_set.contains(name.as_str()) {
            headers.append(name.clone(), value.clone());
        }
    }
    headers.remove(HOST);

    // Presence is judged against the client's headers, not earlier custom ones.
    let client_names: HashSet<HeaderName> = headers.keys().cloned().collect();

    let mut decisions = Vec::with_capacity(custom_headers.len());
    for (raw_name, raw_value) in custom_headers {
        let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(raw_name.as_bytes()),
            HeaderValue::from_str(raw_value),
        ) else {
            tracing::warn!(header = %raw_name, "Skipping invalid custom header");
            continue;
        };

        let action = if !client_names.contains(&name) {
            headers.insert(name.clone(), value);
            HeaderAction::Added
        } else if overwrite {
            headers.insert(name.clone(), value);
            HeaderAction::Overwritten
        } else {
            HeaderAction::Kept
        };

        decisions.push(HeaderDecision { name, action });
    }

    MergedHeaders { headers, decisions }
}
