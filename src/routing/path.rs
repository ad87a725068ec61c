//! Path helpers used by the router.
//!
//! Slash handling is where target composition usually goes wrong, so each
//! step is a small pure function.

use crate::config::BasePath;

/// Strip the base path from a request path, yielding the effective path.
///
/// The raw path is treated as if it started with `/`. When `base_path` is set
/// and the path starts with it, the prefix and one following `/` are
/// removed. Otherwise only the leading `/` is removed: a path outside the
/// base path is still routed rather than rejected.
pub fn effective_path<'a>(raw_path: &'a str, base_path: &BasePath) -> &'a str {
    let relative = raw_path.strip_prefix('/').unwrap_or(raw_path);

    if !base_path.is_empty() {
        let base_relative = &base_path.as_str()[1..];
        if let Some(rest) = relative.strip_prefix(base_relative) {
            return rest.strip_prefix('/').unwrap_or(rest);
        }
    }

    relative
}

/// Split an effective path into the route key and the remainder after the
/// first `/`, if any.
pub fn split_route_key(effective: &str) -> (&str, Option<&str>) {
    match effective.split_once('/') {
        Some((key, rest)) => (key, Some(rest)),
        None => (effective, None),
    }
}

/// Join a configured target URL with a request subpath.
///
/// Trailing slashes of the target are insignificant and leading slashes of
/// the subpath are dropped, so exactly one `/` separates them. An empty
/// subpath yields the bare target.
pub fn join_target(target_url: &str, subpath: &str) -> String {
    let base = target_url.trim_end_matches('/');
    let subpath = subpath.trim_start_matches('/');

    if subpath.is_empty() {
        base.to_string()
    } else {
        format!("{}/{}", base, subpath)
    }
}
