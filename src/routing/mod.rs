//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request path (+ query)
//!     → path.rs (strip base path, split route key)
//!     → router.rs (route lookup in the request's snapshot)
//!     → universal: remainder is the literal target URL
//!       standard:  target_url joined with the subpath
//!     → Return: Resolution or RouteError
//! ```
//!
//! # Design Decisions
//! - Route key is the first path segment, matched exactly (case-sensitive)
//! - No regex, no priorities: one hash lookup per request
//! - Deterministic: same input and snapshot always give the same result

pub mod path;
pub mod router;

pub use router::{resolve, Resolution, RouteError, RouteMode};
