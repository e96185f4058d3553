//! # Router Module
//!
//! The router owns the table that object bindings publish into. It is the
//! boundary between the binding subsystem and request serving:
//!
//! - Parsing route patterns of the form `[METHOD:]path[@domain]`
//! - Normalizing pattern keys into [`RouteKey`]s and storing [`HandlerItem`]s
//! - Exact-key lookup (host before `default` domain, verb before `ALL`)
//! - Running an item's middleware and dispatch function for a request
//!
//! ## Example
//!
//! ```rust
//! use objroute::router::RouteKey;
//!
//! let key = RouteKey::parse("get:/user/list/@Example.com").unwrap();
//! assert_eq!(key.to_string(), "GET:/user/list@example.com");
//! ```
//!
//! Pattern matching with path parameters is not part of this table; keys
//! are compared verbatim after normalization.

mod core;
mod pattern;
#[cfg(test)]
mod tests;

pub use self::core::{HandlerItem, HandlerKind, RouteInfo, RouteKey, Router};
pub use self::pattern::{
    has_builtin_placeholder, is_http_method, parse_pattern, serve_handler_key, ParsedPattern,
    PatternError, DEFAULT_DOMAIN, DEFAULT_METHOD, HTTP_METHODS,
};
