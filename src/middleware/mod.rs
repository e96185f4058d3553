//! # Middleware Module
//!
//! Middleware is attached per binding call (see
//! [`Binder::middleware`](crate::binding::Binder::middleware)) and carried
//! unchanged into every route the call registers. The router runs `before`
//! in order until one returns an early response, dispatches, then runs every
//! `after`.

mod core;
mod metrics;
mod tracing;

pub use self::core::Middleware;
pub use self::metrics::MetricsMiddleware;
pub use self::tracing::TracingMiddleware;
