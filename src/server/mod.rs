//! # Server Module
//!
//! The request context handed to handler methods and the [`Server`] that
//! ties the router and the instance pools together. Connection handling is
//! left to the embedding application: it builds a [`HandlerRequest`] per
//! incoming request and calls [`Server::handle`].

pub mod request;
pub mod response;
mod server;

pub use request::{HandlerRequest, HeaderVec, ParamVec, MAX_INLINE_HEADERS, MAX_INLINE_PARAMS};
pub use response::HandlerResponse;
pub use server::Server;
