use std::time::Duration;

use crate::server::{HandlerRequest, HandlerResponse};

pub trait Middleware: Send + Sync {
    /// Return `Some` to answer the request without dispatching it.
    fn before(&self, _req: &HandlerRequest) -> Option<HandlerResponse> {
        None
    }
    fn after(&self, _req: &HandlerRequest, _res: &mut HandlerResponse, _latency: Duration) {}
}
