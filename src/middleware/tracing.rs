use std::time::Duration;

use tracing::{debug, info, warn};

use super::Middleware;
use crate::server::{HandlerRequest, HandlerResponse};

/// Logs one line when a request enters a bound route and one when it leaves.
pub struct TracingMiddleware;

impl Middleware for TracingMiddleware {
    fn before(&self, req: &HandlerRequest) -> Option<HandlerResponse> {
        debug!(
            request_id = %req.request_id,
            method = %req.method,
            path = %req.path,
            handler_name = %req.handler_name,
            "Request received"
        );
        None
    }

    fn after(&self, req: &HandlerRequest, res: &mut HandlerResponse, latency: Duration) {
        let latency_ms = latency.as_millis() as u64;
        if res.is_server_error() {
            warn!(
                request_id = %req.request_id,
                handler_name = %req.handler_name,
                status = res.status,
                latency_ms = latency_ms,
                "Request failed"
            );
        } else {
            info!(
                request_id = %req.request_id,
                handler_name = %req.handler_name,
                status = res.status,
                latency_ms = latency_ms,
                "Request complete"
            );
        }
    }
}
