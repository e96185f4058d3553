//! Route table: exact `METHOD:path@domain` keys to handler items.

use arc_swap::ArcSwap;
use http::Method;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::pattern::{parse_pattern, PatternError, DEFAULT_DOMAIN, DEFAULT_METHOD};
use crate::handler::DispatchFn;
use crate::middleware::Middleware;
use crate::server::{HandlerRequest, HandlerResponse};

/// Canonical identity of a registered endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RouteKey {
    /// Upper-case verb or `ALL`
    pub method: String,
    pub path: String,
    /// Lower-case domain or `default`
    pub domain: String,
}

impl RouteKey {
    #[must_use]
    pub fn new(method: &str, path: &str, domain: &str) -> Self {
        Self {
            method: method.to_ascii_uppercase(),
            path: path.to_string(),
            domain: domain.to_ascii_lowercase(),
        }
    }

    /// Parse a handler key (any pattern accepted by [`parse_pattern`]).
    pub fn parse(pattern: &str) -> Result<Self, PatternError> {
        let parsed = parse_pattern(pattern)?;
        Ok(Self {
            method: parsed.method,
            path: parsed.path,
            domain: parsed.domain,
        })
    }
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}@{}", self.method, self.path, self.domain)
    }
}

/// Kind of a route entry. Object bindings always install plain handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerKind {
    Handler,
}

/// Immutable entry owned by the router for one route key.
#[derive(Clone)]
pub struct HandlerItem {
    /// Qualified diagnostic name (`crate::module::Type::Method`)
    pub name: String,
    pub kind: HandlerKind,
    pub dispatch: DispatchFn,
    /// Middleware applied around `dispatch`, in order
    pub middleware: Vec<Arc<dyn Middleware>>,
    /// Free-form provenance tag supplied at bind time
    pub source: String,
}

impl fmt::Debug for HandlerItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerItem")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("middleware", &self.middleware.len())
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

/// Diagnostic view of one route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteInfo {
    pub key: RouteKey,
    pub name: String,
    pub source: String,
}

type RouteTable = HashMap<RouteKey, Arc<HandlerItem>>;

/// Exact-match route table.
///
/// Reads go through an [`ArcSwap`] snapshot and never lock; binding calls
/// serialize on a writer mutex and publish a new table.
pub struct Router {
    routes: ArcSwap<RouteTable>,
    writer: Mutex<()>,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    #[must_use]
    pub fn new() -> Self {
        Self {
            routes: ArcSwap::from_pointee(HashMap::new()),
            writer: Mutex::new(()),
        }
    }

    /// Register a batch of handler keys.
    ///
    /// Every key is parsed before anything is published, so a malformed key
    /// leaves the table untouched. An existing key is overwritten (last
    /// registration wins).
    pub fn bind_handler_by_map(
        &self,
        items: HashMap<String, HandlerItem>,
    ) -> Result<Vec<RouteKey>, PatternError> {
        let mut parsed = items
            .into_iter()
            .map(|(pattern, item)| RouteKey::parse(&pattern).map(|key| (key, Arc::new(item))))
            .collect::<Result<Vec<_>, _>>()?;
        parsed.sort_by(|a, b| a.0.cmp(&b.0));

        let _guard = self.writer.lock();
        let mut next = RouteTable::clone(&self.routes.load());
        let mut registered = Vec::with_capacity(parsed.len());
        for (key, item) in parsed {
            info!(
                route = %key,
                handler_name = %item.name,
                source = %item.source,
                "Route registered"
            );
            if let Some(old) = next.insert(key.clone(), item) {
                warn!(
                    route = %key,
                    replaced_handler = %old.name,
                    "Duplicate route key - previous handler replaced"
                );
            }
            registered.push(key);
        }
        info!(
            routes_count = next.len(),
            added = registered.len(),
            "Routing table updated"
        );
        self.routes.store(Arc::new(next));
        Ok(registered)
    }

    /// Find the item for a request.
    ///
    /// The host is tried before the `default` domain, the exact verb before
    /// `ALL`.
    #[must_use]
    pub fn lookup(&self, method: &Method, path: &str, host: &str) -> Option<Arc<HandlerItem>> {
        let path = normalize_path(path);
        let host = host.split(':').next().unwrap_or("").to_ascii_lowercase();
        let routes = self.routes.load();

        let mut domains = Vec::with_capacity(2);
        if !host.is_empty() && host != DEFAULT_DOMAIN {
            domains.push(host.as_str());
        }
        domains.push(DEFAULT_DOMAIN);

        for domain in domains {
            for verb in [method.as_str(), DEFAULT_METHOD] {
                let key = RouteKey::new(verb, path, domain);
                if let Some(item) = routes.get(&key) {
                    return Some(Arc::clone(item));
                }
            }
        }
        None
    }

    /// Serve a request: run middleware and the item's dispatch function.
    ///
    /// Returns `None` if no route matches. Dispatch faults have already been
    /// turned into a 500 response by the dispatch function.
    pub fn handle(&self, req: &mut HandlerRequest) -> Option<HandlerResponse> {
        let Some(item) = self.lookup(&req.method, &req.path, &req.host) else {
            debug!(
                request_id = %req.request_id,
                method = %req.method,
                path = %req.path,
                "No route matched"
            );
            return None;
        };
        req.handler_name.clone_from(&item.name);

        let mut early = None;
        for mw in &item.middleware {
            early = mw.before(req);
            if early.is_some() {
                debug!(
                    request_id = %req.request_id,
                    middleware_name = std::any::type_name_of_val(mw.as_ref()),
                    "Middleware returned early response"
                );
                break;
            }
        }

        let (mut resp, latency) = match early {
            Some(resp) => (resp, Duration::ZERO),
            None => {
                let start = Instant::now();
                if let Err(fault) = (item.dispatch)(req) {
                    debug!(
                        request_id = %req.request_id,
                        handler_name = %item.name,
                        fault = %fault,
                        "Dispatch completed with fault"
                    );
                }
                (std::mem::take(&mut req.response), start.elapsed())
            }
        };

        for mw in &item.middleware {
            mw.after(req, &mut resp, latency);
        }
        Some(resp)
    }

    /// Sorted snapshot of all routes.
    #[must_use]
    pub fn routes(&self) -> Vec<RouteInfo> {
        let mut routes: Vec<RouteInfo> = self
            .routes
            .load()
            .iter()
            .map(|(key, item)| RouteInfo {
                key: key.clone(),
                name: item.name.clone(),
                source: item.source.clone(),
            })
            .collect();
        routes.sort_by(|a, b| a.key.cmp(&b.key));
        routes
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.load().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.load().is_empty()
    }
}

fn normalize_path(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/"
    } else {
        trimmed
    }
}
