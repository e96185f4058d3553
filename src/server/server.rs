use parking_lot::Mutex;
use std::sync::Arc;
use tracing::warn;

use super::request::HandlerRequest;
use super::response::HandlerResponse;
use crate::binding::{sweep_interval, BindError, BindReport, Binder, PoolRegistry, Sweeper};
use crate::config::ServerConfig;
use crate::handler::ServiceObject;
use crate::router::Router;

/// Owns the route table and the instance pools of every bound type.
///
/// A background thread evicts idle pooled instances until
/// [`shutdown`](Self::shutdown) or drop.
///
/// ```rust
/// use objroute::handler::{MethodTable, ServiceObject};
/// use objroute::server::{HandlerRequest, Server};
/// use http::Method;
///
/// #[derive(Clone, Default)]
/// struct Hello;
///
/// impl Hello {
///     fn world(&mut self, req: &mut HandlerRequest) {
///         req.write_json(200, serde_json::json!("hello"));
///     }
/// }
///
/// impl ServiceObject for Hello {
///     fn methods(table: &mut MethodTable<Self>) {
///         table.method("World", Self::world);
///     }
/// }
///
/// let server = Server::new();
/// server.bind_object("/hello", Hello, None).unwrap();
///
/// let mut req = HandlerRequest::new(Method::GET, "/hello/world");
/// assert_eq!(server.handle(&mut req).status, 200);
/// ```
pub struct Server {
    config: ServerConfig,
    router: Router,
    pools: Arc<PoolRegistry>,
    sweeper: Mutex<Option<Sweeper>>,
}

impl Default for Server {
    fn default() -> Self {
        Self::new()
    }
}

impl Server {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(ServerConfig::default())
    }

    #[must_use]
    pub fn with_config(config: ServerConfig) -> Self {
        let pools = Arc::new(PoolRegistry::new(config.pool_idle_timeout()));
        let sweeper = match pools.spawn_sweeper(sweep_interval(config.pool_idle_timeout())) {
            Ok(sweeper) => Some(sweeper),
            Err(e) => {
                warn!(error = %e, "Pool sweeper not started, idle instances expire on access only");
                None
            }
        };
        Self {
            config,
            router: Router::new(),
            pools,
            sweeper: Mutex::new(sweeper),
        }
    }

    /// Registration front end; set middleware and a source tag on it before
    /// binding.
    #[must_use]
    pub fn binder(&self) -> Binder<'_> {
        Binder::new(&self.router, &self.pools, self.config.uri_type)
    }

    /// See [`Binder::bind_object`].
    pub fn bind_object<T: ServiceObject>(
        &self,
        pattern: &str,
        object: T,
        methods: Option<&str>,
    ) -> Result<BindReport, BindError> {
        self.binder().bind_object(pattern, object, methods)
    }

    /// See [`Binder::bind_object_method`].
    pub fn bind_object_method<T: ServiceObject>(
        &self,
        pattern: &str,
        object: T,
        method: &str,
    ) -> Result<BindReport, BindError> {
        self.binder().bind_object_method(pattern, object, method)
    }

    /// See [`Binder::bind_object_rest`].
    pub fn bind_object_rest<T: ServiceObject>(
        &self,
        pattern: &str,
        object: T,
    ) -> Result<BindReport, BindError> {
        self.binder().bind_object_rest(pattern, object)
    }

    /// Serve one request; unmatched requests get a `404`.
    pub fn handle(&self, req: &mut HandlerRequest) -> HandlerResponse {
        self.router
            .handle(req)
            .unwrap_or_else(|| HandlerResponse::error(404, "Not Found"))
    }

    /// Stop the sweeper and close every instance pool.
    pub fn shutdown(&self) {
        if let Some(mut sweeper) = self.sweeper.lock().take() {
            sweeper.stop();
        }
        self.pools.close_all();
    }

    /// True while the idle sweeper thread is alive.
    #[must_use]
    pub fn is_sweeping(&self) -> bool {
        self.sweeper.lock().as_ref().is_some_and(Sweeper::is_running)
    }

    #[must_use]
    pub fn router(&self) -> &Router {
        &self.router
    }

    #[must_use]
    pub fn pools(&self) -> &Arc<PoolRegistry> {
        &self.pools
    }

    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}
