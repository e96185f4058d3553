//! # Binding Module
//!
//! Turns service objects into routes. A binding call
//!
//! 1. parses the pattern (a malformed pattern aborts the call),
//! 2. selects methods from the type's [`MethodTable`] by binding mode,
//! 3. builds one route key per method (plus the `Index` alias),
//! 4. publishes all keys to the [`Router`] in one batch, each route
//!    dispatching through a pooled [`dispatcher_for`] function.
//!
//! ## Binding modes
//!
//! | Call | Methods | Key |
//! |---|---|---|
//! | [`Binder::bind_object`] | every handler method (optionally filtered) | pattern + `/method-uri` |
//! | [`Binder::bind_object_method`] | the one named method | pattern as given |
//! | [`Binder::bind_object_rest`] | methods named after an HTTP verb | `VERB:pattern` |
//!
//! `{.struct}` and `{.method}` placeholders are substituted in every mode.

mod dispatch;
mod error;
pub mod keys;
mod registry;

pub use dispatch::{dispatcher_for, PooledEntry};
pub use error::BindError;
pub use registry::{sweep_interval, PoolRegistry, Sweeper};

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info};

use crate::config::UriType;
use crate::handler::{
    scan_object, scan_rest, MethodFilter, MethodTable, Rejection, ServiceObject,
};
use crate::middleware::Middleware;
use crate::router::{
    has_builtin_placeholder, parse_pattern, serve_handler_key, HandlerItem, HandlerKind,
    ParsedPattern, RouteKey, Router, DEFAULT_METHOD,
};
use self::keys::{index_alias, merge_builtin_names};

/// Method name that also answers on the bare pattern path.
const INDEX_METHOD: &str = "Index";

/// What a successful binding call did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindReport {
    /// Route keys published, sorted
    pub registered: Vec<RouteKey>,
    /// Methods skipped by the scan
    pub rejected: Vec<Rejection>,
}

/// Registration front end over a router and a pool registry.
///
/// Middleware and the source tag set on a binder are copied into every
/// route its calls register.
pub struct Binder<'a> {
    router: &'a Router,
    registry: &'a Arc<PoolRegistry>,
    uri_type: UriType,
    middleware: Vec<Arc<dyn Middleware>>,
    source: String,
}

impl<'a> Binder<'a> {
    #[must_use]
    pub fn new(router: &'a Router, registry: &'a Arc<PoolRegistry>, uri_type: UriType) -> Self {
        Self {
            router,
            registry,
            uri_type,
            middleware: Vec::new(),
            source: String::new(),
        }
    }

    /// Append a middleware to the routes this binder registers.
    #[must_use]
    pub fn middleware(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.middleware.push(middleware);
        self
    }

    /// Provenance tag shown in route dumps and logs.
    #[must_use]
    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Bind every handler method of `object`.
    ///
    /// `methods` is an optional comma-separated, case-sensitive list
    /// restricting which methods are bound. A listed method without the
    /// handler shape is logged at `error` and skipped; during an unrestricted
    /// scan such methods are skipped at `debug`.
    pub fn bind_object<T: ServiceObject>(
        &self,
        pattern: &str,
        object: T,
        methods: Option<&str>,
    ) -> Result<BindReport, BindError> {
        let parsed = self.parse(pattern)?;
        let base = if parsed.method == DEFAULT_METHOD {
            serve_handler_key("", &parsed.path, &parsed.domain)
        } else {
            pattern.trim().to_string()
        };
        let with_alias = !has_builtin_placeholder(pattern);

        let filter = methods.and_then(MethodFilter::parse);
        let table = Arc::new(MethodTable::<T>::for_type());
        let prototype = Arc::new(object);
        let scan = scan_object(&table, filter.as_ref());

        let mut items = HashMap::new();
        for descriptor in &scan.selected {
            let key =
                merge_builtin_names(&base, T::type_name(), descriptor.name(), true, self.uri_type);
            if with_alias && descriptor.name().eq_ignore_ascii_case(INDEX_METHOD) {
                if let Some(alias) = index_alias(&key) {
                    items.insert(alias, self.item(&table, &prototype, descriptor.name()));
                }
            }
            items.insert(key, self.item(&table, &prototype, descriptor.name()));
        }
        self.publish::<T>(pattern, items, scan.rejected)
    }

    /// Bind exactly one method. A missing or non-handler method is fatal.
    pub fn bind_object_method<T: ServiceObject>(
        &self,
        pattern: &str,
        object: T,
        method: &str,
    ) -> Result<BindReport, BindError> {
        self.parse(pattern)?;
        let method = method.trim();
        let table = Arc::new(MethodTable::<T>::for_type());

        let Some(descriptor) = table.get(method) else {
            return Err(self.fatal(
                pattern,
                BindError::MissingMethod {
                    type_name: table.type_name(),
                    method: method.to_string(),
                },
            ));
        };
        if !descriptor.is_handler() {
            return Err(self.fatal(
                pattern,
                BindError::SignatureMismatch {
                    name: table.qualified_name(method),
                    signature: descriptor.signature().clone(),
                },
            ));
        }

        let prototype = Arc::new(object);
        let key = merge_builtin_names(pattern.trim(), T::type_name(), method, false, self.uri_type);
        let mut items = HashMap::new();
        items.insert(key, self.item(&table, &prototype, method));
        self.publish::<T>(pattern, items, Vec::new())
    }

    /// Bind the methods named after HTTP verbs (`Get`, `Post`, ...), keyed by
    /// that verb on the pattern path. Other methods are ignored.
    pub fn bind_object_rest<T: ServiceObject>(
        &self,
        pattern: &str,
        object: T,
    ) -> Result<BindReport, BindError> {
        let parsed = self.parse(pattern)?;
        let table = Arc::new(MethodTable::<T>::for_type());
        let prototype = Arc::new(object);
        let scan = scan_rest(&table);

        let mut items = HashMap::new();
        for descriptor in &scan.selected {
            let verb = descriptor.name().to_ascii_uppercase();
            let key = merge_builtin_names(
                &serve_handler_key(&verb, &parsed.path, &parsed.domain),
                T::type_name(),
                descriptor.name(),
                false,
                self.uri_type,
            );
            items.insert(key, self.item(&table, &prototype, descriptor.name()));
        }
        self.publish::<T>(pattern, items, scan.rejected)
    }

    fn parse(&self, pattern: &str) -> Result<ParsedPattern, BindError> {
        parse_pattern(pattern).map_err(|e| self.fatal(pattern, BindError::Pattern(e)))
    }

    fn item<T: ServiceObject>(
        &self,
        table: &Arc<MethodTable<T>>,
        prototype: &Arc<T>,
        method: &str,
    ) -> HandlerItem {
        HandlerItem {
            name: table.qualified_name(method),
            kind: HandlerKind::Handler,
            dispatch: dispatcher_for(
                Arc::clone(self.registry),
                Arc::clone(prototype),
                Arc::clone(table),
                method,
            ),
            middleware: self.middleware.clone(),
            source: self.source.clone(),
        }
    }

    fn publish<T: ServiceObject>(
        &self,
        pattern: &str,
        items: HashMap<String, HandlerItem>,
        rejected: Vec<Rejection>,
    ) -> Result<BindReport, BindError> {
        let registered = self
            .router
            .bind_handler_by_map(items)
            .map_err(|e| self.fatal(pattern, BindError::Pattern(e)))?;
        info!(
            type_name = T::type_name(),
            pattern = pattern,
            source = %self.source,
            registered = registered.len(),
            rejected = rejected.len(),
            "Object bound"
        );
        Ok(BindReport {
            registered,
            rejected,
        })
    }

    /// Log a binding-aborting error and hand it back.
    fn fatal(&self, pattern: &str, err: BindError) -> BindError {
        error!(
            fatal = true,
            pattern = pattern,
            source = %self.source,
            error = %err,
            "Binding aborted"
        );
        err
    }
}
