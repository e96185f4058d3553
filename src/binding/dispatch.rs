//! Dispatch functions for bound methods.
//!
//! Every route produced by an object binding carries a [`DispatchFn`] built
//! by [`dispatcher_for`]. On each request it borrows a [`PooledEntry`] of the
//! bound type from the server's [`PoolRegistry`] and runs, in order:
//!
//! 1. the init hook, if the type declares one
//! 2. the target method (skipped after an init fault or `req.exit()`)
//! 3. the shut hook, if the type declares one (always, also after a fault)
//!
//! Each phase is isolated with `catch_unwind`. A panic is logged, the
//! response becomes a `500`, and the first fault is returned. The entry goes
//! back to the pool in every case.

use std::any::Any;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error};

use super::registry::PoolRegistry;
use crate::handler::{
    DispatchFault, DispatchFn, HandlerFn, HookFn, MethodTable, Phase, ServiceObject,
};
use crate::pool::Pool;
use crate::server::{HandlerRequest, HandlerResponse};

/// A pooled handler instance plus the callables resolved for it.
pub struct PooledEntry<T> {
    instance: T,
    methods: HashMap<Arc<str>, HandlerFn<T>>,
    init: Option<HookFn<T>>,
    shut: Option<HookFn<T>>,
}

impl<T: ServiceObject> PooledEntry<T> {
    /// Clone `prototype` into a fresh entry with the hooks `table` declares.
    pub fn from_prototype(prototype: &T, table: &MethodTable<T>) -> Self {
        Self {
            instance: prototype.clone(),
            methods: HashMap::new(),
            init: table.init().cloned(),
            shut: table.shut().cloned(),
        }
    }

    /// Callable for `method`, cached on first use.
    ///
    /// Returns `None` if the table does not publish `method` with the
    /// handler shape.
    pub fn resolve(&mut self, table: &MethodTable<T>, method: &str) -> Option<HandlerFn<T>> {
        if let Some(call) = self.methods.get(method) {
            return Some(Arc::clone(call));
        }
        let descriptor = table.get(method).filter(|d| d.is_handler())?;
        let call = Arc::clone(descriptor.handler()?);
        self.methods.insert(Arc::from(method), Arc::clone(&call));
        Some(call)
    }

    #[must_use]
    pub fn instance(&self) -> &T {
        &self.instance
    }

    /// Number of methods resolved on this entry so far.
    #[must_use]
    pub fn cached_methods(&self) -> usize {
        self.methods.len()
    }
}

/// Build the dispatch function for `method` of a bound object.
///
/// Called once per route at bind time. The pool for `T` is looked up (or
/// created from `prototype`) on every call; all routes of the same type
/// share one pool, and the first binding's prototype seeds it.
pub fn dispatcher_for<T: ServiceObject>(
    registry: Arc<PoolRegistry>,
    prototype: Arc<T>,
    table: Arc<MethodTable<T>>,
    method: &str,
) -> DispatchFn {
    let method: Arc<str> = Arc::from(method);
    let handler_name = table.qualified_name(&method);

    Arc::new(move |req: &mut HandlerRequest| {
        let pool = registry.pool_for::<PooledEntry<T>, _>(table.type_name(), |idle_timeout| {
            let prototype = Arc::clone(&prototype);
            let table = Arc::clone(&table);
            Pool::new(idle_timeout, move || {
                PooledEntry::<T>::from_prototype(&prototype, &table)
            })
        });
        let Some(pool) = pool else {
            return Err(fail(
                req,
                DispatchFault {
                    phase: Phase::Init,
                    handler: handler_name.clone(),
                    message: "instance pool has an unexpected value type".to_string(),
                },
            ));
        };

        // The factory runs user `Clone` code.
        let mut entry = match catch_unwind(AssertUnwindSafe(|| pool.get())) {
            Ok(entry) => entry,
            Err(panic) => {
                let fault = DispatchFault {
                    phase: Phase::Init,
                    handler: handler_name.clone(),
                    message: panic_message(panic.as_ref()),
                };
                log_fault(req, &fault);
                return Err(fail(req, fault));
            }
        };

        let outcome = run_phases(&mut entry, &table, &method, &handler_name, req);
        pool.put(entry);
        outcome
    })
}

fn run_phases<T: ServiceObject>(
    entry: &mut PooledEntry<T>,
    table: &MethodTable<T>,
    method: &str,
    handler_name: &str,
    req: &mut HandlerRequest,
) -> Result<(), DispatchFault> {
    let mut fault = None;

    if let Some(init) = entry.init.clone() {
        let instance = &mut entry.instance;
        fault = guarded(Phase::Init, handler_name, req, |req| init(instance, req)).err();
    }

    if fault.is_none() && req.is_exited() {
        debug!(
            request_id = %req.request_id,
            handler_name = %handler_name,
            "Request exited in init hook, handler skipped"
        );
    } else if fault.is_none() {
        match entry.resolve(table, method) {
            Some(call) => {
                let instance = &mut entry.instance;
                fault = guarded(Phase::Handler, handler_name, req, |req| call(instance, req)).err();
            }
            None => {
                let unresolved = DispatchFault {
                    phase: Phase::Handler,
                    handler: handler_name.to_string(),
                    message: format!("method {method} is not a request handler"),
                };
                log_fault(req, &unresolved);
                fault = Some(unresolved);
            }
        }
    }

    if let Some(shut) = entry.shut.clone() {
        let instance = &mut entry.instance;
        if let Err(shut_fault) = guarded(Phase::Shut, handler_name, req, |req| shut(instance, req))
        {
            fault.get_or_insert(shut_fault);
        }
    }

    match fault {
        Some(fault) => Err(fail(req, fault)),
        None => Ok(()),
    }
}

/// Run one phase, turning a panic into a logged [`DispatchFault`].
fn guarded<F>(
    phase: Phase,
    handler_name: &str,
    req: &mut HandlerRequest,
    f: F,
) -> Result<(), DispatchFault>
where
    F: FnOnce(&mut HandlerRequest),
{
    match catch_unwind(AssertUnwindSafe(|| f(req))) {
        Ok(()) => Ok(()),
        Err(panic) => {
            let fault = DispatchFault {
                phase,
                handler: handler_name.to_string(),
                message: panic_message(panic.as_ref()),
            };
            log_fault(req, &fault);
            Err(fault)
        }
    }
}

fn log_fault(req: &HandlerRequest, fault: &DispatchFault) {
    error!(
        request_id = %req.request_id,
        handler_name = %fault.handler,
        phase = %fault.phase,
        message = %fault.message,
        "Dispatch phase failed"
    );
}

/// Replace the response with a server error and hand the fault back.
fn fail(req: &mut HandlerRequest, fault: DispatchFault) -> DispatchFault {
    req.response = HandlerResponse::error(500, &fault.to_string());
    fault
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
