//! # Handler Module
//!
//! Describes what a service object offers to the router:
//!
//! - **[`signature`]** - the structural gate deciding which methods are request handlers
//! - **[`catalog`]** - per-type [`MethodTable`]s, the [`ServiceObject`] trait and the
//!   scans used by the binder
//!
//! It also defines the type-erased [`DispatchFn`] installed into the route table
//! and the typed [`DispatchFault`] it returns when user code panics.

pub mod catalog;
pub mod signature;

use std::fmt;
use std::sync::Arc;

use crate::server::HandlerRequest;

pub use catalog::{
    is_reserved, scan_object, scan_rest, short_type_name, InitHook, MethodDescriptor,
    MethodFilter, MethodTable, Rejection, Scan, ServiceObject, Severity, ShutHook,
    RESERVED_METHODS,
};
pub use signature::{
    is_handler_signature, HandlerFn, HookFn, IntoMethod, MethodShape, ParamKind, Signature,
};

/// The function a route key resolves to.
pub type DispatchFn = Arc<dyn Fn(&mut HandlerRequest) -> Result<(), DispatchFault> + Send + Sync>;

/// Which call of a dispatch faulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Init,
    Handler,
    Shut,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::Init => "init",
            Phase::Handler => "handler",
            Phase::Shut => "shut",
        })
    }
}

/// A panic (or unresolvable method) contained by the dispatch wrapper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchFault {
    pub phase: Phase,
    pub handler: String,
    pub message: String,
}

impl fmt::Display for DispatchFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} phase of {} failed: {}",
            self.phase, self.handler, self.message
        )
    }
}

impl std::error::Error for DispatchFault {}
