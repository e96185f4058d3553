//! Structural check deciding whether a method is routable.
//!
//! A method's shape is captured once, when it is put into a
//! [`MethodTable`](super::MethodTable), through the [`IntoMethod`] capability
//! trait. Only the exact handler shape (one request-context parameter, no
//! return value) produces a callable; every other shape is kept as a
//! [`Signature`] for diagnostics.

use std::any::{type_name, TypeId};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::server::HandlerRequest;

/// Type-erased handler callable bound to an instance of `T`.
pub type HandlerFn<T> = Arc<dyn Fn(&mut T, &mut HandlerRequest) + Send + Sync>;

/// Lifecycle hooks share the handler calling convention.
pub type HookFn<T> = HandlerFn<T>;

/// One parameter slot of a method (the receiver is not listed).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamKind {
    /// `&mut HandlerRequest`
    Request,
    /// Any other parameter, by type name
    Other(&'static str),
}

/// Recorded call shape of a method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub params: Vec<ParamKind>,
    /// Return type name, `None` for `()`
    pub returns: Option<&'static str>,
}

impl Signature {
    /// The one shape accepted as a request handler.
    #[must_use]
    pub fn handler() -> Self {
        Self {
            params: vec![ParamKind::Request],
            returns: None,
        }
    }

    fn returning<R: 'static>() -> Option<&'static str> {
        if TypeId::of::<R>() == TypeId::of::<()>() {
            None
        } else {
            Some(type_name::<R>())
        }
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fn(&mut self")?;
        for param in &self.params {
            match param {
                ParamKind::Request => write!(f, ", &mut HandlerRequest")?,
                ParamKind::Other(name) => write!(f, ", {name}")?,
            }
        }
        write!(f, ")")?;
        if let Some(ret) = self.returns {
            write!(f, " -> {ret}")?;
        }
        Ok(())
    }
}

/// Returns true iff `signature` is exactly `fn(&mut self, &mut HandlerRequest)`.
#[must_use]
pub fn is_handler_signature(signature: &Signature) -> bool {
    signature.params == [ParamKind::Request] && signature.returns.is_none()
}

/// A method as seen by the catalog: its shape, plus a callable when the shape
/// is the handler shape.
pub struct MethodShape<T> {
    pub signature: Signature,
    pub call: Option<HandlerFn<T>>,
}

/// Capability trait turning a method (or closure) into a [`MethodShape`].
///
/// `Marker` only disambiguates the arity impls and is always inferred.
pub trait IntoMethod<T, Marker>: Send + Sync + 'static {
    fn into_shape(self) -> MethodShape<T>;
}

#[doc(hidden)]
pub struct NoRequest<R>(PhantomData<fn() -> R>);
#[doc(hidden)]
pub struct WithRequest<R>(PhantomData<fn() -> R>);
#[doc(hidden)]
pub struct WithExtra<A, R>(PhantomData<fn(A) -> R>);

impl<T, F, R> IntoMethod<T, NoRequest<R>> for F
where
    T: 'static,
    R: 'static,
    F: Fn(&mut T) -> R + Send + Sync + 'static,
{
    fn into_shape(self) -> MethodShape<T> {
        MethodShape {
            signature: Signature {
                params: Vec::new(),
                returns: Signature::returning::<R>(),
            },
            call: None,
        }
    }
}

impl<T, F, R> IntoMethod<T, WithRequest<R>> for F
where
    T: 'static,
    R: 'static,
    F: Fn(&mut T, &mut HandlerRequest) -> R + Send + Sync + 'static,
{
    fn into_shape(self) -> MethodShape<T> {
        let signature = Signature {
            params: vec![ParamKind::Request],
            returns: Signature::returning::<R>(),
        };
        let method = self;
        let call: Option<HandlerFn<T>> = if is_handler_signature(&signature) {
            Some(Arc::new(move |obj: &mut T, req: &mut HandlerRequest| {
                method(obj, req);
            }))
        } else {
            None
        };
        MethodShape { signature, call }
    }
}

impl<T, F, A, R> IntoMethod<T, WithExtra<A, R>> for F
where
    T: 'static,
    A: 'static,
    R: 'static,
    F: Fn(&mut T, &mut HandlerRequest, A) -> R + Send + Sync + 'static,
{
    fn into_shape(self) -> MethodShape<T> {
        MethodShape {
            signature: Signature {
                params: vec![ParamKind::Request, ParamKind::Other(type_name::<A>())],
                returns: Signature::returning::<R>(),
            },
            call: None,
        }
    }
}
