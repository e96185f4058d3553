use std::fmt;

use crate::handler::Signature;
use crate::router::PatternError;

/// Fatal outcome of a binding call. Nothing from the call is registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindError {
    /// The binding pattern (or a key derived from it) is malformed
    Pattern(PatternError),
    /// Single-method mode named a method the type does not publish
    MissingMethod {
        type_name: &'static str,
        method: String,
    },
    /// An explicitly named method does not have the handler shape
    SignatureMismatch { name: String, signature: Signature },
}

impl fmt::Display for BindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindError::Pattern(e) => write!(f, "{e}"),
            BindError::MissingMethod { type_name, method } => {
                write!(f, "invalid method name: {method} is not published by {type_name}")
            }
            BindError::SignatureMismatch { name, signature } => write!(
                f,
                "invalid route method: {} defined as \"{}\", but \"{}\" is required for object registry",
                name,
                signature,
                Signature::handler()
            ),
        }
    }
}

impl std::error::Error for BindError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BindError::Pattern(e) => Some(e),
            _ => None,
        }
    }
}

impl From<PatternError> for BindError {
    fn from(e: PatternError) -> Self {
        BindError::Pattern(e)
    }
}
