//! Registry-layer errors.
//!
//! None of these are fatal: the caller decides how to react, and the stored
//! option value is guaranteed unchanged on every failure path.

use thiserror::Error;
use vigil_values::ValueError;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OptionError {
    #[error("unknown identifier '{id}'")]
    NotFound { id: String },

    #[error("identifier '{id}' was not declared as a mutable option")]
    NotAnOption { id: String },

    /// Unreachable under the declared lifecycle: an option always carries a
    /// value. Kept as an error rather than a panic so a broken embedding
    /// cannot take the process down.
    #[error("option '{id}' has no installed value")]
    Uninitialized { id: String },

    #[error(transparent)]
    TypeClash(#[from] ValueError),

    #[error("change handler rejected the new value for '{id}'")]
    HandlerRejected { id: String },

    #[error("bad change handler signature: {reason}")]
    BadHandlerSignature { reason: String },

    #[error("re-entrant value change on option '{id}'")]
    Reentrant { id: String },

    #[error("identifier '{id}' is already declared")]
    AlreadyDeclared { id: String },
}

impl OptionError {
    pub(crate) fn bad_signature(reason: impl Into<String>) -> Self {
        Self::BadHandlerSignature {
            reason: reason.into(),
        }
    }
}
