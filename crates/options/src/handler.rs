//! Change handlers: the two callable shapes, signature validation, and the
//! priority-ranked storage record.

use std::fmt;

use vigil_values::{TypeDesc, Value};

use crate::error::OptionError;

type ValueHandler = Box<dyn Fn(&str, Value) -> Option<Value> + Send + Sync>;
type LocatedHandler = Box<dyn Fn(&str, Value, &str) -> Option<Value> + Send + Sync>;

/// A registered change-handler callable.
///
/// Handlers come in two shapes: `(name, candidate) -> new` and
/// `(name, candidate, origin_location) -> new`. Returning `None` signals
/// rejection, which aborts the whole change with no mutation.
pub enum HandlerFn {
    Value(ValueHandler),
    ValueWithLocation(LocatedHandler),
}

impl HandlerFn {
    pub fn value<F>(f: F) -> Self
    where
        F: Fn(&str, Value) -> Option<Value> + Send + Sync + 'static,
    {
        Self::Value(Box::new(f))
    }

    pub fn value_with_location<F>(f: F) -> Self
    where
        F: Fn(&str, Value, &str) -> Option<Value> + Send + Sync + 'static,
    {
        Self::ValueWithLocation(Box::new(f))
    }

    pub fn arity(&self) -> usize {
        match self {
            Self::Value(_) => 2,
            Self::ValueWithLocation(_) => 3,
        }
    }

    pub(crate) fn invoke(&self, name: &str, value: Value, location: &str) -> Option<Value> {
        match self {
            Self::Value(f) => f(name, value),
            Self::ValueWithLocation(f) => f(name, value, location),
        }
    }
}

impl fmt::Debug for HandlerFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerFn")
            .field("arity", &self.arity())
            .finish()
    }
}

/// The callable's declared parameter and return descriptors, as reported by
/// the embedding runtime. Validated once, at registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerSignature {
    pub params: Vec<TypeDesc>,
    pub ret: TypeDesc,
}

impl HandlerSignature {
    /// Signature of a 2-argument handler over `value_type`.
    pub fn value(value_type: TypeDesc) -> Self {
        Self {
            params: vec![TypeDesc::Str, value_type.clone()],
            ret: value_type,
        }
    }

    /// Signature of a 3-argument handler over `value_type`.
    pub fn value_with_location(value_type: TypeDesc) -> Self {
        Self {
            params: vec![TypeDesc::Str, value_type.clone(), TypeDesc::Str],
            ret: value_type,
        }
    }

    /// Checks the signature against an option's declared type and the
    /// callable's actual arity.
    pub(crate) fn validate(&self, declared: &TypeDesc, arity: usize) -> Result<(), OptionError> {
        if self.params.len() != arity {
            return Err(OptionError::bad_signature(format!(
                "declared {} parameters but the callable takes {arity}",
                self.params.len()
            )));
        }
        match self.params.as_slice() {
            [first, value] | [first, value, _] => {
                if *first != TypeDesc::Str {
                    return Err(OptionError::bad_signature(
                        "first parameter must be the option name (string)",
                    ));
                }
                if let [_, _, third] = self.params.as_slice()
                    && *third != TypeDesc::Str
                {
                    return Err(OptionError::bad_signature(
                        "third parameter must be the origin location (string)",
                    ));
                }
                if value != declared {
                    return Err(OptionError::bad_signature(format!(
                        "second parameter is '{value}' but the option is '{declared}'"
                    )));
                }
            }
            _ => {
                return Err(OptionError::bad_signature(format!(
                    "handlers take 2 or 3 parameters, not {}",
                    self.params.len()
                )));
            }
        }
        if self.ret != *declared {
            return Err(OptionError::bad_signature(format!(
                "return type is '{}' but the option is '{declared}'",
                self.ret
            )));
        }
        Ok(())
    }
}

/// Chain-order rank: negated priority first (so numerically higher
/// priorities run first), then the monotone registration sequence as the
/// tie-break.
pub(crate) type HandlerRank = (i64, u64);

#[derive(Debug)]
pub(crate) struct RegisteredHandler {
    pub(crate) rank: HandlerRank,
    pub(crate) func: HandlerFn,
}

/// Threads a candidate through the chain. `None` means some handler
/// rejected it. Zero handlers is the identity.
pub(crate) fn run_chain(
    handlers: &[RegisteredHandler],
    name: &str,
    mut value: Value,
    location: &str,
) -> Option<Value> {
    for handler in handlers {
        value = handler.func.invoke(name, value, location)?;
    }
    Some(value)
}
