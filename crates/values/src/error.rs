//! Value-layer errors.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValueError {
    /// Conversion or assignment between incompatible types. Carries the
    /// rendered names of both sides for diagnostics.
    #[error("type clash: cannot treat '{found}' as '{expected}'")]
    TypeClash { found: String, expected: String },

    /// The value kind cannot be used as a table index.
    #[error("'{0}' cannot be used as a table index")]
    Unindexable(String),
}

impl ValueError {
    pub fn clash(found: impl Into<String>, expected: impl ToString) -> Self {
        Self::TypeClash {
            found: found.into(),
            expected: expected.to_string(),
        }
    }
}
