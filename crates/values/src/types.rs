//! Structural type descriptors for the closed value-kind set.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Type descriptor for every value kind the runtime supports.
///
/// Structural equality (`==`) is the compatibility check used both at
/// handler registration and on every value change. `Any` only ever appears
/// as the key/element descriptor of an empty container literal whose
/// element type could not be inferred; it is never a declared option type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeDesc {
    Bool,
    Int,
    Count,
    Double,
    Str,
    Addr,
    Port,
    Interval,
    Table {
        key: Box<TypeDesc>,
        elem: Box<TypeDesc>,
    },
    Any,
}

impl TypeDesc {
    /// Convenience constructor for keyed-container descriptors.
    pub fn table_of(key: TypeDesc, elem: TypeDesc) -> Self {
        Self::Table {
            key: Box::new(key),
            elem: Box::new(elem),
        }
    }

    pub fn is_table(&self) -> bool {
        matches!(self, Self::Table { .. })
    }

    /// True if the descriptor is fully concrete (no `Any` anywhere).
    pub fn is_concrete(&self) -> bool {
        match self {
            Self::Any => false,
            Self::Table { key, elem } => key.is_concrete() && elem.is_concrete(),
            _ => true,
        }
    }

    /// True if the kind can index a table.
    pub fn is_indexable(&self) -> bool {
        matches!(
            self,
            Self::Bool | Self::Int | Self::Count | Self::Str | Self::Addr | Self::Port
        )
    }
}

impl fmt::Display for TypeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => write!(f, "bool"),
            Self::Int => write!(f, "int"),
            Self::Count => write!(f, "count"),
            Self::Double => write!(f, "double"),
            Self::Str => write!(f, "string"),
            Self::Addr => write!(f, "addr"),
            Self::Port => write!(f, "port"),
            Self::Interval => write!(f, "interval"),
            Self::Table { key, elem } => write!(f, "table[{key}] of {elem}"),
            Self::Any => write!(f, "any"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names() {
        assert_eq!(TypeDesc::Str.to_string(), "string");
        assert_eq!(
            TypeDesc::table_of(TypeDesc::Str, TypeDesc::Int).to_string(),
            "table[string] of int"
        );
    }

    #[test]
    fn test_structural_equality() {
        let a = TypeDesc::table_of(TypeDesc::Str, TypeDesc::Count);
        let b = TypeDesc::table_of(TypeDesc::Str, TypeDesc::Count);
        let c = TypeDesc::table_of(TypeDesc::Str, TypeDesc::Int);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_concreteness() {
        assert!(TypeDesc::Int.is_concrete());
        assert!(!TypeDesc::Any.is_concrete());
        assert!(!TypeDesc::table_of(TypeDesc::Any, TypeDesc::Any).is_concrete());
        assert!(TypeDesc::table_of(TypeDesc::Str, TypeDesc::Int).is_concrete());
    }

    #[test]
    fn test_indexable_kinds() {
        assert!(TypeDesc::Port.is_indexable());
        assert!(!TypeDesc::Double.is_indexable());
        assert!(!TypeDesc::table_of(TypeDesc::Str, TypeDesc::Int).is_indexable());
    }
}
