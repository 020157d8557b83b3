//! Owned runtime values mirroring the descriptor set.

use std::collections::BTreeMap;
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ValueError;
use crate::types::TypeDesc;

/// Transport protocol of a [`Port`]. Peering only accepts stream ports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PortProto {
    Tcp,
    Udp,
    Icmp,
    Unknown,
}

impl fmt::Display for PortProto {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp => write!(f, "tcp"),
            Self::Udp => write!(f, "udp"),
            Self::Icmp => write!(f, "icmp"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// A port number tagged with its transport protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Port {
    pub number: u16,
    pub proto: PortProto,
}

impl Port {
    pub fn tcp(number: u16) -> Self {
        Self {
            number,
            proto: PortProto::Tcp,
        }
    }

    pub fn udp(number: u16) -> Self {
        Self {
            number,
            proto: PortProto::Udp,
        }
    }

    pub fn is_tcp(&self) -> bool {
        self.proto == PortProto::Tcp
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.number, self.proto)
    }
}

impl FromStr for Port {
    type Err = ValueError;

    /// Parses the rendered `number/proto` form, e.g. `80/tcp`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let clash = || ValueError::clash(s, TypeDesc::Port);
        let (number, proto) = s.split_once('/').ok_or_else(clash)?;
        let number: u16 = number.parse().map_err(|_| clash())?;
        let proto = match proto {
            "tcp" => PortProto::Tcp,
            "udp" => PortProto::Udp,
            "icmp" => PortProto::Icmp,
            "unknown" => PortProto::Unknown,
            _ => return Err(clash()),
        };
        Ok(Self { number, proto })
    }
}

/// Value kinds that may index a table. A strict subset of [`Value`] so that
/// table entries get a total order and hashability for free.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TableKey {
    Bool(bool),
    Int(i64),
    Count(u64),
    Str(String),
    Addr(IpAddr),
    Port(Port),
}

impl TableKey {
    pub fn type_desc(&self) -> TypeDesc {
        match self {
            Self::Bool(_) => TypeDesc::Bool,
            Self::Int(_) => TypeDesc::Int,
            Self::Count(_) => TypeDesc::Count,
            Self::Str(_) => TypeDesc::Str,
            Self::Addr(_) => TypeDesc::Addr,
            Self::Port(_) => TypeDesc::Port,
        }
    }

    /// Restricts a value to the indexable subset.
    pub fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Bool(v) => Ok(Self::Bool(v)),
            Value::Int(v) => Ok(Self::Int(v)),
            Value::Count(v) => Ok(Self::Count(v)),
            Value::Str(v) => Ok(Self::Str(v)),
            Value::Addr(v) => Ok(Self::Addr(v)),
            Value::Port(v) => Ok(Self::Port(v)),
            other => Err(ValueError::Unindexable(other.type_desc().to_string())),
        }
    }
}

/// A keyed container with declared key and element descriptors.
///
/// The descriptors are part of the value so an empty table still carries a
/// precise type. Entries are kept in a `BTreeMap` for deterministic
/// iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableValue {
    pub key: TypeDesc,
    pub elem: TypeDesc,
    pub entries: BTreeMap<TableKey, Value>,
}

impl TableValue {
    pub fn empty(key: TypeDesc, elem: TypeDesc) -> Self {
        Self {
            key,
            elem,
            entries: BTreeMap::new(),
        }
    }

    /// An empty container literal whose element types could not be inferred.
    pub fn unspecified() -> Self {
        Self::empty(TypeDesc::Any, TypeDesc::Any)
    }

    /// True for an empty container with unspecified key/element types, the
    /// one shape that may be promoted to a declared table type.
    pub fn is_unspecified(&self) -> bool {
        self.entries.is_empty() && self.key == TypeDesc::Any && self.elem == TypeDesc::Any
    }

    /// Inserts an entry after checking it against the declared descriptors.
    pub fn try_insert(&mut self, key: TableKey, value: Value) -> Result<(), ValueError> {
        if key.type_desc() != self.key {
            return Err(ValueError::clash(key.type_desc().to_string(), &self.key));
        }
        if value.type_desc() != self.elem {
            return Err(ValueError::clash(value.type_desc().to_string(), &self.elem));
        }
        self.entries.insert(key, value);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// An owned, natively typed runtime value.
///
/// Replaced wholesale on commit, never mutated in place once published.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Count(u64),
    Double(f64),
    Str(String),
    Addr(IpAddr),
    Port(Port),
    Interval(Duration),
    Table(TableValue),
}

impl Value {
    pub fn type_desc(&self) -> TypeDesc {
        match self {
            Self::Bool(_) => TypeDesc::Bool,
            Self::Int(_) => TypeDesc::Int,
            Self::Count(_) => TypeDesc::Count,
            Self::Double(_) => TypeDesc::Double,
            Self::Str(_) => TypeDesc::Str,
            Self::Addr(_) => TypeDesc::Addr,
            Self::Port(_) => TypeDesc::Port,
            Self::Interval(_) => TypeDesc::Interval,
            Self::Table(t) => TypeDesc::table_of(t.key.clone(), t.elem.clone()),
        }
    }
}

impl From<TableKey> for Value {
    fn from(key: TableKey) -> Self {
        match key {
            TableKey::Bool(v) => Self::Bool(v),
            TableKey::Int(v) => Self::Int(v),
            TableKey::Count(v) => Self::Count(v),
            TableKey::Str(v) => Self::Str(v),
            TableKey::Addr(v) => Self::Addr(v),
            TableKey::Port(v) => Self::Port(v),
        }
    }
}
