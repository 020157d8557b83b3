//! Bridge from the broker's generic self-describing representation.
//!
//! Payloads arriving from another node or subsystem are carried as
//! [`serde_json::Value`] and converted against the declared target
//! descriptor. Purely local assignments never pass through here; they use
//! [`coerce_candidate`] instead.

use std::net::IpAddr;
use std::time::Duration;

use serde_json::Value as Broker;

use crate::error::ValueError;
use crate::types::TypeDesc;
use crate::value::{Port, TableKey, TableValue, Value};

/// Rendered kind name of a broker payload, used in clash diagnostics.
fn broker_kind(foreign: &Broker) -> &'static str {
    match foreign {
        Broker::Null => "null",
        Broker::Bool(_) => "bool",
        Broker::Number(_) => "number",
        Broker::String(_) => "string",
        Broker::Array(_) => "array",
        Broker::Object(_) => "object",
    }
}

/// Converts a broker payload into a natively typed value matching `target`.
///
/// Fails with [`ValueError::TypeClash`] naming both the foreign kind and the
/// target descriptor.
pub fn from_broker(foreign: &Broker, target: &TypeDesc) -> Result<Value, ValueError> {
    let clash = || ValueError::clash(broker_kind(foreign), target);

    match target {
        TypeDesc::Bool => foreign.as_bool().map(Value::Bool).ok_or_else(clash),
        TypeDesc::Int => foreign.as_i64().map(Value::Int).ok_or_else(clash),
        TypeDesc::Count => foreign.as_u64().map(Value::Count).ok_or_else(clash),
        TypeDesc::Double => foreign.as_f64().map(Value::Double).ok_or_else(clash),
        TypeDesc::Str => foreign
            .as_str()
            .map(|s| Value::Str(s.to_owned()))
            .ok_or_else(clash),
        TypeDesc::Addr => foreign
            .as_str()
            .and_then(|s| s.parse::<IpAddr>().ok())
            .map(Value::Addr)
            .ok_or_else(clash),
        TypeDesc::Port => foreign
            .as_str()
            .and_then(|s| s.parse::<Port>().ok())
            .map(Value::Port)
            .ok_or_else(clash),
        TypeDesc::Interval => foreign
            .as_f64()
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
            .map(Value::Interval)
            .ok_or_else(clash),
        TypeDesc::Table { key, elem } => {
            let object = foreign.as_object().ok_or_else(clash)?;
            let mut table = TableValue::empty((**key).clone(), (**elem).clone());
            for (raw_key, raw_elem) in object {
                let key = table_key_from_str(raw_key, &table.key)?;
                let elem = from_broker(raw_elem, &table.elem)?;
                table.try_insert(key, elem)?;
            }
            Ok(Value::Table(table))
        }
        TypeDesc::Any => Err(clash()),
    }
}

/// Parses a broker object key (always a string on the wire) against the
/// table's declared key descriptor.
fn table_key_from_str(raw: &str, key: &TypeDesc) -> Result<TableKey, ValueError> {
    let clash = || ValueError::clash(raw, key);
    match key {
        TypeDesc::Bool => match raw {
            "true" => Ok(TableKey::Bool(true)),
            "false" => Ok(TableKey::Bool(false)),
            _ => Err(clash()),
        },
        TypeDesc::Int => raw.parse().map(TableKey::Int).map_err(|_| clash()),
        TypeDesc::Count => raw.parse().map(TableKey::Count).map_err(|_| clash()),
        TypeDesc::Str => Ok(TableKey::Str(raw.to_owned())),
        TypeDesc::Addr => raw.parse().map(TableKey::Addr).map_err(|_| clash()),
        TypeDesc::Port => raw.parse().map(TableKey::Port),
        other => Err(ValueError::Unindexable(other.to_string())),
    }
}

/// Checks a natively typed candidate against a declared descriptor.
///
/// Exact structural match passes through untouched. The one permitted
/// mismatch is an empty container literal with unspecified element types
/// against a declared table type, which is promoted to an empty table of
/// the declared key/element descriptors. Anything else is a clash.
pub fn coerce_candidate(candidate: Value, declared: &TypeDesc) -> Result<Value, ValueError> {
    let found = candidate.type_desc();
    if found == *declared {
        return Ok(candidate);
    }

    if let (Value::Table(table), TypeDesc::Table { key, elem }) = (&candidate, declared)
        && table.is_unspecified()
    {
        return Ok(Value::Table(TableValue::empty(
            (**key).clone(),
            (**elem).clone(),
        )));
    }

    Err(ValueError::clash(found.to_string(), declared))
}
