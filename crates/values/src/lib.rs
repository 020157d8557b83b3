//! Typed value model shared by the option registry and the peering layer.
//!
//! Values are a closed variant set with structural type descriptors. The
//! [`bridge`] module converts the broker's generic self-describing
//! representation ([`serde_json::Value`]) into natively typed values.

pub mod bridge;
mod error;
mod types;
mod value;

pub use bridge::{coerce_candidate, from_broker};
pub use error::ValueError;
pub use types::TypeDesc;
pub use value::{Port, PortProto, TableKey, TableValue, Value};
