//! Option registry and change-handler pipeline.
//!
//! Every option is a named, typed, mutable configuration value. Proposed
//! changes are threaded through an ordered chain of registered handlers
//! before they take effect; any handler may transform or reject the
//! candidate. Committed values are published behind `Arc` and never mutated
//! in place.

mod error;
mod handler;
mod registry;

pub use error::OptionError;
pub use handler::{HandlerFn, HandlerSignature};
pub use registry::{Candidate, Registry};
