//! Peer-to-peer session tracking for independent running instances.
//!
//! The [`PeerManager`] owns the local node identity, the listening endpoint,
//! and the table of known peers. Connection attempts are fire-and-forget:
//! outcomes surface as [`PeeringEvent`]s driven by a narrow [`Transport`]
//! seam, so the state machine is testable without real sockets. A tokio TCP
//! transport is provided in [`tcp`].

mod endpoint;
mod error;
pub mod events;
mod manager;
mod status;
pub mod tcp;
pub mod transport;

pub use endpoint::{EndpointInfo, NetworkInfo, PeerInfo};
pub use error::PeeringError;
pub use events::{ErrorCode, EventEmitter, PeeringEvent};
pub use manager::{PeerManager, PeerManagerConfig};
pub use status::PeerStatus;
pub use tcp::TcpTransport;
pub use transport::{ConnToken, Transport, TransportEvent};
