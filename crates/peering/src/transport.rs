//! Narrow transport seam between the peer manager and the wire.
//!
//! The manager only ever asks a [`Transport`] to listen, begin a connection
//! attempt, or tear one down; everything the wire does comes back through a
//! [`TransportEvent`] channel. Tokens carry the connection epoch so the
//! manager can discard events from attempts that were since cancelled.

use std::net::IpAddr;

use async_trait::async_trait;

use crate::events::ErrorCode;

/// Identifies one connection attempt towards `addr:port`.
///
/// `epoch` is bumped by the manager on every explicit peer/unpeer for the
/// endpoint; an event stamped with an older epoch is stale and dropped,
/// which resolves the retry-vs-cancellation race in favor of cancellation.
/// Inbound sessions carry epoch `0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnToken {
    pub addr: IpAddr,
    pub port: u16,
    pub epoch: u64,
}

/// Transport-level occurrences, delivered to the manager's event pump.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// The transport handshake completed for an outbound attempt.
    ConnectOk { token: ConnToken },
    /// An outbound attempt failed before the transport handshake.
    ConnectFailed { token: ConnToken, reason: String },
    /// The application-level hello completed; the remote identity is known.
    HandshakeDone { token: ConnToken, node_id: String },
    /// An inbound session was accepted and completed its hello.
    InboundPeered {
        addr: IpAddr,
        port: u16,
        node_id: String,
    },
    /// An established session went away.
    ConnectionLost { token: ConnToken, reason: String },
    /// A fault with no owning session (e.g. an incompatible hello).
    Fault { code: ErrorCode, message: String },
}

/// The connect/listen/teardown primitive the peer manager drives.
///
/// All methods are non-blocking in spirit: they enqueue work and return;
/// outcomes arrive on the event channel handed out at construction.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Binds a listener and returns the bound port (useful for port `0`).
    async fn start_listening(&self, addr: IpAddr, port: u16) -> std::io::Result<u16>;

    /// Starts one outbound connection attempt for `token`.
    async fn begin_connect(&self, token: ConnToken);

    /// Tears down any session or in-flight attempt towards the token's
    /// endpoint. Idempotent.
    async fn close(&self, token: ConnToken);
}
