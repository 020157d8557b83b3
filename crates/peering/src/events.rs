//! Peering events and the non-blocking broadcast emitter.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::endpoint::EndpointInfo;

/// Closed error taxonomy surfaced on `Error` notifications. Unrecognized
/// transport faults map to `TransportError`, never a library-specific code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorCode {
    Unspecified,
    PeerIncompatible,
    PeerInvalid,
    PeerUnavailable,
    PeerTimeout,
    MasterExists,
    NoSuchMaster,
    NoSuchKey,
    RequestTimeout,
    TypeClash,
    InvalidData,
    BackendFailure,
    StaleData,
    TransportError,
}

/// Asynchronously delivered notifications. Per-peer ordering follows the
/// causing transitions; there is no cross-peer ordering guarantee.
#[derive(Debug, Clone, PartialEq)]
pub enum PeeringEvent {
    /// A state-machine transition or a successful listen.
    Status {
        endpoint: EndpointInfo,
        message: String,
    },
    PeerAdded {
        endpoint: EndpointInfo,
        message: String,
    },
    PeerRemoved {
        endpoint: EndpointInfo,
        message: String,
    },
    /// An established session was lost without an explicit unpeer.
    PeerLost {
        endpoint: EndpointInfo,
        message: String,
    },
    /// An operation failure not represented as a direct call failure.
    Error { code: ErrorCode, message: String },
}

const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Non-blocking broadcast emitter. Slow subscribers drop events
/// independently of each other.
#[derive(Debug, Clone)]
pub struct EventEmitter {
    tx: broadcast::Sender<PeeringEvent>,
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

impl EventEmitter {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn emit(&self, event: PeeringEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PeeringEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn status(&self, endpoint: EndpointInfo, message: impl Into<String>) {
        self.emit(PeeringEvent::Status {
            endpoint,
            message: message.into(),
        });
    }

    pub fn peer_added(&self, endpoint: EndpointInfo, message: impl Into<String>) {
        self.emit(PeeringEvent::PeerAdded {
            endpoint,
            message: message.into(),
        });
    }

    pub fn peer_removed(&self, endpoint: EndpointInfo, message: impl Into<String>) {
        self.emit(PeeringEvent::PeerRemoved {
            endpoint,
            message: message.into(),
        });
    }

    pub fn peer_lost(&self, endpoint: EndpointInfo, message: impl Into<String>) {
        self.emit(PeeringEvent::PeerLost {
            endpoint,
            message: message.into(),
        });
    }

    pub fn error(&self, code: ErrorCode, message: impl Into<String>) {
        self.emit(PeeringEvent::Error {
            code,
            message: message.into(),
        });
    }
}
