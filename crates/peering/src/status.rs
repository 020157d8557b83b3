//! Per-peer lifecycle states (stored as u8 for atomic operations).

use serde::{Deserialize, Serialize};

/// Peering state machine states.
///
/// Only `Peered` peers are eligible for data exchange: `Connected` means the
/// transport handshake finished, `Peered` that the application-level hello
/// completed as well. Transitions are one-directional except for the
/// `Disconnected ⇄ Reconnecting ⇄ Connecting` retry loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[strum(serialize_all = "lowercase")]
#[repr(u8)]
pub enum PeerStatus {
    Initializing = 0,
    Connecting = 1,
    Connected = 2,
    Peered = 3,
    Disconnected = 4,
    Reconnecting = 5,
}

impl PeerStatus {
    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Connecting,
            2 => Self::Connected,
            3 => Self::Peered,
            4 => Self::Disconnected,
            5 => Self::Reconnecting,
            _ => Self::Initializing,
        }
    }

    pub fn is_peered(&self) -> bool {
        matches!(self, Self::Peered)
    }

    /// True while a session is being established or is up.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Connecting | Self::Connected | Self::Peered)
    }

    /// Whether the state machine permits advancing to `next`. No state is
    /// ever skipped.
    pub fn can_advance_to(self, next: Self) -> bool {
        use PeerStatus::*;
        matches!(
            (self, next),
            (Initializing, Connecting)
                | (Connecting, Connected)
                | (Connected, Peered)
                | (Connecting | Connected | Peered, Disconnected)
                | (Disconnected, Reconnecting)
                | (Reconnecting, Connecting)
        )
    }
}
