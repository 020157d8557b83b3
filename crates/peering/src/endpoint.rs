//! Endpoint descriptions handed to event subscribers and `peers()` callers.

use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use crate::status::PeerStatus;

/// Network half of an endpoint description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkInfo {
    pub address: IpAddr,
    pub port: u16,
}

/// A node as seen by the peering layer. `node_id` is empty until the
/// application-level hello reveals it; `network` is absent for endpoints
/// without a resolvable address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointInfo {
    pub node_id: String,
    pub network: Option<NetworkInfo>,
}

impl EndpointInfo {
    pub fn new(node_id: impl Into<String>, address: IpAddr, port: u16) -> Self {
        Self {
            node_id: node_id.into(),
            network: Some(NetworkInfo { address, port }),
        }
    }
}

/// Snapshot row returned by `PeerManager::peers`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerInfo {
    pub endpoint: EndpointInfo,
    pub status: PeerStatus,
}
