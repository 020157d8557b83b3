//! Synchronous peering failures. Asynchronous ones surface as
//! [`crate::PeeringEvent::Error`] notifications instead.

use thiserror::Error;
use vigil_values::Port;

#[derive(Debug, Error)]
pub enum PeeringError {
    /// Peering runs over stream transports only.
    #[error("port {0} is not a stream port; peering requires TCP")]
    InvalidTransport(Port),

    #[error("failed to bind listener: {0}")]
    Bind(#[from] std::io::Error),
}
