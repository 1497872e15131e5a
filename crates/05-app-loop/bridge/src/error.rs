use bridge_protocol::{ParseError, PayloadSlot, WireError};
use thiserror::Error;
use transport::TransportError;

/// Convenience result alias for bridge operations.
pub type BridgeResult<T, E = BridgeError> = Result<T, E>;

/// Errors surfaced by the front-end adapter and the engine-side host.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BridgeError {
    /// Inbound text was malformed. Nothing was queued or stored.
    #[error("protocol error: {0}")]
    Protocol(#[from] ParseError),

    /// Ring words did not decode to a command.
    #[error("corrupt command stream: {0}")]
    Wire(#[from] WireError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A payload command arrived with its slot empty.
    #[error("no pending payload for {0:?}")]
    PayloadMissing(PayloadSlot),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl BridgeError {
    /// True when the bridge cannot continue (a broken queue contract).
    pub fn is_fatal(&self) -> bool {
        match self {
            BridgeError::Transport(err) => err.is_fatal(),
            _ => false,
        }
    }
}
