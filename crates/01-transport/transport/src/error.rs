//! Error surface for the transport primitives.
//!
//! Construction validates capacities up front; at runtime the only failures
//! are a producer overrunning the command ring (a protocol violation) and the
//! video hand-off running out of image resources.

use thiserror::Error;

/// Convenience result alias for fallible transport operations.
pub type TransportResult<T, E = TransportError> = Result<T, E>;

/// Errors surfaced by the transport primitives.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Requested capacity or buffer size is below the minimum.
    #[error("capacity {requested} is below the minimum of {minimum}")]
    InvalidCapacity { requested: usize, minimum: usize },

    /// The producer tried to push more words than the ring can hold.
    #[error("command ring overflow: {needed} words needed, {free} of {capacity} free")]
    QueueOverflow {
        capacity: usize,
        free: usize,
        needed: usize,
    },

    /// A frame or sample buffer could not be sized for the requested shape.
    #[error("failed to allocate a {size} byte buffer")]
    AllocationFailed { size: usize },

    /// Every image resource is held by the presentation side.
    #[error("all {max_in_flight} image resources are held by presentation")]
    FrameInFlightLimit { max_in_flight: usize },
}

impl TransportError {
    /// Returns true when the error indicates a broken single-producer contract.
    pub fn is_fatal(&self) -> bool {
        matches!(self, TransportError::QueueOverflow { .. })
    }
}
