//! Error kinds shared across the crate.
//!
//! Timeouts are deliberately absent: a bounded network operation that expires
//! yields `None` at the transport layer and the caller marks the peer down.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    /// The wire codec could not parse an inbound record.
    #[error("malformed message: {0}")]
    MalformedMessage(String),

    /// The local store rejected an upsert under incompatible terms.
    #[error("store conflict: {0}")]
    StoreConflict(String),

    /// Read or delete against a key the store does not hold.
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// Every candidate replica timed out or failed.
    #[error("no replica available: {0}")]
    ReplicaUnavailable(String),

    /// One of the three stabilization steps failed; the key may remain
    /// half-migrated until a later attempt succeeds.
    #[error("stabilization failed: {0}")]
    StabilizationFailure(String),

    /// A peer received a message its role must never receive.
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
