//! Entity index error types.

use mc_protocol::ProtocolError;
use thiserror::Error;

use crate::EntityId;

/// Failures surfaced by packet-driven registry operations.
///
/// Updates for identities the registry does not track are not errors; they
/// are absorbed as no-ops.
#[derive(Debug, Error)]
pub enum EntityError {
    /// The packet payload could not be decoded (usually truncated input).
    #[error("packet decode failed: {0}")]
    Protocol(#[from] ProtocolError),

    /// A spawn reused an identity that is still live.
    #[error("entity {0} is already registered")]
    DuplicateIdentity(EntityId),

    /// Metadata entry with a value type this index does not decode.
    #[error("unsupported metadata value type {0}")]
    UnsupportedMetadataType(i32),

    /// Item stack carrying data components, which this index does not decode.
    #[error("item stack carries {added} added and {removed} removed components")]
    UnsupportedItemComponents { added: i32, removed: i32 },
}

impl EntityError {
    /// Whether the packet simply ran out of bytes.
    #[must_use]
    pub const fn is_truncated(&self) -> bool {
        matches!(self, Self::Protocol(err) if err.is_truncated())
    }
}

/// Result type for entity index operations.
pub type EntityResult<T> = Result<T, EntityError>;
