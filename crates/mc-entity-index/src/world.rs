//! Boundary to the world-state layer that owns loaded chunks.

use crate::key::ChunkKey;

/// The collaborator told about chunks whose entity data went stale.
///
/// Implementations are shared across packet worker threads.
pub trait WorldState: Send + Sync {
    /// Handle to a loaded chunk.
    type Handle;

    /// The loaded chunk at `key`, or `None` if it is not loaded.
    fn partition(&self, key: ChunkKey) -> Option<Self::Handle>;

    /// Record that the chunk has entity changes not yet persisted.
    fn mark_dirty(&self, handle: &Self::Handle);
}
