//! Membership transition planning.
//!
//! [`plan`] is pure: it turns a [`PositionChange`] into the index operation
//! the registry must perform. Every variant ends with the target chunk being
//! marked dirty.

use crate::key::ChunkKey;
use crate::record::PositionChange;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Position untouched (attribute refresh); no index change.
    Refresh(ChunkKey),
    /// First placement after spawn.
    Enter(ChunkKey),
    /// Moved without leaving the chunk; no index change.
    Within(ChunkKey),
    /// Crossed a chunk boundary.
    Cross { from: ChunkKey, to: ChunkKey },
}

impl Transition {
    /// The chunk the entity ends up in.
    #[must_use]
    pub const fn target(&self) -> ChunkKey {
        match *self {
            Self::Refresh(key) | Self::Enter(key) | Self::Within(key) => key,
            Self::Cross { to, .. } => to,
        }
    }
}

#[must_use]
pub fn plan(change: &PositionChange) -> Transition {
    let to = change.current.chunk();
    if !change.moved {
        return Transition::Refresh(to);
    }
    match change.previous.map(|previous| previous.chunk()) {
        None => Transition::Enter(to),
        Some(from) if from == to => Transition::Within(to),
        Some(from) => Transition::Cross { from, to },
    }
}
