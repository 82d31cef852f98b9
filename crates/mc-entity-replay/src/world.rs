//! Loaded-chunk bookkeeping standing in for the client's world state.

use std::collections::BTreeMap;

use hashbrown::HashSet;
use mc_entity_index::{ChunkKey, WorldState};
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxBuildHasher;

/// Tracks which chunks the recording has loaded and how often each was
/// marked dirty by the registry.
#[derive(Default)]
pub struct LoadedChunks {
    loaded: RwLock<HashSet<ChunkKey, FxBuildHasher>>,
    dirty: Mutex<BTreeMap<ChunkKey, u64>>,
}

impl LoadedChunks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if the chunk was already loaded.
    pub fn load(&self, key: ChunkKey) -> bool {
        self.loaded.write().insert(key)
    }

    pub fn unload(&self, key: ChunkKey) -> bool {
        self.loaded.write().remove(&key)
    }

    #[must_use]
    pub fn is_loaded(&self, key: ChunkKey) -> bool {
        self.loaded.read().contains(&key)
    }

    #[must_use]
    pub fn loaded_count(&self) -> usize {
        self.loaded.read().len()
    }

    #[must_use]
    pub fn dirty_marks(&self, key: ChunkKey) -> u64 {
        self.dirty.lock().get(&key).copied().unwrap_or(0)
    }

    pub fn clear(&self) {
        self.loaded.write().clear();
        self.dirty.lock().clear();
    }
}

impl WorldState for LoadedChunks {
    type Handle = ChunkKey;

    fn partition(&self, key: ChunkKey) -> Option<ChunkKey> {
        self.is_loaded(key).then_some(key)
    }

    fn mark_dirty(&self, handle: &ChunkKey) {
        *self.dirty.lock().entry(*handle).or_default() += 1;
    }
}
