//! Identity → record table.
//!
//! The table is split into a power-of-two number of shards, each behind its
//! own `RwLock`, so lookups for unrelated identities never contend. Records
//! are handed out as [`SharedRecord`]s: shard locks are only held for the map
//! operation itself, and per-entity mutation serializes on the record mutex.

use std::sync::Arc;

use hashbrown::HashMap;
use hashbrown::hash_map::Entry;
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxBuildHasher;

use crate::error::{EntityError, EntityResult};
use crate::record::{EntityId, EntityRecord};

/// A record shared between the table and in-flight mutations.
pub type SharedRecord = Arc<Mutex<EntityRecord>>;

type Shard = RwLock<HashMap<EntityId, SharedRecord, FxBuildHasher>>;

pub const DEFAULT_SHARDS: usize = 64;

/// Upper bound on the shard count; larger requests are clamped.
pub const MAX_SHARDS: usize = 1 << 16;

pub struct EntityTable {
    shards: Box<[Shard]>,
    mask: usize,
}

impl EntityTable {
    #[must_use]
    pub fn new() -> Self {
        Self::with_shards(DEFAULT_SHARDS)
    }

    /// Create a table with `count` shards, clamped to `1..=MAX_SHARDS` and
    /// rounded up to a power of two.
    #[must_use]
    pub fn with_shards(count: usize) -> Self {
        let count = count.clamp(1, MAX_SHARDS).next_power_of_two();
        let shards = (0..count).map(|_| RwLock::new(HashMap::default())).collect();
        Self {
            shards,
            mask: count - 1,
        }
    }

    fn shard(&self, id: EntityId) -> &Shard {
        &self.shards[(id as u32 as usize) & self.mask]
    }

    #[must_use]
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Register a record under `id`.
    ///
    /// Fails without touching the table if `id` is already live.
    pub fn insert(&self, id: EntityId, record: SharedRecord) -> EntityResult<()> {
        match self.shard(id).write().entry(id) {
            Entry::Occupied(_) => Err(EntityError::DuplicateIdentity(id)),
            Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(())
            }
        }
    }

    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<SharedRecord> {
        self.shard(id).read().get(&id).cloned()
    }

    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.shard(id).read().contains_key(&id)
    }

    /// Remove `id`; removing an absent identity is a no-op.
    pub fn remove(&self, id: EntityId) -> Option<SharedRecord> {
        self.shard(id).write().remove(&id)
    }

    /// Remove `id` only while it still maps to `record`.
    pub fn remove_record(&self, id: EntityId, record: &SharedRecord) -> bool {
        match self.shard(id).write().entry(id) {
            Entry::Occupied(slot) if Arc::ptr_eq(slot.get(), record) => {
                slot.remove();
                true
            }
            _ => false,
        }
    }

    pub fn clear(&self) {
        for shard in &*self.shards {
            shard.write().clear();
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.shards.iter().map(|shard| shard.read().len()).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(|shard| shard.read().is_empty())
    }

    /// Sorted snapshot of live identities.
    #[must_use]
    pub fn ids(&self) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = self
            .shards
            .iter()
            .flat_map(|shard| shard.read().keys().copied().collect::<Vec<_>>())
            .collect();
        ids.sort_unstable();
        ids
    }
}

impl Default for EntityTable {
    fn default() -> Self {
        Self::new()
    }
}
