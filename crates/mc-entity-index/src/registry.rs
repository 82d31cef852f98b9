//! Packet-driven entity registry.
//!
//! The registry owns the [`EntityTable`] and the [`ChunkMembership`] index and
//! keeps them consistent while packet workers mutate entities concurrently.
//!
//! # Locking
//!
//! ```text
//! record mutex ──► membership lock        (mutations, spawn placement)
//! membership take, released ──► record mutex ──► membership read, table shard  (unload)
//! membership read, released ──► record mutex (export)
//! ```
//!
//! A mutation holds its record's mutex across both the field update and the
//! membership transition, so two updates for one entity never interleave.
//! Moves go through [`ChunkMembership::transfer`], which only adds to the
//! destination if the entity is still in the source: an unload or despawn
//! that got there first wins and the move is dropped.

use std::sync::Arc;

use mc_protocol::nbt::NbtCompound;
use mc_protocol::{DataTypeProvider, ProtocolError};
use parking_lot::Mutex;
use smallvec::SmallVec;
use tracing::{debug, trace, warn};

use crate::config::RegistryConfig;
use crate::error::EntityResult;
use crate::key::ChunkKey;
use crate::membership::ChunkMembership;
use crate::record::{EntityId, EntityPosition, EntityRecord, PositionChange};
use crate::table::EntityTable;
use crate::transition::{self, Transition};
use crate::world::WorldState;

pub struct EntityRegistry<W> {
    entities: EntityTable,
    chunks: ChunkMembership,
    world: Arc<W>,
}

impl<W: WorldState> EntityRegistry<W> {
    #[must_use]
    pub fn new(world: Arc<W>) -> Self {
        Self::with_config(world, RegistryConfig::default())
    }

    #[must_use]
    pub fn with_config(world: Arc<W>, config: RegistryConfig) -> Self {
        Self {
            entities: EntityTable::with_shards(config.table_shards),
            chunks: ChunkMembership::new(),
            world,
        }
    }

    #[must_use]
    pub fn world(&self) -> &Arc<W> {
        &self.world
    }

    /// Register a freshly spawned entity.
    ///
    /// `parse` decodes the type-specific spawn layout. The record is placed
    /// into the chunk of its spawn position before any other thread can
    /// mutate it.
    pub fn add_entity<P, F>(&self, provider: &mut P, parse: F) -> EntityResult<EntityId>
    where
        P: DataTypeProvider + ?Sized,
        F: FnOnce(&mut P) -> EntityResult<EntityRecord>,
    {
        let record = parse(provider)?;
        let id = record.id();
        let change = record.initial_change();

        let shared = Arc::new(Mutex::new(record));
        let _placing = shared.lock();
        if let Err(err) = self.entities.insert(id, Arc::clone(&shared)) {
            warn!(id, "spawn reused a live entity id");
            return Err(err);
        }
        self.apply_transition(id, &change);

        debug!(id, chunk = %change.current.chunk(), "entity spawned");
        Ok(id)
    }

    pub fn add_metadata<P: DataTypeProvider + ?Sized>(&self, provider: &mut P) -> EntityResult<()> {
        let id = provider.read_varint()?;
        self.mutate(id, |record| record.read_metadata(provider))
    }

    pub fn add_equipment<P: DataTypeProvider + ?Sized>(&self, provider: &mut P) -> EntityResult<()> {
        let id = provider.read_varint()?;
        self.mutate(id, |record| record.read_equipment(provider))
    }

    /// Relative move: id followed by three fixed-point deltas.
    pub fn update_position_relative<P: DataTypeProvider + ?Sized>(
        &self,
        provider: &mut P,
    ) -> EntityResult<()> {
        let id = provider.read_varint()?;
        self.mutate(id, |record| {
            let dx = provider.read_short()?;
            let dy = provider.read_short()?;
            let dz = provider.read_short()?;
            Ok(record.increment_position(dx, dy, dz))
        })
    }

    pub fn update_position_absolute<P: DataTypeProvider + ?Sized>(
        &self,
        provider: &mut P,
    ) -> EntityResult<()> {
        let id = provider.read_varint()?;
        self.mutate(id, |record| record.read_position(provider))
    }

    /// Place an entity at an explicit position, possibly in another dimension.
    ///
    /// Returns `false` if the entity is not tracked.
    pub fn move_entity(&self, id: EntityId, position: EntityPosition) -> bool {
        let Some(shared) = self.entities.get(id) else {
            return false;
        };
        let mut record = shared.lock();
        let change = record.set_position(position);
        self.apply_transition(id, &change);
        true
    }

    /// Despawn: a VarInt count followed by that many ids.
    ///
    /// The whole id list is decoded before anything is removed. Returns how
    /// many of the ids were live.
    pub fn remove_entities<P: DataTypeProvider + ?Sized>(&self, provider: &mut P) -> EntityResult<usize> {
        let count = provider.read_varint()?;
        if count < 0 {
            return Err(ProtocolError::NegativeLength(count).into());
        }
        let mut ids: SmallVec<[EntityId; 8]> = SmallVec::new();
        for _ in 0..count {
            ids.push(provider.read_varint()?);
        }
        Ok(ids.into_iter().filter(|&id| self.remove_entity(id)).count())
    }

    /// Drop a single entity from both the table and its chunk.
    pub fn remove_entity(&self, id: EntityId) -> bool {
        let Some(shared) = self.entities.remove(id) else {
            return false;
        };
        let record = shared.lock();
        self.chunks.remove(record.chunk(), id);
        trace!(id, "entity removed");
        true
    }

    /// Forget every entity located in an unloaded chunk.
    ///
    /// Returns how many entities were dropped; a second call for the same
    /// key finds nothing. A taken id that was despawned and spawned again
    /// before its table entry is reached now belongs to a chunk again and is
    /// left alone.
    pub fn unload_chunk(&self, key: ChunkKey) -> usize {
        let members = self.chunks.take(key);
        let dropped = members
            .iter()
            .filter(|&&id| self.drop_evicted(id))
            .count();
        if dropped > 0 {
            debug!(chunk = %key, dropped, "dropped entities of unloaded chunk");
        }
        dropped
    }

    /// Serialized form of every entity currently in `key`, ordered by id.
    ///
    /// Membership is snapshotted when this is called; each entity is
    /// serialized as the iterator reaches it, and entities removed in the
    /// meantime are skipped.
    pub fn get_entities_nbt(&self, key: ChunkKey) -> impl Iterator<Item = NbtCompound> + '_ {
        self.entities_in(key)
            .into_iter()
            .filter_map(move |id| self.with_entity(id, EntityRecord::to_serialized))
    }

    /// Drop all state. Callers must make sure no packets are in flight.
    pub fn reset(&self) {
        self.entities.clear();
        self.chunks.clear();
        debug!("entity registry reset");
    }

    /// Run `f` against a live record.
    pub fn with_entity<R>(&self, id: EntityId, f: impl FnOnce(&EntityRecord) -> R) -> Option<R> {
        let shared = self.entities.get(id)?;
        let record = shared.lock();
        Some(f(&record))
    }

    #[must_use]
    pub fn contains_entity(&self, id: EntityId) -> bool {
        self.entities.contains(id)
    }

    /// The chunk the entity's position maps to.
    #[must_use]
    pub fn chunk_of(&self, id: EntityId) -> Option<ChunkKey> {
        self.with_entity(id, EntityRecord::chunk)
    }

    /// Sorted ids of the entities in `key`.
    #[must_use]
    pub fn entities_in(&self, key: ChunkKey) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = self.chunks.snapshot(key).into_iter().collect();
        ids.sort_unstable();
        ids
    }

    #[must_use]
    pub fn entity_ids(&self) -> Vec<EntityId> {
        self.entities.ids()
    }

    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Chunks holding at least one entity, in key order.
    #[must_use]
    pub fn tracked_chunks(&self) -> Vec<ChunkKey> {
        self.chunks.keys()
    }

    /// Direct access to the membership index for consistent multi-chunk reads.
    #[must_use]
    pub fn membership(&self) -> &ChunkMembership {
        &self.chunks
    }

    /// Caller has already taken `id` out of its chunk's member set.
    fn drop_evicted(&self, id: EntityId) -> bool {
        let Some(shared) = self.entities.get(id) else {
            return false;
        };
        let record = shared.lock();
        if self.chunks.contains(record.chunk(), id) {
            return false;
        }
        self.entities.remove_record(id, &shared)
    }

    fn mutate<F>(&self, id: EntityId, apply: F) -> EntityResult<()>
    where
        F: FnOnce(&mut EntityRecord) -> EntityResult<PositionChange>,
    {
        let Some(shared) = self.entities.get(id) else {
            trace!(id, "update for untracked entity ignored");
            return Ok(());
        };
        let mut record = shared.lock();
        let change = apply(&mut record)?;
        self.apply_transition(id, &change);
        Ok(())
    }

    /// Caller holds the record lock for `id`.
    fn apply_transition(&self, id: EntityId, change: &PositionChange) {
        let transition = transition::plan(change);
        match transition {
            Transition::Refresh(_) | Transition::Within(_) => {}
            Transition::Enter(to) => {
                self.chunks.add(to, id);
            }
            Transition::Cross { from, to } => {
                if !self.chunks.transfer(id, from, to) {
                    trace!(id, %from, %to, "entity left its chunk concurrently, move dropped");
                    return;
                }
            }
        }
        self.mark_dirty(transition.target());
    }

    fn mark_dirty(&self, key: ChunkKey) {
        match self.world.partition(key) {
            Some(handle) => self.world.mark_dirty(&handle),
            // TODO: queue the mark and retry once the chunk arrives
            None => trace!(chunk = %key, "dirty mark skipped, chunk not loaded"),
        }
    }
}
