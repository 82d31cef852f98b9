//! Shared fixtures for the registry integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use hashbrown::{HashMap, HashSet};
use mc_entity_index::{
    ChunkKey, DimensionId, EntityId, EntityPosition, EntityRecord, EntityRegistry, EntityResult,
    WorldState,
};
use mc_protocol::{DataTypeProvider, PacketReader, PacketWriter};
use parking_lot::Mutex;

/// World stub with an explicit set of loaded chunks and a dirty-mark log.
#[derive(Default)]
pub struct RecordingWorld {
    loaded: Mutex<HashSet<ChunkKey>>,
    dirty: Mutex<HashMap<ChunkKey, usize>>,
}

impl RecordingWorld {
    pub fn load(&self, key: ChunkKey) {
        self.loaded.lock().insert(key);
    }

    pub fn dirty_count(&self, key: ChunkKey) -> usize {
        self.dirty.lock().get(&key).copied().unwrap_or(0)
    }

    pub fn clear_dirty(&self) {
        self.dirty.lock().clear();
    }
}

impl WorldState for RecordingWorld {
    type Handle = ChunkKey;

    fn partition(&self, key: ChunkKey) -> Option<ChunkKey> {
        self.loaded.lock().contains(&key).then_some(key)
    }

    fn mark_dirty(&self, handle: &ChunkKey) {
        *self.dirty.lock().entry(*handle).or_default() += 1;
    }
}

pub type Registry = EntityRegistry<RecordingWorld>;

pub fn new_registry() -> (Arc<RecordingWorld>, Registry) {
    let world = Arc::new(RecordingWorld::default());
    let registry = EntityRegistry::new(Arc::clone(&world));
    (world, registry)
}

pub const fn overworld(x: i32, z: i32) -> ChunkKey {
    ChunkKey::new(DimensionId::OVERWORLD, x, z)
}

/// Test spawn layout: id, uuid, x, y, z.
pub fn parse_spawn<P: DataTypeProvider + ?Sized>(provider: &mut P) -> EntityResult<EntityRecord> {
    let id = provider.read_varint()?;
    let uuid = provider.read_uuid()?;
    let x = provider.read_double()?;
    let y = provider.read_double()?;
    let z = provider.read_double()?;
    Ok(EntityRecord::new(
        id,
        uuid,
        "minecraft:sheep",
        EntityPosition::new(DimensionId::OVERWORLD, x, y, z),
    ))
}

pub fn spawn(registry: &Registry, id: EntityId, x: f64, z: f64) -> EntityResult<EntityId> {
    let mut packet = PacketWriter::new();
    packet
        .varint(id)
        .uuid(u128::from(id as u32))
        .double(x)
        .double(64.0)
        .double(z);
    registry.add_entity(&mut PacketReader::new(packet.as_bytes()), parse_spawn)
}

pub fn teleport(registry: &Registry, id: EntityId, x: f64, z: f64) -> EntityResult<()> {
    let mut packet = PacketWriter::new();
    packet
        .varint(id)
        .double(x)
        .double(64.0)
        .double(z)
        .byte(0)
        .byte(0)
        .bool(true);
    registry.update_position_absolute(&mut PacketReader::new(packet.as_bytes()))
}

pub fn nudge(registry: &Registry, id: EntityId, dx: i16, dz: i16) -> EntityResult<()> {
    let mut packet = PacketWriter::new();
    packet.varint(id).short(dx).short(0).short(dz);
    registry.update_position_relative(&mut PacketReader::new(packet.as_bytes()))
}

/// Check the cross-table invariants; returns a description of each violation.
pub fn invariant_violations(registry: &Registry) -> Vec<String> {
    let mut violations = Vec::new();

    for id in registry.entity_ids() {
        let Some(key) = registry.chunk_of(id) else {
            continue;
        };
        let holders: Vec<ChunkKey> = registry
            .tracked_chunks()
            .into_iter()
            .filter(|chunk| registry.membership().contains(*chunk, id))
            .collect();
        if holders != [key] {
            violations.push(format!("entity {id} at {key} is held by {holders:?}"));
        }
    }

    for key in registry.tracked_chunks() {
        let members = registry.entities_in(key);
        if members.is_empty() {
            violations.push(format!("chunk {key} tracked with an empty set"));
        }
        for id in members {
            if !registry.contains_entity(id) {
                violations.push(format!("chunk {key} holds unknown entity {id}"));
            }
        }
    }

    violations
}
