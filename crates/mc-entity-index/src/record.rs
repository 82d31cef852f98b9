//! Per-entity state.
//!
//! An [`EntityRecord`] never notifies anyone about its own movement. Every
//! mutator returns a [`PositionChange`] describing what happened, and the
//! registry feeds that into the membership transition while it still holds
//! the record lock.

use mc_protocol::DataTypeProvider;
use mc_protocol::nbt::{NbtCompound, NbtList};

use crate::attributes::{AttributeBag, uuid_to_ints};
use crate::error::EntityResult;
use crate::key::{ChunkKey, DimensionId};

/// Protocol-assigned entity identity (a VarInt on the wire).
pub type EntityId = i32;

/// Relative moves are fixed-point with 4096 steps per block.
pub const DELTA_SCALE: f64 = 4096.0;

/// World-space position, tagged with the dimension it lives in.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EntityPosition {
    pub dimension: DimensionId,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl EntityPosition {
    #[must_use]
    pub const fn new(dimension: DimensionId, x: f64, y: f64, z: f64) -> Self {
        Self { dimension, x, y, z }
    }

    /// The chunk this position falls in.
    #[must_use]
    pub fn chunk(&self) -> ChunkKey {
        ChunkKey::containing(self)
    }

    /// Apply a fixed-point relative move.
    #[must_use]
    pub fn offset(self, dx: i16, dy: i16, dz: i16) -> Self {
        Self {
            dimension: self.dimension,
            x: self.x + f64::from(dx) / DELTA_SCALE,
            y: self.y + f64::from(dy) / DELTA_SCALE,
            z: self.z + f64::from(dz) / DELTA_SCALE,
        }
    }
}

/// Yaw and pitch in protocol angle steps (256 per full turn).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Rotation {
    pub yaw: i8,
    pub pitch: i8,
}

impl Rotation {
    #[must_use]
    pub const fn new(yaw: i8, pitch: i8) -> Self {
        Self { yaw, pitch }
    }

    #[must_use]
    pub fn degrees(self) -> [f32; 2] {
        [
            f32::from(self.yaw) * 360.0 / 256.0,
            f32::from(self.pitch) * 360.0 / 256.0,
        ]
    }
}

/// Outcome of a position-affecting mutation.
///
/// `moved` is false when the entity kept the position it already had (for
/// example after an attribute refresh); the partition is then only marked
/// dirty. `previous` is `None` for the first placement after spawn.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PositionChange {
    pub previous: Option<EntityPosition>,
    pub current: EntityPosition,
    pub moved: bool,
}

impl PositionChange {
    #[must_use]
    pub const fn spawned(current: EntityPosition) -> Self {
        Self {
            previous: None,
            current,
            moved: true,
        }
    }

    #[must_use]
    pub const fn moved(previous: EntityPosition, current: EntityPosition) -> Self {
        Self {
            previous: Some(previous),
            current,
            moved: true,
        }
    }

    #[must_use]
    pub const fn refreshed(current: EntityPosition) -> Self {
        Self {
            previous: Some(current),
            current,
            moved: false,
        }
    }
}

/// A live entity as reconstructed from the packet stream.
#[derive(Debug, Clone)]
pub struct EntityRecord {
    id: EntityId,
    uuid: u128,
    kind: String,
    position: EntityPosition,
    rotation: Rotation,
    on_ground: bool,
    attributes: AttributeBag,
}

impl EntityRecord {
    /// Build a record from spawn data. `kind` is the namespaced type name
    /// written into the export (e.g. `minecraft:zombie`).
    #[must_use]
    pub fn new(id: EntityId, uuid: u128, kind: impl Into<String>, position: EntityPosition) -> Self {
        Self {
            id,
            uuid,
            kind: kind.into(),
            position,
            rotation: Rotation::default(),
            on_ground: false,
            attributes: AttributeBag::new(),
        }
    }

    #[must_use]
    pub fn with_rotation(mut self, rotation: Rotation) -> Self {
        self.rotation = rotation;
        self
    }

    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.id
    }

    #[must_use]
    pub const fn uuid(&self) -> u128 {
        self.uuid
    }

    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    #[must_use]
    pub const fn position(&self) -> EntityPosition {
        self.position
    }

    #[must_use]
    pub const fn rotation(&self) -> Rotation {
        self.rotation
    }

    #[must_use]
    pub const fn on_ground(&self) -> bool {
        self.on_ground
    }

    #[must_use]
    pub const fn attributes(&self) -> &AttributeBag {
        &self.attributes
    }

    #[must_use]
    pub fn chunk(&self) -> ChunkKey {
        self.position.chunk()
    }

    pub(crate) const fn initial_change(&self) -> PositionChange {
        PositionChange::spawned(self.position)
    }

    /// Teleport-style absolute update: x/y/z doubles, yaw, pitch, on-ground.
    pub(crate) fn read_position<P: DataTypeProvider + ?Sized>(
        &mut self,
        provider: &mut P,
    ) -> EntityResult<PositionChange> {
        let x = provider.read_double()?;
        let y = provider.read_double()?;
        let z = provider.read_double()?;
        let yaw = provider.read_byte()?;
        let pitch = provider.read_byte()?;
        let on_ground = provider.read_bool()?;

        let previous = self.position;
        self.position = EntityPosition::new(previous.dimension, x, y, z);
        self.rotation = Rotation::new(yaw, pitch);
        self.on_ground = on_ground;
        Ok(PositionChange::moved(previous, self.position))
    }

    pub(crate) fn increment_position(&mut self, dx: i16, dy: i16, dz: i16) -> PositionChange {
        let previous = self.position;
        self.position = previous.offset(dx, dy, dz);
        PositionChange::moved(previous, self.position)
    }

    pub(crate) fn set_position(&mut self, position: EntityPosition) -> PositionChange {
        let previous = self.position;
        self.position = position;
        PositionChange::moved(previous, position)
    }

    pub(crate) fn read_metadata<P: DataTypeProvider + ?Sized>(
        &mut self,
        provider: &mut P,
    ) -> EntityResult<PositionChange> {
        self.attributes.read_metadata(provider)?;
        Ok(PositionChange::refreshed(self.position))
    }

    pub(crate) fn read_equipment<P: DataTypeProvider + ?Sized>(
        &mut self,
        provider: &mut P,
    ) -> EntityResult<PositionChange> {
        self.attributes.read_equipment(provider)?;
        Ok(PositionChange::refreshed(self.position))
    }

    /// Serialize into the tag layout the chunk writer stores per entity.
    #[must_use]
    pub fn to_serialized(&self) -> NbtCompound {
        let mut compound = mc_protocol::nbt! {
            "id" => self.kind.as_str(),
            "UUID" => uuid_to_ints(self.uuid),
            "Pos" => NbtList::Double(vec![self.position.x, self.position.y, self.position.z]),
            "Rotation" => NbtList::Float(self.rotation.degrees().to_vec()),
            "OnGround" => self.on_ground,
        };
        self.attributes.write_nbt(&mut compound);
        compound
    }
}
