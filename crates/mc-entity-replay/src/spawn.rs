//! Spawn Entity decoding.

use mc_entity_index::{DimensionId, EntityPosition, EntityRecord, EntityResult, Rotation};
use mc_protocol::DataTypeProvider;

use crate::config::ReplayConfig;

/// Decodes the 1.21 Spawn Entity layout into a fresh record.
pub struct SpawnParser<'a> {
    dimension: DimensionId,
    config: &'a ReplayConfig,
}

impl<'a> SpawnParser<'a> {
    #[must_use]
    pub const fn new(config: &'a ReplayConfig) -> Self {
        Self {
            dimension: config.dimension,
            config,
        }
    }

    /// Every field is read before the record is built, including the ones
    /// the index does not keep (head yaw, data, velocity).
    pub fn parse<P: DataTypeProvider + ?Sized>(&self, provider: &mut P) -> EntityResult<EntityRecord> {
        let id = provider.read_varint()?;
        let uuid = provider.read_uuid()?;
        let type_id = provider.read_varint()?;
        let x = provider.read_double()?;
        let y = provider.read_double()?;
        let z = provider.read_double()?;
        let pitch = provider.read_byte()?;
        let yaw = provider.read_byte()?;
        let _head_yaw = provider.read_byte()?;
        let _data = provider.read_varint()?;
        for _ in 0..3 {
            provider.read_short()?;
        }

        Ok(EntityRecord::new(
            id,
            uuid,
            self.config.entity_type_name(type_id),
            EntityPosition::new(self.dimension, x, y, z),
        )
        .with_rotation(Rotation::new(yaw, pitch)))
    }
}
