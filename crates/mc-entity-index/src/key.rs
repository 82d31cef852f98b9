//! Partition keys and the world-to-chunk transform.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::record::EntityPosition;

/// Chunks are 16 blocks wide on both horizontal axes.
pub const CHUNK_SHIFT: u32 = 4;

/// Dimension identifier as carried by the world-state layer.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct DimensionId(pub i32);

impl DimensionId {
    pub const OVERWORLD: Self = Self(0);
    pub const NETHER: Self = Self(-1);
    pub const END: Self = Self(1);
}

impl fmt::Display for DimensionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dim{}", self.0)
    }
}

/// Identifies one chunk column within a dimension.
///
/// Ordering is dimension, then X, then Z, so iteration over keyed
/// collections is deterministic.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct ChunkKey {
    pub dimension: DimensionId,
    pub x: i32,
    pub z: i32,
}

impl ChunkKey {
    #[must_use]
    pub const fn new(dimension: DimensionId, x: i32, z: i32) -> Self {
        Self { dimension, x, z }
    }

    /// The chunk containing a world-space position.
    #[must_use]
    pub fn containing(position: &EntityPosition) -> Self {
        Self {
            dimension: position.dimension,
            x: block_to_chunk(position.x),
            z: block_to_chunk(position.z),
        }
    }
}

impl fmt::Display for ChunkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{},{}", self.dimension, self.x, self.z)
    }
}

/// Floor a world coordinate to its chunk index.
///
/// `as` saturates out-of-range values and maps NaN to zero, so the transform
/// is total.
#[must_use]
pub fn block_to_chunk(coord: f64) -> i32 {
    (coord.floor() as i32) >> CHUNK_SHIFT
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(x: f64, z: f64) -> ChunkKey {
        ChunkKey::containing(&EntityPosition::new(DimensionId::OVERWORLD, x, 64.0, z))
    }

    #[test]
    fn positive_coordinates_floor_to_chunk() {
        assert_eq!(at(0.0, 0.0), ChunkKey::new(DimensionId::OVERWORLD, 0, 0));
        assert_eq!(at(15.99, 15.99), ChunkKey::new(DimensionId::OVERWORLD, 0, 0));
        assert_eq!(at(16.0, 0.0), ChunkKey::new(DimensionId::OVERWORLD, 1, 0));
        assert_eq!(at(40.5, 33.0), ChunkKey::new(DimensionId::OVERWORLD, 2, 2));
    }

    #[test]
    fn negative_coordinates_round_toward_negative_infinity() {
        assert_eq!(at(-0.01, -0.01), ChunkKey::new(DimensionId::OVERWORLD, -1, -1));
        assert_eq!(at(-16.0, -16.5), ChunkKey::new(DimensionId::OVERWORLD, -1, -2));
    }

    #[test]
    fn non_finite_coordinates_do_not_panic() {
        assert_eq!(at(f64::NAN, 0.0).x, 0);
        assert_eq!(at(f64::INFINITY, 0.0).x, i32::MAX >> CHUNK_SHIFT);
    }

    #[test]
    fn ordering_is_dimension_then_x_then_z() {
        let mut keys = vec![
            ChunkKey::new(DimensionId::END, 0, 0),
            ChunkKey::new(DimensionId::OVERWORLD, 1, -5),
            ChunkKey::new(DimensionId::OVERWORLD, 1, -6),
            ChunkKey::new(DimensionId::NETHER, 9, 9),
        ];
        keys.sort();
        assert_eq!(
            keys,
            vec![
                ChunkKey::new(DimensionId::NETHER, 9, 9),
                ChunkKey::new(DimensionId::OVERWORLD, 1, -6),
                ChunkKey::new(DimensionId::OVERWORLD, 1, -5),
                ChunkKey::new(DimensionId::END, 0, 0),
            ]
        );
    }

    #[test]
    fn same_column_in_other_dimension_is_a_different_key() {
        let overworld = ChunkKey::new(DimensionId::OVERWORLD, 3, 4);
        let nether = ChunkKey::new(DimensionId::NETHER, 3, 4);
        assert_ne!(overworld, nether);
        assert_eq!(overworld.to_string(), "dim0:3,4");
    }
}
