//! The mutable attribute bag carried by every entity record.
//!
//! Metadata and equipment are decoded in full before anything is applied, so a
//! packet that fails halfway leaves the bag untouched.

use std::collections::BTreeMap;

use mc_protocol::DataTypeProvider;
use mc_protocol::nbt::{NbtCompound, NbtList, NbtValue};
use smallvec::SmallVec;

use crate::error::{EntityError, EntityResult};

/// Index byte that terminates a metadata entry list.
const METADATA_END: u8 = 0xFF;

/// Set on an equipment slot byte when another slot follows.
const EQUIPMENT_CONTINUES: u8 = 0x80;

/// Metadata value type ids understood by the decoder.
mod value_type {
    pub const BYTE: i32 = 0;
    pub const VAR_INT: i32 = 1;
    pub const VAR_LONG: i32 = 2;
    pub const FLOAT: i32 = 3;
    pub const STRING: i32 = 4;
    pub const BOOLEAN: i32 = 8;
    pub const ROTATIONS: i32 = 9;
    pub const POSITION: i32 = 10;
    pub const OPTIONAL_POSITION: i32 = 11;
    pub const DIRECTION: i32 = 12;
    pub const OPTIONAL_UUID: i32 = 13;
    pub const BLOCK_STATE: i32 = 14;
    pub const OPTIONAL_VAR_INT: i32 = 20;
    pub const POSE: i32 = 21;
    pub const VECTOR3: i32 = 29;
    pub const QUATERNION: i32 = 30;
}

#[derive(Debug, Clone, PartialEq)]
pub enum MetadataValue {
    Byte(i8),
    VarInt(i32),
    VarLong(i64),
    Float(f32),
    String(String),
    Boolean(bool),
    Floats(SmallVec<[f32; 4]>),
    BlockPosition(i64),
    OptionalBlockPosition(Option<i64>),
    OptionalUuid(Option<u128>),
}

impl MetadataValue {
    fn read<P: DataTypeProvider + ?Sized>(type_id: i32, provider: &mut P) -> EntityResult<Self> {
        let value = match type_id {
            value_type::BYTE => Self::Byte(provider.read_byte()?),
            value_type::VAR_INT
            | value_type::DIRECTION
            | value_type::BLOCK_STATE
            | value_type::OPTIONAL_VAR_INT
            | value_type::POSE => Self::VarInt(provider.read_varint()?),
            value_type::VAR_LONG => Self::VarLong(provider.read_varlong()?),
            value_type::FLOAT => Self::Float(provider.read_float()?),
            value_type::STRING => Self::String(provider.read_string()?),
            value_type::BOOLEAN => Self::Boolean(provider.read_bool()?),
            value_type::ROTATIONS | value_type::VECTOR3 => Self::Floats(read_floats(provider, 3)?),
            value_type::QUATERNION => Self::Floats(read_floats(provider, 4)?),
            value_type::POSITION => Self::BlockPosition(provider.read_long()?),
            value_type::OPTIONAL_POSITION => {
                let present = provider.read_bool()?;
                Self::OptionalBlockPosition(if present { Some(provider.read_long()?) } else { None })
            }
            value_type::OPTIONAL_UUID => {
                let present = provider.read_bool()?;
                Self::OptionalUuid(if present { Some(provider.read_uuid()?) } else { None })
            }
            other => return Err(EntityError::UnsupportedMetadataType(other)),
        };
        Ok(value)
    }

    fn to_nbt(&self) -> Option<NbtValue> {
        let value = match self {
            Self::Byte(v) => NbtValue::Byte(*v),
            Self::VarInt(v) => NbtValue::Int(*v),
            Self::VarLong(v) | Self::BlockPosition(v) => NbtValue::Long(*v),
            Self::Float(v) => NbtValue::Float(*v),
            Self::String(v) => NbtValue::String(v.clone()),
            Self::Boolean(v) => NbtValue::from(*v),
            Self::Floats(v) => NbtValue::List(NbtList::Float(v.to_vec())),
            Self::OptionalBlockPosition(v) => NbtValue::Long((*v)?),
            Self::OptionalUuid(v) => NbtValue::IntArray(uuid_to_ints((*v)?)),
        };
        Some(value)
    }
}

fn read_floats<P: DataTypeProvider + ?Sized>(
    provider: &mut P,
    count: usize,
) -> EntityResult<SmallVec<[f32; 4]>> {
    let mut floats = SmallVec::new();
    for _ in 0..count {
        floats.push(provider.read_float()?);
    }
    Ok(floats)
}

/// One decoded metadata entry.
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataEntry {
    pub type_id: i32,
    pub value: MetadataValue,
}

/// An item occupying an equipment slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemStack {
    pub item_id: i32,
    pub count: i32,
}

impl ItemStack {
    /// Reads a slot; an empty slot decodes to `None`.
    fn read<P: DataTypeProvider + ?Sized>(provider: &mut P) -> EntityResult<Option<Self>> {
        let count = provider.read_varint()?;
        if count <= 0 {
            return Ok(None);
        }
        let item_id = provider.read_varint()?;
        let added = provider.read_varint()?;
        let removed = provider.read_varint()?;
        if added != 0 || removed != 0 {
            return Err(EntityError::UnsupportedItemComponents { added, removed });
        }
        Ok(Some(Self { item_id, count }))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeBag {
    metadata: BTreeMap<u8, MetadataEntry>,
    equipment: BTreeMap<u8, ItemStack>,
}

impl AttributeBag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn metadata(&self, index: u8) -> Option<&MetadataEntry> {
        self.metadata.get(&index)
    }

    #[must_use]
    pub fn equipment(&self, slot: u8) -> Option<&ItemStack> {
        self.equipment.get(&slot)
    }

    #[must_use]
    pub fn metadata_len(&self) -> usize {
        self.metadata.len()
    }

    #[must_use]
    pub fn equipment_len(&self) -> usize {
        self.equipment.len()
    }

    /// Decode a metadata entry list and merge it into the bag.
    pub(crate) fn read_metadata<P: DataTypeProvider + ?Sized>(
        &mut self,
        provider: &mut P,
    ) -> EntityResult<()> {
        let mut staged: SmallVec<[(u8, MetadataEntry); 8]> = SmallVec::new();
        loop {
            let index = provider.read_ubyte()?;
            if index == METADATA_END {
                break;
            }
            let type_id = provider.read_varint()?;
            let value = MetadataValue::read(type_id, provider)?;
            staged.push((index, MetadataEntry { type_id, value }));
        }
        self.metadata.extend(staged);
        Ok(())
    }

    /// Decode an equipment slot list; empty stacks clear their slot.
    pub(crate) fn read_equipment<P: DataTypeProvider + ?Sized>(
        &mut self,
        provider: &mut P,
    ) -> EntityResult<()> {
        let mut staged: SmallVec<[(u8, Option<ItemStack>); 6]> = SmallVec::new();
        loop {
            let slot = provider.read_ubyte()?;
            staged.push((slot & !EQUIPMENT_CONTINUES, ItemStack::read(provider)?));
            if slot & EQUIPMENT_CONTINUES == 0 {
                break;
            }
        }
        for (slot, stack) in staged {
            match stack {
                Some(stack) => {
                    self.equipment.insert(slot, stack);
                }
                None => {
                    self.equipment.remove(&slot);
                }
            }
        }
        Ok(())
    }

    /// Add the bag's contribution to an entity's serialized form.
    pub fn write_nbt(&self, compound: &mut NbtCompound) {
        if !self.metadata.is_empty() {
            let mut metadata = NbtCompound::new();
            for (index, entry) in &self.metadata {
                if let Some(value) = entry.value.to_nbt() {
                    metadata.insert(index.to_string(), value);
                }
            }
            compound.insert("Metadata", metadata);
        }

        if !self.equipment.is_empty() {
            let slots = self
                .equipment
                .iter()
                .map(|(slot, stack)| {
                    mc_protocol::nbt! {
                        "Slot" => *slot as i8,
                        "id" => stack.item_id,
                        "Count" => stack.count,
                    }
                })
                .collect();
            compound.insert("Equipment", NbtList::Compound(slots));
        }
    }
}

/// Split a UUID into the four big-endian ints the save format stores.
#[must_use]
pub fn uuid_to_ints(uuid: u128) -> Vec<i32> {
    vec![
        (uuid >> 96) as i32,
        (uuid >> 64) as i32,
        (uuid >> 32) as i32,
        uuid as i32,
    ]
}

#[cfg(test)]
mod tests {
    use mc_protocol::{PacketReader, PacketWriter};

    use super::*;

    #[test]
    fn metadata_entries_merge_by_index() {
        let mut bag = AttributeBag::new();

        let mut packet = PacketWriter::new();
        packet
            .ubyte(0)
            .varint(value_type::BYTE)
            .byte(0x02)
            .ubyte(2)
            .varint(value_type::STRING)
            .string("Grumm")
            .ubyte(METADATA_END);
        bag.read_metadata(&mut PacketReader::new(packet.as_bytes()))
            .unwrap();

        let mut packet = PacketWriter::new();
        packet.ubyte(0).varint(value_type::BYTE).byte(0x20).ubyte(METADATA_END);
        bag.read_metadata(&mut PacketReader::new(packet.as_bytes()))
            .unwrap();

        assert_eq!(bag.metadata_len(), 2);
        assert_eq!(bag.metadata(0).unwrap().value, MetadataValue::Byte(0x20));
        assert_eq!(
            bag.metadata(2).unwrap().value,
            MetadataValue::String("Grumm".to_string())
        );
    }

    #[test]
    fn failed_metadata_leaves_bag_untouched() {
        let mut bag = AttributeBag::new();

        let mut packet = PacketWriter::new();
        // first entry is fine, second has a type we do not decode
        packet
            .ubyte(0)
            .varint(value_type::BYTE)
            .byte(1)
            .ubyte(1)
            .varint(16)
            .ubyte(METADATA_END);
        let err = bag
            .read_metadata(&mut PacketReader::new(packet.as_bytes()))
            .unwrap_err();
        assert!(matches!(err, EntityError::UnsupportedMetadataType(16)));
        assert_eq!(bag.metadata_len(), 0);

        let mut packet = PacketWriter::new();
        packet.ubyte(0).varint(value_type::FLOAT);
        let err = bag
            .read_metadata(&mut PacketReader::new(packet.as_bytes()))
            .unwrap_err();
        assert!(err.is_truncated());
        assert_eq!(bag.metadata_len(), 0);
    }

    #[test]
    fn equipment_slots_set_and_clear() {
        let mut bag = AttributeBag::new();

        let mut packet = PacketWriter::new();
        packet
            .ubyte(EQUIPMENT_CONTINUES)
            .varint(1)
            .varint(812)
            .varint(0)
            .varint(0)
            .ubyte(5)
            .varint(1)
            .varint(42)
            .varint(0)
            .varint(0);
        bag.read_equipment(&mut PacketReader::new(packet.as_bytes()))
            .unwrap();
        assert_eq!(
            bag.equipment(0),
            Some(&ItemStack {
                item_id: 812,
                count: 1
            })
        );
        assert_eq!(bag.equipment(5).map(|s| s.item_id), Some(42));

        let mut packet = PacketWriter::new();
        packet.ubyte(5).varint(0);
        bag.read_equipment(&mut PacketReader::new(packet.as_bytes()))
            .unwrap();
        assert_eq!(bag.equipment_len(), 1);
        assert!(bag.equipment(5).is_none());
    }

    #[test]
    fn item_components_are_rejected() {
        let mut bag = AttributeBag::new();
        let mut packet = PacketWriter::new();
        packet.ubyte(0).varint(1).varint(812).varint(2).varint(0);
        let err = bag
            .read_equipment(&mut PacketReader::new(packet.as_bytes()))
            .unwrap_err();
        assert!(matches!(
            err,
            EntityError::UnsupportedItemComponents {
                added: 2,
                removed: 0
            }
        ));
        assert_eq!(bag.equipment_len(), 0);
    }

    #[test]
    fn nbt_skips_absent_optionals() {
        let mut bag = AttributeBag::new();
        let mut packet = PacketWriter::new();
        packet
            .ubyte(8)
            .varint(value_type::OPTIONAL_UUID)
            .bool(false)
            .ubyte(9)
            .varint(value_type::FLOAT)
            .float(20.0)
            .ubyte(METADATA_END);
        bag.read_metadata(&mut PacketReader::new(packet.as_bytes()))
            .unwrap();

        let mut compound = NbtCompound::new();
        bag.write_nbt(&mut compound);
        let metadata = compound.get("Metadata").and_then(NbtValue::as_compound).unwrap();
        assert_eq!(metadata.len(), 1);
        assert_eq!(metadata.get("9"), Some(&NbtValue::Float(20.0)));
        assert!(!compound.contains_key("Equipment"));
    }

    #[test]
    fn uuid_splits_big_endian() {
        let uuid = 0x0001_0002_0003_0004_0005_0006_0007_0008u128;
        assert_eq!(
            uuid_to_ints(uuid),
            vec![0x0001_0002, 0x0003_0004, 0x0005_0006, 0x0007_0008]
        );
    }
}
