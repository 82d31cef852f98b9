//! NBT (Named Binary Tag) values used as the entity export format.
//!
//! Entities are serialized into [`NbtCompound`]s that the chunk writer embeds
//! in its own tag tree. Only encoding is provided; the export path never reads
//! NBT back.

/// Tag type byte written ahead of every named value and list body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Tag {
    End = 0,
    Byte = 1,
    Short = 2,
    Int = 3,
    Long = 4,
    Float = 5,
    Double = 6,
    ByteArray = 7,
    String = 8,
    List = 9,
    Compound = 10,
    IntArray = 11,
    LongArray = 12,
}

/// An NBT value
#[derive(Debug, Clone, PartialEq)]
pub enum NbtValue {
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    ByteArray(Vec<i8>),
    String(String),
    List(NbtList),
    Compound(NbtCompound),
    IntArray(Vec<i32>),
    LongArray(Vec<i64>),
}

/// An NBT list; every element shares one tag type.
#[derive(Debug, Clone, PartialEq)]
pub enum NbtList {
    Empty,
    Byte(Vec<i8>),
    Short(Vec<i16>),
    Int(Vec<i32>),
    Long(Vec<i64>),
    Float(Vec<f32>),
    Double(Vec<f64>),
    String(Vec<String>),
    Compound(Vec<NbtCompound>),
}

/// An NBT compound. Entry order is insertion order; inserting an existing key
/// replaces its value in place.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NbtCompound {
    entries: Vec<(String, NbtValue)>,
}

impl NbtCompound {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<NbtValue>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(name, _)| *name == key) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((key, value)),
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&NbtValue> {
        self.entries
            .iter()
            .find_map(|(name, value)| (name == key).then_some(value))
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Network form: compound tag byte, entries, end byte. No root name.
    #[must_use]
    pub fn to_network_bytes(&self) -> Vec<u8> {
        let mut buf = vec![Tag::Compound as u8];
        self.encode(&mut buf);
        buf
    }
}

impl NbtValue {
    #[must_use]
    pub const fn tag(&self) -> Tag {
        match self {
            Self::Byte(_) => Tag::Byte,
            Self::Short(_) => Tag::Short,
            Self::Int(_) => Tag::Int,
            Self::Long(_) => Tag::Long,
            Self::Float(_) => Tag::Float,
            Self::Double(_) => Tag::Double,
            Self::ByteArray(_) => Tag::ByteArray,
            Self::String(_) => Tag::String,
            Self::List(_) => Tag::List,
            Self::Compound(_) => Tag::Compound,
            Self::IntArray(_) => Tag::IntArray,
            Self::LongArray(_) => Tag::LongArray,
        }
    }

    #[must_use]
    pub const fn as_compound(&self) -> Option<&NbtCompound> {
        match self {
            Self::Compound(compound) => Some(compound),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_list(&self) -> Option<&NbtList> {
        match self {
            Self::List(list) => Some(list),
            _ => None,
        }
    }
}

impl NbtList {
    /// Element tag; an empty list is written with the end tag.
    #[must_use]
    pub const fn element_tag(&self) -> Tag {
        match self {
            Self::Empty => Tag::End,
            Self::Byte(_) => Tag::Byte,
            Self::Short(_) => Tag::Short,
            Self::Int(_) => Tag::Int,
            Self::Long(_) => Tag::Long,
            Self::Float(_) => Tag::Float,
            Self::Double(_) => Tag::Double,
            Self::String(_) => Tag::String,
            Self::Compound(_) => Tag::Compound,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Empty => 0,
            Self::Byte(items) => items.len(),
            Self::Short(items) => items.len(),
            Self::Int(items) => items.len(),
            Self::Long(items) => items.len(),
            Self::Float(items) => items.len(),
            Self::Double(items) => items.len(),
            Self::String(items) => items.len(),
            Self::Compound(items) => items.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Payload encoding, without the tag byte or name.
trait Encode {
    fn encode(&self, buf: &mut Vec<u8>);
}

macro_rules! encode_big_endian {
    ($($ty:ty),*) => {
        $(
            impl Encode for $ty {
                fn encode(&self, buf: &mut Vec<u8>) {
                    buf.extend_from_slice(&self.to_be_bytes());
                }
            }
        )*
    };
}

encode_big_endian!(i8, i16, i32, i64, f32, f64);

/// Modified UTF-8 is approximated by plain UTF-8 behind a u16 length.
impl Encode for str {
    fn encode(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&(self.len() as u16).to_be_bytes());
        buf.extend_from_slice(self.as_bytes());
    }
}

impl Encode for String {
    fn encode(&self, buf: &mut Vec<u8>) {
        self.as_str().encode(buf);
    }
}

/// Length-prefixed run, as used by arrays and list bodies.
impl<T: Encode> Encode for [T] {
    fn encode(&self, buf: &mut Vec<u8>) {
        (self.len() as i32).encode(buf);
        for item in self {
            item.encode(buf);
        }
    }
}

impl Encode for NbtCompound {
    fn encode(&self, buf: &mut Vec<u8>) {
        for (name, value) in &self.entries {
            buf.push(value.tag() as u8);
            name.encode(buf);
            value.encode(buf);
        }
        buf.push(Tag::End as u8);
    }
}

impl Encode for NbtList {
    fn encode(&self, buf: &mut Vec<u8>) {
        buf.push(self.element_tag() as u8);
        match self {
            Self::Empty => 0i32.encode(buf),
            Self::Byte(items) => items.encode(buf),
            Self::Short(items) => items.encode(buf),
            Self::Int(items) => items.encode(buf),
            Self::Long(items) => items.encode(buf),
            Self::Float(items) => items.encode(buf),
            Self::Double(items) => items.encode(buf),
            Self::String(items) => items.encode(buf),
            Self::Compound(items) => items.encode(buf),
        }
    }
}

impl Encode for NbtValue {
    fn encode(&self, buf: &mut Vec<u8>) {
        match self {
            Self::Byte(v) => v.encode(buf),
            Self::Short(v) => v.encode(buf),
            Self::Int(v) => v.encode(buf),
            Self::Long(v) => v.encode(buf),
            Self::Float(v) => v.encode(buf),
            Self::Double(v) => v.encode(buf),
            Self::ByteArray(v) => v.encode(buf),
            Self::String(v) => v.encode(buf),
            Self::List(v) => v.encode(buf),
            Self::Compound(v) => v.encode(buf),
            Self::IntArray(v) => v.encode(buf),
            Self::LongArray(v) => v.encode(buf),
        }
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for NbtValue {
                fn from(value: $ty) -> Self {
                    Self::$variant(value)
                }
            }
        )*
    };
}

value_from! {
    i8 => Byte,
    i16 => Short,
    i32 => Int,
    i64 => Long,
    f32 => Float,
    f64 => Double,
    String => String,
    Vec<i8> => ByteArray,
    Vec<i32> => IntArray,
    Vec<i64> => LongArray,
    NbtList => List,
    NbtCompound => Compound,
}

impl From<bool> for NbtValue {
    fn from(value: bool) -> Self {
        Self::Byte(i8::from(value))
    }
}

impl From<&str> for NbtValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

/// Build an [`NbtCompound`] from `key => value` pairs.
///
/// ```
/// use mc_protocol::nbt;
///
/// let compound = nbt! {
///     "id" => "minecraft:zombie",
///     "OnGround" => true,
///     "Air" => 300i16,
/// };
/// assert_eq!(compound.len(), 3);
/// ```
#[macro_export]
macro_rules! nbt {
    () => {
        $crate::nbt::NbtCompound::new()
    };

    ($($key:expr => $value:expr),* $(,)?) => {{
        let mut compound = $crate::nbt::NbtCompound::new();
        $(
            compound.insert($key, $value);
        )*
        compound
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_byte_entry_layout() {
        let compound = nbt! {
            "a" => 1i8,
        };

        // compound tag, byte tag, name "a", value 1, end
        assert_eq!(
            compound.to_network_bytes(),
            vec![Tag::Compound as u8, Tag::Byte as u8, 0, 1, b'a', 1, Tag::End as u8]
        );
    }

    #[test]
    fn insert_replaces_in_place() {
        let mut compound = nbt! {
            "OnGround" => false,
            "Air" => 300i16,
        };
        compound.insert("OnGround", true);

        assert_eq!(compound.len(), 2);
        assert_eq!(compound.get("OnGround"), Some(&NbtValue::Byte(1)));
        let expected = nbt! {
            "OnGround" => true,
            "Air" => 300i16,
        };
        assert_eq!(compound.to_network_bytes(), expected.to_network_bytes());
    }

    #[test]
    fn double_list_layout() {
        let compound = nbt! {
            "Pos" => NbtList::Double(vec![1.0, 2.0, 3.0]),
        };

        let bytes = compound.to_network_bytes();
        // compound + list tag + name(2 + 3) + element type + len(4) + 3 doubles + end
        assert_eq!(bytes.len(), 1 + 1 + 5 + 1 + 4 + 24 + 1);
        assert_eq!(bytes[7], Tag::Double as u8);
        assert_eq!(&bytes[8..12], &3i32.to_be_bytes());
    }

    #[test]
    fn nested_compound_lookup() {
        let compound = nbt! {
            "outer" => nbt! {
                "inner" => 123i32,
            },
        };

        let inner = compound
            .get("outer")
            .and_then(NbtValue::as_compound)
            .and_then(|c| c.get("inner"));
        assert_eq!(inner, Some(&NbtValue::Int(123)));
        assert!(!compound.contains_key("inner"));
    }

    #[test]
    fn empty_list_uses_end_tag() {
        let compound = nbt! {
            "Passengers" => NbtList::Empty,
        };
        let bytes = compound.to_network_bytes();
        // compound, list tag, name(2 + 10), end tag, zero length, end
        assert_eq!(&bytes[14..19], &[Tag::End as u8, 0, 0, 0, 0]);
        assert_eq!(bytes.len(), 20);
    }

    #[test]
    fn int_array_is_length_prefixed() {
        let compound = nbt! {
            "UUID" => vec![1i32, 2, 3, 4],
        };
        let bytes = compound.to_network_bytes();
        // compound, tag, name(2 + 4), len(4), 4 ints, end
        assert_eq!(bytes.len(), 1 + 1 + 6 + 4 + 16 + 1);
        assert_eq!(bytes[1], Tag::IntArray as u8);
        assert_eq!(&bytes[8..12], &4i32.to_be_bytes());
    }
}
