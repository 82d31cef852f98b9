//! Minecraft protocol primitives for decoding already-buffered packet payloads.
//!
//! The entity index never touches raw sockets. It receives a packet body that
//! has been framed upstream and pulls typed fields out of it through
//! [`DataTypeProvider`]. [`PacketReader`] is the slice-backed implementation;
//! [`PacketWriter`] builds payloads for fixtures and tooling.

pub mod nbt;

use std::io::{self, Cursor, Read, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProtocolError {
    /// The payload ended before the requested field was complete.
    #[error("truncated input: packet payload ended mid-field")]
    Truncated,
    #[error("IO error: {0}")]
    Io(#[source] io::Error),
    #[error("VarInt too large")]
    VarIntTooLarge,
    #[error("String too long: {len} > {max}")]
    StringTooLong { len: usize, max: usize },
    #[error("negative length prefix: {0}")]
    NegativeLength(i32),
    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

impl From<io::Error> for ProtocolError {
    fn from(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            Self::Truncated
        } else {
            Self::Io(err)
        }
    }
}

impl ProtocolError {
    /// Whether this error means the payload simply ran out of bytes.
    #[must_use]
    pub const fn is_truncated(&self) -> bool {
        matches!(self, Self::Truncated)
    }
}

pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Longest string the protocol allows, in characters.
pub const MAX_STRING_LEN: usize = 32767;

// VarInt encoding/decoding
pub fn read_varint<R: Read>(reader: &mut R) -> Result<i32> {
    let mut result = 0i32;
    let mut shift = 0;
    loop {
        let byte = reader.read_u8()?;
        result |= ((byte & 0x7F) as i32) << shift;
        if byte & 0x80 == 0 {
            break;
        }
        shift += 7;
        if shift >= 32 {
            return Err(ProtocolError::VarIntTooLarge);
        }
    }
    Ok(result)
}

pub fn write_varint<W: Write>(writer: &mut W, mut value: i32) -> Result<()> {
    loop {
        let mut byte = (value & 0x7F) as u8;
        value = ((value as u32) >> 7) as i32;
        if value != 0 {
            byte |= 0x80;
        }
        writer.write_u8(byte)?;
        if value == 0 {
            break;
        }
    }
    Ok(())
}

// VarLong encoding/decoding
pub fn read_varlong<R: Read>(reader: &mut R) -> Result<i64> {
    let mut result = 0i64;
    let mut shift = 0;
    loop {
        let byte = reader.read_u8()?;
        result |= ((byte & 0x7F) as i64) << shift;
        if byte & 0x80 == 0 {
            break;
        }
        shift += 7;
        if shift >= 64 {
            return Err(ProtocolError::VarIntTooLarge);
        }
    }
    Ok(result)
}

pub fn write_varlong<W: Write>(writer: &mut W, mut value: i64) -> Result<()> {
    loop {
        let mut byte = (value & 0x7F) as u8;
        value = ((value as u64) >> 7) as i64;
        if value != 0 {
            byte |= 0x80;
        }
        writer.write_u8(byte)?;
        if value == 0 {
            break;
        }
    }
    Ok(())
}

/// Typed reads over a pre-buffered packet payload.
///
/// Every method fails with [`ProtocolError::Truncated`] when the payload does
/// not hold enough bytes; callers propagate that and drop the packet.
pub trait DataTypeProvider {
    fn read_varint(&mut self) -> Result<i32>;
    fn read_varlong(&mut self) -> Result<i64>;
    fn read_byte(&mut self) -> Result<i8>;
    fn read_ubyte(&mut self) -> Result<u8>;
    fn read_bool(&mut self) -> Result<bool>;
    fn read_short(&mut self) -> Result<i16>;
    fn read_int(&mut self) -> Result<i32>;
    fn read_long(&mut self) -> Result<i64>;
    fn read_float(&mut self) -> Result<f32>;
    fn read_double(&mut self) -> Result<f64>;
    fn read_uuid(&mut self) -> Result<u128>;
    fn read_string(&mut self) -> Result<String>;
}

/// Cursor over a borrowed packet payload.
#[derive(Debug, Clone)]
pub struct PacketReader<'a> {
    cursor: Cursor<&'a [u8]>,
}

impl<'a> PacketReader<'a> {
    #[must_use]
    pub const fn new(payload: &'a [u8]) -> Self {
        Self {
            cursor: Cursor::new(payload),
        }
    }

    /// Bytes consumed so far.
    #[must_use]
    pub fn position(&self) -> usize {
        self.cursor.position() as usize
    }

    /// Bytes left to read.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.cursor.get_ref().len().saturating_sub(self.position())
    }

    /// The unread tail of the payload.
    #[must_use]
    pub fn rest(&self) -> &'a [u8] {
        let data: &'a [u8] = *self.cursor.get_ref();
        &data[self.position().min(data.len())..]
    }
}

impl DataTypeProvider for PacketReader<'_> {
    fn read_varint(&mut self) -> Result<i32> {
        read_varint(&mut self.cursor)
    }

    fn read_varlong(&mut self) -> Result<i64> {
        read_varlong(&mut self.cursor)
    }

    fn read_byte(&mut self) -> Result<i8> {
        Ok(self.cursor.read_i8()?)
    }

    fn read_ubyte(&mut self) -> Result<u8> {
        Ok(self.cursor.read_u8()?)
    }

    fn read_bool(&mut self) -> Result<bool> {
        Ok(self.cursor.read_u8()? != 0)
    }

    fn read_short(&mut self) -> Result<i16> {
        Ok(self.cursor.read_i16::<BigEndian>()?)
    }

    fn read_int(&mut self) -> Result<i32> {
        Ok(self.cursor.read_i32::<BigEndian>()?)
    }

    fn read_long(&mut self) -> Result<i64> {
        Ok(self.cursor.read_i64::<BigEndian>()?)
    }

    fn read_float(&mut self) -> Result<f32> {
        Ok(self.cursor.read_f32::<BigEndian>()?)
    }

    fn read_double(&mut self) -> Result<f64> {
        Ok(self.cursor.read_f64::<BigEndian>()?)
    }

    fn read_uuid(&mut self) -> Result<u128> {
        Ok(self.cursor.read_u128::<BigEndian>()?)
    }

    fn read_string(&mut self) -> Result<String> {
        let len = read_varint(&mut self.cursor)?;
        let len = usize::try_from(len).map_err(|_| ProtocolError::NegativeLength(len))?;
        // Length prefix counts UTF-8 bytes; each char is at most 3 bytes on the wire.
        if len > MAX_STRING_LEN * 3 {
            return Err(ProtocolError::StringTooLong {
                len,
                max: MAX_STRING_LEN * 3,
            });
        }
        if len > self.remaining() {
            return Err(ProtocolError::Truncated);
        }
        let mut buf = vec![0u8; len];
        self.cursor.read_exact(&mut buf)?;
        Ok(String::from_utf8(buf)?)
    }
}

/// Builds a packet payload field by field.
///
/// Writes go to a `Vec<u8>` and cannot fail, so the methods chain.
#[derive(Debug, Clone, Default)]
pub struct PacketWriter {
    buf: Vec<u8>,
}

impl PacketWriter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn varint(&mut self, value: i32) -> &mut Self {
        let written = write_varint(&mut self.buf, value);
        debug_assert!(written.is_ok());
        self
    }

    pub fn varlong(&mut self, value: i64) -> &mut Self {
        let written = write_varlong(&mut self.buf, value);
        debug_assert!(written.is_ok());
        self
    }

    pub fn byte(&mut self, value: i8) -> &mut Self {
        self.buf.push(value as u8);
        self
    }

    pub fn ubyte(&mut self, value: u8) -> &mut Self {
        self.buf.push(value);
        self
    }

    pub fn bool(&mut self, value: bool) -> &mut Self {
        self.buf.push(u8::from(value));
        self
    }

    pub fn short(&mut self, value: i16) -> &mut Self {
        self.buf.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub fn int(&mut self, value: i32) -> &mut Self {
        self.buf.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub fn long(&mut self, value: i64) -> &mut Self {
        self.buf.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub fn float(&mut self, value: f32) -> &mut Self {
        self.buf.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub fn double(&mut self, value: f64) -> &mut Self {
        self.buf.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub fn uuid(&mut self, value: u128) -> &mut Self {
        self.buf.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub fn string(&mut self, value: &str) -> &mut Self {
        self.varint(value.len() as i32);
        self.buf.extend_from_slice(value.as_bytes());
        self
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn varint_matches_wire_examples() {
        let cases: [(i32, &[u8]); 5] = [
            (0, &[0x00]),
            (1, &[0x01]),
            (300, &[0xAC, 0x02]),
            (2_147_483_647, &[0xFF, 0xFF, 0xFF, 0xFF, 0x07]),
            (-1, &[0xFF, 0xFF, 0xFF, 0xFF, 0x0F]),
        ];

        for (value, bytes) in cases {
            let mut writer = PacketWriter::new();
            writer.varint(value);
            assert_eq!(writer.as_bytes(), bytes, "encoding {value}");

            let mut reader = PacketReader::new(bytes);
            assert_eq!(reader.read_varint().unwrap(), value);
            assert_eq!(reader.remaining(), 0);
        }
    }

    #[test]
    fn oversized_varint_is_rejected() {
        let mut reader = PacketReader::new(&[0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01]);
        assert!(matches!(
            reader.read_varint(),
            Err(ProtocolError::VarIntTooLarge)
        ));
    }

    #[test]
    fn short_read_reports_truncation() {
        let mut reader = PacketReader::new(&[0x01]);
        let err = reader.read_short().unwrap_err();
        assert!(err.is_truncated());

        let mut reader = PacketReader::new(&[0x80]);
        assert!(reader.read_varint().unwrap_err().is_truncated());
    }

    #[test]
    fn string_length_is_checked_against_payload() {
        let mut writer = PacketWriter::new();
        writer.varint(10).ubyte(b'a');
        let mut reader = PacketReader::new(writer.as_bytes());
        assert!(reader.read_string().unwrap_err().is_truncated());

        let mut writer = PacketWriter::new();
        writer.varint(-4);
        let mut reader = PacketReader::new(writer.as_bytes());
        assert!(matches!(
            reader.read_string(),
            Err(ProtocolError::NegativeLength(-4))
        ));
    }

    #[test]
    fn mixed_fields_read_back_in_order() {
        let mut writer = PacketWriter::new();
        writer
            .varint(7)
            .uuid(0xDEAD_BEEF)
            .double(-12.5)
            .short(-4096)
            .float(1.5)
            .bool(true)
            .string("zombie")
            .varlong(-2);

        let mut reader = PacketReader::new(writer.as_bytes());
        assert_eq!(reader.read_varint().unwrap(), 7);
        assert_eq!(reader.read_uuid().unwrap(), 0xDEAD_BEEF);
        assert_eq!(reader.read_double().unwrap(), -12.5);
        assert_eq!(reader.read_short().unwrap(), -4096);
        assert_eq!(reader.read_float().unwrap(), 1.5);
        assert!(reader.read_bool().unwrap());
        assert_eq!(reader.read_string().unwrap(), "zombie");
        assert_eq!(reader.read_varlong().unwrap(), -2);
        assert!(reader.rest().is_empty());
    }

    #[test]
    fn writer_varints_match_free_functions() {
        for value in [0, 1, 127, 128, 25565, -1, i32::MIN] {
            let mut expected = Vec::new();
            write_varint(&mut expected, value).unwrap();
            write_varlong(&mut expected, i64::from(value) << 20).unwrap();

            let mut writer = PacketWriter::new();
            writer.varint(value).varlong(i64::from(value) << 20);
            assert_eq!(writer.into_bytes(), expected);
        }
    }

    #[test]
    fn free_functions_share_the_wire_format() {
        let mut buf = Vec::new();
        write_varint(&mut buf, 25565).unwrap();
        write_varlong(&mut buf, i64::MIN).unwrap();

        let mut cursor = Cursor::new(buf.as_slice());
        assert_eq!(read_varint(&mut cursor).unwrap(), 25565);
        assert_eq!(read_varlong(&mut cursor).unwrap(), i64::MIN);
    }
}
