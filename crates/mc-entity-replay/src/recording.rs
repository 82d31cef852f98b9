//! Packet recordings as written by the capture proxy.
//!
//! `raw_data` holds the whole uncompressed frame: the VarInt length prefix,
//! the VarInt packet id, then the body.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use eyre::WrapErr;
use mc_protocol::{DataTypeProvider, PacketReader};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum State {
    Handshaking,
    Status,
    Login,
    Configuration,
    Play,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PacketDirection {
    ClientToServer,
    ServerToClient,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedPacket {
    pub timestamp_ms: u64,
    pub state: State,
    pub direction: PacketDirection,
    pub packet_id: i32,
    pub packet_name: String,
    pub raw_data: Vec<u8>,
}

impl RecordedPacket {
    /// Frame a server-bound-to-client play packet around `body`.
    #[must_use]
    pub fn play(timestamp_ms: u64, packet_id: i32, packet_name: &str, body: &[u8]) -> Self {
        Self::framed(
            timestamp_ms,
            State::Play,
            PacketDirection::ServerToClient,
            packet_id,
            packet_name,
            body,
        )
    }

    #[must_use]
    pub fn framed(
        timestamp_ms: u64,
        state: State,
        direction: PacketDirection,
        packet_id: i32,
        packet_name: &str,
        body: &[u8],
    ) -> Self {
        let mut frame = mc_protocol::PacketWriter::new();
        frame.varint(packet_id);
        let mut inner = frame.into_bytes();
        inner.extend_from_slice(body);

        let mut raw = mc_protocol::PacketWriter::new();
        raw.varint(inner.len() as i32);
        let mut raw_data = raw.into_bytes();
        raw_data.extend_from_slice(&inner);

        Self {
            timestamp_ms,
            state,
            direction,
            packet_id,
            packet_name: packet_name.to_string(),
            raw_data,
        }
    }

    /// Strip the length prefix and packet id, returning the id and body.
    pub fn frame(&self) -> eyre::Result<(i32, &[u8])> {
        let mut reader = PacketReader::new(&self.raw_data);
        let length = reader.read_varint()?;
        if usize::try_from(length).ok() != Some(reader.remaining()) {
            eyre::bail!(
                "frame length {} does not match {} remaining bytes",
                length,
                reader.remaining()
            );
        }
        let packet_id = reader.read_varint()?;
        Ok((packet_id, reader.rest()))
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacketRecording {
    pub start_time: u64,
    pub packets: Vec<RecordedPacket>,
}

impl PacketRecording {
    pub fn load(path: impl AsRef<Path>) -> eyre::Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .wrap_err_with(|| format!("failed to open recording {}", path.display()))?;
        let recording: Self = serde_json::from_reader(BufReader::new(file))
            .wrap_err_with(|| format!("failed to parse recording {}", path.display()))?;
        info!("Loaded {} packets from {}", recording.packets.len(), path.display());
        Ok(recording)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> eyre::Result<()> {
        let file = File::create(path.as_ref())?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        Ok(())
    }
}
