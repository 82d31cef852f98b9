//! Routes recorded clientbound play packets to the entity registry.

use std::sync::Arc;

use mc_entity_index::{ChunkKey, EntityError, EntityRegistry};
use mc_protocol::{DataTypeProvider, PacketReader};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::ReplayConfig;
use crate::recording::{PacketDirection, PacketRecording, RecordedPacket, State};
use crate::spawn::SpawnParser;
use crate::world::LoadedChunks;

/// Login-state clientbound id of Set Compression.
const SET_COMPRESSION: i32 = 0x03;

/// What happened to a single recorded packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    /// Not a clientbound play packet the index cares about.
    Skipped,
    /// Decoding failed; the registry is unchanged.
    Rejected,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReplayStats {
    pub packets: usize,
    pub applied: usize,
    pub skipped: usize,
    pub rejected: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntitySummary {
    pub id: i32,
    pub kind: String,
    pub position: [f64; 3],
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChunkSummary {
    pub key: ChunkKey,
    pub loaded: bool,
    pub dirty_marks: u64,
    /// Size of the chunk's entities as network NBT.
    pub nbt_bytes: usize,
    pub entities: Vec<EntitySummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplaySummary {
    pub stats: ReplayStats,
    pub entities: usize,
    pub loaded_chunks: usize,
    pub chunks: Vec<ChunkSummary>,
}

pub struct Replayer {
    config: ReplayConfig,
    world: Arc<LoadedChunks>,
    registry: EntityRegistry<LoadedChunks>,
    stats: ReplayStats,
}

impl Replayer {
    #[must_use]
    pub fn new(config: ReplayConfig) -> Self {
        let world = Arc::new(LoadedChunks::new());
        let registry = EntityRegistry::with_config(Arc::clone(&world), config.registry);
        Self {
            config,
            world,
            registry,
            stats: ReplayStats::default(),
        }
    }

    #[must_use]
    pub const fn registry(&self) -> &EntityRegistry<LoadedChunks> {
        &self.registry
    }

    #[must_use]
    pub fn world(&self) -> &LoadedChunks {
        &self.world
    }

    #[must_use]
    pub const fn stats(&self) -> ReplayStats {
        self.stats
    }

    pub fn replay(&mut self, recording: &PacketRecording) -> eyre::Result<ReplayStats> {
        for (index, packet) in recording.packets.iter().enumerate() {
            let outcome = self.apply(packet)?;
            if outcome == Outcome::Rejected {
                warn!(
                    "#{} {} 0x{:02X} rejected at {}ms",
                    index, packet.packet_name, packet.packet_id, packet.timestamp_ms
                );
            }
        }
        info!(
            "Replayed {} packets: {} applied, {} skipped, {} rejected",
            self.stats.packets, self.stats.applied, self.stats.skipped, self.stats.rejected
        );
        Ok(self.stats)
    }

    /// Apply one recorded packet.
    ///
    /// Only a compressed recording is fatal; everything else is counted.
    pub fn apply(&mut self, packet: &RecordedPacket) -> eyre::Result<Outcome> {
        if packet.state == State::Login
            && packet.direction == PacketDirection::ServerToClient
            && packet.packet_id == SET_COMPRESSION
        {
            eyre::bail!("recording enables compression; only uncompressed frames can be replayed");
        }

        let outcome = if packet.state == State::Play
            && packet.direction == PacketDirection::ServerToClient
        {
            match packet.frame() {
                Ok((packet_id, body)) => self.dispatch(packet_id, body),
                Err(err) => {
                    debug!("malformed frame: {err}");
                    Outcome::Rejected
                }
            }
        } else {
            Outcome::Skipped
        };

        self.stats.packets += 1;
        match outcome {
            Outcome::Applied => self.stats.applied += 1,
            Outcome::Skipped => self.stats.skipped += 1,
            Outcome::Rejected => self.stats.rejected += 1,
        }
        Ok(outcome)
    }

    fn dispatch(&self, packet_id: i32, body: &[u8]) -> Outcome {
        let ids = self.config.packets;
        let mut reader = PacketReader::new(body);

        let result = if packet_id == ids.spawn_entity {
            let parser = SpawnParser::new(&self.config);
            self.registry
                .add_entity(&mut reader, |p| parser.parse(p))
                .map(drop)
        } else if packet_id == ids.update_position || packet_id == ids.update_position_rotation {
            self.registry.update_position_relative(&mut reader)
        } else if packet_id == ids.teleport_entity {
            self.registry.update_position_absolute(&mut reader)
        } else if packet_id == ids.set_entity_metadata {
            self.registry.add_metadata(&mut reader)
        } else if packet_id == ids.set_equipment {
            self.registry.add_equipment(&mut reader)
        } else if packet_id == ids.remove_entities {
            self.registry.remove_entities(&mut reader).map(drop)
        } else if packet_id == ids.chunk_data {
            self.chunk_loaded(&mut reader)
        } else if packet_id == ids.unload_chunk {
            self.chunk_unloaded(&mut reader)
        } else if packet_id == ids.login || packet_id == ids.respawn {
            self.reset();
            Ok(())
        } else {
            return Outcome::Skipped;
        };

        match result {
            Ok(()) => Outcome::Applied,
            Err(err) => {
                debug!("packet 0x{packet_id:02X}: {err}");
                Outcome::Rejected
            }
        }
    }

    /// Forget every entity and loaded chunk; the client is entering a new world.
    pub fn reset(&self) {
        self.registry.reset();
        self.world.clear();
        debug!("world reset");
    }

    /// Chunk Data starts with the chunk X then Z.
    fn chunk_loaded(&self, reader: &mut PacketReader<'_>) -> Result<(), EntityError> {
        let x = reader.read_int()?;
        let z = reader.read_int()?;
        self.world.load(ChunkKey::new(self.config.dimension, x, z));
        Ok(())
    }

    /// Unload Chunk carries Z before X.
    fn chunk_unloaded(&self, reader: &mut PacketReader<'_>) -> Result<(), EntityError> {
        let z = reader.read_int()?;
        let x = reader.read_int()?;
        let key = ChunkKey::new(self.config.dimension, x, z);
        self.registry.unload_chunk(key);
        self.world.unload(key);
        Ok(())
    }

    /// Per-chunk view of the reconstructed index, in key order.
    #[must_use]
    pub fn summary(&self) -> ReplaySummary {
        let chunks = self
            .registry
            .tracked_chunks()
            .into_iter()
            .map(|key| self.chunk_summary(key))
            .collect();

        ReplaySummary {
            stats: self.stats,
            entities: self.registry.entity_count(),
            loaded_chunks: self.world.loaded_count(),
            chunks,
        }
    }

    fn chunk_summary(&self, key: ChunkKey) -> ChunkSummary {
        let nbt_bytes = self
            .registry
            .get_entities_nbt(key)
            .map(|tag| tag.to_network_bytes().len())
            .sum();
        let entities = self
            .registry
            .entities_in(key)
            .into_iter()
            .filter_map(|id| {
                self.registry.with_entity(id, |record| {
                    let position = record.position();
                    EntitySummary {
                        id,
                        kind: record.kind().to_string(),
                        position: [position.x, position.y, position.z],
                    }
                })
            })
            .collect();

        ChunkSummary {
            key,
            loaded: self.world.is_loaded(key),
            dirty_marks: self.world.dirty_marks(key),
            nbt_bytes,
            entities,
        }
    }
}
