//! Replay configuration, read from an optional JSON file.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use eyre::WrapErr;
use mc_entity_index::{DimensionId, RegistryConfig};
use serde::{Deserialize, Serialize};

/// Environment variable consulted when no config path is given.
pub const CONFIG_ENV: &str = "ENTITY_REPLAY_CONFIG";

/// Clientbound play packet ids. Defaults match protocol 767 (1.21).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PacketIds {
    pub spawn_entity: i32,
    pub unload_chunk: i32,
    pub chunk_data: i32,
    pub update_position: i32,
    pub update_position_rotation: i32,
    pub remove_entities: i32,
    pub set_entity_metadata: i32,
    pub set_equipment: i32,
    pub teleport_entity: i32,
    /// Login (play) and Respawn both start a fresh client world.
    pub login: i32,
    pub respawn: i32,
}

impl Default for PacketIds {
    fn default() -> Self {
        Self {
            spawn_entity: 0x01,
            unload_chunk: 0x21,
            chunk_data: 0x27,
            update_position: 0x2E,
            update_position_rotation: 0x2F,
            remove_entities: 0x42,
            set_entity_metadata: 0x58,
            set_equipment: 0x5A,
            teleport_entity: 0x70,
            login: 0x2B,
            respawn: 0x47,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReplayConfig {
    pub packets: PacketIds,
    /// Dimension every replayed chunk and entity belongs to.
    pub dimension: DimensionId,
    /// Entity type registry ids to names; unlisted ids export as `#<id>`.
    pub entity_types: BTreeMap<i32, String>,
    /// Default `tracing` directive, combined with `RUST_LOG`.
    pub log: String,
    pub registry: RegistryConfig,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            packets: PacketIds::default(),
            dimension: DimensionId::OVERWORLD,
            entity_types: BTreeMap::new(),
            log: "mc_entity_replay=info".to_string(),
            registry: RegistryConfig::default(),
        }
    }
}

impl ReplayConfig {
    pub fn load(path: impl AsRef<Path>) -> eyre::Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .wrap_err_with(|| format!("failed to open config {}", path.display()))?;
        serde_json::from_reader(BufReader::new(file))
            .wrap_err_with(|| format!("invalid config {}", path.display()))
    }

    /// Load from `path`, or fall back to defaults when there is none.
    pub fn load_or_default(path: Option<&Path>) -> eyre::Result<Self> {
        path.map_or_else(|| Ok(Self::default()), Self::load)
    }

    #[must_use]
    pub fn entity_type_name(&self, type_id: i32) -> String {
        self.entity_types
            .get(&type_id)
            .cloned()
            .unwrap_or_else(|| format!("#{type_id}"))
    }
}
