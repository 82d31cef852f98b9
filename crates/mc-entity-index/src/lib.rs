//! Entity spatial index for world-state reconstruction.
//!
//! Decoded play packets (spawns, moves, metadata, equipment, despawns) update
//! an identity-keyed [`EntityTable`] and, in lockstep, a [`ChunkMembership`]
//! index from chunk to the entities standing in it. The export path reads a
//! chunk's entities as NBT while packet workers keep mutating.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  EntityRegistry<W: WorldState>                                │
//! │    - decodes packet fields through DataTypeProvider           │
//! │    - runs transition::plan on every position change           │
//! │    - marks target chunks dirty in W                           │
//! └──────────────────────────────────────────────────────────────┘
//!            │                                   │
//!            ▼                                   ▼
//! ┌──────────────────────────────┐  ┌────────────────────────────┐
//! │  EntityTable                 │  │  ChunkMembership           │
//! │    id → Arc<Mutex<Record>>   │  │    ChunkKey → {id}         │
//! │    sharded RwLocks           │  │    atomic transfer / take  │
//! └──────────────────────────────┘  └────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! let registry = EntityRegistry::new(world);
//! registry.add_entity(&mut PacketReader::new(payload), parse_spawn)?;
//! registry.update_position_relative(&mut PacketReader::new(payload))?;
//!
//! for tag in registry.get_entities_nbt(chunk) {
//!     writer.push_entity(tag);
//! }
//! registry.unload_chunk(chunk);
//! ```

pub mod attributes;
pub mod config;
mod error;
pub mod key;
pub mod membership;
pub mod record;
mod registry;
pub mod table;
pub mod transition;
mod world;

pub use attributes::{AttributeBag, ItemStack, MetadataEntry, MetadataValue};
pub use config::RegistryConfig;
pub use error::{EntityError, EntityResult};
pub use key::{ChunkKey, DimensionId};
pub use membership::{ChunkMembership, MemberSet};
pub use record::{EntityId, EntityPosition, EntityRecord, PositionChange, Rotation};
pub use registry::EntityRegistry;
pub use table::{EntityTable, SharedRecord};
pub use transition::Transition;
pub use world::WorldState;
