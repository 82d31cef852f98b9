//! Offline replay of captured Minecraft sessions through the entity index.
//!
//! A recording made by the capture proxy is walked in order; clientbound
//! play packets that spawn, move, describe, or remove entities are handed to
//! an [`mc_entity_index::EntityRegistry`], while chunk load and unload
//! packets drive the [`world::LoadedChunks`] set it marks dirty.

pub mod config;
pub mod dispatch;
pub mod recording;
pub mod spawn;
pub mod world;

pub use config::{PacketIds, ReplayConfig};
pub use dispatch::{Outcome, ReplaySummary, ReplayStats, Replayer};
pub use recording::{PacketDirection, PacketRecording, RecordedPacket, State};
