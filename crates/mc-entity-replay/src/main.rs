//! Replays a packet recording and reports the reconstructed entity index.
//!
//! Usage: `mc-entity-replay [config.json|-] [recording.json] [summary.json]`
//!
//! Without a config argument (or with `-`) the path in `ENTITY_REPLAY_CONFIG`
//! is used, falling back to built-in defaults.

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use mc_entity_replay::config::CONFIG_ENV;
use mc_entity_replay::{PacketRecording, ReplayConfig, Replayer};
use tracing::info;

fn main() -> eyre::Result<()> {
    color_eyre::install()?;

    let config_path = std::env::args()
        .nth(1)
        .filter(|arg| arg != "-")
        .or_else(|| std::env::var(CONFIG_ENV).ok())
        .map(PathBuf::from);
    let recording_path = std::env::args()
        .nth(2)
        .unwrap_or("recording.json".to_string());
    let summary_path = std::env::args().nth(3);

    let config = ReplayConfig::load_or_default(config_path.as_deref())?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(config.log.parse()?),
        )
        .init();

    info!("MC Entity Replay");
    match &config_path {
        Some(path) => info!("Config: {}", path.display()),
        None => info!("Config: defaults"),
    }
    info!("Recording: {}", recording_path);

    let recording = PacketRecording::load(&recording_path)?;
    let mut replayer = Replayer::new(config);
    replayer.replay(&recording)?;

    let summary = replayer.summary();
    info!(
        "{} entities across {} chunks, {} chunks loaded",
        summary.entities,
        summary.chunks.len(),
        summary.loaded_chunks
    );
    for chunk in &summary.chunks {
        info!(
            "  {} loaded={} dirty={} entities={} nbt={}B",
            chunk.key,
            chunk.loaded,
            chunk.dirty_marks,
            chunk.entities.len(),
            chunk.nbt_bytes
        );
    }

    if let Some(path) = summary_path {
        let file = File::create(&path)?;
        serde_json::to_writer_pretty(BufWriter::new(file), &summary)?;
        info!("Saved summary to {}", path);
    }

    Ok(())
}
