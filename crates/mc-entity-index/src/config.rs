//! Registry configuration.

use serde::{Deserialize, Serialize};

use crate::table::DEFAULT_SHARDS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegistryConfig {
    /// Lock shards in the entity table, rounded up to a power of two.
    pub table_shards: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            table_shards: DEFAULT_SHARDS,
        }
    }
}
