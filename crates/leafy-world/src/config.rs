//! Chunk registry configuration.

use serde::{Deserialize, Serialize};

use crate::table::{DEFAULT_CAPACITY, MIN_CAPACITY};

/// Largest accepted load margin in chunks.
pub const MAX_LOAD_MARGIN: i32 = 16;

/// Tunables for [`ChunkRegistry`](crate::registry::ChunkRegistry).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Initial chunk table slot count
    pub initial_capacity: usize,
    /// Maximum chunks constructed per tick (0 = unlimited)
    pub max_loads_per_tick: usize,
    /// Chunks kept resident beyond the visible rectangle on every side
    pub load_margin: i32,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            initial_capacity: DEFAULT_CAPACITY,
            max_loads_per_tick: 0,
            load_margin: 1,
        }
    }
}

impl RegistryConfig {
    /// Clamps values to sensible ranges.
    pub fn validate(&mut self) {
        self.initial_capacity = self.initial_capacity.max(MIN_CAPACITY);
        self.load_margin = self.load_margin.clamp(0, MAX_LOAD_MARGIN);
    }

    /// Returns a validated copy.
    #[must_use]
    pub fn validated(mut self) -> Self {
        self.validate();
        self
    }
}
