//! Error types for the chunk registry.

use leafy_common::ChunkCoord;
use thiserror::Error;

use crate::table::TableError;
use crate::window::WindowError;

/// Registry and reconciliation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum WorldError {
    /// Chunk table rejected an insert or removal. Seen from the registry this
    /// always means the resident/desired diff was wrong.
    #[error("Chunk table error: {0}")]
    Table(#[from] TableError),

    /// The viewpoint supplied an unusable load window.
    #[error("Window error: {0}")]
    Window(#[from] WindowError),

    /// A load was completed for a coordinate that is not loading.
    #[error("Chunk {0} was completed but is not loading")]
    NotLoading(ChunkCoord),

    /// An unload was completed for a coordinate that is not unloading.
    #[error("Chunk {0} was unloaded but is not unloading")]
    NotUnloading(ChunkCoord),

    /// The chunk is mid-transition and may not be mutated.
    #[error("Chunk {0} has a load or unload in flight")]
    InFlight(ChunkCoord),
}

/// Result type for registry operations.
pub type WorldResult<T> = Result<T, WorldError>;
