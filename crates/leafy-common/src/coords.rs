//! Coordinate types for world, chunk, and local positions.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// Offsets of the eight chunks surrounding a chunk (Moore neighborhood).
pub const NEIGHBOR_OFFSETS: [(i32, i32); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// World coordinate in cells (global position).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Pod, Zeroable)]
#[repr(C)]
pub struct WorldCoord {
    /// X coordinate in world space
    pub x: i64,
    /// Y coordinate in world space
    pub y: i64,
}

impl WorldCoord {
    /// Creates a new world coordinate.
    #[must_use]
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    /// Converts to chunk coordinate given chunk size.
    #[must_use]
    pub const fn to_chunk_coord(self, chunk_size: u32) -> ChunkCoord {
        let size = chunk_size as i64;
        ChunkCoord {
            x: self.x.div_euclid(size) as i32,
            y: self.y.div_euclid(size) as i32,
        }
    }

    /// Converts to local coordinate within a chunk.
    #[must_use]
    pub const fn to_local_coord(self, chunk_size: u32) -> LocalCoord {
        let size = chunk_size as i64;
        LocalCoord {
            x: self.x.rem_euclid(size) as u16,
            y: self.y.rem_euclid(size) as u16,
        }
    }
}

/// Chunk coordinate (identifies a chunk on the unbounded chunk grid).
///
/// Ordering is by `x`, then `y`; it only exists so coordinate lists can be
/// reported deterministically.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Pod,
    Zeroable,
)]
#[repr(C)]
pub struct ChunkCoord {
    /// X coordinate in chunk space
    pub x: i32,
    /// Y coordinate in chunk space
    pub y: i32,
}

impl ChunkCoord {
    /// The origin chunk.
    pub const ZERO: Self = Self::new(0, 0);

    /// Creates a new chunk coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Returns the coordinate shifted by `(dx, dy)`, clamped to the `i32`
    /// range.
    #[must_use]
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
        }
    }

    /// Returns the coordinate shifted by `(dx, dy)`, or `None` if it falls
    /// off the representable grid.
    #[must_use]
    pub const fn checked_offset(self, dx: i32, dy: i32) -> Option<Self> {
        match (self.x.checked_add(dx), self.y.checked_add(dy)) {
            (Some(x), Some(y)) => Some(Self { x, y }),
            _ => None,
        }
    }

    /// Returns the surrounding chunk coordinates that exist on the grid.
    ///
    /// Chunks on the `i32` boundary have fewer than eight.
    pub fn neighbors(self) -> impl Iterator<Item = Self> {
        NEIGHBOR_OFFSETS
            .into_iter()
            .filter_map(move |(dx, dy)| self.checked_offset(dx, dy))
    }

    /// Whether all eight neighbors exist on the grid.
    #[must_use]
    pub const fn has_full_neighborhood(self) -> bool {
        self.x != i32::MIN && self.x != i32::MAX && self.y != i32::MIN && self.y != i32::MAX
    }

    /// Chebyshev (chessboard) distance to another chunk.
    #[must_use]
    pub const fn chebyshev_distance(self, other: Self) -> u32 {
        let dx = self.x.abs_diff(other.x);
        let dy = self.y.abs_diff(other.y);
        if dx > dy {
            dx
        } else {
            dy
        }
    }

    /// Converts to world coordinate (top-left corner of chunk).
    #[must_use]
    pub const fn to_world_coord(self, chunk_size: u32) -> WorldCoord {
        WorldCoord {
            x: (self.x as i64) * (chunk_size as i64),
            y: (self.y as i64) * (chunk_size as i64),
        }
    }
}

impl std::fmt::Display for ChunkCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl From<(i32, i32)> for ChunkCoord {
    fn from((x, y): (i32, i32)) -> Self {
        Self::new(x, y)
    }
}

/// Local coordinate within a chunk (0 to chunk_size-1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Pod, Zeroable)]
#[repr(C)]
pub struct LocalCoord {
    /// X coordinate within chunk
    pub x: u16,
    /// Y coordinate within chunk
    pub y: u16,
}

impl LocalCoord {
    /// Creates a new local coordinate.
    #[must_use]
    pub const fn new(x: u16, y: u16) -> Self {
        Self { x, y }
    }

    /// Converts to linear index for array access.
    #[must_use]
    pub const fn to_index(self, chunk_size: u32) -> usize {
        (self.y as usize) * (chunk_size as usize) + (self.x as usize)
    }

    /// Creates from linear index.
    #[must_use]
    pub const fn from_index(index: usize, chunk_size: u32) -> Self {
        let size = chunk_size as usize;
        Self {
            x: (index % size) as u16,
            y: (index / size) as u16,
        }
    }
}
