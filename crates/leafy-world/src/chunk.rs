//! Chunk payload: a fixed-size cell grid plus the entities inside it.
//!
//! The registry never looks inside a chunk. Constructors fill it, the
//! simulator and renderer read it, teardown collaborators flush it.

use bytemuck::{Pod, Zeroable};
use leafy_common::{ChunkCoord, EntityId, LocalCoord};

/// Side length of a chunk in cells.
pub const CHUNK_SIZE: u32 = 16;

/// Number of cells in a chunk.
pub const CHUNK_CELLS: usize = (CHUNK_SIZE * CHUNK_SIZE) as usize;

/// A single terrain cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct Cell {
    /// Material type ID (0 = air)
    pub material: u16,
    /// Cell flags
    pub flags: u8,
    /// Material-specific data
    pub data: u8,
}

impl Cell {
    /// Creates a new cell with the given material.
    #[must_use]
    pub const fn new(material: u16) -> Self {
        Self {
            material,
            flags: 0,
            data: 0,
        }
    }

    /// Creates an air cell.
    #[must_use]
    pub const fn air() -> Self {
        Self::new(0)
    }

    /// Whether the cell is air.
    #[must_use]
    pub const fn is_air(&self) -> bool {
        self.material == 0
    }
}

/// An entity stored in a chunk.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntityRecord {
    /// Entity id
    pub id: EntityId,
    /// Collaborator-defined entity kind
    pub kind: u16,
    /// Position in cells relative to the chunk origin
    pub position: (f32, f32),
}

impl EntityRecord {
    /// Creates a record with a freshly allocated id.
    #[must_use]
    pub fn spawn(kind: u16, position: (f32, f32)) -> Self {
        Self {
            id: EntityId::next(),
            kind,
            position,
        }
    }
}

/// A chunk of the world.
#[derive(Debug, Clone)]
pub struct Chunk {
    coord: ChunkCoord,
    cells: Box<[Cell; CHUNK_CELLS]>,
    entities: Vec<EntityRecord>,
    /// Whether the chunk has been modified since it was constructed or last
    /// flushed.
    dirty: bool,
}

impl Chunk {
    /// Creates an empty (all air) chunk.
    #[must_use]
    pub fn new(coord: ChunkCoord) -> Self {
        Self {
            coord,
            cells: Box::new([Cell::air(); CHUNK_CELLS]),
            entities: Vec::new(),
            dirty: false,
        }
    }

    /// Creates a chunk with every cell set to `cell`.
    #[must_use]
    pub fn filled(coord: ChunkCoord, cell: Cell) -> Self {
        Self {
            cells: Box::new([cell; CHUNK_CELLS]),
            ..Self::new(coord)
        }
    }

    /// Returns the chunk coordinate.
    #[must_use]
    pub const fn coord(&self) -> ChunkCoord {
        self.coord
    }

    /// Returns whether the chunk is dirty.
    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Marks the chunk as clean, e.g. after a teardown flush.
    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    /// Gets a cell at local coordinates.
    #[must_use]
    pub fn get_cell(&self, local: LocalCoord) -> Option<&Cell> {
        if u32::from(local.x) >= CHUNK_SIZE || u32::from(local.y) >= CHUNK_SIZE {
            return None;
        }
        self.cells.get(local.to_index(CHUNK_SIZE))
    }

    /// Sets a cell at local coordinates. Returns `false` when out of bounds.
    pub fn set_cell(&mut self, local: LocalCoord, cell: Cell) -> bool {
        if u32::from(local.x) >= CHUNK_SIZE || u32::from(local.y) >= CHUNK_SIZE {
            return false;
        }
        match self.cells.get_mut(local.to_index(CHUNK_SIZE)) {
            Some(slot) => {
                *slot = cell;
                self.dirty = true;
                true
            },
            None => false,
        }
    }

    /// Returns all cells in row-major order.
    #[must_use]
    pub fn cells(&self) -> &[Cell] {
        self.cells.as_slice()
    }

    /// Returns all cells mutably.
    pub fn cells_mut(&mut self) -> &mut [Cell] {
        self.dirty = true;
        self.cells.as_mut_slice()
    }

    /// Raw cell bytes, for collaborators that flush chunks to storage.
    #[must_use]
    pub fn cell_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(self.cells.as_slice())
    }

    /// Entities in insertion order.
    #[must_use]
    pub fn entities(&self) -> &[EntityRecord] {
        &self.entities
    }

    /// Entities, mutably (for the simulator).
    pub fn entities_mut(&mut self) -> &mut [EntityRecord] {
        self.dirty = true;
        &mut self.entities
    }

    /// Appends an entity.
    pub fn push_entity(&mut self, entity: EntityRecord) {
        self.entities.push(entity);
        self.dirty = true;
    }

    /// Removes an entity by id, preserving the order of the rest.
    pub fn remove_entity(&mut self, id: EntityId) -> Option<EntityRecord> {
        let index = self.entities.iter().position(|e| e.id == id)?;
        self.dirty = true;
        Some(self.entities.remove(index))
    }
}
