//! Open-addressed chunk table keyed by chunk coordinate.
//!
//! All entries live in a single slot array. Collisions are resolved by linear
//! probing from the coordinate's home bucket, wrapping at the end of the
//! array. The table doubles (full rehash into a freshly allocated array)
//! before an insertion would push the load factor past [`MAX_LOAD_FACTOR`],
//! and removal closes the hole by shifting later chain members back, so no
//! tombstones ever exist.

use std::collections::HashSet;

use leafy_common::ChunkCoord;
use thiserror::Error;
use tracing::debug;

use crate::hash::home_bucket;

/// Default slot count of a new table.
pub const DEFAULT_CAPACITY: usize = 64;

/// Smallest slot count a table is created with.
pub const MIN_CAPACITY: usize = 8;

/// Upper bound on `len / capacity` after any insertion.
pub const MAX_LOAD_FACTOR: f64 = 0.7;

// MAX_LOAD_FACTOR as an exact ratio, so the growth check stays in integers.
const LOAD_NUMERATOR: usize = 7;
const LOAD_DENOMINATOR: usize = 10;

/// Chunk table errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TableError {
    /// The coordinate is already resident.
    #[error("Chunk {0} is already resident")]
    DuplicateKey(ChunkCoord),
    /// The coordinate is not resident.
    #[error("Chunk {0} is not resident")]
    NotFound(ChunkCoord),
}

/// Result type for chunk table operations.
pub type TableResult<T> = Result<T, TableError>;

/// An occupied slot.
#[derive(Debug)]
struct Slot<T> {
    coord: ChunkCoord,
    value: T,
}

/// Open-addressed map from [`ChunkCoord`] to a chunk payload.
///
/// A slot holding `Some` is occupied; the set of occupied coordinates is
/// exactly the set of resident chunks.
pub struct ChunkTable<T> {
    slots: Box<[Option<Slot<T>>]>,
    len: usize,
}

fn empty_slots<T>(capacity: usize) -> Box<[Option<Slot<T>>]> {
    std::iter::repeat_with(|| None).take(capacity).collect()
}

/// Whether holding `len` entries in `capacity` slots breaks the load bound.
const fn over_threshold(len: usize, capacity: usize) -> bool {
    len * LOAD_DENOMINATOR > capacity * LOAD_NUMERATOR
}

/// Whether `home` lies in the cyclic interval `(hole, index]`.
///
/// An entry at `index` whose home is in that interval would become
/// unreachable if moved back into `hole`.
const fn home_between(hole: usize, home: usize, index: usize) -> bool {
    if hole <= index {
        hole < home && home <= index
    } else {
        hole < home || home <= index
    }
}

/// Places `entry` in the first free slot of its probe sequence.
fn place<T>(slots: &mut [Option<Slot<T>>], entry: Slot<T>) -> &mut Slot<T> {
    let capacity = slots.len();
    let start = home_bucket(entry.coord, capacity);
    let mut index = start;
    while slots[index].is_some() {
        index = (index + 1) % capacity;
        assert!(
            index != start,
            "chunk table probe wrapped without a free slot ({capacity} slots); \
             load factor invariant broken"
        );
    }
    slots[index].insert(entry)
}

impl<T> ChunkTable<T> {
    /// Creates an empty table with [`DEFAULT_CAPACITY`] slots.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Creates an empty table with at least `capacity` slots.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: empty_slots(capacity.max(MIN_CAPACITY)),
            len: 0,
        }
    }

    /// Number of resident chunks.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether no chunk is resident.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of slots.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Current `len / capacity` ratio.
    #[must_use]
    pub fn load_factor(&self) -> f64 {
        self.len as f64 / self.slots.len() as f64
    }

    /// Inserts a chunk, returning a handle to the stored payload.
    ///
    /// Grows the table first when the insertion would exceed
    /// [`MAX_LOAD_FACTOR`].
    pub fn insert(&mut self, coord: ChunkCoord, value: T) -> TableResult<&mut T> {
        if self.find_slot(coord).is_some() {
            return Err(TableError::DuplicateKey(coord));
        }

        while over_threshold(self.len + 1, self.slots.len()) {
            self.grow();
        }

        let slot = place(&mut self.slots, Slot { coord, value });
        self.len += 1;
        Ok(&mut slot.value)
    }

    /// Removes a chunk and hands back its payload.
    pub fn remove(&mut self, coord: ChunkCoord) -> TableResult<T> {
        let index = self.find_slot(coord).ok_or(TableError::NotFound(coord))?;
        let Some(slot) = self.slots[index].take() else {
            return Err(TableError::NotFound(coord));
        };
        self.len -= 1;
        self.close_gap(index);
        Ok(slot.value)
    }

    /// Looks up a resident chunk.
    pub fn lookup(&self, coord: ChunkCoord) -> TableResult<&T> {
        self.find_slot(coord)
            .and_then(|index| self.slots[index].as_ref())
            .map(|slot| &slot.value)
            .ok_or(TableError::NotFound(coord))
    }

    /// Looks up a resident chunk mutably.
    pub fn lookup_mut(&mut self, coord: ChunkCoord) -> TableResult<&mut T> {
        match self.find_slot(coord) {
            Some(index) => self.slots[index]
                .as_mut()
                .map(|slot| &mut slot.value)
                .ok_or(TableError::NotFound(coord)),
            None => Err(TableError::NotFound(coord)),
        }
    }

    /// Whether `coord` is resident.
    #[must_use]
    pub fn contains(&self, coord: ChunkCoord) -> bool {
        self.find_slot(coord).is_some()
    }

    /// Snapshot of every resident coordinate.
    #[must_use]
    pub fn resident_coordinates(&self) -> HashSet<ChunkCoord> {
        self.iter().map(|(coord, _)| coord).collect()
    }

    /// Iterates over resident chunks in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (ChunkCoord, &T)> + '_ {
        self.slots
            .iter()
            .flatten()
            .map(|slot| (slot.coord, &slot.value))
    }

    /// Removes every entry, keeping the current capacity.
    pub fn drain(&mut self) -> Vec<(ChunkCoord, T)> {
        let capacity = self.slots.len();
        let slots = std::mem::replace(&mut self.slots, empty_slots(capacity));
        self.len = 0;
        slots
            .into_vec()
            .into_iter()
            .flatten()
            .map(|slot| (slot.coord, slot.value))
            .collect()
    }

    /// Walks the probe sequence of `coord` and returns its slot index.
    fn find_slot(&self, coord: ChunkCoord) -> Option<usize> {
        let capacity = self.slots.len();
        let start = home_bucket(coord, capacity);
        let mut index = start;
        loop {
            match &self.slots[index] {
                None => return None,
                Some(slot) if slot.coord == coord => return Some(index),
                Some(_) => {},
            }
            index = (index + 1) % capacity;
            if index == start {
                return None;
            }
        }
    }

    /// Back-shift deletion: pulls later members of the probe chain into the
    /// vacated slot until an empty slot ends the chain.
    fn close_gap(&mut self, mut hole: usize) {
        let capacity = self.slots.len();
        let mut index = (hole + 1) % capacity;
        while let Some(slot) = &self.slots[index] {
            let home = home_bucket(slot.coord, capacity);
            if !home_between(hole, home, index) {
                self.slots[hole] = self.slots[index].take();
                hole = index;
            }
            index = (index + 1) % capacity;
        }
    }

    /// Doubles capacity and rehashes every entry into the new array.
    ///
    /// The new array is allocated before any entry moves, so an allocation
    /// failure leaves the table untouched.
    fn grow(&mut self) {
        let old_capacity = self.slots.len();
        let new_capacity = old_capacity
            .checked_mul(2)
            .expect("chunk table capacity overflow");

        let mut grown = empty_slots(new_capacity);
        for entry in self.slots.iter_mut().filter_map(Option::take) {
            place(&mut grown, entry);
        }
        self.slots = grown;

        debug!(
            "Chunk table grew from {} to {} slots ({} resident)",
            old_capacity, new_capacity, self.len
        );
    }
}

impl<T> Default for ChunkTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for ChunkTable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkTable")
            .field("len", &self.len)
            .field("capacity", &self.slots.len())
            .finish_non_exhaustive()
    }
}
