//! Deterministic hashing of chunk coordinates.
//!
//! The two axes are widened to their two's-complement bit patterns, placed in
//! independent halves of a 64-bit word by rotation and folded with XOR. The
//! fold is injective, so distinct coordinates never share a pre-mix value; the
//! final multiply-xorshift rounds spread clustered inputs (a player exploring a
//! contiguous region) over the low bits used for bucket selection.

use leafy_common::ChunkCoord;

/// Rotation applied to the x axis before folding.
pub const X_ROTATION: u32 = 32;

/// Multiplier for the avalanche rounds.
const MIX_MULTIPLIER: u64 = 0x517c_c1b7_2722_0a95;

#[inline]
fn mix64(mut h: u64) -> u64 {
    h = h.wrapping_mul(MIX_MULTIPLIER);
    h ^= h >> 32;
    h = h.wrapping_mul(MIX_MULTIPLIER);
    h ^= h >> 29;
    h
}

/// Hashes a chunk coordinate.
///
/// Pure and deterministic across runs and platforms. Negative coordinates
/// hash through their raw bit pattern, with no sign special-casing.
#[must_use]
#[inline]
pub fn hash_coord(coord: ChunkCoord) -> u64 {
    let x = u64::from(coord.x as u32);
    let y = u64::from(coord.y as u32);
    mix64(x.rotate_left(X_ROTATION) ^ y)
}

/// Maps a coordinate to its home bucket in a table of `capacity` slots.
#[must_use]
#[inline]
pub fn home_bucket(coord: ChunkCoord, capacity: usize) -> usize {
    debug_assert!(capacity > 0, "bucket requested for an empty table");
    (hash_coord(coord) % capacity as u64) as usize
}
