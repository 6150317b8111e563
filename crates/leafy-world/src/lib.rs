//! # Leafy World
//!
//! Spatial chunk registry for Leafy Hollows.
//!
//! This crate decides which chunks of the unbounded 2D world are in memory:
//! - Coordinate hashing and an open-addressed chunk table
//! - Load windows describing what should be resident
//! - Reconciliation of desired against resident chunks, with interior/border
//!   classification for simulation eligibility
//! - A per-tick registry driving external construction and teardown
//!
//! Terrain generation, rendering and persistence belong to the collaborators
//! plugged into [`ChunkRegistry`].

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod chunk;
pub mod config;
pub mod error;
pub mod hash;
pub mod reconcile;
pub mod registry;
pub mod table;
pub mod window;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::chunk::*;
    pub use crate::config::*;
    pub use crate::error::*;
    pub use crate::hash::*;
    pub use crate::reconcile::*;
    pub use crate::registry::*;
    pub use crate::table::*;
    pub use crate::window::*;
}

pub use prelude::*;
