//! # Leafy Common
//!
//! Shared types for Leafy Hollows.
//!
//! This crate provides the foundational types used by the world registry and
//! its collaborators:
//! - Coordinate types (world, chunk, local) and chunk neighborhoods
//! - Entity ids
//! - Prelude for convenient imports

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod coords;
pub mod ids;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::coords::*;
    pub use crate::ids::*;
}

pub use prelude::*;
