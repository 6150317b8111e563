//! Scripted viewpoint that wanders the world.
//!
//! Stands in for a player camera: each tick it drifts a few cells in a
//! direction that occasionally changes, and reports the chunk window the
//! registry should keep resident around it.

use leafy_common::{ChunkCoord, WorldCoord};
use leafy_world::{LoadWindow, ViewpointProvider, CHUNK_SIZE};

/// Largest per-axis drift per tick, in cells.
const MAX_STEP: i64 = 6;

/// Chance (out of 100) of picking a new heading on a tick.
const TURN_CHANCE: u32 = 8;

/// Random walk of a camera over the cell grid.
#[derive(Debug)]
pub struct ScriptedWalk {
    rng: fastrand::Rng,
    /// Camera center in cells
    position: WorldCoord,
    /// Drift per tick in cells
    heading: (i64, i64),
    view_width: i32,
    view_height: i32,
    margin: i32,
}

impl ScriptedWalk {
    /// Creates a walk centered on the world origin.
    #[must_use]
    pub fn new(seed: u64, view_width: i32, view_height: i32, margin: i32) -> Self {
        let mut walk = Self {
            rng: fastrand::Rng::with_seed(seed),
            position: WorldCoord::new(0, 0),
            heading: (0, 0),
            view_width,
            view_height,
            margin,
        };
        walk.turn();
        walk
    }

    /// Camera center in cells.
    #[must_use]
    pub const fn position(&self) -> WorldCoord {
        self.position
    }

    /// Chunk containing the camera center.
    #[must_use]
    pub const fn focus(&self) -> ChunkCoord {
        self.position.to_chunk_coord(CHUNK_SIZE)
    }

    /// Visible window with the camera chunk in the middle.
    #[must_use]
    pub const fn window(&self) -> LoadWindow {
        let view_origin = self.focus().offset(-self.view_width / 2, -self.view_height / 2);
        LoadWindow::around_view(view_origin, self.view_width, self.view_height, self.margin)
    }

    /// Advances the camera by one tick.
    pub fn step(&mut self) {
        if self.rng.u32(0..100) < TURN_CHANCE {
            self.turn();
        }
        self.position = WorldCoord::new(
            self.position.x + self.heading.0,
            self.position.y + self.heading.1,
        );
    }

    fn turn(&mut self) {
        self.heading = (
            self.rng.i64(-MAX_STEP..=MAX_STEP),
            self.rng.i64(-MAX_STEP..=MAX_STEP),
        );
    }
}

impl ViewpointProvider for ScriptedWalk {
    fn viewpoint(&mut self) -> LoadWindow {
        self.step();
        self.window()
    }
}
