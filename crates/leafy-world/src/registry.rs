//! Per-tick chunk residency management.
//!
//! [`ChunkRegistry`] owns the load window and the [`Reconciler`]. Each tick it
//! plans against the window, hands unloaded chunks to a [`ChunkTeardown`],
//! asks a [`ChunkConstructor`] for missing ones and reports what the renderer
//! (every resident chunk) and the simulator (interior chunks only) should see.
//!
//! ## Deferred construction
//!
//! A constructor may answer [`Construction::Deferred`]. The coordinate then
//! stays `Loading`, is skipped by later ticks, and becomes resident once the
//! caller passes the chunk to [`ChunkRegistry::complete_load`]. If the window
//! moved away in the meantime the chunk is still inserted and is unloaded on
//! the next tick.

use leafy_common::ChunkCoord;
use tracing::{debug, error, info, warn};

use crate::chunk::Chunk;
use crate::config::RegistryConfig;
use crate::error::WorldResult;
use crate::reconcile::{Reconciler, ResidencyState};
use crate::table::ChunkTable;
use crate::window::LoadWindow;

/// Outcome of asking a constructor for a chunk.
#[derive(Debug)]
pub enum Construction {
    /// The chunk is ready now.
    Ready(Chunk),
    /// The chunk will be delivered later through
    /// [`ChunkRegistry::complete_load`].
    Deferred,
}

/// Builds chunk payloads for coordinates entering the load window.
pub trait ChunkConstructor {
    /// Produces (or starts producing) the chunk at `coord`.
    fn construct(&mut self, coord: ChunkCoord) -> Construction;
}

impl<F> ChunkConstructor for F
where
    F: FnMut(ChunkCoord) -> Chunk,
{
    fn construct(&mut self, coord: ChunkCoord) -> Construction {
        Construction::Ready(self(coord))
    }
}

/// Receives chunks leaving the load window, e.g. to flush them to storage.
///
/// Called exactly once per unload, never for a coordinate still in the
/// window.
pub trait ChunkTeardown {
    /// Takes ownership of an unloaded chunk.
    fn teardown(&mut self, coord: ChunkCoord, chunk: Chunk);
}

impl<F> ChunkTeardown for F
where
    F: FnMut(ChunkCoord, Chunk),
{
    fn teardown(&mut self, coord: ChunkCoord, chunk: Chunk) {
        self(coord, chunk);
    }
}

/// Supplies the load window once per tick, already in chunk units.
pub trait ViewpointProvider {
    /// The window that should be resident this tick.
    fn viewpoint(&mut self) -> LoadWindow;
}

/// What a tick did and what is resident afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Tick number (1-based)
    pub tick: u64,
    /// Coordinates requested from the constructor, nearest first
    pub to_load: Vec<ChunkCoord>,
    /// Coordinates handed to teardown
    pub to_unload: Vec<ChunkCoord>,
    /// Requested coordinates whose construction was deferred
    pub deferred: Vec<ChunkCoord>,
    /// Missing coordinates held back by the load budget
    pub postponed: usize,
    /// Every resident coordinate (render set)
    pub resident: Vec<ChunkCoord>,
    /// Interior coordinates (simulation set)
    pub interior: Vec<ChunkCoord>,
}

impl TickReport {
    /// Whether the tick changed nothing.
    #[must_use]
    pub fn is_quiet(&self) -> bool {
        self.to_load.is_empty() && self.to_unload.is_empty() && self.postponed == 0
    }
}

/// Owns which chunks exist in memory and where they are.
pub struct ChunkRegistry {
    config: RegistryConfig,
    window: LoadWindow,
    reconciler: Reconciler,
    ticks: u64,
}

impl ChunkRegistry {
    /// Creates a registry with an empty window.
    #[must_use]
    pub fn new(config: RegistryConfig) -> Self {
        let config = config.validated();
        info!(
            "Creating chunk registry: initial_capacity={}, max_loads_per_tick={}, load_margin={}",
            config.initial_capacity, config.max_loads_per_tick, config.load_margin
        );

        Self {
            reconciler: Reconciler::new(ChunkTable::with_capacity(config.initial_capacity)),
            config,
            window: LoadWindow::EMPTY,
            ticks: 0,
        }
    }

    /// Creates a registry with an initial window.
    #[must_use]
    pub fn with_window(config: RegistryConfig, window: LoadWindow) -> Self {
        let mut registry = Self::new(config);
        registry.window = window;
        registry
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Returns the current load window.
    #[must_use]
    pub const fn window(&self) -> LoadWindow {
        self.window
    }

    /// Replaces the load window. Takes effect on the next tick.
    pub fn set_window(&mut self, window: LoadWindow) {
        if window != self.window {
            debug!("Load window changed: {:?} -> {:?}", self.window, window);
            self.window = window;
        }
    }

    /// Moves the load window. Takes effect on the next tick.
    pub fn set_window_position(&mut self, origin: ChunkCoord) {
        let mut window = self.window;
        window.set_position(origin);
        self.set_window(window);
    }

    /// Resizes the load window. Takes effect on the next tick.
    pub fn set_window_size(&mut self, width: i32, height: i32) {
        let mut window = self.window;
        window.set_size(width, height);
        self.set_window(window);
    }

    /// Sets the window to the visible rectangle plus the configured margin.
    pub fn follow_view(&mut self, view_origin: ChunkCoord, view_width: i32, view_height: i32) {
        self.set_window(LoadWindow::around_view(
            view_origin,
            view_width,
            view_height,
            self.config.load_margin,
        ));
    }

    /// Number of ticks run so far.
    #[must_use]
    pub const fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Runs one reconciliation pass against the current window.
    ///
    /// An invalid window is reported and the tick is skipped with no
    /// residency change.
    pub fn tick<C, T>(&mut self, constructor: &mut C, teardown: &mut T) -> WorldResult<TickReport>
    where
        C: ChunkConstructor + ?Sized,
        T: ChunkTeardown + ?Sized,
    {
        let desired = match self.window.desired_set() {
            Ok(desired) => desired,
            Err(e) => {
                warn!("Skipping tick {}: {e}", self.ticks + 1);
                return Err(e.into());
            },
        };
        self.ticks += 1;

        let plan = self
            .reconciler
            .plan(&desired, self.window.center(), self.config.max_loads_per_tick);

        for &coord in &plan.to_unload {
            let chunk = self.reconciler.complete_unload(coord).map_err(|e| {
                error!("Unload of chunk {coord} failed: {e}");
                e
            })?;
            teardown.teardown(coord, chunk);
        }

        let mut deferred = Vec::new();
        for &coord in &plan.to_load {
            match constructor.construct(coord) {
                Construction::Ready(chunk) => {
                    self.reconciler.complete_load(coord, chunk).map_err(|e| {
                        error!("Load of chunk {coord} failed: {e}");
                        e
                    })?;
                },
                Construction::Deferred => deferred.push(coord),
            }
        }

        let report = TickReport {
            tick: self.ticks,
            to_load: plan.to_load,
            to_unload: plan.to_unload,
            deferred,
            postponed: plan.postponed,
            resident: self.reconciler.resident_coords(),
            interior: self.reconciler.interior_coords(),
        };

        debug!(
            "Tick {}: {} loaded, {} unloaded, {} deferred, {} postponed, {} resident, {} interior",
            report.tick,
            report.to_load.len() - report.deferred.len(),
            report.to_unload.len(),
            report.deferred.len(),
            report.postponed,
            report.resident.len(),
            report.interior.len()
        );

        Ok(report)
    }

    /// Pulls the window from a viewpoint provider, then ticks.
    pub fn tick_with<V, C, T>(
        &mut self,
        viewpoint: &mut V,
        constructor: &mut C,
        teardown: &mut T,
    ) -> WorldResult<TickReport>
    where
        V: ViewpointProvider + ?Sized,
        C: ChunkConstructor + ?Sized,
        T: ChunkTeardown + ?Sized,
    {
        self.set_window(viewpoint.viewpoint());
        self.tick(constructor, teardown)
    }

    /// Delivers a chunk whose construction was deferred.
    pub fn complete_load(&mut self, chunk: Chunk) -> WorldResult<()> {
        self.reconciler.complete_load(chunk.coord(), chunk)
    }

    /// Tears down every resident chunk and abandons pending loads.
    ///
    /// Returns the number of chunks handed to `teardown`.
    pub fn shutdown<T>(&mut self, teardown: &mut T) -> usize
    where
        T: ChunkTeardown + ?Sized,
    {
        let pending = self.reconciler.in_flight();
        let drained = self.reconciler.drain();
        let count = drained.len();
        for (coord, chunk) in drained {
            teardown.teardown(coord, chunk);
        }
        self.window = LoadWindow::EMPTY;

        info!(
            "Chunk registry shut down: {count} chunks torn down, {pending} transitions abandoned"
        );
        count
    }

    /// Current state of a coordinate.
    #[must_use]
    pub fn state(&self, coord: ChunkCoord) -> ResidencyState {
        self.reconciler.state(coord)
    }

    /// Looks up a resident chunk.
    pub fn chunk(&self, coord: ChunkCoord) -> WorldResult<&Chunk> {
        self.reconciler.chunk(coord)
    }

    /// Looks up a resident chunk mutably.
    pub fn chunk_mut(&mut self, coord: ChunkCoord) -> WorldResult<&mut Chunk> {
        self.reconciler.chunk_mut(coord)
    }

    /// Number of resident chunks.
    #[must_use]
    pub fn resident_count(&self) -> usize {
        self.reconciler.table().len()
    }

    /// Resident coordinates, sorted.
    #[must_use]
    pub fn resident_coords(&self) -> Vec<ChunkCoord> {
        self.reconciler.resident_coords()
    }

    /// Interior coordinates, sorted.
    #[must_use]
    pub fn interior_coords(&self) -> Vec<ChunkCoord> {
        self.reconciler.interior_coords()
    }

    /// Every resident chunk, for rendering.
    pub fn resident_chunks(&self) -> impl Iterator<Item = (ChunkCoord, &Chunk)> + '_ {
        self.reconciler.resident_chunks()
    }

    /// Interior chunks, for simulation.
    pub fn interior_chunks(&self) -> impl Iterator<Item = (ChunkCoord, &Chunk)> + '_ {
        self.reconciler.interior_chunks()
    }

    /// Read access to the reconciler.
    #[must_use]
    pub const fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }
}

impl std::fmt::Debug for ChunkRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkRegistry")
            .field("window", &self.window)
            .field("ticks", &self.ticks)
            .field("resident", &self.resident_count())
            .field("in_flight", &self.reconciler.in_flight())
            .finish_non_exhaustive()
    }
}
