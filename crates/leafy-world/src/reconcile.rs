//! Reconciliation of desired against resident chunks.
//!
//! Every coordinate moves through
//! `Unloaded -> Loading -> Resident -> Unloading -> Unloaded`, with resident
//! chunks further split into interior (all eight neighbors resident, so the
//! chunk may be simulated) and border. A coordinate in `Loading` or
//! `Unloading` is excluded from planning until its transition completes,
//! which caps every coordinate at one in-flight transition.

use std::collections::{HashMap, HashSet};

use leafy_common::ChunkCoord;
use tracing::{debug, trace};

use crate::chunk::Chunk;
use crate::error::{WorldError, WorldResult};
use crate::table::ChunkTable;

/// Lifecycle state of a chunk coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ResidencyState {
    /// Not in memory and not requested.
    #[default]
    Unloaded,
    /// Requested from the chunk constructor, not yet resident.
    Loading,
    /// Resident, at least one neighbor absent. Rendered, not simulated.
    ResidentBorder,
    /// Resident with all eight neighbors resident. Rendered and simulated.
    ResidentInterior,
    /// Left the desired set, waiting to be handed to teardown.
    Unloading,
}

impl ResidencyState {
    /// Whether the chunk is in the table.
    #[must_use]
    pub const fn is_resident(self) -> bool {
        matches!(self, Self::ResidentBorder | Self::ResidentInterior | Self::Unloading)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transition {
    Loading,
    Unloading,
}

/// Load and unload instructions produced by one planning pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcilePlan {
    /// Coordinates to construct, nearest to the focus first.
    pub to_load: Vec<ChunkCoord>,
    /// Coordinates to tear down.
    pub to_unload: Vec<ChunkCoord>,
    /// Missing coordinates held back by the load budget.
    pub postponed: usize,
}

impl ReconcilePlan {
    /// Whether the plan changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.to_load.is_empty() && self.to_unload.is_empty()
    }
}

/// Owns the chunk table and drives chunk lifecycle against a desired set.
pub struct Reconciler {
    table: ChunkTable<Chunk>,
    transitions: HashMap<ChunkCoord, Transition>,
    interior: HashSet<ChunkCoord>,
}

impl Reconciler {
    /// Creates a reconciler around an (usually empty) table.
    ///
    /// Chunks already in the table are classified immediately.
    #[must_use]
    pub fn new(table: ChunkTable<Chunk>) -> Self {
        let mut reconciler = Self {
            table,
            transitions: HashMap::new(),
            interior: HashSet::new(),
        };
        let resident: Vec<_> = reconciler.table.iter().map(|(coord, _)| coord).collect();
        for coord in resident {
            reconciler.reclassify(coord);
        }
        reconciler
    }

    /// Diffs `desired` against the resident set and marks the result as
    /// in flight.
    ///
    /// `to_load` is ordered by Chebyshev distance from `focus` and capped at
    /// `max_loads` when that is non-zero; the remainder is reported as
    /// postponed and will be planned again on a later pass.
    ///
    /// # Panics
    ///
    /// Panics if a coordinate lands in both `to_load` and `to_unload`.
    pub fn plan(
        &mut self,
        desired: &HashSet<ChunkCoord>,
        focus: ChunkCoord,
        max_loads: usize,
    ) -> ReconcilePlan {
        let resident = self.table.resident_coordinates();

        let mut to_load: Vec<ChunkCoord> = desired
            .iter()
            .filter(|coord| !resident.contains(*coord) && !self.transitions.contains_key(*coord))
            .copied()
            .collect();
        let mut to_unload: Vec<ChunkCoord> = resident
            .iter()
            .filter(|coord| !desired.contains(*coord) && !self.transitions.contains_key(*coord))
            .copied()
            .collect();

        // `to_unload` is drawn from `resident`, so this rules out overlap.
        assert!(
            to_load.iter().all(|coord| !resident.contains(coord)),
            "a coordinate was planned for both load and unload"
        );

        to_load.sort_unstable_by_key(|coord| (coord.chebyshev_distance(focus), *coord));
        to_unload.sort_unstable();

        let mut postponed = 0;
        if max_loads > 0 && to_load.len() > max_loads {
            postponed = to_load.len() - max_loads;
            to_load.truncate(max_loads);
        }

        for coord in &to_load {
            self.transitions.insert(*coord, Transition::Loading);
        }
        for coord in &to_unload {
            self.transitions.insert(*coord, Transition::Unloading);
        }

        trace!(
            "Planned {} loads, {} unloads, {} postponed",
            to_load.len(),
            to_unload.len(),
            postponed
        );

        ReconcilePlan {
            to_load,
            to_unload,
            postponed,
        }
    }

    /// Moves a loading coordinate into the table.
    ///
    /// # Panics
    ///
    /// Panics if `chunk` belongs to another coordinate.
    pub fn complete_load(&mut self, coord: ChunkCoord, chunk: Chunk) -> WorldResult<()> {
        if self.transitions.get(&coord) != Some(&Transition::Loading) {
            return Err(WorldError::NotLoading(coord));
        }
        assert_eq!(
            chunk.coord(),
            coord,
            "constructor returned a chunk for another coordinate"
        );

        self.table.insert(coord, chunk)?;
        self.transitions.remove(&coord);
        self.reclassify_around(coord);

        debug!("Loaded chunk {}", coord);
        Ok(())
    }

    /// Removes an unloading coordinate from the table and hands back its
    /// payload.
    pub fn complete_unload(&mut self, coord: ChunkCoord) -> WorldResult<Chunk> {
        if self.transitions.get(&coord) != Some(&Transition::Unloading) {
            return Err(WorldError::NotUnloading(coord));
        }

        let chunk = self.table.remove(coord)?;
        self.transitions.remove(&coord);
        self.reclassify_around(coord);

        debug!("Unloaded chunk {}", coord);
        Ok(chunk)
    }

    /// Empties the table, abandoning any in-flight loads.
    pub fn drain(&mut self) -> Vec<(ChunkCoord, Chunk)> {
        self.transitions.clear();
        self.interior.clear();
        self.table.drain()
    }

    /// Current state of a coordinate.
    #[must_use]
    pub fn state(&self, coord: ChunkCoord) -> ResidencyState {
        match self.transitions.get(&coord) {
            Some(Transition::Loading) => ResidencyState::Loading,
            Some(Transition::Unloading) => ResidencyState::Unloading,
            None if self.interior.contains(&coord) => ResidencyState::ResidentInterior,
            None if self.table.contains(coord) => ResidencyState::ResidentBorder,
            None => ResidencyState::Unloaded,
        }
    }

    /// Whether a resident chunk has all eight neighbors resident.
    #[must_use]
    pub fn is_interior(&self, coord: ChunkCoord) -> bool {
        self.interior.contains(&coord)
    }

    /// Resident coordinates, sorted.
    #[must_use]
    pub fn resident_coords(&self) -> Vec<ChunkCoord> {
        let mut coords: Vec<_> = self.table.iter().map(|(coord, _)| coord).collect();
        coords.sort_unstable();
        coords
    }

    /// Interior coordinates, sorted.
    #[must_use]
    pub fn interior_coords(&self) -> Vec<ChunkCoord> {
        let mut coords: Vec<_> = self.interior.iter().copied().collect();
        coords.sort_unstable();
        coords
    }

    /// Coordinates with a transition in flight.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.transitions.len()
    }

    /// Read access to the table.
    #[must_use]
    pub const fn table(&self) -> &ChunkTable<Chunk> {
        &self.table
    }

    /// Looks up a resident chunk.
    pub fn chunk(&self, coord: ChunkCoord) -> WorldResult<&Chunk> {
        Ok(self.table.lookup(coord)?)
    }

    /// Looks up a resident chunk mutably.
    ///
    /// Chunks with a transition in flight are not handed out.
    pub fn chunk_mut(&mut self, coord: ChunkCoord) -> WorldResult<&mut Chunk> {
        if self.transitions.contains_key(&coord) {
            return Err(WorldError::InFlight(coord));
        }
        Ok(self.table.lookup_mut(coord)?)
    }

    /// Iterates over resident chunks (render set).
    pub fn resident_chunks(&self) -> impl Iterator<Item = (ChunkCoord, &Chunk)> + '_ {
        self.table.iter()
    }

    /// Iterates over interior chunks (simulation set).
    pub fn interior_chunks(&self) -> impl Iterator<Item = (ChunkCoord, &Chunk)> + '_ {
        self.table
            .iter()
            .filter(|(coord, _)| self.interior.contains(coord))
    }

    /// Neighbors off the edge of the grid count as absent.
    fn all_neighbors_resident(&self, coord: ChunkCoord) -> bool {
        coord.has_full_neighborhood()
            && coord.neighbors().all(|neighbor| self.table.contains(neighbor))
    }

    /// Recomputes the classification of one coordinate.
    fn reclassify(&mut self, coord: ChunkCoord) {
        if self.table.contains(coord) && self.all_neighbors_resident(coord) {
            self.interior.insert(coord);
        } else {
            self.interior.remove(&coord);
        }
    }

    /// Recomputes a coordinate and its neighbors after its residency changed.
    fn reclassify_around(&mut self, coord: ChunkCoord) {
        self.reclassify(coord);
        for neighbor in coord.neighbors() {
            self.reclassify(neighbor);
        }
    }
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new(ChunkTable::new())
    }
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("table", &self.table)
            .field("in_flight", &self.transitions.len())
            .field("interior", &self.interior.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::desired_set;
    use leafy_common::NEIGHBOR_OFFSETS;
    use proptest::prelude::*;

    fn coord(x: i32, y: i32) -> ChunkCoord {
        ChunkCoord::new(x, y)
    }

    /// Plans and applies synchronously, returning the plan.
    fn reconcile(reconciler: &mut Reconciler, desired: &HashSet<ChunkCoord>) -> ReconcilePlan {
        let plan = reconciler.plan(desired, ChunkCoord::ZERO, 0);
        for &c in &plan.to_unload {
            reconciler.complete_unload(c).expect("unload failed");
        }
        for &c in &plan.to_load {
            reconciler.complete_load(c, Chunk::new(c)).expect("load failed");
        }
        plan
    }

    /// Interior set straight from the definition.
    fn interior_by_definition(reconciler: &Reconciler) -> Vec<ChunkCoord> {
        let resident = reconciler.table().resident_coordinates();
        let mut interior: Vec<_> = resident
            .iter()
            .filter(|c| NEIGHBOR_OFFSETS.iter().all(|&(dx, dy)| {
                c.checked_offset(dx, dy).is_some_and(|n| resident.contains(&n))
            }))
            .copied()
            .collect();
        interior.sort_unstable();
        interior
    }

    #[test]
    fn test_three_by_three_classification() {
        let mut reconciler = Reconciler::default();
        let desired = desired_set(coord(0, 0), 3, 3).expect("valid window");
        let plan = reconcile(&mut reconciler, &desired);

        assert_eq!(plan.to_load.len(), 9);
        assert_eq!(plan.to_load[0], coord(0, 0));
        assert_eq!(reconciler.state(coord(1, 1)), ResidencyState::ResidentInterior);
        for c in &desired {
            if *c != coord(1, 1) {
                assert_eq!(reconciler.state(*c), ResidencyState::ResidentBorder, "{c}");
            }
        }
        assert_eq!(reconciler.interior_coords(), vec![coord(1, 1)]);
    }

    #[test]
    fn test_second_pass_is_empty() {
        let mut reconciler = Reconciler::default();
        let desired = desired_set(coord(-4, 2), 5, 4).expect("valid window");
        reconcile(&mut reconciler, &desired);
        let plan = reconcile(&mut reconciler, &desired);
        assert!(plan.is_empty());
    }

    #[test]
    fn test_shift_window() {
        let mut reconciler = Reconciler::default();
        reconcile(&mut reconciler, &desired_set(coord(0, 0), 3, 3).expect("valid"));

        let plan = reconcile(&mut reconciler, &desired_set(coord(1, 0), 3, 3).expect("valid"));
        let mut to_load = plan.to_load.clone();
        to_load.sort_unstable();
        assert_eq!(plan.to_unload, vec![coord(0, 0), coord(0, 1), coord(0, 2)]);
        assert_eq!(to_load, vec![coord(3, 0), coord(3, 1), coord(3, 2)]);

        assert_eq!(reconciler.state(coord(0, 1)), ResidencyState::Unloaded);
        assert_eq!(reconciler.state(coord(2, 1)), ResidencyState::ResidentInterior);
        assert_eq!(reconciler.state(coord(1, 1)), ResidencyState::ResidentBorder);
    }

    #[test]
    fn test_in_flight_coordinates_are_not_replanned() {
        let mut reconciler = Reconciler::default();
        let desired = desired_set(coord(0, 0), 2, 1).expect("valid");

        let first = reconciler.plan(&desired, ChunkCoord::ZERO, 0);
        assert_eq!(first.to_load.len(), 2);
        assert_eq!(reconciler.state(coord(1, 0)), ResidencyState::Loading);

        let second = reconciler.plan(&desired, ChunkCoord::ZERO, 0);
        assert!(second.is_empty());
        assert_eq!(reconciler.in_flight(), 2);
    }

    #[test]
    fn test_load_budget_prioritises_focus() {
        let mut reconciler = Reconciler::default();
        let desired = desired_set(coord(-2, -2), 5, 5).expect("valid");

        let plan = reconciler.plan(&desired, coord(0, 0), 9);
        assert_eq!(plan.to_load.len(), 9);
        assert_eq!(plan.postponed, 16);
        assert_eq!(plan.to_load[0], coord(0, 0));
        assert!(plan.to_load.iter().all(|c| c.chebyshev_distance(coord(0, 0)) <= 1));
    }

    #[test]
    fn test_completion_checks_transition() {
        let mut reconciler = Reconciler::default();
        assert_eq!(
            reconciler.complete_load(coord(5, 5), Chunk::new(coord(5, 5))),
            Err(WorldError::NotLoading(coord(5, 5)))
        );
        assert_eq!(
            reconciler.complete_unload(coord(5, 5)).map(|_| ()),
            Err(WorldError::NotUnloading(coord(5, 5)))
        );
    }

    #[test]
    fn test_drain_empties_everything() {
        let mut reconciler = Reconciler::default();
        reconcile(&mut reconciler, &desired_set(coord(0, 0), 4, 4).expect("valid"));
        reconciler.plan(&desired_set(coord(10, 10), 1, 1).expect("valid"), ChunkCoord::ZERO, 0);

        let drained = reconciler.drain();
        assert_eq!(drained.len(), 16);
        assert_eq!(reconciler.in_flight(), 0);
        assert!(reconciler.interior_coords().is_empty());
        assert_eq!(reconciler.state(coord(10, 10)), ResidencyState::Unloaded);
    }

    #[test]
    #[should_panic(expected = "constructor returned a chunk for another coordinate")]
    fn test_mismatched_chunk_is_fatal() {
        let mut reconciler = Reconciler::default();
        let desired = desired_set(coord(0, 0), 1, 1).expect("valid");
        reconciler.plan(&desired, ChunkCoord::ZERO, 0);
        let _ = reconciler.complete_load(coord(0, 0), Chunk::new(coord(3, 3)));
    }

    #[test]
    fn test_grid_edge_chunks_stay_border() {
        let mut reconciler = Reconciler::default();
        let desired = desired_set(coord(i32::MAX - 2, 0), 3, 3).expect("valid");
        let plan = reconcile(&mut reconciler, &desired);

        assert_eq!(plan.to_load.len(), 9);
        assert!(plan.to_load.iter().all(|c| c.x >= i32::MAX - 2));
        assert_eq!(reconciler.interior_coords(), vec![coord(i32::MAX - 1, 1)]);
        assert_eq!(reconciler.state(coord(i32::MAX, 1)), ResidencyState::ResidentBorder);
        assert_eq!(reconciler.interior_coords(), interior_by_definition(&reconciler));

        // A window hanging over the edge keeps the edge column border.
        let desired = desired_set(coord(i32::MAX - 2, 0), 10, 3).expect("valid");
        reconcile(&mut reconciler, &desired);
        assert_eq!(reconciler.table().len(), 9);
        assert_eq!(reconciler.state(coord(i32::MAX, 1)), ResidencyState::ResidentBorder);
    }

    #[test]
    fn test_preloaded_table_is_classified() {
        let mut table = ChunkTable::new();
        for c in desired_set(coord(0, 0), 3, 3).expect("valid") {
            table.insert(c, Chunk::new(c)).expect("insert failed");
        }
        let reconciler = Reconciler::new(table);
        assert_eq!(reconciler.interior_coords(), vec![coord(1, 1)]);
    }

    proptest! {
        #[test]
        fn prop_classification_matches_definition(
            windows in prop::collection::vec((-6i32..6, -6i32..6, 0i32..7, 0i32..7), 1..12)
        ) {
            let mut reconciler = Reconciler::default();
            for (x, y, w, h) in windows {
                let desired = desired_set(coord(x, y), w, h).expect("valid");
                reconcile(&mut reconciler, &desired);

                prop_assert_eq!(reconciler.table().resident_coordinates(), desired);
                prop_assert_eq!(reconciler.interior_coords(), interior_by_definition(&reconciler));
                prop_assert_eq!(reconciler.in_flight(), 0);
            }
        }
    }
}
