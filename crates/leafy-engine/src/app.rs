//! Headless run loop.
//!
//! Wires the scripted walk, a flat-fill constructor and a flushing teardown
//! to the chunk registry, then ticks it for the configured run length.

use anyhow::{Context, Result};
use leafy_common::{ChunkCoord, LocalCoord};
use leafy_world::{
    Cell, Chunk, ChunkConstructor, ChunkRegistry, ChunkTeardown, Construction, EntityRecord,
    CHUNK_SIZE,
};
use tracing::{debug, info, trace};

use crate::config::EngineConfig;
use crate::viewpoint::ScriptedWalk;

/// Material id of the ground fill.
const GROUND: u16 = 1;

/// Entity kind dropped into freshly built surface chunks.
const CRITTER: u16 = 1;

/// Totals for a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Ticks run
    pub ticks: u64,
    /// Chunks constructed
    pub loads: u64,
    /// Chunks torn down, including at shutdown
    pub unloads: u64,
    /// Torn down chunks that had been modified
    pub flushed: u64,
}

/// Builds chunks as flat fills: air above row zero, ground below.
#[derive(Debug, Default)]
struct FlatConstructor {
    built: u64,
}

impl ChunkConstructor for FlatConstructor {
    fn construct(&mut self, coord: ChunkCoord) -> Construction {
        self.built += 1;
        let mut chunk = if coord.y >= 0 {
            Chunk::filled(coord, Cell::new(GROUND))
        } else {
            Chunk::new(coord)
        };
        if coord.y == -1 {
            let center = (CHUNK_SIZE / 2) as f32;
            chunk.push_entity(EntityRecord::spawn(CRITTER, (center, center)));
        }
        Construction::Ready(chunk)
    }
}

/// Counts torn down chunks and clears their dirty flag as a stand-in for
/// writing them out.
#[derive(Debug, Default)]
struct FlushTeardown {
    torn_down: u64,
    flushed: u64,
}

impl ChunkTeardown for FlushTeardown {
    fn teardown(&mut self, coord: ChunkCoord, mut chunk: Chunk) {
        self.torn_down += 1;
        if chunk.is_dirty() {
            trace!(
                "Flushing chunk {coord}: {} bytes, {} entities",
                chunk.cell_bytes().len(),
                chunk.entities().len()
            );
            chunk.mark_clean();
            self.flushed += 1;
        }
    }
}

/// Touches one cell in every interior chunk.
///
/// Only interior chunks have all neighbors resident, so only they are
/// eligible for simulation.
fn simulate(registry: &mut ChunkRegistry, tick: u64) -> Result<()> {
    let local = LocalCoord::new((tick % u64::from(CHUNK_SIZE)) as u16, 0);
    for coord in registry.interior_coords() {
        let chunk = registry
            .chunk_mut(coord)
            .with_context(|| format!("interior chunk {coord} not accessible"))?;
        let cell = chunk.get_cell(local).copied().unwrap_or_default();
        chunk.set_cell(local, Cell { data: cell.data.wrapping_add(1), ..cell });
    }
    Ok(())
}

/// Runs the registry for `config.ticks` ticks and shuts it down.
pub fn run(config: &EngineConfig) -> Result<RunSummary> {
    let mut registry = ChunkRegistry::new(config.registry.clone());
    let mut walk = ScriptedWalk::new(
        config.seed,
        config.view_width,
        config.view_height,
        registry.config().load_margin,
    );
    let mut constructor = FlatConstructor::default();
    let mut teardown = FlushTeardown::default();

    info!(
        "Running {} ticks with a {}x{} chunk view (seed {:#x})",
        config.ticks, config.view_width, config.view_height, config.seed
    );

    for _ in 0..config.ticks {
        let report = registry.tick_with(&mut walk, &mut constructor, &mut teardown)?;
        simulate(&mut registry, report.tick)?;

        if !report.is_quiet() {
            debug!(
                "Tick {}: camera at {:?}, +{} -{}",
                report.tick,
                walk.position(),
                report.to_load.len(),
                report.to_unload.len()
            );
        }

        if config.log_summary_every > 0 && report.tick % u64::from(config.log_summary_every) == 0 {
            info!(
                "Tick {}: {} resident, {} interior, {} built, {} torn down",
                report.tick,
                report.resident.len(),
                report.interior.len(),
                constructor.built,
                teardown.torn_down
            );
        }
    }

    let ticks = registry.ticks();
    registry.shutdown(&mut teardown);

    Ok(RunSummary {
        ticks,
        loads: constructor.built,
        unloads: teardown.torn_down,
        flushed: teardown.flushed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use leafy_world::ResidencyState;

    fn small_config() -> EngineConfig {
        EngineConfig {
            ticks: 120,
            log_summary_every: 0,
            view_width: 4,
            view_height: 3,
            ..EngineConfig::default()
        }
    }

    #[test]
    fn test_run_tears_down_everything_it_built() {
        let summary = run(&small_config()).expect("run failed");

        assert_eq!(summary.ticks, 120);
        assert!(summary.loads > 0);
        assert_eq!(summary.loads, summary.unloads);
        assert!(summary.flushed > 0);
        assert!(summary.flushed <= summary.unloads);
    }

    #[test]
    fn test_run_is_deterministic_per_seed() {
        let config = small_config();
        assert_eq!(run(&config).expect("run failed"), run(&config).expect("run failed"));
    }

    #[test]
    fn test_load_budget_still_drains() {
        let mut config = small_config();
        config.registry.max_loads_per_tick = 2;
        let summary = run(&config).expect("run failed");
        assert_eq!(summary.loads, summary.unloads);
    }

    #[test]
    fn test_flat_constructor_layers() {
        let mut constructor = FlatConstructor::default();
        let Construction::Ready(ground) = constructor.construct(ChunkCoord::new(0, 0)) else {
            panic!("expected a ready chunk");
        };
        let Construction::Ready(surface) = constructor.construct(ChunkCoord::new(0, -1)) else {
            panic!("expected a ready chunk");
        };

        assert!(ground.cells().iter().all(|c| c.material == GROUND));
        assert!(surface.cells().iter().all(Cell::is_air));
        assert_eq!(surface.entities().len(), 1);
        assert_eq!(constructor.built, 2);
    }

    #[test]
    fn test_simulate_only_dirties_interior() {
        let mut registry = ChunkRegistry::with_window(
            leafy_world::RegistryConfig::default(),
            leafy_world::LoadWindow::new(ChunkCoord::new(0, 0), 3, 3),
        );
        let mut constructor = FlatConstructor::default();
        let mut teardown = FlushTeardown::default();
        registry
            .tick(&mut constructor, &mut teardown)
            .expect("tick failed");

        simulate(&mut registry, 1).expect("simulate failed");

        for (coord, chunk) in registry.resident_chunks() {
            let interior = registry.state(coord) == ResidencyState::ResidentInterior;
            assert_eq!(chunk.is_dirty(), interior, "{coord}");
        }

        assert_eq!(registry.shutdown(&mut teardown), 9);
        assert_eq!(teardown.flushed, 1);
    }
}
