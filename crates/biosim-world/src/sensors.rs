//! Sensor evaluation.
//!
//! Every sensor maps arena, signal or self state onto `0.0..=1.0`. Sensors
//! only read shared state. Signal cells may be bumped by other agents while a
//! step is in flight, so with more than one worker thread the signal sensors
//! can observe either side of a concurrent emission.

use crate::grid::Grid;
use crate::signals::{Signals, SIGNAL_MAX};
use biosim_core::{Coord, Dir, Sensor, SimulationConfig};
use biosim_genome::{genome_similarity, Genome};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use std::f32::consts::TAU;
use std::sync::Arc;

/// Shared read-only state for one step of the agent phase.
pub struct StepContext<'a> {
    pub grid: &'a Grid,
    pub signals: &'a Signals,
    /// Genomes by agent slot, `genomes[index - 1]`
    pub genomes: &'a [Arc<Genome>],
    pub config: &'a SimulationConfig,
    pub generation: u32,
    /// Step within the generation
    pub step: u32,
}

impl StepContext<'_> {
    fn genome_of(&self, index: usize) -> Option<&Genome> {
        index
            .checked_sub(1)
            .and_then(|i| self.genomes.get(i))
            .map(|g| g.as_ref())
    }
}

/// The parts of an agent its sensors may read.
pub struct AgentView<'a> {
    pub index: usize,
    pub loc: Coord,
    pub age: u32,
    pub last_move_dir: Dir,
    pub osc_period: u32,
    pub long_probe_dist: u32,
    pub genome: &'a Genome,
}

pub fn sense(agent: &AgentView<'_>, sensor: Sensor, ctx: &StepContext<'_>, rng: &mut ChaCha8Rng) -> f32 {
    let grid = ctx.grid;
    let cfg = &ctx.config.sensors;
    let (w, h) = (grid.width() as f32, grid.height() as f32);
    let loc = agent.loc;

    let value = match sensor {
        Sensor::LocX => ratio(loc.x as f32, w - 1.0),
        Sensor::LocY => ratio(loc.y as f32, h - 1.0),
        Sensor::BoundaryDistX => {
            let min_x = (loc.x as f32).min(w - loc.x as f32 - 1.0);
            ratio(min_x, w / 2.0)
        }
        Sensor::BoundaryDistY => {
            let min_y = (loc.y as f32).min(h - loc.y as f32 - 1.0);
            ratio(min_y, h / 2.0)
        }
        Sensor::BoundaryDist => {
            let min_x = (loc.x as f32).min(w - loc.x as f32 - 1.0);
            let min_y = (loc.y as f32).min(h - loc.y as f32 - 1.0);
            let max_possible = (w / 2.0 - 1.0).max(h / 2.0 - 1.0);
            ratio(min_x.min(min_y), max_possible)
        }
        Sensor::GeneticSimFwd => {
            let ahead = loc + agent.last_move_dir;
            grid.agent_at(ahead)
                .and_then(|other| ctx.genome_of(other))
                .map(|other| genome_similarity(agent.genome, other, ctx.config.genome.comparison))
                .unwrap_or(0.0)
        }
        Sensor::LastMoveDirX => (agent.last_move_dir.as_normalized_coord().x as f32 + 1.0) / 2.0,
        Sensor::LastMoveDirY => (agent.last_move_dir.as_normalized_coord().y as f32 + 1.0) / 2.0,
        Sensor::LongProbePopFwd => {
            let dist = agent.long_probe_dist.max(1);
            long_probe_population_fwd(grid, loc, agent.last_move_dir, dist) as f32 / dist as f32
        }
        Sensor::LongProbeBarFwd => {
            let dist = agent.long_probe_dist.max(1);
            long_probe_barrier_fwd(grid, loc, agent.last_move_dir, dist) as f32 / dist as f32
        }
        Sensor::Population => {
            let mut cells = 0u32;
            let mut occupied = 0u32;
            grid.visit_neighborhood(loc, cfg.population_sensor_radius, |c| {
                cells += 1;
                if grid.is_occupied_at(c) {
                    occupied += 1;
                }
            });
            ratio(occupied as f32, cells as f32)
        }
        Sensor::PopulationFwd => {
            population_along_axis(grid, loc, agent.last_move_dir, cfg.population_sensor_radius)
        }
        Sensor::PopulationLr => population_along_axis(
            grid,
            loc,
            agent.last_move_dir.rotate_90_cw(),
            cfg.population_sensor_radius,
        ),
        Sensor::Osc1 => {
            let period = agent.osc_period.max(1);
            let phase = (ctx.step % period) as f32 / period as f32;
            (-(phase * TAU).cos() + 1.0) / 2.0
        }
        Sensor::Age => ratio(agent.age as f32, ctx.config.run.steps_per_generation as f32),
        Sensor::BarrierFwd => short_probe_barrier(
            grid,
            loc,
            agent.last_move_dir,
            cfg.short_probe_barrier_distance,
        ),
        Sensor::BarrierLr => short_probe_barrier(
            grid,
            loc,
            agent.last_move_dir.rotate_90_cw(),
            cfg.short_probe_barrier_distance,
        ),
        Sensor::Random => rng.gen::<f32>(),
        Sensor::Signal0 => signal_density(grid, ctx.signals, 0, loc, cfg.signal_sensor_radius),
        Sensor::Signal0Fwd => signal_along_axis(
            grid,
            ctx.signals,
            0,
            loc,
            agent.last_move_dir,
            cfg.signal_sensor_radius,
        ),
        Sensor::Signal0Lr => signal_along_axis(
            grid,
            ctx.signals,
            0,
            loc,
            agent.last_move_dir.rotate_90_cw(),
            cfg.signal_sensor_radius,
        ),
        Sensor::Bias => 1.0,
    };

    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

fn ratio(numerator: f32, denominator: f32) -> f32 {
    if denominator <= 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

/// Cells walked before hitting an agent; the full distance when the probe
/// meets the edge or a barrier first.
pub fn long_probe_population_fwd(grid: &Grid, loc: Coord, dir: Dir, distance: u32) -> u32 {
    let mut count = 0;
    let mut probe = loc + dir;
    let mut remaining = distance;
    while remaining > 0 && grid.is_in_bounds(probe) && grid.is_empty_at(probe) {
        count += 1;
        probe = probe + dir;
        remaining -= 1;
    }
    if remaining > 0 && (!grid.is_in_bounds(probe) || grid.is_barrier_at(probe)) {
        distance
    } else {
        count
    }
}

/// Cells walked before hitting a barrier; the full distance when the probe
/// meets the edge or an agent first.
pub fn long_probe_barrier_fwd(grid: &Grid, loc: Coord, dir: Dir, distance: u32) -> u32 {
    let mut count = 0;
    let mut probe = loc + dir;
    let mut remaining = distance;
    while remaining > 0 && grid.is_in_bounds(probe) && !grid.is_barrier_at(probe) {
        count += 1;
        probe = probe + dir;
        remaining -= 1;
    }
    if remaining > 0 && !grid.is_in_bounds(probe) {
        distance
    } else {
        count
    }
}

/// Barrier distance ahead minus behind, mapped onto 0..=1 with 0.5 balanced.
fn short_probe_barrier(grid: &Grid, loc: Coord, dir: Dir, distance: u32) -> f32 {
    if distance == 0 {
        return 0.5;
    }
    let scan = |step: Coord| -> u32 {
        let mut count = 0;
        let mut probe = loc + step;
        let mut remaining = distance;
        while remaining > 0 && grid.is_in_bounds(probe) && !grid.is_barrier_at(probe) {
            count += 1;
            probe = probe + step;
            remaining -= 1;
        }
        if remaining > 0 && !grid.is_in_bounds(probe) {
            distance
        } else {
            count
        }
    };
    let step = dir.as_normalized_coord();
    let fwd = scan(step) as f32;
    let rev = scan(Coord::new(0, 0) - step) as f32;
    ((fwd - rev) + distance as f32) / 2.0 / distance as f32
}

fn unit_axis(dir: Dir) -> Option<(f32, f32)> {
    let c = dir.as_normalized_coord();
    let len = ((c.x * c.x + c.y * c.y) as f32).sqrt();
    (len > 0.0).then(|| (c.x as f32 / len, c.y as f32 / len))
}

/// Neighbors weighted by their projection on `dir` over squared distance.
fn population_along_axis(grid: &Grid, loc: Coord, dir: Dir, radius: f32) -> f32 {
    let Some((ux, uy)) = unit_axis(dir) else {
        return 0.5;
    };
    let mut sum = 0.0f32;
    grid.visit_neighborhood(loc, radius, |c| {
        if c != loc && grid.is_occupied_at(c) {
            let off = c - loc;
            let proj = ux * off.x as f32 + uy * off.y as f32;
            sum += proj / (off.x as f32 * off.x as f32 + off.y as f32 * off.y as f32);
        }
    });
    let max_sum = 6.0 * radius;
    (sum / max_sum + 1.0) / 2.0
}

fn signal_density(grid: &Grid, signals: &Signals, layer: usize, loc: Coord, radius: f32) -> f32 {
    let mut cells = 0u32;
    let mut total = 0u32;
    grid.visit_neighborhood(loc, radius, |c| {
        cells += 1;
        total += signals.magnitude(layer, c) as u32;
    });
    ratio(total as f32, cells as f32 * SIGNAL_MAX as f32)
}

fn signal_along_axis(
    grid: &Grid,
    signals: &Signals,
    layer: usize,
    loc: Coord,
    dir: Dir,
    radius: f32,
) -> f32 {
    let Some((ux, uy)) = unit_axis(dir) else {
        return 0.5;
    };
    let mut sum = 0.0f32;
    grid.visit_neighborhood(loc, radius, |c| {
        if c != loc {
            let off = c - loc;
            let proj = ux * off.x as f32 + uy * off.y as f32;
            let mag = signals.magnitude(layer, c) as f32;
            sum += proj * mag / (off.x as f32 * off.x as f32 + off.y as f32 * off.y as f32);
        }
    });
    let max_sum = 6.0 * radius * SIGNAL_MAX as f32;
    (sum / max_sum + 1.0) / 2.0
}
