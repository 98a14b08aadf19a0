//! The population and its deferred command queues.
//!
//! Agents never move or remove themselves from the grid while the agent phase
//! runs. They queue commands instead, and [`Peeps::apply_deferred`] replays
//! them serially: deaths first, then moves, each in queue order.

use crate::actions::Command;
use crate::grid::Grid;
use crate::indiv::Indiv;
use biosim_core::Coord;
use biosim_genome::Genome;
use serde::{Deserialize, Serialize};
use std::ops::{Index, IndexMut};
use std::sync::Arc;
use tracing::trace;

/// Outcome of one apply phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyReport {
    pub deaths: usize,
    /// Deaths caused by another agent
    pub murders: usize,
    pub moves_applied: usize,
    /// Moves whose target was out of bounds, a barrier or taken
    pub moves_dropped: usize,
}

#[derive(Debug, Clone, Copy)]
struct QueuedDeath {
    index: usize,
    murdered: bool,
}

#[derive(Debug, Default)]
pub struct Peeps {
    indivs: Vec<Indiv>,
    genomes: Vec<Arc<Genome>>,
    death_queue: Vec<QueuedDeath>,
    move_queue: Vec<(usize, Coord)>,
}

impl Peeps {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the population. `indivs[i]` must carry index `i + 1`.
    pub fn init(&mut self, indivs: Vec<Indiv>) {
        debug_assert!(indivs.iter().enumerate().all(|(i, a)| a.index == i + 1));
        self.genomes = indivs.iter().map(|a| Arc::clone(&a.genome)).collect();
        self.indivs = indivs;
        self.death_queue.clear();
        self.move_queue.clear();
    }

    pub fn len(&self) -> usize {
        self.indivs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indivs.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Indiv> {
        index.checked_sub(1).and_then(|i| self.indivs.get(i))
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Indiv> {
        index.checked_sub(1).and_then(|i| self.indivs.get_mut(i))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Indiv> {
        self.indivs.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Indiv> {
        self.indivs.iter_mut()
    }

    pub fn alive_count(&self) -> usize {
        self.indivs.iter().filter(|a| a.alive).count()
    }

    /// Genomes by slot, read by the genetic similarity sensor.
    pub fn genome_table(&self) -> &[Arc<Genome>] {
        &self.genomes
    }

    /// Mutable agents alongside the shared genome table for the agent phase.
    pub(crate) fn split_for_step(&mut self) -> (&mut [Indiv], &[Arc<Genome>]) {
        (&mut self.indivs, &self.genomes)
    }

    /// The agent standing on `loc`, for external inspection.
    pub fn indiv_at(&self, grid: &Grid, loc: Coord) -> Option<&Indiv> {
        grid.agent_at(loc).and_then(|index| self.get(index))
    }

    pub fn queue_for_death(&mut self, index: usize) {
        self.death_queue.push(QueuedDeath {
            index,
            murdered: false,
        });
    }

    pub fn queue_for_move(&mut self, index: usize, to: Coord) {
        self.move_queue.push((index, to));
    }

    pub fn death_queue_size(&self) -> usize {
        self.death_queue.len()
    }

    pub fn move_queue_size(&self) -> usize {
        self.move_queue.len()
    }

    pub fn enqueue(&mut self, command: Command) {
        match command {
            Command::Move { index, to } => self.queue_for_move(index, to),
            Command::Death { index } => self.queue_for_death(index),
            Command::Kill { victim, .. } => self.death_queue.push(QueuedDeath {
                index: victim,
                murdered: true,
            }),
        }
    }

    /// Drain both queues against `grid`. Deaths free their cell; moves by
    /// dead agents or into cells that are not free are dropped.
    pub fn apply_deferred(&mut self, grid: &mut Grid) -> ApplyReport {
        let mut report = ApplyReport::default();

        for death in self.death_queue.drain(..) {
            let Some(indiv) = death
                .index
                .checked_sub(1)
                .and_then(|i| self.indivs.get_mut(i))
            else {
                debug_assert!(false, "death queued for unknown agent {}", death.index);
                continue;
            };
            if !indiv.alive {
                continue;
            }
            indiv.alive = false;
            grid.clear(indiv.loc);
            report.deaths += 1;
            if death.murdered {
                report.murders += 1;
            }
        }

        for (index, to) in self.move_queue.drain(..) {
            let Some(indiv) = index.checked_sub(1).and_then(|i| self.indivs.get_mut(i)) else {
                debug_assert!(false, "move queued for unknown agent {index}");
                continue;
            };
            if !indiv.alive {
                continue;
            }
            if !grid.is_in_bounds(to) || !grid.is_empty_at(to) {
                report.moves_dropped += 1;
                continue;
            }
            let from = indiv.loc;
            grid.clear(from);
            if grid.set(to, index).is_err() {
                // unreachable after the emptiness check; restore the old cell
                let _ = grid.set(from, index);
                report.moves_dropped += 1;
                continue;
            }
            indiv.loc = to;
            indiv.last_move_dir = (to - from).as_dir();
            report.moves_applied += 1;
        }

        trace!(?report, "applied deferred commands");
        report
    }

    /// True when every live agent sits on its own cell and no cell claims a
    /// dead or unknown agent.
    pub fn occupancy_consistent(&self, grid: &Grid) -> bool {
        let agents_ok = self
            .indivs
            .iter()
            .filter(|a| a.alive)
            .all(|a| grid.is_in_bounds(a.loc) && grid.agent_at(a.loc) == Some(a.index));
        let cells_ok = grid
            .iter()
            .filter_map(|(loc, _)| grid.agent_at(loc))
            .all(|index| self.get(index).map_or(false, |a| a.alive));
        agents_ok && cells_ok
    }
}

impl Index<usize> for Peeps {
    type Output = Indiv;

    fn index(&self, index: usize) -> &Indiv {
        debug_assert!(index != 0, "agent index 0 is reserved");
        &self.indivs[index - 1]
    }
}

impl IndexMut<usize> for Peeps {
    fn index_mut(&mut self, index: usize) -> &mut Indiv {
        debug_assert!(index != 0, "agent index 0 is reserved");
        &mut self.indivs[index - 1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use biosim_core::{Dir, SimulationConfig};
    use biosim_genome::{Compiler, CompilerConfig};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn populate(grid: &mut Grid, locs: &[Coord]) -> Peeps {
        let config = SimulationConfig::default();
        let compiler = Compiler::new(CompilerConfig::default());
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let indivs = locs
            .iter()
            .enumerate()
            .map(|(i, &loc)| {
                grid.set(loc, i + 1).unwrap();
                Indiv::new(
                    i + 1,
                    loc,
                    Arc::new(Genome::default()),
                    &compiler,
                    &config,
                    &mut rng,
                )
            })
            .collect();
        let mut peeps = Peeps::new();
        peeps.init(indivs);
        peeps
    }

    #[test]
    fn test_indexing_is_one_based() {
        let mut grid = Grid::new(4, 4);
        let peeps = populate(&mut grid, &[Coord::new(0, 0), Coord::new(1, 1)]);
        assert_eq!(peeps[1].loc, Coord::new(0, 0));
        assert_eq!(peeps[2].loc, Coord::new(1, 1));
        assert!(peeps.get(0).is_none());
        assert!(peeps.get(3).is_none());
        assert_eq!(peeps.indiv_at(&grid, Coord::new(1, 1)).map(|a| a.index), Some(2));
        assert_eq!(peeps.genome_table().len(), 2);
    }

    #[test]
    fn test_death_frees_cell() {
        let mut grid = Grid::new(4, 4);
        let mut peeps = populate(&mut grid, &[Coord::new(0, 0), Coord::new(1, 1)]);
        peeps.queue_for_death(1);
        peeps.enqueue(Command::Kill { killer: 2, victim: 1 });
        assert_eq!(peeps.death_queue_size(), 2);

        let report = peeps.apply_deferred(&mut grid);
        assert_eq!(report.deaths, 1);
        assert_eq!(report.murders, 0);
        assert!(!peeps[1].alive);
        assert!(grid.is_empty_at(Coord::new(0, 0)));
        assert_eq!(peeps.death_queue_size(), 0);
        assert!(peeps.occupancy_consistent(&grid));
    }

    #[test]
    fn test_move_updates_location_and_direction() {
        let mut grid = Grid::new(4, 4);
        let mut peeps = populate(&mut grid, &[Coord::new(0, 0)]);
        peeps.queue_for_move(1, Coord::new(1, 0));
        let report = peeps.apply_deferred(&mut grid);
        assert_eq!(report.moves_applied, 1);
        assert_eq!(peeps[1].loc, Coord::new(1, 0));
        assert_eq!(peeps[1].last_move_dir, Dir::E);
        assert!(grid.is_empty_at(Coord::new(0, 0)));
        assert_eq!(grid.agent_at(Coord::new(1, 0)), Some(1));
    }

    #[test]
    fn test_conflicting_moves_first_wins() {
        let mut grid = Grid::new(4, 4);
        let mut peeps = populate(&mut grid, &[Coord::new(0, 0), Coord::new(2, 0)]);
        let target = Coord::new(1, 0);
        peeps.queue_for_move(1, target);
        peeps.queue_for_move(2, target);
        let report = peeps.apply_deferred(&mut grid);
        assert_eq!(report.moves_applied, 1);
        assert_eq!(report.moves_dropped, 1);
        assert_eq!(peeps[1].loc, target);
        assert_eq!(peeps[2].loc, Coord::new(2, 0));
        assert!(peeps.occupancy_consistent(&grid));
    }

    #[test]
    fn test_invalid_and_dead_moves_dropped() {
        let mut grid = Grid::new(4, 4);
        let mut peeps = populate(&mut grid, &[Coord::new(0, 0), Coord::new(3, 3)]);
        grid.set_barrier(Coord::new(1, 1));
        peeps.queue_for_move(1, Coord::new(-1, 0));
        peeps.queue_for_move(1, Coord::new(1, 1));
        peeps.queue_for_death(2);
        peeps.queue_for_move(2, Coord::new(2, 2));
        let report = peeps.apply_deferred(&mut grid);
        assert_eq!(report.moves_applied, 0);
        assert_eq!(report.moves_dropped, 2);
        assert_eq!(peeps[1].loc, Coord::new(0, 0));
        assert!(grid.is_empty_at(Coord::new(2, 2)));
        assert!(peeps.occupancy_consistent(&grid));
    }

    #[test]
    fn test_apply_is_deterministic() {
        let run = || {
            let mut grid = Grid::new(5, 5);
            let mut peeps = populate(
                &mut grid,
                &[Coord::new(0, 0), Coord::new(2, 0), Coord::new(1, 2)],
            );
            for (index, to) in [(1, Coord::new(1, 1)), (3, Coord::new(1, 1)), (2, Coord::new(1, 0))] {
                peeps.queue_for_move(index, to);
            }
            peeps.apply_deferred(&mut grid);
            grid.iter().collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }
}
