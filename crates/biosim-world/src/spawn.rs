//! Building populations: random founders, explicit genomes and offspring of
//! the previous generation's survivors.

use crate::grid::Grid;
use crate::indiv::Indiv;
use biosim_core::{Coord, Error, Result, SimulationConfig};
use biosim_genome::{Compiler, Genome, Mutator};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;
use tracing::debug;

/// A survivor's genome with the score it earned.
#[derive(Debug, Clone)]
pub struct Survivor {
    pub genome: Arc<Genome>,
    pub score: f32,
}

/// Place one agent per genome at a random empty cell.
pub fn place_genomes(
    grid: &mut Grid,
    genomes: Vec<Arc<Genome>>,
    compiler: &Compiler,
    config: &SimulationConfig,
    rng: &mut ChaCha8Rng,
) -> Result<Vec<Indiv>> {
    genomes
        .into_iter()
        .enumerate()
        .map(|(i, genome)| {
            let index = i + 1;
            let loc = grid
                .find_empty_location(rng)
                .ok_or_else(|| Error::ArenaFull(format!("no free cell for agent {index}")))?;
            place(grid, index, loc, genome, compiler, config, rng)
        })
        .collect()
}

/// Place agents at fixed locations, in order.
pub fn place_at(
    grid: &mut Grid,
    seeded: Vec<(Coord, Arc<Genome>)>,
    compiler: &Compiler,
    config: &SimulationConfig,
    rng: &mut ChaCha8Rng,
) -> Result<Vec<Indiv>> {
    seeded
        .into_iter()
        .enumerate()
        .map(|(i, (loc, genome))| {
            if !grid.is_in_bounds(loc) {
                return Err(Error::Config(format!("seed location {loc} is outside the arena")));
            }
            place(grid, i + 1, loc, genome, compiler, config, rng)
        })
        .collect()
}

fn place(
    grid: &mut Grid,
    index: usize,
    loc: Coord,
    genome: Arc<Genome>,
    compiler: &Compiler,
    config: &SimulationConfig,
    rng: &mut ChaCha8Rng,
) -> Result<Indiv> {
    grid.set(loc, index)?;
    Ok(Indiv::new(index, loc, genome, compiler, config, rng))
}

/// `config.population.size` random genomes.
pub fn random_genomes(config: &SimulationConfig, rng: &mut ChaCha8Rng) -> Vec<Arc<Genome>> {
    let g = &config.genome;
    (0..config.population.size)
        .map(|_| Arc::new(Genome::random(rng, g.initial_length_min, g.initial_length_max)))
        .collect()
}

/// Indices of two parents in `0..count`. With fitness ordering the first
/// parent comes from `1..count` and the second from below it, so better
/// ranked survivors are chosen more often.
pub fn select_parents(count: usize, by_fitness: bool, rng: &mut ChaCha8Rng) -> (usize, usize) {
    debug_assert!(count > 0);
    if count == 1 {
        return (0, 0);
    }
    if by_fitness {
        let p1 = rng.gen_range(1..count);
        let p2 = rng.gen_range(0..p1);
        (p1, p2)
    } else {
        (rng.gen_range(0..count), rng.gen_range(0..count))
    }
}

/// `config.population.size` children bred from `survivors`, which must be
/// sorted best first and non-empty.
pub fn offspring(
    survivors: &[Survivor],
    mutator: &Mutator,
    config: &SimulationConfig,
    rng: &mut ChaCha8Rng,
) -> Vec<Arc<Genome>> {
    debug_assert!(!survivors.is_empty());
    let sexual = config.reproduction.sexual_reproduction;
    let by_fitness = config.reproduction.choose_parents_by_fitness;
    let children: Vec<Arc<Genome>> = (0..config.population.size)
        .map(|_| {
            let (p1, p2) = select_parents(survivors.len(), by_fitness, rng);
            let child = mutator.child_genome(
                &survivors[p1].genome,
                &survivors[p2].genome,
                sexual,
                rng,
            );
            Arc::new(child)
        })
        .collect();
    debug!(
        parents = survivors.len(),
        children = children.len(),
        sexual,
        "bred next generation"
    );
    children
}
