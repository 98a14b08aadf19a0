//! Configuration types for the simulation.
//!
//! Every section is defaulted so a partial JSON file is a valid config.
//! Fields are split into *structural* ones, fixed for the lifetime of a run,
//! and *tunable* ones that may be refreshed between generations.

use crate::error::{Error, Result};
use crate::types::{ChallengeKind, GenomeComparison};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Largest arena side that still fits a signed 16-bit coordinate.
pub const MAX_ARENA_SIDE: u16 = i16::MAX as u16;

/// Largest internal neuron count a 7-bit gene field can address.
pub const MAX_NEURONS: usize = 128;

/// Arena configuration parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Width of the arena in cells
    pub width: u16,
    /// Height of the arena in cells
    pub height: u16,
    /// Barrier layout, 0 (none) through 6
    pub barrier_type: u8,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: 128,
            height: 128,
            barrier_type: 0,
        }
    }
}

/// Population configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopulationConfig {
    /// Number of agents per generation
    pub size: usize,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self { size: 3000 }
    }
}

/// Genome and network shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenomeConfig {
    /// Minimum gene count of a random genome
    pub initial_length_min: usize,
    /// Maximum gene count of a random genome
    pub initial_length_max: usize,
    /// Hard cap on gene count after insertion mutations
    pub max_length: usize,
    /// Internal neurons available to the compiler
    pub max_neurons: usize,
    /// Comparison used for the diversity metric
    pub comparison: GenomeComparison,
}

impl Default for GenomeConfig {
    fn default() -> Self {
        Self {
            initial_length_min: 24,
            initial_length_max: 24,
            max_length: 300,
            max_neurons: 5,
            comparison: GenomeComparison::JaroWinkler,
        }
    }
}

/// Mutation rates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MutationConfig {
    /// Per-gene probability of a single bit flip
    pub point_mutation_rate: f64,
    /// Per-child probability of inserting or deleting a gene
    pub gene_insertion_deletion_rate: f64,
    /// Fraction of insertion/deletion events that delete
    pub deletion_ratio: f64,
}

impl Default for MutationConfig {
    fn default() -> Self {
        Self {
            point_mutation_rate: 0.001,
            gene_insertion_deletion_rate: 0.0,
            deletion_ratio: 0.5,
        }
    }
}

/// Sensor ranges and the action response curve
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    /// Neighborhood radius for the population density sensors
    pub population_sensor_radius: f32,
    /// Neighborhood radius for the signal sensors
    pub signal_sensor_radius: f32,
    /// Initial long probe distance of every agent
    pub long_probe_distance: u32,
    /// Reach of the short barrier probes
    pub short_probe_barrier_distance: u32,
    /// Steepness of the responsiveness gain curve
    pub responsiveness_curve_k_factor: u32,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            population_sensor_radius: 2.5,
            signal_sensor_radius: 2.0,
            long_probe_distance: 16,
            short_probe_barrier_distance: 4,
            responsiveness_curve_k_factor: 2,
        }
    }
}

/// Pheromone field configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    /// Number of overlaid signal layers
    pub layers: usize,
    /// Amount added to a cell by one emission
    pub increment_amount: u8,
    /// Amount subtracted from every cell once per step
    pub fade_amount: u8,
    /// Fraction of each cell shared with its neighbors once per step
    pub diffusion_rate: f32,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            layers: 1,
            increment_amount: 1,
            fade_amount: 1,
            diffusion_rate: 0.0,
        }
    }
}

/// Selection and reproduction policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReproductionConfig {
    /// Combine two parents instead of copying one
    pub sexual_reproduction: bool,
    /// Prefer higher scoring survivors as parents
    pub choose_parents_by_fitness: bool,
    /// Enable the KillForward action
    pub kill_enable: bool,
    /// Survival rule applied at generation end
    pub challenge: ChallengeKind,
}

impl Default for ReproductionConfig {
    fn default() -> Self {
        Self {
            sexual_reproduction: true,
            choose_parents_by_fitness: true,
            kill_enable: false,
            challenge: ChallengeKind::Circle,
        }
    }
}

/// Scheduler and reporting settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Steps in one generation
    pub steps_per_generation: u32,
    /// Generation count at which the run ends
    pub max_generations: u32,
    /// Random seed for reproducibility
    pub seed: u64,
    /// Worker threads for the agent phase, 0 for the global pool
    pub threads: usize,
    /// Capture snapshots every N generations, 0 to disable
    pub snapshot_stride: u32,
    /// Capture snapshots for this many leading generations regardless of stride
    pub snapshot_first_generations: u32,
    /// Compute genetic diversity every N generations, 0 to disable
    pub diversity_stride: u32,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            steps_per_generation: 300,
            max_generations: 200_000,
            seed: 0,
            threads: 0,
            snapshot_stride: 25,
            snapshot_first_generations: 2,
            diversity_stride: 25,
        }
    }
}

/// Complete parameter set for one run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub world: WorldConfig,
    pub population: PopulationConfig,
    pub genome: GenomeConfig,
    pub mutation: MutationConfig,
    pub sensors: SensorConfig,
    pub signals: SignalConfig,
    pub reproduction: ReproductionConfig,
    pub run: RunConfig,
}

impl SimulationConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        debug!(path = %path.display(), bytes = text.len(), "loading config");
        Self::from_json(&text)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        Ok(())
    }

    /// Reject parameter sets no run could start from.
    pub fn validate(&self) -> Result<()> {
        let w = &self.world;
        if w.width == 0 || w.height == 0 || w.width > MAX_ARENA_SIDE || w.height > MAX_ARENA_SIDE {
            return Err(Error::Config(format!(
                "arena {}x{} outside 1..={} per side",
                w.width, w.height, MAX_ARENA_SIDE
            )));
        }
        if w.barrier_type > 6 {
            return Err(Error::Config(format!("unknown barrier type {}", w.barrier_type)));
        }

        let cells = w.width as usize * w.height as usize;
        if self.population.size == 0 {
            return Err(Error::Config("population size must be positive".into()));
        }
        if self.population.size > cells {
            return Err(Error::Config(format!(
                "population {} does not fit a {}-cell arena",
                self.population.size, cells
            )));
        }

        let g = &self.genome;
        if g.initial_length_min == 0 || g.initial_length_min > g.initial_length_max {
            return Err(Error::Config(format!(
                "initial genome length range {}..={} is empty",
                g.initial_length_min, g.initial_length_max
            )));
        }
        if g.max_length < g.initial_length_max {
            return Err(Error::Config(format!(
                "max genome length {} below initial max {}",
                g.max_length, g.initial_length_max
            )));
        }
        if g.max_neurons == 0 || g.max_neurons > MAX_NEURONS {
            return Err(Error::Config(format!(
                "max_neurons {} outside 1..={}",
                g.max_neurons, MAX_NEURONS
            )));
        }

        let m = &self.mutation;
        for (name, rate) in [
            ("point_mutation_rate", m.point_mutation_rate),
            ("gene_insertion_deletion_rate", m.gene_insertion_deletion_rate),
            ("deletion_ratio", m.deletion_ratio),
        ] {
            if !(0.0..=1.0).contains(&rate) {
                return Err(Error::Config(format!("{name} {rate} outside [0, 1]")));
            }
        }

        let s = &self.sensors;
        if !(s.population_sensor_radius > 0.0) || !(s.signal_sensor_radius > 0.0) {
            return Err(Error::Config("sensor radii must be positive".into()));
        }
        if s.long_probe_distance == 0 || s.short_probe_barrier_distance == 0 {
            return Err(Error::Config("probe distances must be positive".into()));
        }

        if self.signals.layers == 0 {
            return Err(Error::Config("at least one signal layer is required".into()));
        }
        if !(0.0..=1.0).contains(&self.signals.diffusion_rate) {
            return Err(Error::Config(format!(
                "diffusion_rate {} outside [0, 1]",
                self.signals.diffusion_rate
            )));
        }

        if self.run.steps_per_generation == 0 {
            return Err(Error::Config("steps_per_generation must be positive".into()));
        }
        if self.run.max_generations == 0 {
            return Err(Error::Config("max_generations must be positive".into()));
        }

        Ok(())
    }

    /// Adopt the tunable fields of `other`, keeping structural ones.
    ///
    /// Returns the names of structural fields that differed and were ignored.
    pub fn merge_tunables(&mut self, other: &SimulationConfig) -> Vec<&'static str> {
        let mut ignored = Vec::new();
        if other.world.width != self.world.width || other.world.height != self.world.height {
            ignored.push("world.size");
        }
        if other.population.size != self.population.size {
            ignored.push("population.size");
        }
        if other.signals.layers != self.signals.layers {
            ignored.push("signals.layers");
        }
        if other.genome.max_neurons != self.genome.max_neurons {
            ignored.push("genome.max_neurons");
        }
        if other.run.steps_per_generation != self.run.steps_per_generation {
            ignored.push("run.steps_per_generation");
        }

        self.world.barrier_type = other.world.barrier_type;
        self.mutation = other.mutation.clone();
        self.reproduction = other.reproduction.clone();
        self.sensors = other.sensors.clone();
        self.signals.increment_amount = other.signals.increment_amount;
        self.signals.fade_amount = other.signals.fade_amount;
        self.signals.diffusion_rate = other.signals.diffusion_rate;
        self.genome.comparison = other.genome.comparison;
        self.run.max_generations = other.run.max_generations;
        ignored
    }
}
