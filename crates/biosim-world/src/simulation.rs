//! The generation scheduler.
//!
//! Each step runs the agent phase in parallel, then a serial barrier that
//! applies deferred commands, updates the signal field and notifies
//! observers. After the last step of a generation parameters are refreshed,
//! then survivors are judged under them and the next population is bred.

use crate::actions::Command;
use crate::barriers::create_barriers;
use crate::control::RunControl;
use crate::grid::Grid;
use crate::indiv::Indiv;
use crate::params::ParameterSource;
use crate::peeps::Peeps;
use crate::sensors::StepContext;
use crate::signals::Signals;
use crate::snapshot::{StepObserver, StepSnapshot};
use crate::spawn::{self, Survivor};
use crate::survival::{judge, Challenge, SurvivalContext, SurvivalPredicate};
use biosim_core::{
    Coord, Error, GenerationStats, Result, RunId, RunMode, RunSummary, SimulationConfig,
};
use biosim_genome::{genetic_diversity, Compiler, CompilerConfig, Edge, Genome, Mutator};
use chrono::{DateTime, Utc};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, trace, warn};

const RNG_STEP_MIX: u64 = 0x9E37_79B9_7F4A_7C15;
const RNG_AGENT_MIX: u64 = 0xBF58_476D_1CE4_E5B9;

/// Poll interval while the run mode is `Pause`.
const PAUSE_POLL: Duration = Duration::from_millis(20);

/// What a call to [`Simulation::step`] did.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// One step ran inside the current generation
    Advanced { generation: u32, step: u32 },
    /// The last step of a generation ran and the next population is ready
    GenerationEnded(GenerationStats),
    /// Run mode is `Pause`; nothing ran
    Paused,
    /// Run mode is `Stop`/`Abort` or the generation limit was reached
    Finished,
}

pub struct Simulation {
    run_id: RunId,
    config: SimulationConfig,
    grid: Grid,
    signals: Signals,
    peeps: Peeps,
    compiler: Compiler,
    mutator: Mutator,
    challenge: Box<dyn SurvivalPredicate>,
    custom_challenge: bool,
    observers: Vec<Box<dyn StepObserver>>,
    parameter_source: Option<Box<dyn ParameterSource>>,
    control: RunControl,
    pool: Option<rayon::ThreadPool>,
    rng: ChaCha8Rng,
    generation: u32,
    /// Next step to run within the generation
    step: u32,
    murders: usize,
    last_survivors: usize,
    last_diversity: Option<f32>,
    last_stats: Option<GenerationStats>,
    generations_completed: u64,
    restarts: u32,
    started_at: DateTime<Utc>,
}

impl Simulation {
    /// A run seeded with `population.size` random genomes.
    pub fn new(config: SimulationConfig) -> Result<Self> {
        Self::build(config, |sim| {
            let genomes = spawn::random_genomes(&sim.config, &mut sim.rng);
            spawn::place_genomes(&mut sim.grid, genomes, &sim.compiler, &sim.config, &mut sim.rng)
        })
    }

    /// A run whose first generation is exactly `seeded`, each genome at its
    /// given location. Later generations use `population.size`.
    pub fn from_genomes(config: SimulationConfig, seeded: Vec<(Coord, Genome)>) -> Result<Self> {
        if seeded.is_empty() {
            return Err(Error::Config("at least one seeded genome is required".into()));
        }
        let max_length = config.genome.max_length;
        for (_, genome) in &seeded {
            biosim_genome::validate_genome(genome, max_length)?;
        }
        let seeded: Vec<(Coord, Arc<Genome>)> = seeded
            .into_iter()
            .map(|(loc, genome)| (loc, Arc::new(genome)))
            .collect();
        Self::build(config, move |sim| {
            spawn::place_at(&mut sim.grid, seeded, &sim.compiler, &sim.config, &mut sim.rng)
        })
    }

    fn build<F>(config: SimulationConfig, populate: F) -> Result<Self>
    where
        F: FnOnce(&mut Simulation) -> Result<Vec<Indiv>>,
    {
        config.validate()?;

        let pool = match config.run.threads {
            0 => None,
            n => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(n)
                    .thread_name(|i| format!("biosim-worker-{i}"))
                    .build()
                    .map_err(|e| Error::Config(format!("failed to build thread pool: {e}")))?,
            ),
        };

        let compiler = Compiler::new(CompilerConfig {
            max_neurons: config.genome.max_neurons,
        });
        let mutator = Mutator::new(config.mutation.clone(), config.genome.max_length);
        let challenge = Box::new(Challenge::new(config.reproduction.challenge));

        let mut sim = Self {
            run_id: RunId::new(),
            grid: Grid::new(config.world.width, config.world.height),
            signals: Signals::new(config.signals.layers, config.world.width, config.world.height),
            peeps: Peeps::new(),
            compiler,
            mutator,
            challenge,
            custom_challenge: false,
            observers: Vec::new(),
            parameter_source: None,
            control: RunControl::default(),
            pool,
            rng: ChaCha8Rng::seed_from_u64(config.run.seed),
            generation: 0,
            step: 0,
            murders: 0,
            last_survivors: 0,
            last_diversity: None,
            last_stats: None,
            generations_completed: 0,
            restarts: 0,
            started_at: Utc::now(),
            config,
        };

        create_barriers(&mut sim.grid, sim.config.world.barrier_type, &mut sim.rng);
        let indivs = populate(&mut sim)?;
        sim.peeps.init(indivs);

        info!(
            event = "simulation_created",
            run_id = %sim.run_id,
            width = sim.config.world.width,
            height = sim.config.world.height,
            population = sim.peeps.len(),
            challenge = sim.challenge.name(),
            threads = sim.config.run.threads,
            "Simulation initialized"
        );
        Ok(sim)
    }

    /// Replace the survival rule. The rule stays in force across parameter
    /// refreshes.
    pub fn with_challenge(mut self, predicate: impl SurvivalPredicate + 'static) -> Self {
        self.challenge = Box::new(predicate);
        self.custom_challenge = true;
        self
    }

    pub fn add_observer(&mut self, observer: impl StepObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    pub fn set_parameter_source(&mut self, source: impl ParameterSource + 'static) {
        self.parameter_source = Some(Box::new(source));
    }

    /// Handle for commanding the run mode from another thread.
    pub fn control(&self) -> RunControl {
        self.control.clone()
    }

    pub fn set_run_mode(&self, mode: RunMode) {
        debug!(?mode, "run mode changed");
        self.control.set(mode);
    }

    pub fn run_mode(&self) -> RunMode {
        self.control.mode()
    }

    /// True once the generation limit is reached or the run was stopped.
    pub fn is_done(&self) -> bool {
        self.generation >= self.config.run.max_generations || self.control.is_terminal()
    }

    /// Run one step, finishing the generation when it was the last one.
    pub fn step(&mut self) -> Result<StepOutcome> {
        if self.is_done() {
            return Ok(StepOutcome::Finished);
        }
        if self.control.mode() == RunMode::Pause {
            return Ok(StepOutcome::Paused);
        }

        let generation = self.generation;
        let step = self.step;
        self.simulate_step();
        self.step += 1;

        if self.step >= self.config.run.steps_per_generation {
            let stats = self.end_generation()?;
            return Ok(StepOutcome::GenerationEnded(stats));
        }
        Ok(StepOutcome::Advanced { generation, step })
    }

    /// Step until the current generation ends. `None` when the run stopped
    /// first.
    pub fn run_generation(&mut self) -> Result<Option<GenerationStats>> {
        loop {
            match self.step()? {
                StepOutcome::Advanced { .. } => {}
                StepOutcome::GenerationEnded(stats) => return Ok(Some(stats)),
                StepOutcome::Paused => std::thread::sleep(PAUSE_POLL),
                StepOutcome::Finished => return Ok(None),
            }
        }
    }

    /// Run until the generation limit or an external stop.
    #[instrument(skip(self), fields(run_id = %self.run_id, max_generations = self.config.run.max_generations))]
    pub fn run(&mut self) -> Result<()> {
        info!(
            event = "run_started",
            population = self.config.population.size,
            steps_per_generation = self.config.run.steps_per_generation,
            "Starting run"
        );
        while self.run_generation()?.is_some() {}
        info!(
            event = "run_stopped",
            generation = self.generation,
            mode = ?self.control.mode(),
            generations_completed = self.generations_completed,
            restarts = self.restarts,
            "Run loop exited"
        );
        Ok(())
    }

    fn agent_rng(&self, generation: u32, step: u32, index: usize) -> ChaCha8Rng {
        agent_rng(self.config.run.seed, generation, step, index)
    }

    fn simulate_step(&mut self) {
        let generation = self.generation;
        let step = self.step;
        let seed = self.config.run.seed;

        let (indivs, genomes) = self.peeps.split_for_step();
        let ctx = StepContext {
            grid: &self.grid,
            signals: &self.signals,
            genomes,
            config: &self.config,
            generation,
            step,
        };
        let think = |indiv: &mut Indiv| {
            let mut rng = agent_rng(seed, generation, step, indiv.index);
            indiv.step(&ctx, &mut rng)
        };
        let queued: Vec<Vec<Command>> = match &self.pool {
            Some(pool) => pool.install(|| indivs.par_iter_mut().map(think).collect()),
            None => indivs.par_iter_mut().map(think).collect(),
        };
        for command in queued.into_iter().flatten() {
            self.peeps.enqueue(command);
        }

        let survival_ctx = SurvivalContext {
            grid: &self.grid,
            config: &self.config,
            step,
        };
        let extra = self
            .challenge
            .end_of_step(&survival_ctx, &mut self.peeps, &mut self.rng);
        for command in extra {
            self.peeps.enqueue(command);
        }

        let report = self.peeps.apply_deferred(&mut self.grid);
        self.murders += report.murders;
        debug_assert!(
            self.peeps.occupancy_consistent(&self.grid),
            "grid and population disagree after step {step}"
        );

        let signals = &self.config.signals;
        self.signals.settle(signals.fade_amount, signals.diffusion_rate);

        if !self.observers.is_empty() && self.captures_generation(generation) {
            let snapshot = StepSnapshot::capture(
                &self.peeps,
                generation,
                step,
                self.last_survivors,
                self.last_diversity,
            );
            for observer in &mut self.observers {
                observer.on_step_end(&snapshot);
            }
        }

        trace!(
            generation,
            step,
            deaths = report.deaths,
            moves = report.moves_applied,
            dropped = report.moves_dropped,
            "step complete"
        );
    }

    fn captures_generation(&self, generation: u32) -> bool {
        let run = &self.config.run;
        generation < run.snapshot_first_generations
            || (run.snapshot_stride != 0 && generation % run.snapshot_stride == 0)
    }

    fn end_generation(&mut self) -> Result<GenerationStats> {
        let generation = self.generation;

        for observer in &mut self.observers {
            observer.on_generation_end(generation, &self.peeps);
        }
        self.refresh_parameters();

        let survival_ctx = SurvivalContext {
            grid: &self.grid,
            config: &self.config,
            step: self.step,
        };
        let challenge = self.challenge.as_ref();
        let mut survivors: Vec<Survivor> = self
            .peeps
            .iter()
            .filter_map(|indiv| {
                let verdict = judge(challenge, indiv, &survival_ctx);
                verdict.passed.then(|| Survivor {
                    genome: Arc::clone(&indiv.genome),
                    score: verdict.score,
                })
            })
            .collect();
        survivors.sort_by(|a, b| b.score.total_cmp(&a.score));

        let stats = GenerationStats {
            restarted: survivors.is_empty(),
            ..self.generation_stats(generation, survivors.len())
        };
        for observer in &mut self.observers {
            observer.on_generation_stats(&stats);
        }

        let genomes = if survivors.is_empty() {
            warn!(
                event = "generation_restart",
                generation,
                "No survivors, restarting from random genomes at generation 0"
            );
            self.restarts += 1;
            self.generation = 0;
            spawn::random_genomes(&self.config, &mut self.rng)
        } else {
            self.generation += 1;
            spawn::offspring(&survivors, &self.mutator, &self.config, &mut self.rng)
        };
        self.repopulate(genomes)?;

        self.generations_completed += 1;
        self.last_survivors = stats.survivors;
        if stats.diversity.is_some() {
            self.last_diversity = stats.diversity;
        }
        info!(
            event = "generation_complete",
            generation,
            survivors = stats.survivors,
            murders = stats.murders,
            diversity = ?stats.diversity,
            mean_genome_length = stats.mean_genome_length,
            mean_connections = stats.mean_connections,
            "Generation complete"
        );
        self.last_stats = Some(stats.clone());
        Ok(stats)
    }

    fn generation_stats(&self, generation: u32, survivors: usize) -> GenerationStats {
        let count = self.peeps.len().max(1) as f32;
        let stride = self.config.run.diversity_stride;
        let diversity = (stride != 0 && generation % stride == 0).then(|| {
            genetic_diversity(
                self.peeps.iter().map(|a| a.genome.as_ref()),
                self.config.genome.comparison,
            )
        });
        GenerationStats {
            generation,
            survivors,
            murders: self.murders,
            diversity,
            mean_genome_length: self.peeps.iter().map(|a| a.genome.len()).sum::<usize>() as f32
                / count,
            mean_connections: self
                .peeps
                .iter()
                .map(|a| a.net.connection_count())
                .sum::<usize>() as f32
                / count,
            restarted: false,
        }
    }

    /// Clear the world and place `genomes` as the new population.
    fn repopulate(&mut self, genomes: Vec<Arc<Genome>>) -> Result<()> {
        self.grid.reset();
        self.signals.reset();
        create_barriers(&mut self.grid, self.config.world.barrier_type, &mut self.rng);
        let indivs = spawn::place_genomes(
            &mut self.grid,
            genomes,
            &self.compiler,
            &self.config,
            &mut self.rng,
        )?;
        self.peeps.init(indivs);
        self.step = 0;
        self.murders = 0;
        Ok(())
    }

    /// Poll the parameter source and adopt any tunable changes. Returns true
    /// when new parameters took effect.
    pub fn refresh_parameters(&mut self) -> bool {
        let Some(source) = self.parameter_source.as_mut() else {
            return false;
        };
        let candidate = match source.refresh() {
            Ok(Some(candidate)) => candidate,
            Ok(None) => return false,
            Err(e) => {
                warn!(error = %e, "Parameter refresh failed, keeping current parameters");
                return false;
            }
        };
        if let Err(e) = candidate.validate() {
            warn!(error = %e, "Rejected refreshed parameters");
            return false;
        }

        let mut next = self.config.clone();
        for field in next.merge_tunables(&candidate) {
            warn!(field, "Structural parameter change ignored for this run");
        }
        if next == self.config {
            return false;
        }
        self.config = next;
        self.mutator = Mutator::new(self.config.mutation.clone(), self.config.genome.max_length);
        if !self.custom_challenge {
            self.challenge = Box::new(Challenge::new(self.config.reproduction.challenge));
        }
        info!(
            event = "parameters_refreshed",
            generation = self.generation,
            challenge = self.challenge.name(),
            point_mutation_rate = self.config.mutation.point_mutation_rate,
            "Adopted refreshed parameters"
        );
        true
    }

    /// Copy of the current agent state.
    pub fn snapshot(&self) -> StepSnapshot {
        StepSnapshot::capture(
            &self.peeps,
            self.generation,
            self.step,
            self.last_survivors,
            self.last_diversity,
        )
    }

    /// Wiring of the agent standing on `loc`.
    pub fn wiring_at(&self, loc: Coord) -> Option<Vec<Edge>> {
        self.indiv_at(loc).map(|indiv| indiv.net.edge_list())
    }

    pub fn indiv_at(&self, loc: Coord) -> Option<&Indiv> {
        self.peeps.indiv_at(&self.grid, loc)
    }

    pub fn peeps(&self) -> &Peeps {
        &self.peeps
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn signals(&self) -> &Signals {
        &self.signals
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Next step to run within the current generation.
    pub fn current_step(&self) -> u32 {
        self.step
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    pub fn last_stats(&self) -> Option<&GenerationStats> {
        self.last_stats.as_ref()
    }

    /// Random genome sample from the current population.
    pub fn sample_genomes(&self, count: usize) -> Vec<Arc<Genome>> {
        let mut rng = self.agent_rng(self.generation, self.step, 0);
        let live: Vec<&Indiv> = self.peeps.iter().filter(|a| a.alive).collect();
        rand::seq::SliceRandom::choose_multiple(live.as_slice(), &mut rng, count)
            .map(|a| Arc::clone(&a.genome))
            .collect()
    }

    /// End the run and report on it.
    pub fn shutdown(self) -> RunSummary {
        let summary = RunSummary {
            run_id: self.run_id,
            started_at: self.started_at,
            finished_at: Utc::now(),
            generations_completed: self.generations_completed,
            restarts: self.restarts,
            final_stats: self.last_stats,
        };
        info!(
            event = "run_finished",
            run_id = %summary.run_id,
            generations_completed = summary.generations_completed,
            restarts = summary.restarts,
            duration_ms = summary.duration().num_milliseconds(),
            "Run finished"
        );
        summary
    }
}

/// Per-agent random stream for one step, independent of thread scheduling.
pub fn agent_rng(seed: u64, generation: u32, step: u32, index: usize) -> ChaCha8Rng {
    let stamp = ((generation as u64) << 32) | step as u64;
    let mixed = mix_u64(
        seed ^ stamp.wrapping_mul(RNG_STEP_MIX) ^ (index as u64).wrapping_mul(RNG_AGENT_MIX),
    );
    ChaCha8Rng::seed_from_u64(mixed)
}

fn mix_u64(mut x: u64) -> u64 {
    x ^= x >> 30;
    x = x.wrapping_mul(0xBF58_476D_1CE4_E5B9);
    x ^= x >> 27;
    x = x.wrapping_mul(0x94D0_49BB_1331_11EB);
    x ^ (x >> 31)
}
