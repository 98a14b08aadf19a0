//! End-to-end runs of the scheduler on tiny arenas.

use biosim_core::{Action, ChallengeKind, Coord, GenerationStats, Sensor, SignalConfig, SimulationConfig};
use biosim_genome::{Gene, Genome, SinkKind, SourceKind};
use biosim_world::{
    Indiv, Peeps, QueuedParameterSource, Simulation, StepObserver, StepOutcome, SurvivalContext,
    SurvivalPredicate, Verdict,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

fn bias_to(action: Action, weight: i16) -> Genome {
    Genome::new(vec![Gene::new(
        SourceKind::Sensor,
        Sensor::Bias.index() as u8,
        SinkKind::Action,
        action.index() as u8,
        weight,
    )])
}

fn arena_config(width: u16, height: u16, population: usize) -> SimulationConfig {
    let mut config = SimulationConfig::default();
    config.world.width = width;
    config.world.height = height;
    config.population.size = population;
    config.run.threads = 1;
    config.reproduction.challenge = ChallengeKind::None;
    config
}

#[test]
fn test_emitters_mark_their_cells() {
    let config = arena_config(4, 4, 2);
    assert_eq!(config.signals, SignalConfig::default());
    let emitter = bias_to(Action::EmitSignal0, 8192);
    let mut sim = Simulation::from_genomes(
        config,
        vec![
            (Coord::new(0, 0), emitter.clone()),
            (Coord::new(3, 3), emitter),
        ],
    )
    .unwrap();

    assert!(matches!(sim.step().unwrap(), StepOutcome::Advanced { step: 0, .. }));

    let increment = sim.config().signals.increment_amount;
    for x in 0..4 {
        for y in 0..4 {
            let loc = Coord::new(x, y);
            let expected = if loc == Coord::new(0, 0) || loc == Coord::new(3, 3) {
                increment
            } else {
                0
            };
            assert_eq!(sim.signals().magnitude(0, loc), expected, "cell {loc}");
        }
    }
    for indiv in sim.peeps().iter() {
        assert_eq!(indiv.age, 1);
        assert!(indiv.alive);
    }
    assert_eq!(sim.peeps()[1].loc, Coord::new(0, 0));
    assert_eq!(sim.peeps()[2].loc, Coord::new(3, 3));
}

#[test]
fn test_emission_persists_under_defaults() {
    let config = arena_config(4, 4, 1);
    let increment = config.signals.increment_amount;
    let mut sim = Simulation::from_genomes(
        config,
        vec![(Coord::new(1, 1), bias_to(Action::EmitSignal0, 8192))],
    )
    .unwrap();
    for _ in 0..5 {
        sim.step().unwrap();
        assert_eq!(sim.signals().magnitude(0, Coord::new(1, 1)), increment);
    }
    assert_eq!(sim.signals().magnitude(0, Coord::new(2, 1)), 0);
}

#[test]
fn test_signal_saturates() {
    let mut config = arena_config(4, 4, 1);
    config.signals.fade_amount = 0;
    config.run.steps_per_generation = 400;
    let mut sim = Simulation::from_genomes(
        config,
        vec![(Coord::new(2, 2), bias_to(Action::EmitSignal0, 8192))],
    )
    .unwrap();
    for _ in 0..300 {
        sim.step().unwrap();
    }
    assert_eq!(sim.signals().magnitude(0, Coord::new(2, 2)), 255);
    assert_eq!(sim.signals().magnitude(0, Coord::new(1, 2)), 0);
}

#[test]
fn test_bias_to_move_east_moves_one_cell() {
    let config = arena_config(5, 5, 1);
    let mut sim = Simulation::from_genomes(
        config,
        vec![(Coord::new(0, 0), bias_to(Action::MoveEast, i16::MAX))],
    )
    .unwrap();
    sim.step().unwrap();
    assert_eq!(sim.peeps()[1].loc, Coord::new(1, 0));
    assert_eq!(sim.grid().agent_at(Coord::new(1, 0)), Some(1));
    assert!(sim.grid().is_empty_at(Coord::new(0, 0)));
}

#[test]
fn test_move_into_wall_is_dropped() {
    let config = arena_config(5, 5, 1);
    let mut sim = Simulation::from_genomes(
        config,
        vec![(Coord::new(4, 2), bias_to(Action::MoveEast, i16::MAX))],
    )
    .unwrap();
    sim.step().unwrap();
    assert_eq!(sim.peeps()[1].loc, Coord::new(4, 2));
}

/// Passes everyone until switched off.
struct Gate(Arc<AtomicBool>);

impl SurvivalPredicate for Gate {
    fn name(&self) -> &str {
        "gate"
    }

    fn evaluate(&self, _indiv: &Indiv, _ctx: &SurvivalContext<'_>) -> Verdict {
        if self.0.load(Ordering::SeqCst) {
            Verdict::pass(1.0)
        } else {
            Verdict::FAIL
        }
    }
}

#[test]
fn test_zero_survivors_restart_at_generation_zero() {
    let mut config = arena_config(16, 16, 30);
    config.run.steps_per_generation = 3;
    config.run.seed = 11;
    let open = Arc::new(AtomicBool::new(true));
    let mut sim = Simulation::new(config)
        .unwrap()
        .with_challenge(Gate(Arc::clone(&open)));

    let stats = sim.run_generation().unwrap().unwrap();
    assert!(!stats.restarted);
    assert_eq!(sim.generation(), 1);

    open.store(false, Ordering::SeqCst);
    let stats = sim.run_generation().unwrap().unwrap();
    assert_eq!(stats.generation, 1);
    assert_eq!(stats.survivors, 0);
    assert!(stats.restarted);
    assert_eq!(sim.generation(), 0);
    assert_eq!(sim.peeps().len(), 30);
    assert_eq!(sim.peeps().alive_count(), 30);
    assert!(sim.peeps().iter().all(|a| a.age == 0));
    assert!(sim.peeps().occupancy_consistent(sim.grid()));

    let summary = sim.shutdown();
    assert_eq!(summary.restarts, 1);
    assert_eq!(summary.generations_completed, 2);
}

#[test]
fn test_occupancy_holds_every_step() {
    let mut config = arena_config(24, 24, 120);
    config.run.threads = 0;
    config.run.steps_per_generation = 20;
    config.genome.initial_length_min = 16;
    config.genome.initial_length_max = 32;
    config.world.barrier_type = 1;
    config.reproduction.kill_enable = true;
    config.reproduction.challenge = ChallengeKind::RightHalf;
    let mut sim = Simulation::new(config).unwrap();

    for _ in 0..60 {
        sim.step().unwrap();
        let grid = sim.grid();
        let mut seen = HashSet::new();
        for indiv in sim.peeps().iter().filter(|a| a.alive) {
            assert_eq!(grid.agent_at(indiv.loc), Some(indiv.index));
            assert!(!grid.is_barrier_at(indiv.loc));
            assert!(seen.insert(indiv.loc), "two agents at {}", indiv.loc);
        }
        assert!(sim.peeps().occupancy_consistent(grid));
    }
}

#[test]
fn test_same_seed_same_run() {
    let run = || {
        let mut config = arena_config(20, 20, 60);
        config.run.steps_per_generation = 15;
        config.run.seed = 1234;
        config.genome.initial_length_min = 12;
        config.genome.initial_length_max = 20;
        config.mutation.point_mutation_rate = 0.01;
        config.reproduction.challenge = ChallengeKind::LeftEighth;
        let mut sim = Simulation::new(config).unwrap();
        for _ in 0..3 {
            sim.run_generation().unwrap();
        }
        sim.step().unwrap();
        let snapshot = sim.snapshot();
        let genomes: Vec<String> = sim.peeps().iter().map(|a| a.genome.to_hex()).collect();
        (sim.generation(), snapshot.agents, genomes)
    };
    assert_eq!(run(), run());
}

#[test]
fn test_refreshed_challenge_judges_the_ending_generation() {
    let mut config = arena_config(16, 16, 10);
    config.run.steps_per_generation = 2;
    let seeded = (0..10)
        .map(|x| (Coord::new(x, 0), bias_to(Action::EmitSignal0, 8192)))
        .collect();
    let mut sim = Simulation::from_genomes(config, seeded).unwrap();

    let mut refreshed = sim.config().clone();
    refreshed.reproduction.challenge = ChallengeKind::RightHalf;
    let mut source = QueuedParameterSource::new();
    source.push(refreshed);
    sim.set_parameter_source(source);

    let stats = sim.run_generation().unwrap().unwrap();
    assert_eq!(sim.config().reproduction.challenge, ChallengeKind::RightHalf);
    // only x = 9 lies right of the midline
    assert_eq!(stats.survivors, 1);
}

#[derive(Clone, Default)]
struct EventLog(Arc<Mutex<Vec<String>>>);

impl StepObserver for EventLog {
    fn on_generation_end(&mut self, generation: u32, peeps: &Peeps) {
        let mut events = self.0.lock().unwrap();
        events.push(format!("end {generation} {}", peeps.alive_count()));
    }

    fn on_generation_stats(&mut self, stats: &GenerationStats) {
        let mut events = self.0.lock().unwrap();
        events.push(format!("stats {} {}", stats.generation, stats.survivors));
    }
}

#[test]
fn test_generation_hooks_run_in_order() {
    let mut config = arena_config(8, 8, 4);
    config.run.steps_per_generation = 1;
    let seeded = (0..4)
        .map(|y| (Coord::new(0, y), bias_to(Action::EmitSignal0, 8192)))
        .collect();
    let mut sim = Simulation::from_genomes(config, seeded).unwrap();
    let log = EventLog::default();
    sim.add_observer(log.clone());

    sim.run_generation().unwrap();
    let events = log.0.lock().unwrap().clone();
    assert_eq!(events, vec!["end 0 4".to_string(), "stats 0 4".to_string()]);
}
