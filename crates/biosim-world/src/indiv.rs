//! A single agent and its sense-think-act step.

use crate::actions::{self, Command};
use crate::sensors::{self, AgentView, StepContext};
use biosim_core::{Coord, Dir, SimulationConfig};
use biosim_genome::{ActionLevels, Compiler, Genome, NeuralNet};
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;

/// Starting oscillator period in steps.
pub const INITIAL_OSC_PERIOD: u32 = 34;

/// Starting responsiveness, the midpoint of the gain curve's domain.
pub const INITIAL_RESPONSIVENESS: f32 = 0.5;

#[derive(Debug, Clone)]
pub struct Indiv {
    /// 1-based slot index, also the value stored in the grid
    pub index: usize,
    pub alive: bool,
    pub loc: Coord,
    pub birth_loc: Coord,
    /// Steps survived this generation
    pub age: u32,
    pub genome: Arc<Genome>,
    pub net: NeuralNet,
    /// 0..=1, shapes the gain applied to action levels
    pub responsiveness: f32,
    pub osc_period: u32,
    pub long_probe_dist: u32,
    pub last_move_dir: Dir,
    /// Per-generation marks set by survival challenges
    pub challenge_bits: u32,
}

impl Indiv {
    pub fn new(
        index: usize,
        loc: Coord,
        genome: Arc<Genome>,
        compiler: &Compiler,
        config: &SimulationConfig,
        rng: &mut ChaCha8Rng,
    ) -> Self {
        debug_assert!(index != 0, "agent index 0 is reserved");
        let net = compiler.compile(&genome);
        Self {
            index,
            alive: true,
            loc,
            birth_loc: loc,
            age: 0,
            genome,
            net,
            responsiveness: INITIAL_RESPONSIVENESS,
            osc_period: INITIAL_OSC_PERIOD,
            long_probe_dist: config.sensors.long_probe_distance,
            last_move_dir: Dir::random8(rng),
            challenge_bits: 0,
        }
    }

    /// Evaluate sensors and propagate them through the net.
    pub fn think(&mut self, ctx: &StepContext<'_>, rng: &mut ChaCha8Rng) -> ActionLevels {
        let view = AgentView {
            index: self.index,
            loc: self.loc,
            age: self.age,
            last_move_dir: self.last_move_dir,
            osc_period: self.osc_period,
            long_probe_dist: self.long_probe_dist,
            genome: &self.genome,
        };
        self.net
            .feed_forward(|sensor| sensors::sense(&view, sensor, ctx, rng))
    }

    /// One full step for a live agent: age, think, act. Returns the commands
    /// the agent wants applied to shared state.
    pub fn step(&mut self, ctx: &StepContext<'_>, rng: &mut ChaCha8Rng) -> Vec<Command> {
        if !self.alive {
            return Vec::new();
        }
        self.age += 1;
        let levels = self.think(ctx, rng);
        actions::execute_actions(self, &levels, ctx, rng)
    }
}
