//! Turning action levels into behavior.
//!
//! Self-state actions (responsiveness, oscillator, probe distance) apply
//! immediately. Emission bumps the agent's own signal cell. Anything that
//! touches the grid or another agent comes back as a [`Command`] for the
//! serial apply phase.

use crate::indiv::Indiv;
use crate::sensors::StepContext;
use biosim_core::{Action, Coord, Dir};
use biosim_genome::ActionLevels;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Upper bound of the evolvable long probe distance.
pub const MAX_LONG_PROBE_DISTANCE: f32 = 32.0;

/// Emission and kill fire when their squashed level exceeds this.
pub const ACTION_THRESHOLD: f32 = 0.5;

/// Deferred mutation of shared state, replayed in the apply phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    Move { index: usize, to: Coord },
    Death { index: usize },
    Kill { killer: usize, victim: usize },
}

/// Gain for a responsiveness in 0..=1: near zero at 0, rising to 1 at 1.
pub fn response_curve(responsiveness: f32, k: u32) -> f32 {
    let r = responsiveness as f64;
    let exp = -2 * k.min(64) as i32;
    ((r - 2.0).powi(exp) - 2.0f64.powi(exp) * (1.0 - r)) as f32
}

fn squash(level: f32) -> f32 {
    (level.tanh() + 1.0) / 2.0
}

pub fn execute_actions(
    indiv: &mut Indiv,
    levels: &ActionLevels,
    ctx: &StepContext<'_>,
    rng: &mut ChaCha8Rng,
) -> Vec<Command> {
    let mut commands = Vec::new();
    let grid = ctx.grid;

    if let Some(level) = levels.get(Action::SetResponsiveness) {
        indiv.responsiveness = squash(level);
    }
    let gain = response_curve(
        indiv.responsiveness,
        ctx.config.sensors.responsiveness_curve_k_factor,
    );

    if let Some(level) = levels.get(Action::SetOscillatorPeriod) {
        let period = 1.0 + (1.5 + (7.0 * squash(level)).exp()).floor();
        indiv.osc_period = period as u32;
    }

    if let Some(level) = levels.get(Action::SetLongProbeDist) {
        indiv.long_probe_dist = (1.0 + squash(level) * MAX_LONG_PROBE_DISTANCE) as u32;
    }

    if let Some(level) = levels.get(Action::EmitSignal0) {
        if squash(gain * level) > ACTION_THRESHOLD {
            ctx.signals
                .increment(0, indiv.loc, ctx.config.signals.increment_amount);
        }
    }

    if ctx.config.reproduction.kill_enable {
        if let Some(level) = levels.get(Action::KillForward) {
            if squash(gain * level) > ACTION_THRESHOLD {
                let target = indiv.loc + indiv.last_move_dir;
                if let Some(victim) = grid.agent_at(target) {
                    if victim != indiv.index {
                        commands.push(Command::Kill {
                            killer: indiv.index,
                            victim,
                        });
                    }
                }
            }
        }
    }

    let (move_x, move_y) = movement_vector(indiv.last_move_dir, levels, rng);
    let offset = Coord::new(
        (gain * move_x).tanh().round() as i16,
        (gain * move_y).tanh().round() as i16,
    );
    if offset != Coord::new(0, 0) {
        let to = indiv.loc + offset;
        if grid.is_in_bounds(to) && grid.is_empty_at(to) {
            commands.push(Command::Move {
                index: indiv.index,
                to,
            });
        }
    }

    commands
}

/// Sum every driven movement action into one float vector.
fn movement_vector(last_dir: Dir, levels: &ActionLevels, rng: &mut ChaCha8Rng) -> (f32, f32) {
    let mut x = 0.0f32;
    let mut y = 0.0f32;
    let mut along = |dir: Dir, level: f32| {
        let c = dir.as_normalized_coord();
        x += c.x as f32 * level;
        y += c.y as f32 * level;
    };

    for (action, level) in levels.iter() {
        match action {
            Action::MoveX | Action::MoveEast => along(Dir::E, level),
            Action::MoveWest => along(Dir::W, level),
            Action::MoveY | Action::MoveNorth => along(Dir::N, level),
            Action::MoveSouth => along(Dir::S, level),
            Action::MoveForward => along(last_dir, level),
            Action::MoveReverse => along(last_dir.rotate_180(), level),
            Action::MoveLeft => along(last_dir.rotate_90_ccw(), level),
            Action::MoveRight | Action::MoveRl => along(last_dir.rotate_90_cw(), level),
            Action::MoveRandom => along(Dir::random8(rng), level),
            _ => {}
        }
    }
    (x, y)
}
