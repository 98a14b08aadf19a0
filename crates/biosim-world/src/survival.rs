//! Survival rules applied at the end of each generation.

use crate::actions::Command;
use crate::grid::Grid;
use crate::indiv::Indiv;
use crate::peeps::Peeps;
use biosim_core::{ChallengeKind, Coord, SimulationConfig};
use rand::Rng;
use rand_chacha::ChaCha8Rng;

/// Pass/fail plus a score used to rank parents.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Verdict {
    pub passed: bool,
    pub score: f32,
}

impl Verdict {
    pub const FAIL: Verdict = Verdict {
        passed: false,
        score: 0.0,
    };

    pub fn pass(score: f32) -> Self {
        Self {
            passed: true,
            score,
        }
    }
}

pub struct SurvivalContext<'a> {
    pub grid: &'a Grid,
    pub config: &'a SimulationConfig,
    /// Step within the generation
    pub step: u32,
}

/// A selection rule. `evaluate` is only called for live agents with a
/// non-empty net.
pub trait SurvivalPredicate: Send + Sync {
    fn name(&self) -> &str;

    fn evaluate(&self, indiv: &Indiv, ctx: &SurvivalContext<'_>) -> Verdict;

    /// Runs serially after the agent phase of every step.
    fn end_of_step(
        &self,
        _ctx: &SurvivalContext<'_>,
        _peeps: &mut Peeps,
        _rng: &mut ChaCha8Rng,
    ) -> Vec<Command> {
        Vec::new()
    }
}

/// Apply `predicate` with the common rules: dead agents and agents with an
/// empty net never pass.
pub fn judge(
    predicate: &dyn SurvivalPredicate,
    indiv: &Indiv,
    ctx: &SurvivalContext<'_>,
) -> Verdict {
    if !indiv.alive || indiv.net.is_empty() {
        return Verdict::FAIL;
    }
    predicate.evaluate(indiv, ctx)
}

/// Built-in rule selected by [`ChallengeKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Challenge {
    kind: ChallengeKind,
}

impl Challenge {
    pub fn new(kind: ChallengeKind) -> Self {
        Self { kind }
    }

    pub fn kind(&self) -> ChallengeKind {
        self.kind
    }
}

fn on_edge(loc: Coord, w: i16, h: i16) -> bool {
    loc.x == 0 || loc.x == w - 1 || loc.y == 0 || loc.y == h - 1
}

fn within(loc: Coord, center: Coord, radius: f32) -> Option<f32> {
    let distance = (center - loc).length() as f32;
    (distance <= radius).then_some(distance)
}

impl SurvivalPredicate for Challenge {
    fn name(&self) -> &str {
        match self.kind {
            ChallengeKind::None => "none",
            ChallengeKind::Circle => "circle",
            ChallengeKind::RightHalf => "right_half",
            ChallengeKind::RightQuarter => "right_quarter",
            ChallengeKind::LeftEighth => "left_eighth",
            ChallengeKind::CenterWeighted => "center_weighted",
            ChallengeKind::CenterUnweighted => "center_unweighted",
            ChallengeKind::CenterSparse => "center_sparse",
            ChallengeKind::Corner => "corner",
            ChallengeKind::CornerWeighted => "corner_weighted",
            ChallengeKind::EastWestEighths => "east_west_eighths",
            ChallengeKind::AgainstAnyWall => "against_any_wall",
            ChallengeKind::TouchAnyWall => "touch_any_wall",
            ChallengeKind::MigrateDistance => "migrate_distance",
            ChallengeKind::NearBarrier => "near_barrier",
            ChallengeKind::Pairs => "pairs",
            ChallengeKind::RadioactiveWalls => "radioactive_walls",
        }
    }

    fn evaluate(&self, indiv: &Indiv, ctx: &SurvivalContext<'_>) -> Verdict {
        let grid = ctx.grid;
        let (w, h) = (grid.width(), grid.height());
        let (wf, hf) = (w as f32, h as f32);
        let loc = indiv.loc;

        match self.kind {
            ChallengeKind::None | ChallengeKind::RadioactiveWalls => Verdict::pass(1.0),

            ChallengeKind::Circle => {
                let center = Coord::new((wf / 4.0) as i16, (hf / 4.0) as i16);
                let radius = wf / 4.0;
                match within(loc, center, radius) {
                    Some(d) => Verdict::pass((radius - d) / radius),
                    None => Verdict::FAIL,
                }
            }

            ChallengeKind::RightHalf => pass_if(loc.x > w / 2),
            ChallengeKind::RightQuarter => pass_if(loc.x > w / 2 + w / 4),
            ChallengeKind::LeftEighth => pass_if(loc.x < w / 8),
            ChallengeKind::EastWestEighths => pass_if(loc.x < w / 8 || loc.x >= w - w / 8),

            ChallengeKind::CenterWeighted | ChallengeKind::CenterUnweighted => {
                let center = Coord::new((wf / 2.0) as i16, (hf / 2.0) as i16);
                let radius = wf / 3.0;
                match within(loc, center, radius) {
                    Some(d) if self.kind == ChallengeKind::CenterWeighted => {
                        Verdict::pass((radius - d) / radius)
                    }
                    Some(_) => Verdict::pass(1.0),
                    None => Verdict::FAIL,
                }
            }

            ChallengeKind::CenterSparse => {
                let center = Coord::new((wf / 2.0) as i16, (hf / 2.0) as i16);
                if within(loc, center, wf / 4.0).is_none() {
                    return Verdict::FAIL;
                }
                let mut neighbors = 0;
                grid.visit_neighborhood(loc, 1.5, |c| {
                    if grid.is_occupied_at(c) {
                        neighbors += 1;
                    }
                });
                pass_if((5..=8).contains(&neighbors))
            }

            ChallengeKind::Corner | ChallengeKind::CornerWeighted => {
                let radius = wf / 8.0;
                let corners = [
                    Coord::new(0, 0),
                    Coord::new(0, h - 1),
                    Coord::new(w - 1, 0),
                    Coord::new(w - 1, h - 1),
                ];
                match corners.iter().find_map(|&c| within(loc, c, radius)) {
                    Some(d) if self.kind == ChallengeKind::CornerWeighted => {
                        Verdict::pass((radius - d) / radius)
                    }
                    Some(_) => Verdict::pass(1.0),
                    None => Verdict::FAIL,
                }
            }

            ChallengeKind::AgainstAnyWall => pass_if(on_edge(loc, w, h)),

            ChallengeKind::TouchAnyWall => pass_if(indiv.challenge_bits != 0),

            ChallengeKind::MigrateDistance => {
                let distance = (loc - indiv.birth_loc).length() as f32;
                Verdict::pass(distance / wf.max(hf))
            }

            ChallengeKind::NearBarrier => {
                let radius = wf / 2.0;
                let nearest = grid
                    .barrier_centers()
                    .iter()
                    .map(|&c| (loc - c).length() as f32)
                    .fold(f32::INFINITY, f32::min);
                if nearest <= radius {
                    Verdict::pass(1.0 - nearest / radius)
                } else {
                    Verdict::FAIL
                }
            }

            ChallengeKind::Pairs => {
                if on_edge(loc, w, h) {
                    return Verdict::FAIL;
                }
                let neighbors = occupied_neighbors(grid, loc, &[]);
                match neighbors.as_slice() {
                    [partner] => pass_if(occupied_neighbors(grid, *partner, &[loc]).is_empty()),
                    _ => Verdict::FAIL,
                }
            }
        }
    }

    fn end_of_step(
        &self,
        ctx: &SurvivalContext<'_>,
        peeps: &mut Peeps,
        rng: &mut ChaCha8Rng,
    ) -> Vec<Command> {
        let (w, h) = (ctx.grid.width(), ctx.grid.height());
        match self.kind {
            ChallengeKind::TouchAnyWall => {
                for indiv in peeps.iter_mut().filter(|a| a.alive) {
                    if on_edge(indiv.loc, w, h) {
                        indiv.challenge_bits = 1;
                    }
                }
                Vec::new()
            }
            ChallengeKind::RadioactiveWalls => {
                // west wall for the first half of the generation, east after
                let hot_x = if ctx.step < ctx.config.run.steps_per_generation / 2 {
                    0
                } else {
                    w - 1
                };
                peeps
                    .iter()
                    .filter(|a| a.alive)
                    .filter_map(|a| {
                        let distance = (a.loc.x - hot_x).abs();
                        if distance >= w / 2 {
                            return None;
                        }
                        let chance = 1.0 / (distance as f32).max(1.0);
                        (rng.gen::<f32>() < chance).then_some(Command::Death { index: a.index })
                    })
                    .collect()
            }
            _ => Vec::new(),
        }
    }
}

fn pass_if(condition: bool) -> Verdict {
    if condition {
        Verdict::pass(1.0)
    } else {
        Verdict::FAIL
    }
}

/// Occupied cells in the 3x3 block around `loc`, excluding `loc` and `skip`.
fn occupied_neighbors(grid: &Grid, loc: Coord, skip: &[Coord]) -> Vec<Coord> {
    let mut found = Vec::new();
    for dx in -1..=1 {
        for dy in -1..=1 {
            let c = loc + Coord::new(dx, dy);
            if c != loc && !skip.contains(&c) && grid.agent_at(c).is_some() {
                found.push(c);
            }
        }
    }
    found
}
