//! Copies of per-step state handed to external observers.

use crate::peeps::Peeps;
use biosim_core::{Coord, GenerationStats};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub index: usize,
    pub loc: Coord,
    pub birth_loc: Coord,
    pub age: u32,
    pub alive: bool,
    /// Display colour derived from the genome
    pub color: [u8; 3],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepSnapshot {
    pub generation: u32,
    pub step: u32,
    /// Survivors of the previous generation
    pub survivors: usize,
    /// Most recent sampled diversity
    pub diversity: Option<f32>,
    pub agents: Vec<AgentSnapshot>,
}

impl StepSnapshot {
    /// Capture every live agent in `peeps`.
    pub fn capture(
        peeps: &Peeps,
        generation: u32,
        step: u32,
        survivors: usize,
        diversity: Option<f32>,
    ) -> Self {
        let agents = peeps
            .iter()
            .filter(|a| a.alive)
            .map(|a| AgentSnapshot {
                index: a.index,
                loc: a.loc,
                birth_loc: a.birth_loc,
                age: a.age,
                alive: a.alive,
                color: a.genome.color_rgb(),
            })
            .collect();
        Self {
            generation,
            step,
            survivors,
            diversity,
            agents,
        }
    }
}

/// Hooks called by the scheduler on its own thread. Implementations must
/// return quickly; hand work off to another thread if it may block.
pub trait StepObserver: Send {
    fn on_step_end(&mut self, _snapshot: &StepSnapshot) {}

    /// Last step of a generation ran; parameters are not yet refreshed and
    /// nobody has been judged.
    fn on_generation_end(&mut self, _generation: u32, _peeps: &Peeps) {}

    /// Survivors were judged under the refreshed parameters; breeding has
    /// not started.
    fn on_generation_stats(&mut self, _stats: &GenerationStats) {}
}

/// Keeps the most recent snapshot for hosts that poll.
#[derive(Debug, Clone, Default)]
pub struct FrameBuffer {
    latest: Arc<Mutex<Option<Arc<StepSnapshot>>>>,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn latest(&self) -> Option<Arc<StepSnapshot>> {
        self.latest.lock().clone()
    }

    pub fn take(&self) -> Option<Arc<StepSnapshot>> {
        self.latest.lock().take()
    }
}

impl StepObserver for FrameBuffer {
    fn on_step_end(&mut self, snapshot: &StepSnapshot) {
        *self.latest.lock() = Some(Arc::new(snapshot.clone()));
    }
}
