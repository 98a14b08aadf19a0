//! Per-generation statistics and run summaries.

use crate::types::RunId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Figures reported at the end of each generation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationStats {
    /// Generation number before the counter advanced
    pub generation: u32,
    /// Agents that passed the survival rule
    pub survivors: usize,
    /// Deaths caused by KillForward during the generation
    pub murders: usize,
    /// Genetic diversity in 0..=1, when sampled this generation
    pub diversity: Option<f32>,
    pub mean_genome_length: f32,
    /// Mean connection count of the compiled nets
    pub mean_connections: f32,
    /// True when zero survivors forced a restart at generation 0
    pub restarted: bool,
}

/// Final report of a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: RunId,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Total generations simulated, including restarted ones
    pub generations_completed: u64,
    /// Number of zero-survivor restarts
    pub restarts: u32,
    pub final_stats: Option<GenerationStats>,
}

impl RunSummary {
    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}
