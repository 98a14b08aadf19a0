//! Sources of parameter updates, polled between generations.

use biosim_core::{Result, SimulationConfig};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;

pub trait ParameterSource: Send {
    /// A new configuration if one is available since the last call.
    fn refresh(&mut self) -> Result<Option<SimulationConfig>>;
}

/// Re-reads a JSON config file whenever its modification time changes.
#[derive(Debug)]
pub struct FileParameterSource {
    path: PathBuf,
    last_modified: Option<SystemTime>,
}

impl FileParameterSource {
    /// The file's current contents count as already seen.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let last_modified = modified(&path);
        Self {
            path,
            last_modified,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn modified(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

impl ParameterSource for FileParameterSource {
    fn refresh(&mut self) -> Result<Option<SimulationConfig>> {
        let current = modified(&self.path);
        if current.is_none() || current == self.last_modified {
            return Ok(None);
        }
        self.last_modified = current;
        debug!(path = %self.path.display(), "config file changed");
        SimulationConfig::load(&self.path).map(Some)
    }
}

/// Hands out queued configurations, one per refresh.
#[derive(Debug, Default)]
pub struct QueuedParameterSource {
    pending: std::collections::VecDeque<SimulationConfig>,
}

impl QueuedParameterSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, config: SimulationConfig) {
        self.pending.push_back(config);
    }
}

impl ParameterSource for QueuedParameterSource {
    fn refresh(&mut self) -> Result<Option<SimulationConfig>> {
        Ok(self.pending.pop_front())
    }
}
