//! Run mode shared between the scheduler and whoever drives it.

use biosim_core::RunMode;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// Cloneable handle to the scheduler's [`RunMode`].
#[derive(Debug, Clone)]
pub struct RunControl {
    mode: Arc<AtomicU8>,
}

impl RunControl {
    pub fn new(mode: RunMode) -> Self {
        Self {
            mode: Arc::new(AtomicU8::new(mode as u8)),
        }
    }

    pub fn mode(&self) -> RunMode {
        RunMode::from_u8(self.mode.load(Ordering::Acquire)).unwrap_or(RunMode::Abort)
    }

    pub fn set(&self, mode: RunMode) {
        self.mode.store(mode as u8, Ordering::Release);
    }

    pub fn stop(&self) {
        self.set(RunMode::Stop);
    }

    pub fn is_terminal(&self) -> bool {
        self.mode().is_terminal()
    }
}

impl Default for RunControl {
    fn default() -> Self {
        Self::new(RunMode::Run)
    }
}
