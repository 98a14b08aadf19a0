//! The simulated world and its scheduler.
//!
//! Agents live on a [`Grid`], sense it and a [`Signals`] field through a
//! compiled neural net, and act through deferred [`Command`]s that
//! [`Peeps`] applies serially at the end of every step. [`Simulation`]
//! drives steps and generations, judging survivors with a
//! [`SurvivalPredicate`] and breeding the next population from them.

pub mod actions;
pub mod barriers;
pub mod control;
pub mod grid;
pub mod indiv;
pub mod params;
pub mod peeps;
pub mod sensors;
pub mod signals;
pub mod simulation;
pub mod snapshot;
pub mod spawn;
pub mod survival;

pub use actions::Command;
pub use control::RunControl;
pub use grid::Grid;
pub use indiv::Indiv;
pub use params::{FileParameterSource, ParameterSource, QueuedParameterSource};
pub use peeps::{ApplyReport, Peeps};
pub use signals::Signals;
pub use simulation::{Simulation, StepOutcome};
pub use snapshot::{AgentSnapshot, FrameBuffer, StepObserver, StepSnapshot};
pub use survival::{Challenge, SurvivalContext, SurvivalPredicate, Verdict};
