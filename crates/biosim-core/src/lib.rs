//! Core types and utilities for the biosim evolutionary simulation.

pub mod config;
pub mod error;
pub mod geometry;
pub mod stats;
pub mod types;

pub use config::*;
pub use error::{Error, Result};
pub use geometry::{Coord, Dir, Polar};
pub use stats::*;
pub use types::*;
