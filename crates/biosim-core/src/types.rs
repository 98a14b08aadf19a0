//! Core type definitions for the simulation.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a simulation run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Externally commanded scheduler state. Only `Run` advances steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum RunMode {
    Stop = 0,
    Pause = 1,
    Run = 2,
    Abort = 3,
}

impl RunMode {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(RunMode::Stop),
            1 => Some(RunMode::Pause),
            2 => Some(RunMode::Run),
            3 => Some(RunMode::Abort),
            _ => None,
        }
    }

    /// True for the modes that end a run.
    pub fn is_terminal(self) -> bool {
        matches!(self, RunMode::Stop | RunMode::Abort)
    }
}

/// Neural-net input nodes. Every sensor yields a value in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Sensor {
    /// Normalized east-west location
    LocX,
    /// Normalized north-south location
    LocY,
    /// Distance to the nearest east or west edge
    BoundaryDistX,
    /// Distance to the nearest edge of any kind
    BoundaryDist,
    /// Distance to the nearest north or south edge
    BoundaryDistY,
    /// Genetic similarity with the agent directly ahead
    GeneticSimFwd,
    LastMoveDirX,
    LastMoveDirY,
    /// Distance to the nearest agent straight ahead
    LongProbePopFwd,
    /// Distance to the nearest barrier straight ahead
    LongProbeBarFwd,
    /// Population density in the neighborhood
    Population,
    /// Population gradient along the last move direction
    PopulationFwd,
    /// Population gradient across the last move direction
    PopulationLr,
    Osc1,
    Age,
    /// Short-range barrier gradient along the last move direction
    BarrierFwd,
    /// Short-range barrier gradient across the last move direction
    BarrierLr,
    Random,
    /// Signal layer 0 density in the neighborhood
    Signal0,
    Signal0Fwd,
    Signal0Lr,
    /// Constant 1.0
    Bias,
}

impl Sensor {
    pub const COUNT: usize = 22;

    pub const ALL: [Sensor; Sensor::COUNT] = [
        Sensor::LocX,
        Sensor::LocY,
        Sensor::BoundaryDistX,
        Sensor::BoundaryDist,
        Sensor::BoundaryDistY,
        Sensor::GeneticSimFwd,
        Sensor::LastMoveDirX,
        Sensor::LastMoveDirY,
        Sensor::LongProbePopFwd,
        Sensor::LongProbeBarFwd,
        Sensor::Population,
        Sensor::PopulationFwd,
        Sensor::PopulationLr,
        Sensor::Osc1,
        Sensor::Age,
        Sensor::BarrierFwd,
        Sensor::BarrierLr,
        Sensor::Random,
        Sensor::Signal0,
        Sensor::Signal0Fwd,
        Sensor::Signal0Lr,
        Sensor::Bias,
    ];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Sensor::LocX => "LocX",
            Sensor::LocY => "LocY",
            Sensor::BoundaryDistX => "BoundaryDistX",
            Sensor::BoundaryDist => "BoundaryDist",
            Sensor::BoundaryDistY => "BoundaryDistY",
            Sensor::GeneticSimFwd => "GeneticSimFwd",
            Sensor::LastMoveDirX => "LastMoveDirX",
            Sensor::LastMoveDirY => "LastMoveDirY",
            Sensor::LongProbePopFwd => "LongProbePopFwd",
            Sensor::LongProbeBarFwd => "LongProbeBarFwd",
            Sensor::Population => "Population",
            Sensor::PopulationFwd => "PopulationFwd",
            Sensor::PopulationLr => "PopulationLr",
            Sensor::Osc1 => "Osc1",
            Sensor::Age => "Age",
            Sensor::BarrierFwd => "BarrierFwd",
            Sensor::BarrierLr => "BarrierLr",
            Sensor::Random => "Random",
            Sensor::Signal0 => "Signal0",
            Sensor::Signal0Fwd => "Signal0Fwd",
            Sensor::Signal0Lr => "Signal0Lr",
            Sensor::Bias => "Bias",
        }
    }

    /// Three-letter label used in compact net dumps.
    pub fn mnemonic(self) -> &'static str {
        match self {
            Sensor::LocX => "Lx",
            Sensor::LocY => "Ly",
            Sensor::BoundaryDistX => "EDx",
            Sensor::BoundaryDist => "ED",
            Sensor::BoundaryDistY => "EDy",
            Sensor::GeneticSimFwd => "Gen",
            Sensor::LastMoveDirX => "LMx",
            Sensor::LastMoveDirY => "LMy",
            Sensor::LongProbePopFwd => "LPf",
            Sensor::LongProbeBarFwd => "LPb",
            Sensor::Population => "Pop",
            Sensor::PopulationFwd => "Pfd",
            Sensor::PopulationLr => "Plr",
            Sensor::Osc1 => "Osc",
            Sensor::Age => "Age",
            Sensor::BarrierFwd => "Bfd",
            Sensor::BarrierLr => "Blr",
            Sensor::Random => "Rnd",
            Sensor::Signal0 => "Sg",
            Sensor::Signal0Fwd => "Sfd",
            Sensor::Signal0Lr => "Slr",
            Sensor::Bias => "Bia",
        }
    }
}

impl fmt::Display for Sensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Neural-net output nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Action {
    MoveX,
    MoveY,
    MoveForward,
    /// Sideways move, right for positive levels
    MoveRl,
    MoveRandom,
    SetOscillatorPeriod,
    SetLongProbeDist,
    SetResponsiveness,
    EmitSignal0,
    MoveEast,
    MoveWest,
    MoveNorth,
    MoveSouth,
    MoveLeft,
    MoveRight,
    MoveReverse,
    KillForward,
}

impl Action {
    pub const COUNT: usize = 17;

    pub const ALL: [Action; Action::COUNT] = [
        Action::MoveX,
        Action::MoveY,
        Action::MoveForward,
        Action::MoveRl,
        Action::MoveRandom,
        Action::SetOscillatorPeriod,
        Action::SetLongProbeDist,
        Action::SetResponsiveness,
        Action::EmitSignal0,
        Action::MoveEast,
        Action::MoveWest,
        Action::MoveNorth,
        Action::MoveSouth,
        Action::MoveLeft,
        Action::MoveRight,
        Action::MoveReverse,
        Action::KillForward,
    ];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Action::MoveX => "MoveX",
            Action::MoveY => "MoveY",
            Action::MoveForward => "MoveForward",
            Action::MoveRl => "MoveRl",
            Action::MoveRandom => "MoveRandom",
            Action::SetOscillatorPeriod => "SetOscillatorPeriod",
            Action::SetLongProbeDist => "SetLongProbeDist",
            Action::SetResponsiveness => "SetResponsiveness",
            Action::EmitSignal0 => "EmitSignal0",
            Action::MoveEast => "MoveEast",
            Action::MoveWest => "MoveWest",
            Action::MoveNorth => "MoveNorth",
            Action::MoveSouth => "MoveSouth",
            Action::MoveLeft => "MoveLeft",
            Action::MoveRight => "MoveRight",
            Action::MoveReverse => "MoveReverse",
            Action::KillForward => "KillForward",
        }
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            Action::MoveX => "MvX",
            Action::MoveY => "MvY",
            Action::MoveForward => "Mfd",
            Action::MoveRl => "MRL",
            Action::MoveRandom => "Mrn",
            Action::SetOscillatorPeriod => "OSC",
            Action::SetLongProbeDist => "LPD",
            Action::SetResponsiveness => "Res",
            Action::EmitSignal0 => "SG",
            Action::MoveEast => "MvE",
            Action::MoveWest => "MvW",
            Action::MoveNorth => "MvN",
            Action::MoveSouth => "MvS",
            Action::MoveLeft => "MvL",
            Action::MoveRight => "MvR",
            Action::MoveReverse => "Mrv",
            Action::KillForward => "Klf",
        }
    }

    pub fn is_movement(self) -> bool {
        matches!(
            self,
            Action::MoveX
                | Action::MoveY
                | Action::MoveForward
                | Action::MoveRl
                | Action::MoveRandom
                | Action::MoveEast
                | Action::MoveWest
                | Action::MoveNorth
                | Action::MoveSouth
                | Action::MoveLeft
                | Action::MoveRight
                | Action::MoveReverse
        )
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Built-in survival rules selectable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeKind {
    None,
    Circle,
    RightHalf,
    RightQuarter,
    LeftEighth,
    CenterWeighted,
    CenterUnweighted,
    CenterSparse,
    Corner,
    CornerWeighted,
    EastWestEighths,
    AgainstAnyWall,
    TouchAnyWall,
    MigrateDistance,
    NearBarrier,
    Pairs,
    RadioactiveWalls,
}

impl Default for ChallengeKind {
    fn default() -> Self {
        ChallengeKind::Circle
    }
}

/// Genome comparison used by the diversity metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenomeComparison {
    #[default]
    JaroWinkler,
    HammingBits,
    HammingBytes,
}
