//! The 32-bit gene: one weighted edge of the neural wiring.

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Mask for the 7-bit source and sink numbers.
pub const NUM_MASK: u8 = 0x7f;

/// Divisor turning the stored weight into a float in roughly -4.0..4.0.
pub const WEIGHT_SCALE: f32 = 8192.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceKind {
    Neuron,
    Sensor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SinkKind {
    Neuron,
    Action,
}

impl SourceKind {
    pub fn bit(self) -> u8 {
        match self {
            SourceKind::Neuron => 0,
            SourceKind::Sensor => 1,
        }
    }

    pub fn from_bit(bit: bool) -> Self {
        if bit {
            SourceKind::Sensor
        } else {
            SourceKind::Neuron
        }
    }

    pub fn flipped(self) -> Self {
        Self::from_bit(self.bit() == 0)
    }
}

impl SinkKind {
    pub fn bit(self) -> u8 {
        match self {
            SinkKind::Neuron => 0,
            SinkKind::Action => 1,
        }
    }

    pub fn from_bit(bit: bool) -> Self {
        if bit {
            SinkKind::Action
        } else {
            SinkKind::Neuron
        }
    }

    pub fn flipped(self) -> Self {
        Self::from_bit(self.bit() == 0)
    }
}

/// Packed layout, most significant bit first:
/// source kind (1) | source number (7) | sink kind (1) | sink number (7) | weight (16).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Gene {
    pub source_kind: SourceKind,
    pub source_num: u8,
    pub sink_kind: SinkKind,
    pub sink_num: u8,
    pub weight: i16,
}

impl Gene {
    pub fn new(
        source_kind: SourceKind,
        source_num: u8,
        sink_kind: SinkKind,
        sink_num: u8,
        weight: i16,
    ) -> Self {
        Self {
            source_kind,
            source_num: source_num & NUM_MASK,
            sink_kind,
            sink_num: sink_num & NUM_MASK,
            weight,
        }
    }

    pub fn random(rng: &mut ChaCha8Rng) -> Self {
        Self::new(
            SourceKind::from_bit(rng.gen()),
            rng.gen::<u8>(),
            SinkKind::from_bit(rng.gen()),
            rng.gen::<u8>(),
            Self::random_weight(rng),
        )
    }

    pub fn random_weight(rng: &mut ChaCha8Rng) -> i16 {
        rng.gen::<i16>()
    }

    pub fn weight_as_f32(&self) -> f32 {
        self.weight as f32 / WEIGHT_SCALE
    }

    pub fn to_u32(&self) -> u32 {
        (self.source_kind.bit() as u32) << 31
            | ((self.source_num & NUM_MASK) as u32) << 24
            | (self.sink_kind.bit() as u32) << 23
            | ((self.sink_num & NUM_MASK) as u32) << 16
            | self.weight as u16 as u32
    }

    pub fn from_u32(bits: u32) -> Self {
        Self {
            source_kind: SourceKind::from_bit(bits >> 31 & 1 == 1),
            source_num: (bits >> 24) as u8 & NUM_MASK,
            sink_kind: SinkKind::from_bit(bits >> 23 & 1 == 1),
            sink_num: (bits >> 16) as u8 & NUM_MASK,
            weight: bits as u16 as i16,
        }
    }
}

impl fmt::Display for Gene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}", self.to_u32())
    }
}
