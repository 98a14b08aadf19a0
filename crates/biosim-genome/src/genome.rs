//! Variable-length gene sequences.

use crate::gene::Gene;
use biosim_core::Result;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Channel ceiling above which an overly bright display colour is folded back.
const MAX_COLOR_VAL: u8 = 0xb0;
const MAX_LUMA_VAL: u32 = 0xb0;

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Genome {
    genes: Vec<Gene>,
}

impl Genome {
    pub fn new(genes: Vec<Gene>) -> Self {
        Self { genes }
    }

    /// A genome of random genes with a length uniform in `min_len..=max_len`.
    pub fn random(rng: &mut ChaCha8Rng, min_len: usize, max_len: usize) -> Self {
        let len = rng.gen_range(min_len..=max_len.max(min_len));
        Self {
            genes: (0..len).map(|_| Gene::random(rng)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.genes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }

    pub fn genes(&self) -> &[Gene] {
        &self.genes
    }

    pub fn genes_mut(&mut self) -> &mut Vec<Gene> {
        &mut self.genes
    }

    pub fn iter(&self) -> impl Iterator<Item = &Gene> {
        self.genes.iter()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }

    /// Space separated 8-digit hex form of every gene.
    pub fn to_hex(&self) -> String {
        self.genes
            .iter()
            .map(|g| g.to_string())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn from_hex(text: &str) -> Result<Self> {
        let genes = text
            .split_whitespace()
            .map(|word| {
                u32::from_str_radix(word, 16).map(Gene::from_u32).map_err(|e| {
                    biosim_core::Error::Serialization(format!("bad gene {word:?}: {e}"))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { genes })
    }

    /// Eight bits derived from the genome so related genomes share a hue.
    pub fn genetic_color(&self) -> u8 {
        let (Some(front), Some(back)) = (self.genes.first(), self.genes.last()) else {
            return 0;
        };
        (self.genes.len() & 1) as u8
            | front.source_kind.bit() << 1
            | back.source_kind.bit() << 2
            | front.sink_kind.bit() << 3
            | back.sink_kind.bit() << 4
            | (front.source_num & 1) << 5
            | (front.sink_num & 1) << 6
            | (back.source_num & 1) << 7
    }

    /// Display colour as `[r, g, b]`.
    pub fn color_rgb(&self) -> [u8; 3] {
        let c = self.genetic_color();
        let mut rgb = [c, (c & 0x1f) << 3, (c & 7) << 5];
        let [r, g, b] = rgb.map(u32::from);
        let luma = (r + r + r + b + g + g + g + g) / 8;
        if luma > MAX_LUMA_VAL {
            for channel in &mut rgb {
                if *channel > MAX_COLOR_VAL {
                    *channel %= MAX_COLOR_VAL;
                }
            }
        }
        rgb
    }
}

impl From<Vec<Gene>> for Genome {
    fn from(genes: Vec<Gene>) -> Self {
        Self::new(genes)
    }
}

impl fmt::Display for Genome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}
