//! Validation for externally supplied genomes.

use crate::gene::NUM_MASK;
use crate::genome::Genome;
use biosim_core::{Error, Result};

/// Validate that a genome is usable by a run with the given length cap
pub fn validate_genome(genome: &Genome, max_length: usize) -> Result<()> {
    if genome.is_empty() {
        return Err(Error::Validation("Genome has no genes".to_string()));
    }

    if genome.len() > max_length {
        return Err(Error::Validation(format!(
            "Genome has {} genes, limit is {}",
            genome.len(),
            max_length
        )));
    }

    for (idx, gene) in genome.iter().enumerate() {
        if gene.source_num > NUM_MASK || gene.sink_num > NUM_MASK {
            return Err(Error::Validation(format!(
                "Gene {} ({}) has an out of range node number",
                idx, gene
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gene::{Gene, SinkKind, SourceKind};

    #[test]
    fn test_validate_empty_genome() {
        assert!(validate_genome(&Genome::default(), 10).is_err());
    }

    #[test]
    fn test_validate_too_long() {
        let gene = Gene::new(SourceKind::Sensor, 0, SinkKind::Action, 0, 1);
        let genome = Genome::new(vec![gene; 11]);
        assert!(validate_genome(&genome, 10).is_err());
        assert!(validate_genome(&genome, 11).is_ok());
    }

    #[test]
    fn test_validate_unmasked_numbers() {
        let mut gene = Gene::new(SourceKind::Neuron, 0, SinkKind::Neuron, 0, 1);
        gene.sink_num = 200;
        assert!(validate_genome(&Genome::new(vec![gene]), 10).is_err());
    }
}
