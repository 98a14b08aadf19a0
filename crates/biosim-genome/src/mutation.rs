//! Mutation and recombination operators for genomes.

use crate::gene::{Gene, NUM_MASK};
use crate::genome::Genome;
use biosim_core::MutationConfig;
use rand::Rng;
use rand_chacha::ChaCha8Rng;

pub struct Mutator {
    config: MutationConfig,
    max_length: usize,
}

impl Mutator {
    pub fn new(config: MutationConfig, max_length: usize) -> Self {
        Self { config, max_length }
    }

    pub fn config(&self) -> &MutationConfig {
        &self.config
    }

    /// Build one child from its parents: recombine (or copy `parent1` when
    /// asexual), then insert or delete a gene, then apply point mutations.
    pub fn child_genome(
        &self,
        parent1: &Genome,
        parent2: &Genome,
        sexual: bool,
        rng: &mut ChaCha8Rng,
    ) -> Genome {
        let mut genome = if sexual {
            self.crossover(parent1, parent2, rng)
        } else {
            parent1.clone()
        };
        self.insert_or_delete(&mut genome, rng);
        self.point_mutate(&mut genome, rng);
        genome
    }

    /// Copy the longer parent, overlay a random slice of the shorter one at
    /// the same offset, then crop to the mean parent length.
    pub fn crossover(&self, parent1: &Genome, parent2: &Genome, rng: &mut ChaCha8Rng) -> Genome {
        let (longer, shorter) = if parent1.len() > parent2.len() {
            (parent1, parent2)
        } else {
            (parent2, parent1)
        };

        let mut genes = longer.genes().to_vec();
        if !shorter.is_empty() {
            let mut start = rng.gen_range(0..shorter.len());
            let mut end = rng.gen_range(0..=shorter.len());
            if start > end {
                std::mem::swap(&mut start, &mut end);
            }
            genes[start..end].copy_from_slice(&shorter.genes()[start..end]);
        }

        let mut sum = parent1.len() + parent2.len();
        if sum & 1 == 1 && rng.gen::<bool>() {
            sum += 1;
        }
        let mut genome = Genome::new(genes);
        Self::crop(&mut genome, sum / 2, rng);
        genome
    }

    /// Shorten to `len` genes, dropping from the front or back at random.
    fn crop(genome: &mut Genome, len: usize, rng: &mut ChaCha8Rng) {
        let genes = genome.genes_mut();
        if len == 0 || genes.len() <= len {
            return;
        }
        if rng.gen::<bool>() {
            let excess = genes.len() - len;
            genes.drain(..excess);
        } else {
            genes.truncate(len);
        }
    }

    /// With probability `gene_insertion_deletion_rate`, delete a random gene
    /// (share `deletion_ratio`) or append a random one.
    pub fn insert_or_delete(&self, genome: &mut Genome, rng: &mut ChaCha8Rng) {
        if rng.gen::<f64>() >= self.config.gene_insertion_deletion_rate {
            return;
        }
        let genes = genome.genes_mut();
        if rng.gen::<f64>() < self.config.deletion_ratio {
            if genes.len() > 1 {
                let index = rng.gen_range(0..genes.len());
                genes.remove(index);
            }
        } else if genes.len() < self.max_length {
            genes.push(Gene::random(rng));
        }
    }

    /// Flip one bit in each gene selected with `point_mutation_rate`.
    pub fn point_mutate(&self, genome: &mut Genome, rng: &mut ChaCha8Rng) {
        for gene in genome.genes_mut() {
            if rng.gen::<f64>() < self.config.point_mutation_rate {
                Self::flip_random_bit(gene, rng);
            }
        }
    }

    fn flip_random_bit(gene: &mut Gene, rng: &mut ChaCha8Rng) {
        let chance = rng.gen::<f32>();
        let bit = 1u8 << rng.gen_range(0..7);
        if chance < 0.2 {
            gene.source_kind = gene.source_kind.flipped();
        } else if chance < 0.4 {
            gene.sink_kind = gene.sink_kind.flipped();
        } else if chance < 0.6 {
            gene.source_num = (gene.source_num ^ bit) & NUM_MASK;
        } else if chance < 0.8 {
            gene.sink_num = (gene.sink_num ^ bit) & NUM_MASK;
        } else {
            gene.weight ^= 1i16 << rng.gen_range(1..15);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn mutator(config: MutationConfig) -> Mutator {
        Mutator::new(config, 300)
    }

    fn genome(rng: &mut ChaCha8Rng, len: usize) -> Genome {
        Genome::random(rng, len, len)
    }

    #[test]
    fn test_point_mutation_changes_one_bit() {
        let m = mutator(MutationConfig {
            point_mutation_rate: 1.0,
            ..Default::default()
        });
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let original = genome(&mut rng, 20);
        let mut mutated = original.clone();
        m.point_mutate(&mut mutated, &mut rng);

        assert_eq!(mutated.len(), original.len());
        for (a, b) in original.iter().zip(mutated.iter()) {
            let diff = (a.to_u32() ^ b.to_u32()).count_ones();
            assert_eq!(diff, 1, "{a} vs {b}");
        }
    }

    #[test]
    fn test_zero_rates_copy_parent() {
        let m = mutator(MutationConfig {
            point_mutation_rate: 0.0,
            gene_insertion_deletion_rate: 0.0,
            deletion_ratio: 0.5,
        });
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let parent = genome(&mut rng, 12);
        let other = genome(&mut rng, 12);
        assert_eq!(m.child_genome(&parent, &other, false, &mut rng), parent);
    }

    #[test]
    fn test_insertion_and_deletion() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);

        let deleter = mutator(MutationConfig {
            gene_insertion_deletion_rate: 1.0,
            deletion_ratio: 1.0,
            ..Default::default()
        });
        let mut g = genome(&mut rng, 5);
        deleter.insert_or_delete(&mut g, &mut rng);
        assert_eq!(g.len(), 4);

        let mut single = genome(&mut rng, 1);
        deleter.insert_or_delete(&mut single, &mut rng);
        assert_eq!(single.len(), 1);

        let inserter = Mutator::new(
            MutationConfig {
                gene_insertion_deletion_rate: 1.0,
                deletion_ratio: 0.0,
                ..Default::default()
            },
            6,
        );
        let mut g = genome(&mut rng, 5);
        inserter.insert_or_delete(&mut g, &mut rng);
        assert_eq!(g.len(), 6);
        inserter.insert_or_delete(&mut g, &mut rng);
        assert_eq!(g.len(), 6);
    }

    #[test]
    fn test_crossover_length_is_parent_mean() {
        let m = mutator(MutationConfig::default());
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        for _ in 0..20 {
            let p1 = genome(&mut rng, 10);
            let p2 = genome(&mut rng, 20);
            let child = m.crossover(&p1, &p2, &mut rng);
            assert_eq!(child.len(), 15);

            let p3 = genome(&mut rng, 11);
            let child = m.crossover(&p1, &p3, &mut rng);
            assert!(child.len() == 10 || child.len() == 11);
        }
    }

    #[test]
    fn test_crossover_genes_come_from_parents() {
        let m = mutator(MutationConfig::default());
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let p1 = genome(&mut rng, 8);
        let p2 = genome(&mut rng, 8);
        let child = m.crossover(&p1, &p2, &mut rng);
        for gene in child.iter() {
            assert!(p1.genes().contains(gene) || p2.genes().contains(gene));
        }
    }
}
