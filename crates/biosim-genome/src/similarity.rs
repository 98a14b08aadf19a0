//! Genome similarity measures and the population diversity metric.
//!
//! These only feed reporting; nothing in the simulation reads them.

use crate::genome::Genome;
use biosim_core::GenomeComparison;

/// Genes considered by the Jaro-Winkler comparison.
const MAX_GENES_TO_COMPARE: usize = 20;

/// Adjacent pairs sampled by [`genetic_diversity`].
const MAX_DIVERSITY_SAMPLES: usize = 1000;

/// Similarity in 0..=1 using the selected comparison.
pub fn genome_similarity(a: &Genome, b: &Genome, comparison: GenomeComparison) -> f32 {
    match comparison {
        GenomeComparison::JaroWinkler => jaro_winkler(a, b),
        GenomeComparison::HammingBits => hamming_bits(a, b),
        GenomeComparison::HammingBytes => hamming_bytes(a, b),
    }
}

/// Jaro-Winkler similarity treating each gene as one symbol.
pub fn jaro_winkler(a: &Genome, b: &Genome) -> f32 {
    let s = &a.genes()[..a.len().min(MAX_GENES_TO_COMPARE)];
    let t = &b.genes()[..b.len().min(MAX_GENES_TO_COMPARE)];
    if s.is_empty() || t.is_empty() {
        return 0.0;
    }

    let range = (s.len().max(t.len()) / 2).saturating_sub(1);
    let mut s_flags = vec![false; s.len()];
    let mut t_flags = vec![false; t.len()];
    let mut matches = 0usize;

    for (i, gene) in t.iter().enumerate() {
        let lo = i.saturating_sub(range);
        let hi = (i + range + 1).min(s.len());
        for j in lo..hi {
            if !s_flags[j] && s[j] == *gene {
                s_flags[j] = true;
                t_flags[i] = true;
                matches += 1;
                break;
            }
        }
    }
    if matches == 0 {
        return 0.0;
    }

    let s_matched = s.iter().zip(&s_flags).filter(|(_, &f)| f).map(|(g, _)| g);
    let t_matched = t.iter().zip(&t_flags).filter(|(_, &f)| f).map(|(g, _)| g);
    let transpositions = s_matched.zip(t_matched).filter(|(x, y)| x != y).count() / 2;

    let m = matches as f32;
    let jaro = (m / s.len() as f32 + m / t.len() as f32 + (m - transpositions as f32) / m) / 3.0;

    let prefix = s.iter().zip(t).take(4).take_while(|(x, y)| x == y).count();
    jaro + prefix as f32 * 0.1 * (1.0 - jaro)
}

/// Fraction of agreeing bits over the common prefix, scaled so two random
/// genomes score about 0.
pub fn hamming_bits(a: &Genome, b: &Genome) -> f32 {
    let len = a.len().min(b.len());
    if len == 0 {
        return 0.0;
    }
    let differing: u32 = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| (x.to_u32() ^ y.to_u32()).count_ones())
        .sum();
    let total_bits = (len * 32) as f32;
    1.0 - (2.0 * differing as f32 / total_bits).min(1.0)
}

/// Fraction of identical bytes over the common prefix.
pub fn hamming_bytes(a: &Genome, b: &Genome) -> f32 {
    let len = a.len().min(b.len());
    if len == 0 {
        return 0.0;
    }
    let same: usize = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let (x, y) = (x.to_u32().to_be_bytes(), y.to_u32().to_be_bytes());
            x.iter().zip(&y).filter(|(p, q)| p == q).count()
        })
        .sum();
    same as f32 / (len * 4) as f32
}

/// One minus the mean similarity of up to 1000 adjacent genome pairs.
/// Zero for fewer than two genomes.
pub fn genetic_diversity<'a, I>(genomes: I, comparison: GenomeComparison) -> f32
where
    I: IntoIterator<Item = &'a Genome>,
{
    let genomes: Vec<&Genome> = genomes.into_iter().collect();
    if genomes.len() < 2 {
        return 0.0;
    }
    let samples = (genomes.len() - 1).min(MAX_DIVERSITY_SAMPLES);
    let total: f32 = genomes
        .windows(2)
        .take(samples)
        .map(|pair| genome_similarity(pair[0], pair[1], comparison))
        .sum();
    1.0 - total / samples as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gene::{Gene, SinkKind, SourceKind};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn gene(n: u8) -> Gene {
        Gene::new(SourceKind::Sensor, n, SinkKind::Action, n, n as i16)
    }

    #[test]
    fn test_identical_genomes_are_fully_similar() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let g = Genome::random(&mut rng, 30, 30);
        for comparison in [
            GenomeComparison::JaroWinkler,
            GenomeComparison::HammingBits,
            GenomeComparison::HammingBytes,
        ] {
            let sim = genome_similarity(&g, &g, comparison);
            assert!((sim - 1.0).abs() < 1e-6, "{comparison:?} gave {sim}");
        }
    }

    #[test]
    fn test_empty_genomes() {
        let empty = Genome::default();
        let g = Genome::new(vec![gene(1)]);
        assert_eq!(jaro_winkler(&empty, &g), 0.0);
        assert_eq!(hamming_bits(&empty, &g), 0.0);
        assert_eq!(hamming_bytes(&g, &empty), 0.0);
    }

    #[test]
    fn test_jaro_winkler_transposition() {
        let a = Genome::new(vec![gene(1), gene(2), gene(3), gene(4)]);
        let b = Genome::new(vec![gene(1), gene(2), gene(4), gene(3)]);
        let sim = jaro_winkler(&a, &b);
        assert!(sim < 1.0);
        assert!(sim > 0.8);

        let c = Genome::new(vec![gene(9), gene(8), gene(7), gene(6)]);
        assert_eq!(jaro_winkler(&a, &c), 0.0);
    }

    #[test]
    fn test_hamming_bits_scaling() {
        let a = Genome::new(vec![Gene::from_u32(0)]);
        let b = Genome::new(vec![Gene::from_u32(0xffff_ffff)]);
        assert_eq!(hamming_bits(&a, &b), 0.0);
        let c = Genome::new(vec![Gene::from_u32(1)]);
        assert!((hamming_bits(&a, &c) - (1.0 - 2.0 / 32.0)).abs() < 1e-6);
        assert_eq!(hamming_bytes(&a, &c), 0.75);
    }

    #[test]
    fn test_diversity() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let g = Genome::random(&mut rng, 24, 24);
        let clones = vec![g.clone(), g.clone(), g.clone()];
        assert!(genetic_diversity(&clones, GenomeComparison::JaroWinkler).abs() < 1e-6);

        let randoms: Vec<Genome> = (0..50).map(|_| Genome::random(&mut rng, 24, 24)).collect();
        let diversity = genetic_diversity(&randoms, GenomeComparison::JaroWinkler);
        assert!(diversity > 0.9);

        assert_eq!(genetic_diversity(&randoms[..1], GenomeComparison::HammingBits), 0.0);
    }
}
