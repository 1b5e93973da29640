//! Pairwise allelic distances.

use crate::data::{AllelicProfiles, DistanceMatrix, MISSING_ALLELE};
use crate::error::Result;
use rayon::prelude::*;
use std::path::Path;
use tracing::debug;

/// Computes the distance matrix of a set of profiles.
pub trait DistanceService: Send + Sync {
    /// Compare every profile with every other and write the binary matrix
    /// artifact to `artifact`.
    fn compute(&self, profiles: &AllelicProfiles, artifact: &Path) -> Result<()>;
}

/// Number of loci at which two profiles carry different alleles.
#[derive(Debug, Clone, Copy, Default)]
pub struct HammingDistance {
    /// Count a locus missing on one side only as a difference.
    pub count_missing: bool,
}

impl HammingDistance {
    pub fn new(count_missing: bool) -> Self {
        Self { count_missing }
    }

    /// Distance between two rows of allele codes.
    pub fn between(&self, a: &[u32], b: &[u32]) -> u32 {
        a.iter()
            .zip(b)
            .filter(|(x, y)| {
                if x == y {
                    return false;
                }
                self.count_missing || (**x != MISSING_ALLELE && **y != MISSING_ALLELE)
            })
            .count() as u32
    }

    /// Full matrix over `profiles`.
    pub fn matrix(&self, profiles: &AllelicProfiles) -> Result<DistanceMatrix> {
        let n = profiles.n_samples();
        let values: Vec<f64> = (0..n)
            .into_par_iter()
            .flat_map_iter(|i| {
                let row = profiles.calls(i);
                (0..n).map(move |j| self.between(row, profiles.calls(j)) as f64)
            })
            .collect();
        DistanceMatrix::new(profiles.sample_ids().to_vec(), values)
    }
}

impl DistanceService for HammingDistance {
    fn compute(&self, profiles: &AllelicProfiles, artifact: &Path) -> Result<()> {
        let matrix = self.matrix(profiles)?;
        debug!(
            n = matrix.n(),
            loci = profiles.n_loci(),
            path = %artifact.display(),
            "computed hamming distances"
        );
        matrix.write_bin(artifact)
    }
}
