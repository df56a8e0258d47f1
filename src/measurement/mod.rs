// src/measurement/mod.rs

//! Turning a final register into candidate keys, and checking them.
//!
//! Exact measurement reads the key-register probabilities directly; shot
//! sampling draws from the same distribution with a seeded `StdRng`.
//! Candidates are ranked by frequency, then re-checked against the
//! classical cipher, which is the only authoritative test.

use crate::cipher::{AesPrimitive, Block, KeySpace};
use crate::core::{GroverError, Register, Result};
use crate::oracle::OracleSpec;
use crate::validation::check_ancilla_restored;
use rand::SeedableRng;
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;
use rand::rngs::StdRng;
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// Mapping from candidate key to observed probability or frequency.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementOutcome {
    key_bits: usize,
    distribution: BTreeMap<u64, f64>,
    counts: Option<BTreeMap<u64, u64>>,
}

impl MeasurementOutcome {
    /// Exact outcome from a full probability vector indexed by key value.
    /// Zero-probability keys are dropped.
    pub fn exact(key_bits: usize, probabilities: &[f64]) -> Self {
        let distribution = probabilities
            .iter()
            .enumerate()
            .filter(|(_, p)| **p > 0.0)
            .map(|(k, p)| (k as u64, *p))
            .collect();
        Self { key_bits, distribution, counts: None }
    }

    /// Sampled outcome from shot counts.
    pub fn from_counts(key_bits: usize, counts: BTreeMap<u64, u64>) -> Self {
        let shots: u64 = counts.values().sum();
        let distribution = if shots == 0 {
            BTreeMap::new()
        } else {
            counts.iter().map(|(k, c)| (*k, *c as f64 / shots as f64)).collect()
        };
        Self { key_bits, distribution, counts: Some(counts) }
    }

    pub fn key_bits(&self) -> usize {
        self.key_bits
    }

    pub fn is_exact(&self) -> bool {
        self.counts.is_none()
    }

    /// Number of shots behind a sampled outcome.
    pub fn shots(&self) -> Option<u64> {
        self.counts.as_ref().map(|c| c.values().sum())
    }

    /// Probability (exact) or relative frequency (sampled) of `key`.
    pub fn probability(&self, key: u64) -> f64 {
        self.distribution.get(&key).copied().unwrap_or(0.0)
    }

    pub fn count(&self, key: u64) -> Option<u64> {
        self.counts.as_ref().map(|c| c.get(&key).copied().unwrap_or(0))
    }

    /// Keys with non-zero weight, ascending.
    pub fn iter(&self) -> impl Iterator<Item = (u64, f64)> + '_ {
        self.distribution.iter().map(|(k, p)| (*k, *p))
    }

    /// The same data keyed by bitstring, most significant bit first.
    pub fn bitstring_map(&self) -> BTreeMap<String, f64> {
        self.iter().map(|(k, p)| (bitstring(k, self.key_bits), p)).collect()
    }
}

impl fmt::Display for MeasurementOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.shots() {
            Some(shots) => writeln!(f, "MeasurementOutcome[{} shots over {} key bits]", shots, self.key_bits)?,
            None => writeln!(f, "MeasurementOutcome[exact over {} key bits]", self.key_bits)?,
        }
        for (key, p) in self.iter() {
            write!(f, "  {}: {:.4}", bitstring(key, self.key_bits), p)?;
            if let Some(count) = self.count(key) {
                write!(f, " ({})", count)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

fn bitstring(key: u64, key_bits: usize) -> String {
    format!("{:0width$b}", key, width = key_bits)
}

/// A key value pulled out of a measurement outcome, not yet verified.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandidateKey {
    /// The `n`-bit candidate
    pub value: u64,
    pub key_bits: usize,
    /// Probability or relative frequency in the outcome
    pub frequency: f64,
    /// Absolute shot count for sampled outcomes
    pub count: Option<u64>,
}

impl CandidateKey {
    /// The complete AES key this candidate stands for.
    pub fn full_key(&self, key_space: &KeySpace) -> Block {
        key_space.full_key(self.value)
    }

    pub fn bitstring(&self) -> String {
        bitstring(self.value, self.key_bits)
    }
}

impl fmt::Display for CandidateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}) p={:.4}", self.bitstring(), self.value, self.frequency)
    }
}

/// Exact measurement: key-register probabilities with the ancilla summed out.
///
/// # Errors
/// `AncillaLeakage` if the ancilla register is not in |0>.
pub fn measure(register: &Register) -> Result<MeasurementOutcome> {
    check_ancilla_restored(register, None)?;
    Ok(MeasurementOutcome::exact(register.key_qubits(), &register.key_probabilities()))
}

/// Draws `shots` samples from the register's key distribution.
///
/// # Errors
/// `AncillaLeakage` as for [`measure`]; `Incoherence` if the distribution
/// carries no weight at all.
pub fn measure_shots(register: &Register, shots: usize, rng: &mut StdRng) -> Result<MeasurementOutcome> {
    check_ancilla_restored(register, None)?;
    let counts = sample_shots(&register.key_probabilities(), shots, rng)?;
    Ok(MeasurementOutcome::from_counts(register.key_qubits(), counts))
}

/// Samples `shots` indices from `probabilities`, returning per-index counts.
pub fn sample_shots(probabilities: &[f64], shots: usize, rng: &mut StdRng) -> Result<BTreeMap<u64, u64>> {
    let dist = WeightedIndex::new(probabilities).map_err(|e| {
        debug!(error = %e, "cannot sample from distribution");
        GroverError::Incoherence { norm: probabilities.iter().sum() }
    })?;
    let mut counts = BTreeMap::new();
    for _ in 0..shots {
        *counts.entry(dist.sample(rng) as u64).or_insert(0u64) += 1;
    }
    Ok(counts)
}

/// Seeded generator for reproducible runs, or one seeded from OS entropy.
pub fn shot_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_rng(&mut rand::rng()),
    }
}

/// The `top_k` most frequent keys, highest first; ties go to the lower key.
pub fn extract_candidates(outcome: &MeasurementOutcome, top_k: usize) -> Vec<CandidateKey> {
    let mut ranked: Vec<(u64, f64)> = outcome.iter().collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    ranked
        .into_iter()
        .take(top_k)
        .map(|(value, frequency)| CandidateKey {
            value,
            key_bits: outcome.key_bits(),
            frequency,
            count: outcome.count(value),
        })
        .collect()
}

/// Re-runs the cipher on every known pair. Authoritative.
pub fn verify(candidate: &CandidateKey, spec: &OracleSpec, primitive: &dyn AesPrimitive) -> bool {
    let verified = spec.is_marked(candidate.value, primitive);
    debug!(candidate = %candidate, verified, "classical verification");
    verified
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cipher::{Aes128Primitive, PlaintextCiphertextPair, parse_block_hex};
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_exact_measurement_of_superposition() -> Result<()> {
        let register = Register::initialize(3, 1)?.apply_uniform_superposition();
        let outcome = measure(&register)?;
        assert!(outcome.is_exact());
        assert_eq!(outcome.iter().count(), 8);
        assert_abs_diff_eq!(outcome.probability(5), 0.125, epsilon = 1e-12);
        assert_eq!(outcome.count(5), None);
        assert!(outcome.bitstring_map().contains_key("101"));
        Ok(())
    }

    #[test]
    fn test_sampling_is_reproducible_with_seed() -> Result<()> {
        let probabilities = [0.1, 0.0, 0.6, 0.3];
        let first = sample_shots(&probabilities, 500, &mut shot_rng(Some(7)))?;
        let second = sample_shots(&probabilities, 500, &mut shot_rng(Some(7)))?;
        assert_eq!(first, second);
        assert_eq!(first.values().sum::<u64>(), 500);
        assert!(!first.contains_key(&1));
        Ok(())
    }

    #[test]
    fn test_unseeded_generators_differ() -> Result<()> {
        let probabilities = [0.25; 4];
        let first = sample_shots(&probabilities, 256, &mut shot_rng(None))?;
        let second = sample_shots(&probabilities, 256, &mut shot_rng(None))?;
        assert_eq!(first.values().sum::<u64>(), 256);
        assert_ne!(first, second);
        Ok(())
    }

    #[test]
    fn test_sampled_outcome_frequencies() -> Result<()> {
        let register = Register::initialize(2, 0)?.apply_uniform_superposition();
        let outcome = measure_shots(&register, 1000, &mut shot_rng(Some(1)))?;
        assert_eq!(outcome.shots(), Some(1000));
        let total: f64 = outcome.iter().map(|(_, p)| p).sum();
        assert_abs_diff_eq!(total, 1.0, epsilon = 1e-12);
        for key in 0..4 {
            assert!(outcome.probability(key) > 0.15, "key {} undersampled", key);
        }
        Ok(())
    }

    #[test]
    fn test_all_zero_distribution_rejected() {
        let result = sample_shots(&[0.0, 0.0], 10, &mut shot_rng(Some(3)));
        assert!(matches!(result, Err(GroverError::Incoherence { .. })));
    }

    #[test]
    fn test_extract_candidates_orders_and_breaks_ties() {
        let counts = BTreeMap::from([(3u64, 40u64), (9, 40), (1, 15), (12, 5)]);
        let outcome = MeasurementOutcome::from_counts(4, counts);
        let candidates = extract_candidates(&outcome, 3);
        let values: Vec<u64> = candidates.iter().map(|c| c.value).collect();
        assert_eq!(values, vec![3, 9, 1]);
        assert_eq!(candidates[0].count, Some(40));
        assert_eq!(candidates[0].bitstring(), "0011");
        assert_abs_diff_eq!(candidates[2].frequency, 0.15, epsilon = 1e-12);
    }

    #[test]
    fn test_top_k_larger_than_outcome() {
        let outcome = MeasurementOutcome::exact(2, &[0.5, 0.5, 0.0, 0.0]);
        assert_eq!(extract_candidates(&outcome, 10).len(), 2);
    }

    #[test]
    fn test_verify_uses_cipher() -> Result<()> {
        let pair = PlaintextCiphertextPair::from_text("This is a test", "3c86e7ec17bb967b9da2f2242d94a634")?;
        let base = parse_block_hex("key", "00112233445566778899aabbccddeeff")?;
        let space = KeySpace::new(base, 4)?;
        let spec = OracleSpec::new(vec![pair], space)?;

        let right = CandidateKey { value: 15, key_bits: 4, frequency: 0.9, count: None };
        let wrong = CandidateKey { value: 14, key_bits: 4, frequency: 0.05, count: None };
        assert!(verify(&right, &spec, &Aes128Primitive));
        assert!(!verify(&wrong, &spec, &Aes128Primitive));
        assert_eq!(right.full_key(&space), base);
        Ok(())
    }
}
