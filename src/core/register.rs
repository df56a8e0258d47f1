// src/core/register.rs

use super::constants::grover_constants::AMPLITUDE_BYTES;
use super::error::{GroverError, Result};
use super::state::AmplitudeState;
use crate::simulation::engine;
use std::fmt;

/// Widest register the dense representation will even try to address.
const MAX_ADDRESSABLE_QUBITS: usize = usize::BITS as usize - 5;

/// The key-space register: `key_qubits` candidate-key qubits followed by
/// `ancilla_qubits` scratch qubits used by the oracle.
///
/// The key width is fixed for the lifetime of the register. Ancilla qubits
/// start at |0> and every oracle application must leave them there.
#[derive(Debug, Clone, PartialEq)]
pub struct Register {
    key_qubits: usize,
    ancilla_qubits: usize,
    state: AmplitudeState,
}

impl Register {
    /// Sets up `key_qubits + ancilla_qubits` qubits in the all-zero basis state.
    ///
    /// # Errors
    /// `ResourceExhausted` when the dimension `2^(n+a)` cannot be addressed
    /// on this platform, or when the allocation is refused (reported with a
    /// zero budget). Backend-specific memory budgets are checked by the
    /// backend before it calls this.
    pub fn initialize(key_qubits: usize, ancilla_qubits: usize) -> Result<Self> {
        let total = key_qubits + ancilla_qubits;
        if total > MAX_ADDRESSABLE_QUBITS {
            return Err(GroverError::ResourceExhausted {
                qubits: total,
                dimension: dimension_of(total),
                required_bytes: required_bytes(total),
                budget_bytes: required_bytes(MAX_ADDRESSABLE_QUBITS),
            });
        }
        let state = AmplitudeState::try_zero(total).ok_or_else(|| GroverError::ResourceExhausted {
            qubits: total,
            dimension: dimension_of(total),
            required_bytes: required_bytes(total),
            budget_bytes: 0,
        })?;
        Ok(Self { key_qubits, ancilla_qubits, state })
    }

    /// Hadamard on every key qubit; ancilla qubits are left untouched.
    ///
    /// From |0...0> this yields amplitude `1/sqrt(2^n)` on every key pattern
    /// with the ancilla component at zero.
    pub fn apply_uniform_superposition(mut self) -> Self {
        let amps = self.state.amplitudes_mut();
        for q in 0..self.key_qubits {
            engine::hadamard(amps, q);
        }
        self
    }

    pub fn key_qubits(&self) -> usize {
        self.key_qubits
    }

    pub fn ancilla_qubits(&self) -> usize {
        self.ancilla_qubits
    }

    pub fn total_qubits(&self) -> usize {
        self.key_qubits + self.ancilla_qubits
    }

    /// Number of candidate keys, `2^n`.
    pub fn key_space_size(&self) -> usize {
        1usize << self.key_qubits
    }

    pub fn state(&self) -> &AmplitudeState {
        &self.state
    }

    pub(crate) fn state_mut(&mut self) -> &mut AmplitudeState {
        &mut self.state
    }

    /// Probability of each key pattern with the ancilla register summed out.
    pub fn key_probabilities(&self) -> Vec<f64> {
        let key_mask = self.key_space_size() - 1;
        let mut probabilities = vec![0.0; self.key_space_size()];
        for (index, amp) in self.state.amplitudes().iter().enumerate() {
            probabilities[index & key_mask] += amp.norm_sqr();
        }
        probabilities
    }

    /// Probability mass carried by basis states with any ancilla bit set.
    /// Zero (up to rounding) whenever the oracle uncomputed correctly.
    pub fn ancilla_residual(&self) -> f64 {
        let key_mask = self.key_space_size() - 1;
        self.state
            .amplitudes()
            .iter()
            .enumerate()
            .filter(|(index, _)| index & !key_mask != 0)
            .map(|(_, amp)| amp.norm_sqr())
            .sum()
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Register[{} key + {} ancilla qubits]", self.key_qubits, self.ancilla_qubits)
    }
}

/// `2^qubits`, saturating at `u128::MAX`.
pub fn dimension_of(qubits: usize) -> u128 {
    u32::try_from(qubits)
        .ok()
        .and_then(|q| 1u128.checked_shl(q))
        .unwrap_or(u128::MAX)
}

/// Bytes needed by a dense amplitude vector over `qubits` qubits, saturating.
pub fn required_bytes(qubits: usize) -> u128 {
    dimension_of(qubits).saturating_mul(AMPLITUDE_BYTES as u128)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_initialize_is_all_zero_basis_state() -> Result<()> {
        let register = Register::initialize(3, 2)?;
        assert_eq!(register.state().dim(), 32);
        assert_abs_diff_eq!(register.state().amplitudes()[0].re, 1.0);
        assert_abs_diff_eq!(register.state().norm_sqr(), 1.0);
        Ok(())
    }

    #[test]
    fn test_uniform_superposition_leaves_ancilla_at_zero() -> Result<()> {
        let register = Register::initialize(4, 1)?.apply_uniform_superposition();
        let expected = 0.25; // 1/sqrt(16)
        for (index, amp) in register.state().amplitudes().iter().enumerate() {
            if index < 16 {
                assert_abs_diff_eq!(amp.re, expected, epsilon = 1e-12);
            } else {
                assert_abs_diff_eq!(amp.norm(), 0.0, epsilon = 1e-12);
            }
        }
        assert_abs_diff_eq!(register.ancilla_residual(), 0.0, epsilon = 1e-12);
        let probabilities = register.key_probabilities();
        assert!(probabilities.iter().all(|p| (p - 1.0 / 16.0).abs() < 1e-12));
        Ok(())
    }

    #[test]
    fn test_oversized_register_is_resource_exhausted() {
        let result = Register::initialize(64, 4);
        match result {
            Err(GroverError::ResourceExhausted { qubits, .. }) => assert_eq!(qubits, 68),
            other => panic!("expected ResourceExhausted, got {:?}", other),
        }
    }

    #[test]
    fn test_unallocatable_register_is_resource_exhausted() {
        // 2^50 amplitudes need 16 PiB
        match Register::initialize(48, 2) {
            Err(GroverError::ResourceExhausted { qubits, required_bytes, .. }) => {
                assert_eq!(qubits, 50);
                assert_eq!(required_bytes, 1u128 << 54);
            }
            other => panic!("expected ResourceExhausted, got {:?}", other.map(|r| r.total_qubits())),
        }
    }

    #[test]
    fn test_required_bytes_saturates() {
        assert_eq!(required_bytes(4), 256);
        assert_eq!(dimension_of(200), u128::MAX);
        assert_eq!(required_bytes(200), u128::MAX);
    }
}
