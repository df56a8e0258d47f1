// src/core/state.rs

use num_complex::Complex64;
use num_traits::{One, Zero};
use std::fmt;

/// Dense amplitude vector over `2^num_qubits` computational basis states.
///
/// Qubit `q` is bit `q` of the basis index, so for a register laid out as
/// key qubits followed by ancilla qubits the low bits of an index are the
/// candidate key and the high bits are the ancilla pattern.
#[derive(Debug, Clone, PartialEq)] // Avoid Eq for floating-point complex numbers
pub struct AmplitudeState {
    amplitudes: Vec<Complex64>,
    num_qubits: usize,
}

impl AmplitudeState {
    /// All-zero basis state |0...0> over `num_qubits` qubits, or `None` if
    /// the allocator cannot provide the `2^num_qubits` amplitudes.
    ///
    /// `num_qubits` must be below the pointer width; see
    /// [`crate::core::Register::initialize`].
    pub(crate) fn try_zero(num_qubits: usize) -> Option<Self> {
        let dim = 1usize << num_qubits;
        let mut amplitudes = Vec::new();
        amplitudes.try_reserve_exact(dim).ok()?;
        amplitudes.resize(dim, Complex64::zero());
        amplitudes[0] = Complex64::one();
        Some(Self { amplitudes, num_qubits })
    }

    /// Wraps an existing vector. The length must be a power of two.
    #[cfg(test)]
    pub(crate) fn from_amplitudes(amplitudes: Vec<Complex64>) -> Self {
        assert!(amplitudes.len().is_power_of_two(), "amplitude vector length must be a power of 2");
        let num_qubits = amplitudes.len().trailing_zeros() as usize;
        Self { amplitudes, num_qubits }
    }

    /// Read-only view of the amplitudes.
    pub fn amplitudes(&self) -> &[Complex64] {
        &self.amplitudes
    }

    /// Mutable access for the simulation kernels.
    pub(crate) fn amplitudes_mut(&mut self) -> &mut [Complex64] {
        &mut self.amplitudes
    }

    /// Number of basis states.
    pub fn dim(&self) -> usize {
        self.amplitudes.len()
    }

    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    /// Sum of squared magnitudes.
    pub fn norm_sqr(&self) -> f64 {
        self.amplitudes.iter().map(|c| c.norm_sqr()).sum()
    }
}

impl fmt::Display for AmplitudeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Amplitudes[")?;
        for (i, c) in self.amplitudes.iter().enumerate() {
            write!(f, "{}{:.4}", if i > 0 { ", " } else { "" }, c)?;
        }
        write!(f, "]")
    }
}
