// src/gates/mod.rs

//! Defines the operator alphabet shared by the oracle, the diffuser and
//! every execution backend.
//!
//! All gates are real, self-inverse and diagonal or permutation-like apart
//! from the Hadamard, which keeps uncompute sections trivial: reversing a
//! gate list inverts it.

use std::fmt;

/// Marker placed between operator applications at points where the
/// amplitude-state invariants must hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Checkpoint {
    /// After the uniform superposition has been prepared.
    Prepared,
    /// After a full oracle application (compute, phase, uncompute).
    AfterOracle,
    /// After a diffusion application.
    AfterDiffusion,
}

impl fmt::Display for Checkpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Checkpoint::Prepared => write!(f, "prepared"),
            Checkpoint::AfterOracle => write!(f, "after-oracle"),
            Checkpoint::AfterDiffusion => write!(f, "after-diffusion"),
        }
    }
}

/// A single operation on the register. Qubit indices are register positions:
/// key qubits first, ancilla qubits after them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Gate {
    /// Hadamard on one qubit.
    Hadamard {
        /// Qubit transformed
        target: usize,
    },

    /// Bit flip on one qubit.
    PauliX {
        /// Qubit flipped
        target: usize,
    },

    /// Flips `target` when every control qubit is |1>.
    ///
    /// Analogy: `mcx` in Qiskit. With a single control this is CNOT, with
    /// two it is the Toffoli gate.
    MultiControlledX {
        /// Qubits that must all be |1>
        controls: Vec<usize>,
        /// Qubit flipped
        target: usize,
    },

    /// Multiplies the amplitude by -1 when every listed qubit is |1>.
    /// Symmetric in its qubits, so no control/target distinction is kept.
    MultiControlledZ {
        /// Qubits that must all be |1>
        qubits: Vec<usize>,
    },

    /// Multiplies the amplitude by -1 unless every listed qubit is |0>,
    /// i.e. the reflection `2|0><0| - I` on the listed qubits.
    ZeroReflection {
        /// Qubits the reflection acts on
        qubits: Vec<usize>,
    },

    /// Invariant checkpoint. Not a quantum operation.
    Checkpoint(Checkpoint),
}

impl Gate {
    /// Returns every qubit index mentioned by the gate.
    pub fn involved_qubits(&self) -> Vec<usize> {
        match self {
            Gate::Hadamard { target } | Gate::PauliX { target } => vec![*target],
            Gate::MultiControlledX { controls, target } => {
                let mut qubits = controls.clone();
                qubits.push(*target);
                qubits
            }
            Gate::MultiControlledZ { qubits } | Gate::ZeroReflection { qubits } => qubits.clone(),
            Gate::Checkpoint(_) => Vec::new(),
        }
    }

    /// True for checkpoint markers.
    pub fn is_checkpoint(&self) -> bool {
        matches!(self, Gate::Checkpoint(_))
    }
}

impl fmt::Display for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gate::Hadamard { target } => write!(f, "h q[{}]", target),
            Gate::PauliX { target } => write!(f, "x q[{}]", target),
            Gate::MultiControlledX { controls, target } => write!(f, "mcx {:?} -> q[{}]", controls, target),
            Gate::MultiControlledZ { qubits } => write!(f, "mcz {:?}", qubits),
            Gate::ZeroReflection { qubits } => write!(f, "reflect0 {:?}", qubits),
            Gate::Checkpoint(cp) => write!(f, "checkpoint({})", cp),
        }
    }
}
