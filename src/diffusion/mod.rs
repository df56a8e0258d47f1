// src/diffusion/mod.rs

//! The Grover diffusion operator `D = 2|s><s| - I` over the key qubits.

use crate::circuits::{Circuit, CircuitBuilder};
use crate::gates::{Checkpoint, Gate};
use std::fmt;

/// Reflection about the uniform superposition of the key register.
///
/// Built once per key width and independent of any oracle. Its gates only
/// address key qubits, so it acts as the identity on ancilla qubits.
#[derive(Debug, Clone, PartialEq)]
pub struct DiffusionOperator {
    circuit: Circuit,
}

impl DiffusionOperator {
    /// H on every key qubit, reflection about |0...0>, H again, then an
    /// `AfterDiffusion` checkpoint.
    pub fn circuit(&self) -> &Circuit {
        &self.circuit
    }

    pub fn key_qubits(&self) -> usize {
        self.circuit.key_qubits()
    }
}

impl fmt::Display for DiffusionOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Diffuser[{} key qubits, {} gates]", self.key_qubits(), self.circuit.gate_count())
    }
}

/// Builds the diffuser for an `n`-qubit key register.
pub fn build_diffuser(key_qubits: usize) -> DiffusionOperator {
    let hadamards = || (0..key_qubits).map(|target| Gate::Hadamard { target });
    let circuit = CircuitBuilder::new(key_qubits, 0)
        .add_ops(hadamards())
        .add_op(Gate::ZeroReflection { qubits: (0..key_qubits).collect() })
        .add_ops(hadamards())
        .checkpoint(Checkpoint::AfterDiffusion)
        .build();
    DiffusionOperator { circuit }
}
