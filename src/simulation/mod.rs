// src/simulation/mod.rs

//! Exact state-vector execution of a [`Circuit`] on a [`Register`].
//!
//! The `Simulator` walks the gate list in order, delegating each gate to
//! the matrix-free kernels in [`engine`] and enforcing the amplitude-state
//! invariants whenever it reaches a checkpoint marker.

pub(crate) mod engine;

use crate::circuits::Circuit;
use crate::core::{GroverError, Register, Result};
use crate::gates::{Checkpoint, Gate};
use crate::validation::{check_ancilla_restored, check_normalization};
use tracing::trace;

/// The main simulator orchestrating the execution of circuits.
#[derive(Debug, Clone, Copy)]
pub struct Simulator {
    check_invariants: bool,
}

impl Default for Simulator {
    fn default() -> Self {
        Self { check_invariants: true }
    }
}

impl Simulator {
    /// Creates a simulator that validates every checkpoint.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a simulator that treats checkpoints as no-ops.
    pub fn without_checks() -> Self {
        Self { check_invariants: false }
    }

    /// Runs `circuit` on `register` and returns the evolved register.
    ///
    /// # Arguments
    /// * `circuit` - The gate sequence to execute.
    /// * `register` - Input register; its shape must match the circuit's.
    ///
    /// # Returns
    /// * `Ok(Register)` holding the final state.
    /// * `Err(GroverError::OracleConstruction)` for a shape mismatch or a malformed gate.
    /// * `Err(GroverError::Incoherence)` if the norm drifts at a checkpoint.
    /// * `Err(GroverError::AncillaLeakage)` if an oracle leaves an ancilla qubit dirty.
    pub fn run(&self, circuit: &Circuit, mut register: Register) -> Result<Register> {
        if circuit.key_qubits() != register.key_qubits() || circuit.ancilla_qubits() != register.ancilla_qubits() {
            return Err(GroverError::oracle(format!(
                "circuit over {}+{} qubits cannot run on a {}+{} register",
                circuit.key_qubits(),
                circuit.ancilla_qubits(),
                register.key_qubits(),
                register.ancilla_qubits()
            )));
        }

        for gate in circuit.gates() {
            match gate {
                Gate::Checkpoint(checkpoint) => {
                    if self.check_invariants {
                        self.check(*checkpoint, &register)?;
                    }
                }
                _ => engine::apply_gate(register.state_mut(), gate)?,
            }
        }
        Ok(register)
    }

    /// Initializes a fresh all-zero register shaped like `circuit` and runs it.
    pub fn run_from_zero(&self, circuit: &Circuit) -> Result<Register> {
        let register = Register::initialize(circuit.key_qubits(), circuit.ancilla_qubits())?;
        self.run(circuit, register)
    }

    fn check(&self, checkpoint: Checkpoint, register: &Register) -> Result<()> {
        check_normalization(register.state(), None)?;
        if checkpoint == Checkpoint::AfterOracle {
            check_ancilla_restored(register, None)?;
        }
        trace!(%checkpoint, "invariants hold");
        Ok(())
    }
}
