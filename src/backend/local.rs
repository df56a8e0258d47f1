// src/backend/local.rs

use crate::circuits::Circuit;
use crate::core::{GroverError, Register, Result, dimension_of, required_bytes};
use crate::measurement::{MeasurementOutcome, measure, measure_shots, shot_rng};
use crate::simulation::Simulator;
use tracing::debug;

/// Deterministic full state-vector execution, bounded by a memory budget.
///
/// By default the outcome is the exact key distribution. With sampling
/// enabled the backend draws `shots` samples from it instead, like a
/// shot-based simulator would.
#[derive(Debug, Clone)]
pub struct LocalExactBackend {
    simulator: Simulator,
    memory_budget_bytes: u64,
    readout: Readout,
}

#[derive(Debug, Clone, Copy)]
enum Readout {
    Exact,
    Sampled { seed: Option<u64> },
}

impl LocalExactBackend {
    pub fn new(memory_budget_bytes: u64) -> Self {
        Self {
            simulator: Simulator::new(),
            memory_budget_bytes,
            readout: Readout::Exact,
        }
    }

    /// Sample shots instead of returning exact probabilities; `seed` makes
    /// the draws reproducible.
    pub fn with_sampling(mut self, seed: Option<u64>) -> Self {
        self.readout = Readout::Sampled { seed };
        self
    }

    pub fn memory_budget_bytes(&self) -> u64 {
        self.memory_budget_bytes
    }

    /// # Errors
    /// `ResourceExhausted` if a `qubits`-wide amplitude vector does not fit
    /// the memory budget.
    pub fn check_budget(&self, qubits: usize) -> Result<()> {
        let required = required_bytes(qubits);
        if required > u128::from(self.memory_budget_bytes) {
            return Err(GroverError::ResourceExhausted {
                qubits,
                dimension: dimension_of(qubits),
                required_bytes: required,
                budget_bytes: u128::from(self.memory_budget_bytes),
            });
        }
        Ok(())
    }

    /// Runs `circuit` from the all-zero state and returns the final register.
    pub fn run(&self, circuit: &Circuit) -> Result<Register> {
        self.check_budget(circuit.total_qubits())?;
        debug!(qubits = circuit.total_qubits(), gates = circuit.gate_count(), "local execution");
        self.simulator.run_from_zero(circuit)
    }

    /// Runs `circuit` and measures the key register.
    pub fn execute(&self, circuit: &Circuit, shots: usize) -> Result<MeasurementOutcome> {
        let register = self.run(circuit)?;
        match self.readout {
            Readout::Sampled { seed } => measure_shots(&register, shots, &mut shot_rng(seed)),
            Readout::Exact => measure(&register),
        }
    }
}
