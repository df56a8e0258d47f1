// src/amplification/mod.rs

//! Iteration-count arithmetic and the oracle/diffusion loop.

use crate::circuits::{Circuit, CircuitBuilder};
use crate::core::{GroverError, Register, Result};
use crate::diffusion::DiffusionOperator;
use crate::gates::{Checkpoint, Gate};
use crate::oracle::OracleOperator;
use crate::simulation::Simulator;
use std::f64::consts::FRAC_PI_4;
use std::fmt;
use tracing::{debug, info, warn};

/// `floor(π/4 · sqrt(2^n / M))`.
///
/// # Errors
/// `OracleConstruction` when `marked_count` is zero, for which the formula
/// is undefined.
pub fn iteration_count(key_qubits: usize, marked_count: usize) -> Result<usize> {
    if marked_count == 0 {
        return Err(GroverError::oracle("assumed_marked_count must be at least 1"));
    }
    let ratio = 2f64.powi(key_qubits as i32) / marked_count as f64;
    Ok((FRAC_PI_4 * ratio.sqrt()).floor() as usize)
}

/// Probability of measuring a marked key after `iterations` rounds when the
/// oracle marks `marked_count` of `2^key_qubits` keys:
/// `sin²((2t+1)·asin(sqrt(M/N)))`.
pub fn expected_success_probability(key_qubits: usize, marked_count: usize, iterations: usize) -> f64 {
    if marked_count == 0 {
        return 0.0;
    }
    let n = 2f64.powi(key_qubits as i32);
    let theta = (marked_count as f64 / n).min(1.0).sqrt().asin();
    ((2 * iterations + 1) as f64 * theta).sin().powi(2)
}

/// Non-fatal conditions surfaced alongside the amplified state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmplificationWarning {
    /// No rounds were run; the state is the plain uniform superposition.
    ZeroIterations,
    /// The oracle marks a different number of keys than assumed, so the
    /// iteration count may under- or over-rotate.
    MarkedCountMismatch { assumed: usize, actual: usize },
}

impl fmt::Display for AmplificationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AmplificationWarning::ZeroIterations => {
                write!(f, "iteration count is 0; returning the uniform superposition")
            }
            AmplificationWarning::MarkedCountMismatch { assumed, actual } => write!(
                f,
                "assumed {} marked keys but the oracle marks {}; amplification may over-rotate",
                assumed, actual
            ),
        }
    }
}

/// The full Grover circuit for one run, ready for any backend.
#[derive(Debug, Clone)]
pub struct AmplificationPlan {
    /// Superposition, then `iterations` × (oracle, diffuser), with checkpoints
    pub circuit: Circuit,
    pub iterations: usize,
    pub assumed_marked_count: usize,
    pub actual_marked_count: usize,
    pub expected_success_probability: f64,
    pub warnings: Vec<AmplificationWarning>,
}

/// What the controller did to a register.
#[derive(Debug, Clone, PartialEq)]
pub struct AmplificationReport {
    pub iterations: usize,
    pub assumed_marked_count: usize,
    pub actual_marked_count: usize,
    pub expected_success_probability: f64,
    /// Total probability on the oracle's marked keys after the loop
    pub marked_probability: f64,
    pub warnings: Vec<AmplificationWarning>,
}

/// Drives the oracle/diffusion loop, always in that order.
#[derive(Debug, Clone, Copy, Default)]
pub struct AmplificationController {
    simulator: Simulator,
}

impl AmplificationController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_simulator(simulator: Simulator) -> Self {
        Self { simulator }
    }

    /// Computes the iteration count and emits the complete circuit, starting
    /// from the all-zero register.
    ///
    /// # Errors
    /// `OracleConstruction` for a zero `assumed_marked_count` or when the
    /// oracle and diffuser disagree on the key width.
    pub fn plan(
        &self,
        oracle: &OracleOperator,
        diffuser: &DiffusionOperator,
        assumed_marked_count: usize,
    ) -> Result<AmplificationPlan> {
        check_widths(oracle, diffuser)?;
        let n = oracle.key_qubits();
        let iterations = iteration_count(n, assumed_marked_count)?;
        let warnings = collect_warnings(iterations, assumed_marked_count, oracle.marked_count());

        let mut builder = CircuitBuilder::new(n, oracle.ancilla_qubits())
            .add_ops((0..n).map(|target| Gate::Hadamard { target }))
            .checkpoint(Checkpoint::Prepared);
        for _ in 0..iterations {
            builder = builder.append(oracle.circuit()).append(diffuser.circuit());
        }
        let circuit = builder.build();

        debug!(iterations, gates = circuit.gate_count(), "amplification circuit planned");
        Ok(AmplificationPlan {
            circuit,
            iterations,
            assumed_marked_count,
            actual_marked_count: oracle.marked_count(),
            expected_success_probability: expected_success_probability(n, oracle.marked_count(), iterations),
            warnings,
        })
    }

    /// Runs the computed number of rounds on an already superposed register.
    ///
    /// # Arguments
    /// * `register` - Register in the uniform superposition over its key qubits.
    /// * `oracle` - The phase oracle.
    /// * `diffuser` - The diffusion operator for the same key width.
    /// * `assumed_marked_count` - `M` in the iteration-count formula.
    ///
    /// # Returns
    /// The amplified register and a report. A zero iteration count is a
    /// warning, not an error: the register comes back unchanged.
    pub fn run(
        &self,
        register: Register,
        oracle: &OracleOperator,
        diffuser: &DiffusionOperator,
        assumed_marked_count: usize,
    ) -> Result<(Register, AmplificationReport)> {
        check_widths(oracle, diffuser)?;
        let n = oracle.key_qubits();
        let iterations = iteration_count(n, assumed_marked_count)?;
        let warnings = collect_warnings(iterations, assumed_marked_count, oracle.marked_count());

        let register = self.run_iterations(register, oracle, diffuser, iterations)?;
        let marked_probability = marked_probability(&register, oracle);
        info!(iterations, marked_probability, "amplification finished");

        Ok((
            register,
            AmplificationReport {
                iterations,
                assumed_marked_count,
                actual_marked_count: oracle.marked_count(),
                expected_success_probability: expected_success_probability(n, oracle.marked_count(), iterations),
                marked_probability,
                warnings,
            },
        ))
    }

    /// Applies exactly `iterations` oracle/diffuser rounds.
    pub fn run_iterations(
        &self,
        register: Register,
        oracle: &OracleOperator,
        diffuser: &DiffusionOperator,
        iterations: usize,
    ) -> Result<Register> {
        check_widths(oracle, diffuser)?;
        let round = CircuitBuilder::new(register.key_qubits(), register.ancilla_qubits())
            .append(oracle.circuit())
            .append(diffuser.circuit())
            .build();
        (0..iterations).try_fold(register, |register, round_index| {
            debug!(round = round_index + 1, of = iterations, "grover round");
            self.simulator.run(&round, register)
        })
    }
}

/// Total probability carried by the oracle's marked keys.
pub fn marked_probability(register: &Register, oracle: &OracleOperator) -> f64 {
    let probabilities = register.key_probabilities();
    oracle
        .marked_keys()
        .iter()
        .filter_map(|k| probabilities.get(*k as usize))
        .sum()
}

fn check_widths(oracle: &OracleOperator, diffuser: &DiffusionOperator) -> Result<()> {
    if oracle.key_qubits() != diffuser.key_qubits() {
        return Err(GroverError::oracle(format!(
            "oracle acts on {} key qubits but the diffuser on {}",
            oracle.key_qubits(),
            diffuser.key_qubits()
        )));
    }
    Ok(())
}

fn collect_warnings(iterations: usize, assumed: usize, actual: usize) -> Vec<AmplificationWarning> {
    let mut warnings = Vec::new();
    if iterations == 0 {
        warnings.push(AmplificationWarning::ZeroIterations);
    }
    if assumed != actual {
        warnings.push(AmplificationWarning::MarkedCountMismatch { assumed, actual });
    }
    for warning in &warnings {
        warn!(%warning, "amplification");
    }
    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cipher::{AesPrimitive, Block, KeySpace, PlaintextCiphertextPair};
    use crate::diffusion::build_diffuser;
    use crate::oracle::{OracleSpec, build_oracle};
    use approx::assert_abs_diff_eq;

    struct TableCipher(Vec<u8>);

    impl AesPrimitive for TableCipher {
        fn encrypt(&self, _plaintext: &Block, key: &Block) -> Block {
            if self.0.contains(&key[15]) { [1u8; 16] } else { [0u8; 16] }
        }
    }

    fn oracle_for(n: usize, marked: Vec<u8>) -> Result<OracleOperator> {
        let pair = PlaintextCiphertextPair::new([0u8; 16], [1u8; 16]);
        let spec = OracleSpec::new(vec![pair], KeySpace::new([0u8; 16], n)?)?;
        build_oracle(&spec, &TableCipher(marked), 24)
    }

    #[test]
    fn test_iteration_count_formula() -> Result<()> {
        assert_eq!(iteration_count(4, 1)?, 3);
        assert_eq!(iteration_count(4, 2)?, 2);
        assert_eq!(iteration_count(10, 1)?, 25);
        assert_eq!(iteration_count(1, 2)?, 0);
        Ok(())
    }

    #[test]
    fn test_zero_marked_count_rejected() {
        assert!(matches!(iteration_count(4, 0), Err(GroverError::OracleConstruction { .. })));
    }

    #[test]
    fn test_expected_success_probability() {
        // n=2, M=1: one round lands exactly on the marked key
        assert_abs_diff_eq!(expected_success_probability(2, 1, 1), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(expected_success_probability(4, 1, 0), 1.0 / 16.0, epsilon = 1e-12);
        assert_eq!(expected_success_probability(4, 0, 3), 0.0);
    }

    #[test]
    fn test_run_matches_theory() -> Result<()> {
        let oracle = oracle_for(4, vec![11])?;
        let diffuser = build_diffuser(4);
        let register = Register::initialize(4, oracle.ancilla_qubits())?.apply_uniform_superposition();
        let (register, report) = AmplificationController::new().run(register, &oracle, &diffuser, 1)?;
        assert_eq!(report.iterations, 3);
        assert!(report.warnings.is_empty());
        assert_abs_diff_eq!(report.marked_probability, report.expected_success_probability, epsilon = 1e-9);
        assert!(register.key_probabilities()[11] > 0.9);
        Ok(())
    }

    #[test]
    fn test_zero_iterations_is_a_warning() -> Result<()> {
        // n=2 with M=4 gives floor(π/4 · 1) = 0
        let oracle = oracle_for(2, vec![0, 1, 2, 3])?;
        let diffuser = build_diffuser(2);
        let register = Register::initialize(2, 1)?.apply_uniform_superposition();
        let before = register.clone();
        let (after, report) = AmplificationController::new().run(register, &oracle, &diffuser, 4)?;
        assert_eq!(report.iterations, 0);
        assert_eq!(report.warnings, vec![AmplificationWarning::ZeroIterations]);
        assert_eq!(after, before);
        Ok(())
    }

    #[test]
    fn test_marked_count_mismatch_surfaced() -> Result<()> {
        let oracle = oracle_for(4, vec![3, 7])?;
        let plan = AmplificationController::new().plan(&oracle, &build_diffuser(4), 1)?;
        assert_eq!(plan.iterations, 3);
        assert_eq!(plan.warnings, vec![AmplificationWarning::MarkedCountMismatch { assumed: 1, actual: 2 }]);
        // Three rounds over-rotate for M=2
        assert!(plan.expected_success_probability < expected_success_probability(4, 2, 2));
        Ok(())
    }

    #[test]
    fn test_plan_executes_like_run() -> Result<()> {
        let oracle = oracle_for(3, vec![6])?;
        let diffuser = build_diffuser(3);
        let controller = AmplificationController::new();
        let plan = controller.plan(&oracle, &diffuser, 1)?;
        let from_plan = Simulator::new().run_from_zero(&plan.circuit)?;

        let register = Register::initialize(3, 1)?.apply_uniform_superposition();
        let (from_run, _) = controller.run(register, &oracle, &diffuser, 1)?;
        for (a, b) in from_plan.key_probabilities().iter().zip(from_run.key_probabilities()) {
            assert_abs_diff_eq!(*a, b, epsilon = 1e-12);
        }
        Ok(())
    }

    #[test]
    fn test_mismatched_widths_rejected() -> Result<()> {
        let oracle = oracle_for(3, vec![1])?;
        let result = AmplificationController::new().plan(&oracle, &build_diffuser(4), 1);
        assert!(matches!(result, Err(GroverError::OracleConstruction { .. })));
        Ok(())
    }
}
