// src/oracle/mod.rs

//! The AES marking oracle.
//!
//! [`build_oracle`] compiles the classical predicate "candidate `k` encrypts
//! every known plaintext to its ciphertext" into a reversible gate sequence:
//! one scratch qubit per plaintext/ciphertext pair is computed from the key
//! qubits, a multi-controlled Z over the scratch qubits applies the phase,
//! and the compute section is replayed in reverse to return every scratch
//! qubit to |0>.

use crate::cipher::{AesPrimitive, KeySpace, PlaintextCiphertextPair};
use crate::circuits::{Circuit, CircuitBuilder};
use crate::core::{GroverError, Result};
use crate::gates::{Checkpoint, Gate};
use rayon::prelude::*;
use std::fmt;
use tracing::debug;

/// Widest key register the builder will enumerate classically.
const MAX_ENUMERABLE_KEY_BITS: usize = 40;

/// The marking predicate: which candidate keys satisfy every known pair.
///
/// Constructed once per run and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleSpec {
    pairs: Vec<PlaintextCiphertextPair>,
    key_space: KeySpace,
}

impl OracleSpec {
    /// # Errors
    /// `OracleConstruction` if no pair is supplied.
    pub fn new(pairs: Vec<PlaintextCiphertextPair>, key_space: KeySpace) -> Result<Self> {
        if pairs.is_empty() {
            return Err(GroverError::oracle("at least one plaintext/ciphertext pair is required"));
        }
        Ok(Self { pairs, key_space })
    }

    pub fn pairs(&self) -> &[PlaintextCiphertextPair] {
        &self.pairs
    }

    pub fn key_space(&self) -> &KeySpace {
        &self.key_space
    }

    pub fn key_bits(&self) -> usize {
        self.key_space.unknown_bits()
    }

    /// `f(k) = 1`: candidate `k` satisfies every pair.
    pub fn is_marked(&self, candidate: u64, primitive: &dyn AesPrimitive) -> bool {
        let key = self.key_space.full_key(candidate);
        self.pairs.iter().all(|pair| pair.is_satisfied_by(primitive, &key))
    }
}

/// A compiled phase oracle together with the classical facts gathered while
/// building it.
#[derive(Debug, Clone, PartialEq)]
pub struct OracleOperator {
    circuit: Circuit,
    marked: Vec<u64>,
    compute_gates: usize,
}

impl OracleOperator {
    /// Compute, phase, uncompute, then an `AfterOracle` checkpoint.
    pub fn circuit(&self) -> &Circuit {
        &self.circuit
    }

    pub fn key_qubits(&self) -> usize {
        self.circuit.key_qubits()
    }

    pub fn ancilla_qubits(&self) -> usize {
        self.circuit.ancilla_qubits()
    }

    /// Number of candidates the oracle actually marks.
    pub fn marked_count(&self) -> usize {
        self.marked.len()
    }

    /// Marked candidates in ascending order.
    pub fn marked_keys(&self) -> &[u64] {
        &self.marked
    }

    pub fn is_marked(&self, candidate: u64) -> bool {
        self.marked.binary_search(&candidate).is_ok()
    }

    /// Gates in the compute section (the uncompute section mirrors it).
    pub fn compute_gate_count(&self) -> usize {
        self.compute_gates
    }
}

impl fmt::Display for OracleOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Oracle[{} key + {} ancilla qubits, {} marked, {} gates]",
            self.key_qubits(),
            self.ancilla_qubits(),
            self.marked_count(),
            self.circuit.gate_count()
        )
    }
}

/// Builds the phase oracle for `spec`.
///
/// The AES collaborator is evaluated over all `2^n` candidates; for each
/// pair `j` the compute section X-conjugates a fully controlled X onto
/// scratch qubit `n + j` for every candidate satisfying that pair.
///
/// # Arguments
/// * `spec` - Pairs and key space to encode.
/// * `primitive` - The block cipher used to evaluate candidates.
/// * `qubit_budget` - Upper bound on key plus ancilla qubits.
///
/// # Errors
/// `OracleConstruction` if the register would exceed `qubit_budget` or the
/// key space is too wide to enumerate.
pub fn build_oracle(spec: &OracleSpec, primitive: &dyn AesPrimitive, qubit_budget: usize) -> Result<OracleOperator> {
    let n = spec.key_bits();
    let a = spec.pairs().len();
    if n + a > qubit_budget {
        return Err(GroverError::oracle(format!(
            "{} key qubits + {} ancilla qubits exceed the qubit budget of {}",
            n, a, qubit_budget
        )));
    }
    if n > MAX_ENUMERABLE_KEY_BITS {
        return Err(GroverError::oracle(format!(
            "key_bit_length {} is too wide to enumerate (at most {})",
            n, MAX_ENUMERABLE_KEY_BITS
        )));
    }

    let size = 1u64 << n;
    let key_qubits: Vec<usize> = (0..n).collect();

    // Per pair, the candidates that satisfy it.
    let satisfying: Vec<Vec<u64>> = spec
        .pairs()
        .iter()
        .map(|pair| {
            (0..size)
                .into_par_iter()
                .filter(|k| pair.is_satisfied_by(primitive, &spec.key_space().full_key(*k)))
                .collect()
        })
        .collect();

    let mut compute = Vec::new();
    for (j, candidates) in satisfying.iter().enumerate() {
        let scratch = n + j;
        for &candidate in candidates {
            let zero_bits: Vec<Gate> = key_qubits
                .iter()
                .filter(|q| (candidate >> **q) & 1 == 0)
                .map(|q| Gate::PauliX { target: *q })
                .collect();
            compute.extend(zero_bits.iter().cloned());
            compute.push(Gate::MultiControlledX { controls: key_qubits.clone(), target: scratch });
            compute.extend(zero_bits);
        }
    }

    let mut marked: Vec<u64> = match satisfying.split_first() {
        Some((first, rest)) => first
            .iter()
            .copied()
            .filter(|k| rest.iter().all(|other| other.binary_search(k).is_ok()))
            .collect(),
        None => Vec::new(),
    };
    marked.sort_unstable();

    let scratch_qubits: Vec<usize> = (n..n + a).collect();
    let compute_gates = compute.len();
    let circuit = CircuitBuilder::new(n, a)
        .add_ops(compute.iter().cloned())
        .add_op(Gate::MultiControlledZ { qubits: scratch_qubits })
        .add_ops(compute.into_iter().rev())
        .checkpoint(Checkpoint::AfterOracle)
        .build();

    debug!(
        key_qubits = n,
        ancilla_qubits = a,
        marked = marked.len(),
        compute_gates,
        total_gates = circuit.gate_count(),
        "oracle built"
    );

    Ok(OracleOperator { circuit, marked, compute_gates })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cipher::{Aes128Primitive, Block, parse_block_hex};
    use crate::core::Register;
    use crate::simulation::Simulator;

    fn base_key() -> Block {
        parse_block_hex("key", "00112233445566778899aabbccddeeff").expect("valid hex")
    }

    fn test_pair() -> Result<PlaintextCiphertextPair> {
        PlaintextCiphertextPair::from_text("This is a test", "3c86e7ec17bb967b9da2f2242d94a634")
    }

    /// Marks every key whose low nibble is in `marked` by lying about the cipher.
    struct TableCipher {
        marked: Vec<u8>,
    }

    impl AesPrimitive for TableCipher {
        fn encrypt(&self, _plaintext: &Block, key: &Block) -> Block {
            if self.marked.contains(&(key[15] & 0x0f)) { [0xaa; 16] } else { [0u8; 16] }
        }
    }

    #[test]
    fn test_aes_oracle_marks_unique_key() -> Result<()> {
        let spec = OracleSpec::new(vec![test_pair()?], KeySpace::new(base_key(), 4)?)?;
        let oracle = build_oracle(&spec, &Aes128Primitive, 24)?;
        assert_eq!(oracle.marked_keys(), &[15]);
        assert_eq!(oracle.ancilla_qubits(), 1);
        assert!(spec.is_marked(15, &Aes128Primitive));
        assert!(!spec.is_marked(3, &Aes128Primitive));
        Ok(())
    }

    #[test]
    fn test_oracle_flips_exactly_marked_states() -> Result<()> {
        let cipher = TableCipher { marked: vec![2, 9, 13] };
        let pair = PlaintextCiphertextPair::new([0u8; 16], [0xaa; 16]);
        let spec = OracleSpec::new(vec![pair], KeySpace::new([0u8; 16], 4)?)?;
        let oracle = build_oracle(&spec, &cipher, 24)?;
        assert_eq!(oracle.marked_keys(), &[2, 9, 13]);

        let register = Register::initialize(4, oracle.ancilla_qubits())?.apply_uniform_superposition();
        let before: Vec<f64> = register.state().amplitudes()[..16].iter().map(|c| c.re).collect();
        let after = Simulator::new().run(oracle.circuit(), register)?;

        for k in 0..16usize {
            let amp = after.state().amplitudes()[k].re;
            let flipped = (amp - (-before[k])).abs() < 1e-12;
            let unchanged = (amp - before[k]).abs() < 1e-12;
            assert_eq!(flipped, spec.is_marked(k as u64, &cipher), "candidate {}", k);
            assert_eq!(unchanged, !spec.is_marked(k as u64, &cipher), "candidate {}", k);
        }
        assert!(after.ancilla_residual() < 1e-12);
        Ok(())
    }

    #[test]
    fn test_multiple_pairs_intersect() -> Result<()> {
        // Pair A accepts {1, 5, 7}, pair B accepts {5, 7, 11}: only {5, 7} are marked
        struct TwoTables;
        impl AesPrimitive for TwoTables {
            fn encrypt(&self, plaintext: &Block, key: &Block) -> Block {
                let k = key[15] & 0x0f;
                let hit = if plaintext[0] == 0 { [1, 5, 7].contains(&k) } else { [5, 7, 11].contains(&k) };
                if hit { [0xff; 16] } else { [0u8; 16] }
            }
        }
        let pairs = vec![
            PlaintextCiphertextPair::new([0u8; 16], [0xff; 16]),
            PlaintextCiphertextPair::new([1u8; 16], [0xff; 16]),
        ];
        let spec = OracleSpec::new(pairs, KeySpace::new([0u8; 16], 4)?)?;
        let oracle = build_oracle(&spec, &TwoTables, 24)?;
        assert_eq!(oracle.marked_keys(), &[5, 7]);
        assert_eq!(oracle.ancilla_qubits(), 2);

        let register = Register::initialize(4, 2)?.apply_uniform_superposition();
        let after = Simulator::new().run(oracle.circuit(), register)?;
        for k in 0..16usize {
            let negative = after.state().amplitudes()[k].re < 0.0;
            assert_eq!(negative, k == 5 || k == 7, "candidate {}", k);
        }
        assert!(after.ancilla_residual() < 1e-12);
        Ok(())
    }

    #[test]
    fn test_qubit_budget_enforced() -> Result<()> {
        let spec = OracleSpec::new(vec![test_pair()?], KeySpace::new(base_key(), 8)?)?;
        let result = build_oracle(&spec, &Aes128Primitive, 8);
        assert!(matches!(result, Err(GroverError::OracleConstruction { .. })));
        Ok(())
    }

    #[test]
    fn test_empty_pairs_rejected() -> Result<()> {
        let result = OracleSpec::new(Vec::new(), KeySpace::new(base_key(), 4)?);
        assert!(matches!(result, Err(GroverError::OracleConstruction { .. })));
        Ok(())
    }

    #[test]
    fn test_uncompute_mirrors_compute() -> Result<()> {
        let spec = OracleSpec::new(vec![test_pair()?], KeySpace::new(base_key(), 4)?)?;
        let oracle = build_oracle(&spec, &Aes128Primitive, 24)?;
        let gates = oracle.circuit().gates();
        let c = oracle.compute_gate_count();
        // compute + phase + uncompute + checkpoint
        assert_eq!(gates.len(), 2 * c + 2);
        for i in 0..c {
            assert_eq!(gates[i], gates[2 * c - i]);
        }
        Ok(())
    }
}
