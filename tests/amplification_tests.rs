// tests/amplification_tests.rs

use approx::assert_abs_diff_eq;
use grover_aes::amplification::{expected_success_probability, marked_probability};
use grover_aes::cipher::parse_block_hex;
use grover_aes::{
    AesPrimitive, Aes128Primitive, AmplificationController, Block, GroverError, KeySpace, OracleOperator, OracleSpec,
    PlaintextCiphertextPair, Register, build_diffuser, build_oracle, iteration_count,
};
use proptest::prelude::*;

/// Pretends only keys whose low `bits` bits equal `target` encrypt to the
/// expected ciphertext.
struct SingleKey {
    bits: usize,
    target: u64,
}

impl AesPrimitive for SingleKey {
    fn encrypt(&self, _plaintext: &Block, key: &Block) -> Block {
        let low = u64::from_be_bytes(key[8..].try_into().expect("8 bytes")) & ((1u64 << self.bits) - 1);
        if low == self.target { [0x5a; 16] } else { [0u8; 16] }
    }
}

fn fake_oracle(n: usize, target: u64) -> Result<OracleOperator, GroverError> {
    let spec = OracleSpec::new(
        vec![PlaintextCiphertextPair::new([0u8; 16], [0x5a; 16])],
        KeySpace::new([0u8; 16], n)?,
    )?;
    build_oracle(&spec, &SingleKey { bits: n, target }, 24)
}

fn aes_oracle(n: usize) -> Result<OracleOperator, GroverError> {
    let base = parse_block_hex("base_key", "00112233445566778899aabbccddeeff")?;
    let pair = PlaintextCiphertextPair::from_text("This is a test", "3c86e7ec17bb967b9da2f2242d94a634")?;
    let spec = OracleSpec::new(vec![pair], KeySpace::new(base, n)?)?;
    build_oracle(&spec, &Aes128Primitive, 24)
}

#[test]
fn test_iteration_counts() -> Result<(), GroverError> {
    assert_eq!(iteration_count(4, 1)?, 3);
    assert_eq!(iteration_count(4, 2)?, 2);
    assert_eq!(iteration_count(2, 1)?, 1);
    assert_eq!(iteration_count(10, 1)?, 25);
    assert_eq!(iteration_count(4, 16)?, 0);
    assert!(matches!(iteration_count(4, 0), Err(GroverError::OracleConstruction { .. })));
    Ok(())
}

/// Marked probability climbs every round up to the computed optimum and
/// falls once the rotation overshoots.
#[test]
fn test_amplification_peaks_at_computed_optimum() -> Result<(), GroverError> {
    let controller = AmplificationController::new();
    for n in 4..=8 {
        let oracle = aes_oracle(n)?;
        assert_eq!(oracle.marked_keys(), &[(1u64 << n) - 1], "n = {}", n);
        let diffuser = build_diffuser(n);
        let optimum = iteration_count(n, 1)?;

        let mut register = Register::initialize(n, oracle.ancilla_qubits())?.apply_uniform_superposition();
        let mut history = vec![marked_probability(&register, &oracle)];
        for _ in 0..optimum + 2 {
            register = controller.run_iterations(register, &oracle, &diffuser, 1)?;
            history.push(marked_probability(&register, &oracle));
        }

        for t in 0..optimum {
            assert!(history[t + 1] > history[t], "n = {}: no gain at round {}: {:?}", n, t + 1, history);
        }
        assert!(history[optimum + 1] < history[optimum], "n = {}: no over-rotation: {:?}", n, history);
        assert!(history[optimum + 2] < history[optimum + 1], "n = {}: {:?}", n, history);
        for (t, p) in history.iter().enumerate() {
            assert_abs_diff_eq!(*p, expected_success_probability(n, 1, t), epsilon = 1e-9);
        }
    }
    Ok(())
}

#[test]
fn test_run_reports_success_probability() -> Result<(), GroverError> {
    let oracle = aes_oracle(4)?;
    let register = Register::initialize(4, 1)?.apply_uniform_superposition();
    let (register, report) = AmplificationController::new().run(register, &oracle, &build_diffuser(4), 1)?;

    assert_eq!(report.iterations, 3);
    assert!(report.marked_probability > 0.96);
    assert_abs_diff_eq!(report.marked_probability, report.expected_success_probability, epsilon = 1e-12);
    assert!(register.ancilla_residual() < 1e-12);
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_state_stays_normalized(n in 2usize..=12, target_seed in any::<u64>()) {
        let target = target_seed % (1u64 << n);
        let oracle = fake_oracle(n, target).expect("oracle builds");
        let diffuser = build_diffuser(n);
        let controller = AmplificationController::new();

        let mut register = Register::initialize(n, oracle.ancilla_qubits())
            .expect("register fits")
            .apply_uniform_superposition();
        prop_assert!((register.state().norm_sqr() - 1.0).abs() < 1e-9);

        for _ in 0..iteration_count(n, 1).expect("M = 1 is valid") {
            register = controller.run_iterations(register, &oracle, &diffuser, 1).expect("round succeeds");
            prop_assert!((register.state().norm_sqr() - 1.0).abs() < 1e-9);
            prop_assert!(register.ancilla_residual() < 1e-9);
        }

        let probabilities = register.key_probabilities();
        let best = (0..probabilities.len()).max_by(|a, b| probabilities[*a].total_cmp(&probabilities[*b]));
        prop_assert_eq!(best, Some(target as usize));
    }
}
