// src/lib.rs

//! `grover_aes` - Grover amplitude amplification over reduced AES-128 key spaces
//!
//! Given plaintext/ciphertext pairs and a key whose high bits are known, the
//! library builds a reversible phase oracle over the `n` unknown bits, a
//! diffusion operator, and the Grover loop that amplifies the keys the
//! oracle marks. The resulting circuit runs either on an exact local state
//! vector or as a job on a queued remote service, and every measured
//! candidate is verified classically before it is reported.

pub mod core;
pub mod gates;
pub mod circuits;
pub mod cipher;
pub mod oracle;
pub mod diffusion;
pub mod amplification;
pub mod simulation;
pub mod measurement;
pub mod backend;
pub mod validation;
pub mod config;
pub mod search;

// Re-export the most common types for easier top-level use
pub use core::{GroverError, Register, Result};
pub use gates::{Checkpoint, Gate};
pub use circuits::{Circuit, CircuitBuilder};
pub use cipher::{Aes128Primitive, AesPrimitive, Block, KeySpace, PlaintextCiphertextPair};
pub use oracle::{OracleOperator, OracleSpec, build_oracle};
pub use diffusion::{DiffusionOperator, build_diffuser};
pub use amplification::{AmplificationController, AmplificationPlan, AmplificationReport, AmplificationWarning, iteration_count};
pub use simulation::Simulator;
pub use measurement::{CandidateKey, MeasurementOutcome, extract_candidates, measure, verify};
pub use backend::{Backend, BackendKind, LocalExactBackend, QuantumService, RemotePolicy, RemoteQueuedBackend};
pub use validation::{check_ancilla_restored, check_normalization, validate_register};
pub use config::{RemoteConfig, RunConfig};
pub use search::{KeySearch, SearchReport, SearchVerdict};

/// Amplifying the 4 unknown low bits of a known AES-128 key step by step.
///
/// ```
/// use grover_aes::{
///     AmplificationController, Aes128Primitive, KeySpace, OracleSpec, PlaintextCiphertextPair, Register,
///     build_diffuser, build_oracle, extract_candidates, measure, verify,
/// };
/// use grover_aes::cipher::parse_block_hex;
///
/// # fn main() -> grover_aes::Result<()> {
/// let base = parse_block_hex("key", "00112233445566778899aabbccddeeff")?;
/// let pair = PlaintextCiphertextPair::from_text("This is a test", "3c86e7ec17bb967b9da2f2242d94a634")?;
/// let spec = OracleSpec::new(vec![pair], KeySpace::new(base, 4)?)?;
///
/// let oracle = build_oracle(&spec, &Aes128Primitive, 24)?;
/// let diffuser = build_diffuser(4);
/// assert_eq!(oracle.marked_keys(), &[15]);
///
/// let register = Register::initialize(4, 1)?.apply_uniform_superposition();
/// let (register, report) = AmplificationController::new().run(register, &oracle, &diffuser, 1)?;
/// assert_eq!(report.iterations, 3);
///
/// let candidates = extract_candidates(&measure(&register)?, 3);
/// assert_eq!(candidates[0].value, 15);
/// assert!(verify(&candidates[0], &spec, &Aes128Primitive));
/// # Ok(())
/// # }
/// ```
#[doc(hidden)]
const _: () = ();
