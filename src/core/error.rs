// src/core/error.rs

//! Error handling logic

use std::time::Duration;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, GroverError>;

/// Failures of a key-search run.
///
/// Construction and resource errors abort a run before any backend call.
/// Backend errors are only surfaced after the adapter's own retries are
/// exhausted. A search that finishes without a verified key is *not* an
/// error; see [`crate::search::SearchVerdict`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GroverError {
    /// Malformed run configuration or oracle inputs. Fatal, never retried.
    #[error("Oracle construction failed: {message}")]
    OracleConstruction {
        /// What was wrong with the inputs
        message: String,
    },

    /// The register does not fit the chosen backend's budget.
    #[error(
        "Resource exhausted: {qubits} qubits need dimension {dimension} ({required_bytes} bytes), budget is {budget_bytes} bytes"
    )]
    ResourceExhausted {
        /// Total qubits (key + ancilla)
        qubits: usize,
        /// State-vector dimension `2^qubits`, saturating
        dimension: u128,
        /// Bytes needed for the dense amplitude vector, saturating
        required_bytes: u128,
        /// Bytes the backend is allowed to use; 0 when the allocator refused
        budget_bytes: u128,
    },

    /// A remote job did not finish inside the wait budget.
    #[error("Backend timeout: job {job_id} not finished after {waited:?}")]
    BackendTimeout {
        /// Identifier handed out by the service
        job_id: String,
        /// Time spent waiting before giving up
        waited: Duration,
    },

    /// The remote service kept failing after the retry limit.
    #[error("Backend unavailable after {attempts} attempts: {message}")]
    BackendUnavailable {
        /// Attempts made, including the first one
        attempts: u32,
        /// Last failure reported by the service
        message: String,
    },

    /// Ancilla qubits were not returned to |0> by the oracle's uncompute section.
    #[error("Ancilla leakage: {residual:e} probability mass outside the ancilla-zero subspace")]
    AncillaLeakage {
        /// Probability carried by basis states with any ancilla bit set
        residual: f64,
    },

    /// The amplitude vector lost its unit norm.
    #[error("Incoherence: state norm drifted to {norm}")]
    Incoherence {
        /// Sum of squared magnitudes found
        norm: f64,
    },

    /// A pending remote job was abandoned on request.
    #[error("Job {job_id} cancelled")]
    Cancelled {
        /// Identifier of the abandoned job
        job_id: String,
    },

    /// Configuration text could not be parsed.
    #[error("Configuration error: {message}")]
    Config {
        /// Parser message
        message: String,
    },
}

impl GroverError {
    pub(crate) fn oracle(message: impl Into<String>) -> Self {
        GroverError::OracleConstruction { message: message.into() }
    }
}

impl From<toml::de::Error> for GroverError {
    fn from(err: toml::de::Error) -> Self {
        GroverError::Config { message: err.to_string() }
    }
}

impl From<std::io::Error> for GroverError {
    fn from(err: std::io::Error) -> Self {
        GroverError::Config { message: err.to_string() }
    }
}
