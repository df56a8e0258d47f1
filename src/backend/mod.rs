// src/backend/mod.rs

//! Execution backends.
//!
//! [`Backend`] is a tagged variant over the two ways of running a circuit:
//! locally on the exact state vector, or as a job on a queued remote
//! service. Both take the same [`Circuit`] and yield a
//! [`MeasurementOutcome`] over the key register.

mod local;
mod queued;
mod remote;

pub use local::LocalExactBackend;
pub use queued::QueuedSimulatorService;
pub use remote::{
    CancelHandle, JobId, JobRequest, JobStatus, QuantumService, RemotePolicy, RemoteQueuedBackend, ServiceError,
    UNSUBMITTED,
};

use crate::circuits::Circuit;
use crate::core::Result;
use crate::measurement::MeasurementOutcome;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which backend variant a run uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Local,
    Remote,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Local => write!(f, "local"),
            BackendKind::Remote => write!(f, "remote"),
        }
    }
}

/// An execution backend.
#[derive(Debug, Clone)]
pub enum Backend {
    Local(LocalExactBackend),
    Remote(RemoteQueuedBackend),
}

impl Backend {
    pub fn kind(&self) -> BackendKind {
        match self {
            Backend::Local(_) => BackendKind::Local,
            Backend::Remote(_) => BackendKind::Remote,
        }
    }

    /// Resource checks that must pass before anything is executed.
    ///
    /// # Errors
    /// `ResourceExhausted` when the local backend's memory budget is too
    /// small for `qubits`. The remote backend has no local limit.
    pub fn preflight(&self, qubits: usize) -> Result<()> {
        match self {
            Backend::Local(local) => local.check_budget(qubits),
            Backend::Remote(_) => Ok(()),
        }
    }

    /// Executes `circuit` and measures the key register. `shots` is ignored
    /// by the local backend unless sampling is enabled.
    pub async fn execute(&self, circuit: &Circuit, shots: usize) -> Result<MeasurementOutcome> {
        match self {
            Backend::Local(local) => local.execute(circuit, shots),
            Backend::Remote(remote) => remote.execute(circuit, shots).await,
        }
    }
}
