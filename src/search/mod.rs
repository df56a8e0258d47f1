// src/search/mod.rs

//! The end-to-end key search: configuration in, verified key (or an
//! explicit negative verdict) out.

use crate::amplification::{AmplificationController, AmplificationWarning};
use crate::backend::{Backend, BackendKind, LocalExactBackend, QuantumService, QueuedSimulatorService, RemoteQueuedBackend};
use crate::cipher::{Aes128Primitive, AesPrimitive, Block, KeySpace};
use crate::config::RunConfig;
use crate::core::Result;
use crate::diffusion::build_diffuser;
use crate::measurement::{CandidateKey, MeasurementOutcome, extract_candidates, verify};
use crate::oracle::{OracleSpec, build_oracle};
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

/// How a run ended. Both variants are successful runs.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchVerdict {
    /// The first candidate that passed classical verification
    Verified(CandidateKey),
    /// None of the extracted candidates verified
    VerificationFailed {
        /// Number of candidates checked
        tried: usize,
        /// What to change before trying again
        hint: String,
    },
}

impl SearchVerdict {
    pub fn is_verified(&self) -> bool {
        matches!(self, SearchVerdict::Verified(_))
    }
}

impl fmt::Display for SearchVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchVerdict::Verified(candidate) => write!(f, "verified key candidate {}", candidate),
            SearchVerdict::VerificationFailed { tried, hint } => {
                write!(f, "no candidate verified among the top {}; {}", tried, hint)
            }
        }
    }
}

/// Everything a run produced, including the raw outcome for diagnostics.
#[derive(Debug, Clone)]
pub struct SearchReport {
    pub verdict: SearchVerdict,
    pub outcome: MeasurementOutcome,
    pub candidates: Vec<CandidateKey>,
    pub iterations: usize,
    pub expected_success_probability: f64,
    pub warnings: Vec<AmplificationWarning>,
    pub backend: BackendKind,
    pub key_space: KeySpace,
}

impl SearchReport {
    /// Full AES key of the verified candidate.
    pub fn recovered_key(&self) -> Option<Block> {
        match &self.verdict {
            SearchVerdict::Verified(candidate) => Some(candidate.full_key(&self.key_space)),
            SearchVerdict::VerificationFailed { .. } => None,
        }
    }
}

/// One configured key-search run.
pub struct KeySearch {
    config: RunConfig,
    primitive: Arc<dyn AesPrimitive>,
    service: Option<Arc<dyn QuantumService>>,
}

impl KeySearch {
    /// # Errors
    /// `OracleConstruction` if the configuration fails validation.
    pub fn new(config: RunConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            primitive: Arc::new(Aes128Primitive),
            service: None,
        })
    }

    /// Replaces the AES-128 collaborator.
    pub fn with_primitive(mut self, primitive: Arc<dyn AesPrimitive>) -> Self {
        self.primitive = primitive;
        self
    }

    /// Remote service used when `backend_kind = "remote"`; the in-process
    /// queued simulator otherwise.
    pub fn with_remote_service(mut self, service: Arc<dyn QuantumService>) -> Self {
        self.service = Some(service);
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// The backend selected by the configuration.
    pub fn backend(&self) -> Backend {
        match self.config.backend_kind {
            BackendKind::Local => {
                let local = LocalExactBackend::new(self.config.memory_budget_bytes);
                Backend::Local(if self.config.local_sampling { local.with_sampling(self.config.seed) } else { local })
            }
            BackendKind::Remote => {
                let service = self.service.clone().unwrap_or_else(|| {
                    Arc::new(QueuedSimulatorService::new(self.config.remote.queue_polls, self.config.seed))
                });
                Backend::Remote(RemoteQueuedBackend::new(service, self.config.remote.policy()))
            }
        }
    }

    /// Runs on the configured backend.
    pub async fn run(&self) -> Result<SearchReport> {
        self.run_on(&self.backend()).await
    }

    /// Runs on a caller-supplied backend, e.g. one whose cancel handle the
    /// caller holds.
    ///
    /// # Errors
    /// * `OracleConstruction` / `ResourceExhausted` before anything executes.
    /// * `BackendTimeout`, `BackendUnavailable`, `Cancelled` from a remote backend.
    /// * `AncillaLeakage` / `Incoherence` on an internal invariant violation.
    pub async fn run_on(&self, backend: &Backend) -> Result<SearchReport> {
        let config = &self.config;
        let key_space = config.key_space()?;
        backend.preflight(config.key_bit_length + config.pairs.len())?;

        let spec = OracleSpec::new(config.pairs.clone(), key_space)?;
        let oracle = build_oracle(&spec, self.primitive.as_ref(), config.qubit_budget)?;
        let diffuser = build_diffuser(config.key_bit_length);
        let plan = AmplificationController::new().plan(&oracle, &diffuser, config.assumed_marked_count)?;
        info!(
            key_bits = config.key_bit_length,
            ancilla = oracle.ancilla_qubits(),
            iterations = plan.iterations,
            expected_success = plan.expected_success_probability,
            backend = %backend.kind(),
            "starting key search"
        );

        let outcome = backend.execute(&plan.circuit, config.shots).await?;
        let candidates = extract_candidates(&outcome, config.top_k);

        let verdict = match candidates.iter().find(|c| verify(c, &spec, self.primitive.as_ref())) {
            Some(candidate) => {
                info!(candidate = %candidate, "key verified");
                SearchVerdict::Verified(*candidate)
            }
            None => {
                warn!(tried = candidates.len(), "no candidate verified");
                SearchVerdict::VerificationFailed {
                    tried: candidates.len(),
                    hint: "increase assumed_marked_count, shots or top_k".to_string(),
                }
            }
        };

        Ok(SearchReport {
            verdict,
            outcome,
            candidates,
            iterations: plan.iterations,
            expected_success_probability: plan.expected_success_probability,
            warnings: plan.warnings,
            backend: backend.kind(),
            key_space,
        })
    }
}
