// src/backend/remote.rs

//! Job-queued execution on a remote quantum service.
//!
//! The adapter submits one OpenQASM 3 job, polls it until it reaches a
//! terminal state and fetches the shot counts. Every service call is retried
//! with capped exponential backoff on transient failures; the whole wait is
//! bounded by a timeout and can be abandoned through a [`CancelHandle`].

use crate::circuits::Circuit;
use crate::core::{GroverError, Result};
use crate::measurement::MeasurementOutcome;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Identifier handed out by a service on submission.
pub type JobId = String;

/// Reported in place of a job id when submission never completed.
pub const UNSUBMITTED: &str = "<unsubmitted>";

/// Lifecycle of a submitted job as reported by the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    /// Terminal failure reported by the service
    Failed(String),
    Cancelled,
}

/// Everything a service needs to run one circuit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRequest {
    /// OpenQASM 3 program text
    pub qasm: String,
    pub num_qubits: usize,
    /// Number of leading qubits measured into the classical register
    pub measured_qubits: usize,
    pub shots: usize,
}

impl JobRequest {
    pub fn from_circuit(circuit: &Circuit, shots: usize) -> Self {
        Self {
            qasm: circuit.to_qasm(),
            num_qubits: circuit.total_qubits(),
            measured_qubits: circuit.key_qubits(),
            shots,
        }
    }
}

/// Failure of a single service call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// Connectivity or throttling; worth retrying
    #[error("transient service error: {0}")]
    Transient(String),
    /// Rejected request or broken service; retrying will not help
    #[error("fatal service error: {0}")]
    Fatal(String),
}

/// A remote quantum execution service.
#[async_trait]
pub trait QuantumService: Send + Sync {
    /// Human-readable service name for logs.
    fn name(&self) -> &str;

    async fn submit(&self, request: &JobRequest) -> std::result::Result<JobId, ServiceError>;

    async fn poll(&self, job_id: &str) -> std::result::Result<JobStatus, ServiceError>;

    /// Shot counts keyed by measured bitstring, most significant bit first.
    async fn fetch_results(&self, job_id: &str) -> std::result::Result<HashMap<String, u64>, ServiceError>;

    async fn cancel(&self, job_id: &str) -> std::result::Result<(), ServiceError>;
}

/// Wait, retry and backoff limits for remote execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemotePolicy {
    /// Pause between status polls
    pub poll_interval: Duration,
    /// Total wait budget from submission to results
    pub timeout: Duration,
    /// Attempts per service call, including the first
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RemotePolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
            timeout: Duration::from_secs(600),
            max_attempts: 5,
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(10),
        }
    }
}

impl RemotePolicy {
    /// Delay before retry number `attempt` (1-based): doubles each time,
    /// capped at `max_backoff`.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff.saturating_mul(factor).min(self.max_backoff)
    }
}

/// Abandons the job a [`RemoteQueuedBackend`] is waiting on.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    /// Requests cancellation. The backend cancels the pending job with the
    /// service and fails the run with `Cancelled`; later runs on the same
    /// backend are cancelled immediately.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Backend adapter over a [`QuantumService`].
#[derive(Clone)]
pub struct RemoteQueuedBackend {
    service: Arc<dyn QuantumService>,
    policy: RemotePolicy,
    cancel_tx: Arc<watch::Sender<bool>>,
}

impl std::fmt::Debug for RemoteQueuedBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteQueuedBackend")
            .field("service", &self.service.name())
            .field("policy", &self.policy)
            .finish()
    }
}

impl RemoteQueuedBackend {
    pub fn new(service: Arc<dyn QuantumService>, policy: RemotePolicy) -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { service, policy, cancel_tx: Arc::new(tx) }
    }

    pub fn policy(&self) -> &RemotePolicy {
        &self.policy
    }

    pub fn service_name(&self) -> &str {
        self.service.name()
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle { tx: Arc::clone(&self.cancel_tx) }
    }

    /// Submits `circuit`, waits for completion and returns the sampled outcome.
    ///
    /// # Errors
    /// * `BackendUnavailable` once a call keeps failing past `max_attempts`,
    ///   on a fatal service error, or when the job itself fails.
    /// * `BackendTimeout` when results are not in after `policy.timeout`.
    /// * `Cancelled` when the [`CancelHandle`] fires first.
    pub async fn execute(&self, circuit: &Circuit, shots: usize) -> Result<MeasurementOutcome> {
        let request = JobRequest::from_circuit(circuit, shots);
        let mut cancel_rx = self.cancel_tx.subscribe();
        if *cancel_rx.borrow_and_update() {
            return Err(GroverError::Cancelled { job_id: UNSUBMITTED.to_string() });
        }

        // Submission counts against the timeout and can be cancelled too.
        let mut submitted: Option<JobId> = None;
        let finished = {
            let job = async {
                let job_id = self.with_retry("submit", || self.service.submit(&request)).await?;
                info!(job_id = %job_id, service = self.service.name(), qubits = request.num_qubits, shots, "job submitted");
                submitted = Some(job_id.clone());
                self.wait_for_job(&job_id, circuit.key_qubits()).await
            };
            tokio::select! {
                waited = tokio::time::timeout(self.policy.timeout, job) => Some(waited),
                _ = cancelled(&mut cancel_rx) => None,
            }
        };

        match finished {
            Some(Ok(result)) => result,
            Some(Err(_)) => {
                warn!(job_id = ?submitted, timeout = ?self.policy.timeout, "job timed out");
                let job_id = self.abandon(submitted).await;
                Err(GroverError::BackendTimeout { job_id, waited: self.policy.timeout })
            }
            None => {
                info!(job_id = ?submitted, "cancellation requested");
                let job_id = self.abandon(submitted).await;
                Err(GroverError::Cancelled { job_id })
            }
        }
    }

    /// Polls until the job is terminal, then fetches its counts.
    async fn wait_for_job(&self, job_id: &str, key_bits: usize) -> Result<MeasurementOutcome> {
        loop {
            match self.with_retry("poll", || self.service.poll(job_id)).await? {
                JobStatus::Completed => {
                    let raw = self.with_retry("fetch_results", || self.service.fetch_results(job_id)).await?;
                    let counts = parse_counts(&raw, key_bits)?;
                    info!(job_id, shots = counts.values().sum::<u64>(), "job completed");
                    return Ok(MeasurementOutcome::from_counts(key_bits, counts));
                }
                JobStatus::Failed(reason) => {
                    return Err(GroverError::BackendUnavailable {
                        attempts: 1,
                        message: format!("job {} failed: {}", job_id, reason),
                    });
                }
                JobStatus::Cancelled => {
                    return Err(GroverError::Cancelled { job_id: job_id.to_string() });
                }
                status => {
                    debug!(job_id, ?status, poll_in = ?self.policy.poll_interval, "job pending");
                    tokio::time::sleep(self.policy.poll_interval).await;
                }
            }
        }
    }

    /// Runs one service call, retrying transient failures with backoff.
    async fn with_retry<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, ServiceError>>,
    {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match call().await {
                Ok(value) => return Ok(value),
                Err(ServiceError::Fatal(message)) => {
                    return Err(GroverError::BackendUnavailable { attempts: attempt, message });
                }
                Err(ServiceError::Transient(message)) => {
                    if attempt >= self.policy.max_attempts {
                        warn!(operation, attempts = attempt, %message, "giving up on service");
                        return Err(GroverError::BackendUnavailable { attempts: attempt, message });
                    }
                    let delay = self.policy.backoff_delay(attempt);
                    warn!(operation, attempt, ?delay, %message, "transient service failure, retrying");
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// Best-effort cancel of a job nobody will wait for. Returns the id to
    /// report, a placeholder if submission never completed.
    async fn abandon(&self, submitted: Option<JobId>) -> JobId {
        let Some(job_id) = submitted else {
            return UNSUBMITTED.to_string();
        };
        if let Err(e) = self.service.cancel(&job_id).await {
            warn!(job_id = %job_id, error = %e, "failed to cancel job");
        }
        job_id
    }
}

/// Resolves once the cancel flag is set; never resolves if it cannot be.
async fn cancelled(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Converts bitstring-keyed counts into key-value counts.
fn parse_counts(raw: &HashMap<String, u64>, key_bits: usize) -> Result<BTreeMap<u64, u64>> {
    let mut counts = BTreeMap::new();
    for (bits, count) in raw {
        if bits.len() != key_bits {
            return Err(GroverError::BackendUnavailable {
                attempts: 1,
                message: format!("result bitstring `{}` does not have {} bits", bits, key_bits),
            });
        }
        let key = u64::from_str_radix(bits, 2).map_err(|e| GroverError::BackendUnavailable {
            attempts: 1,
            message: format!("result bitstring `{}` is malformed: {}", bits, e),
        })?;
        *counts.entry(key).or_insert(0) += count;
    }
    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuits::CircuitBuilder;
    use crate::gates::Gate;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy() -> RemotePolicy {
        RemotePolicy {
            poll_interval: Duration::from_millis(5),
            timeout: Duration::from_millis(100),
            max_attempts: 3,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(4),
        }
    }

    fn circuit() -> Circuit {
        CircuitBuilder::new(2, 0)
            .add_ops([Gate::Hadamard { target: 0 }, Gate::Hadamard { target: 1 }])
            .build()
    }

    /// Accepts jobs and never finishes them.
    struct StuckService {
        cancels: AtomicU32,
    }

    #[async_trait]
    impl QuantumService for StuckService {
        fn name(&self) -> &str {
            "stuck"
        }
        async fn submit(&self, _request: &JobRequest) -> std::result::Result<JobId, ServiceError> {
            Ok("job-1".to_string())
        }
        async fn poll(&self, _job_id: &str) -> std::result::Result<JobStatus, ServiceError> {
            Ok(JobStatus::Queued)
        }
        async fn fetch_results(&self, _job_id: &str) -> std::result::Result<HashMap<String, u64>, ServiceError> {
            Err(ServiceError::Fatal("not finished".into()))
        }
        async fn cancel(&self, _job_id: &str) -> std::result::Result<(), ServiceError> {
            self.cancels.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    /// A service whose submissions never return, like a stalled connection.
    struct HangingSubmit {
        cancels: AtomicU32,
    }

    #[async_trait]
    impl QuantumService for HangingSubmit {
        fn name(&self) -> &str {
            "hanging"
        }
        async fn submit(&self, _request: &JobRequest) -> std::result::Result<JobId, ServiceError> {
            std::future::pending().await
        }
        async fn poll(&self, _job_id: &str) -> std::result::Result<JobStatus, ServiceError> {
            Ok(JobStatus::Completed)
        }
        async fn fetch_results(&self, _job_id: &str) -> std::result::Result<HashMap<String, u64>, ServiceError> {
            Ok(HashMap::new())
        }
        async fn cancel(&self, _job_id: &str) -> std::result::Result<(), ServiceError> {
            self.cancels.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Fails `failures` submissions with a transient error, then completes instantly.
    struct FlakyService {
        failures: u32,
        submits: AtomicU32,
    }

    #[async_trait]
    impl QuantumService for FlakyService {
        fn name(&self) -> &str {
            "flaky"
        }
        async fn submit(&self, _request: &JobRequest) -> std::result::Result<JobId, ServiceError> {
            let n = self.submits.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                Err(ServiceError::Transient("connection reset".into()))
            } else {
                Ok("job-7".to_string())
            }
        }
        async fn poll(&self, _job_id: &str) -> std::result::Result<JobStatus, ServiceError> {
            Ok(JobStatus::Completed)
        }
        async fn fetch_results(&self, _job_id: &str) -> std::result::Result<HashMap<String, u64>, ServiceError> {
            Ok(HashMap::from([("10".to_string(), 7), ("01".to_string(), 3)]))
        }
        async fn cancel(&self, _job_id: &str) -> std::result::Result<(), ServiceError> {
            Ok(())
        }
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RemotePolicy {
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_millis(350),
            ..RemotePolicy::default()
        };
        assert_eq!(policy.backoff_delay(1), Duration::from_millis(100));
        assert_eq!(policy.backoff_delay(2), Duration::from_millis(200));
        assert_eq!(policy.backoff_delay(3), Duration::from_millis(350));
        assert_eq!(policy.backoff_delay(40), Duration::from_millis(350));
    }

    #[test]
    fn test_job_request_carries_qasm() {
        let request = JobRequest::from_circuit(&circuit(), 100);
        assert_eq!(request.num_qubits, 2);
        assert_eq!(request.measured_qubits, 2);
        assert!(request.qasm.contains("h q[1];"));
    }

    #[tokio::test]
    async fn test_stuck_job_times_out() {
        let service = Arc::new(StuckService { cancels: AtomicU32::new(0) });
        let backend = RemoteQueuedBackend::new(service.clone(), fast_policy());
        match backend.execute(&circuit(), 10).await {
            Err(GroverError::BackendTimeout { job_id, waited }) => {
                assert_eq!(job_id, "job-1");
                assert_eq!(waited, Duration::from_millis(100));
            }
            other => panic!("expected BackendTimeout, got {:?}", other),
        }
        assert_eq!(service.cancels.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() -> Result<()> {
        let service = Arc::new(FlakyService { failures: 2, submits: AtomicU32::new(0) });
        let backend = RemoteQueuedBackend::new(service.clone(), fast_policy());
        let outcome = backend.execute(&circuit(), 10).await?;
        assert_eq!(service.submits.load(Ordering::SeqCst), 3);
        assert_eq!(outcome.count(0b10), Some(7));
        assert_eq!(outcome.shots(), Some(10));
        Ok(())
    }

    #[tokio::test]
    async fn test_retry_limit_gives_backend_unavailable() {
        let service = Arc::new(FlakyService { failures: 10, submits: AtomicU32::new(0) });
        let backend = RemoteQueuedBackend::new(service.clone(), fast_policy());
        match backend.execute(&circuit(), 10).await {
            Err(GroverError::BackendUnavailable { attempts, .. }) => assert_eq!(attempts, 3),
            other => panic!("expected BackendUnavailable, got {:?}", other),
        }
        assert_eq!(service.submits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_cancel_abandons_pending_job() {
        let service = Arc::new(StuckService { cancels: AtomicU32::new(0) });
        let policy = RemotePolicy { timeout: Duration::from_secs(30), ..fast_policy() };
        let backend = RemoteQueuedBackend::new(service.clone(), policy);
        let handle = backend.cancel_handle();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            handle.cancel();
        });
        match backend.execute(&circuit(), 10).await {
            Err(GroverError::Cancelled { job_id }) => assert_eq!(job_id, "job-1"),
            other => panic!("expected Cancelled, got {:?}", other),
        }
        assert_eq!(service.cancels.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stalled_submission_times_out() {
        let service = Arc::new(HangingSubmit { cancels: AtomicU32::new(0) });
        let backend = RemoteQueuedBackend::new(service.clone(), fast_policy());
        let result = tokio::time::timeout(Duration::from_secs(2), backend.execute(&circuit(), 10))
            .await
            .expect("adapter must give up on its own");
        match result {
            Err(GroverError::BackendTimeout { job_id, waited }) => {
                assert_eq!(job_id, UNSUBMITTED);
                assert_eq!(waited, Duration::from_millis(100));
            }
            other => panic!("expected BackendTimeout, got {:?}", other),
        }
        assert_eq!(service.cancels.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_stalled_submission_can_be_cancelled() {
        let service = Arc::new(HangingSubmit { cancels: AtomicU32::new(0) });
        let policy = RemotePolicy { timeout: Duration::from_secs(30), ..fast_policy() };
        let backend = RemoteQueuedBackend::new(service.clone(), policy);
        let handle = backend.cancel_handle();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            handle.cancel();
        });
        let result = tokio::time::timeout(Duration::from_secs(2), backend.execute(&circuit(), 10))
            .await
            .expect("cancellation must interrupt submission");
        match result {
            Err(GroverError::Cancelled { job_id }) => assert_eq!(job_id, UNSUBMITTED),
            other => panic!("expected Cancelled, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_counts_rejected() {
        let raw = HashMap::from([("1x".to_string(), 1u64)]);
        assert!(parse_counts(&raw, 2).is_err());
        let raw = HashMap::from([("101".to_string(), 1u64)]);
        assert!(parse_counts(&raw, 2).is_err());
    }
}
