// src/backend/queued.rs

//! An in-process [`QuantumService`] that behaves like a queued remote
//! simulator: jobs sit in `Queued`/`Running` for a few polls, then complete
//! with shots sampled from the exact state vector.

use super::remote::{JobId, JobRequest, JobStatus, QuantumService, ServiceError};
use crate::circuits::Circuit;
use crate::measurement::{sample_shots, shot_rng};
use crate::simulation::Simulator;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

struct QueuedJob {
    circuit: Circuit,
    shots: usize,
    polls_left: u32,
    status: JobStatus,
}

/// Queued simulator service.
pub struct QueuedSimulatorService {
    queue_polls: u32,
    seed: Option<u64>,
    next_id: AtomicU64,
    jobs: Mutex<HashMap<JobId, QueuedJob>>,
}

impl QueuedSimulatorService {
    /// `queue_polls` polls report the job as pending before it completes.
    pub fn new(queue_polls: u32, seed: Option<u64>) -> Self {
        Self {
            queue_polls,
            seed,
            next_id: AtomicU64::new(1),
            jobs: Mutex::new(HashMap::new()),
        }
    }

    /// Jobs submitted but neither fetched nor cancelled.
    pub fn pending_jobs(&self) -> usize {
        self.jobs.lock().map(|jobs| jobs.len()).unwrap_or(0)
    }

    fn lock_jobs(&self) -> Result<MutexGuard<'_, HashMap<JobId, QueuedJob>>, ServiceError> {
        self.jobs.lock().map_err(|_| ServiceError::Fatal("job table poisoned".into()))
    }

    fn with_job<T>(&self, job_id: &str, f: impl FnOnce(&mut QueuedJob) -> T) -> Result<T, ServiceError> {
        let mut jobs = self.lock_jobs()?;
        let job = jobs.get_mut(job_id).ok_or_else(|| ServiceError::Fatal(format!("unknown job {}", job_id)))?;
        Ok(f(job))
    }
}

#[async_trait]
impl QuantumService for QueuedSimulatorService {
    fn name(&self) -> &str {
        "queued-simulator"
    }

    async fn submit(&self, request: &JobRequest) -> Result<JobId, ServiceError> {
        let circuit = Circuit::from_qasm(&request.qasm).map_err(|e| ServiceError::Fatal(e.to_string()))?;
        if circuit.total_qubits() != request.num_qubits || circuit.key_qubits() != request.measured_qubits {
            return Err(ServiceError::Fatal("request header disagrees with program".into()));
        }
        let job_id = format!("qsim-{}", self.next_id.fetch_add(1, Ordering::Relaxed));
        let job = QueuedJob {
            circuit,
            shots: request.shots,
            polls_left: self.queue_polls,
            status: JobStatus::Queued,
        };
        self.lock_jobs()?.insert(job_id.clone(), job);
        debug!(job_id = %job_id, "queued");
        Ok(job_id)
    }

    async fn poll(&self, job_id: &str) -> Result<JobStatus, ServiceError> {
        let half = self.queue_polls / 2;
        self.with_job(job_id, |job| {
            if matches!(job.status, JobStatus::Queued | JobStatus::Running) {
                if job.polls_left == 0 {
                    job.status = JobStatus::Completed;
                } else {
                    job.polls_left -= 1;
                    if job.polls_left < half.max(1) {
                        job.status = JobStatus::Running;
                    }
                }
            }
            job.status.clone()
        })
    }

    async fn fetch_results(&self, job_id: &str) -> Result<HashMap<String, u64>, ServiceError> {
        // Results are handed out once; the job leaves the table here.
        let job = {
            let mut jobs = self.lock_jobs()?;
            let status = jobs
                .get(job_id)
                .map(|job| job.status.clone())
                .ok_or_else(|| ServiceError::Fatal(format!("unknown job {}", job_id)))?;
            if status != JobStatus::Completed {
                return Err(ServiceError::Fatal(format!("job {} is {:?}", job_id, status)));
            }
            jobs.remove(job_id).ok_or_else(|| ServiceError::Fatal(format!("unknown job {}", job_id)))?
        };

        let seed = self.seed;
        let counts = tokio::task::spawn_blocking(move || -> crate::core::Result<_> {
            let register = Simulator::new().run_from_zero(&job.circuit)?;
            sample_shots(&register.key_probabilities(), job.shots, &mut shot_rng(seed))
                .map(|counts| (counts, job.circuit.key_qubits()))
        })
        .await
        .map_err(|e| ServiceError::Fatal(format!("simulation task failed: {}", e)))?;
        let (counts, width) = counts.map_err(|e| ServiceError::Fatal(e.to_string()))?;
        Ok(counts.into_iter().map(|(key, count)| (format!("{:0width$b}", key, width = width), count)).collect())
    }

    async fn cancel(&self, job_id: &str) -> Result<(), ServiceError> {
        match self.lock_jobs()?.remove(job_id) {
            Some(_) => {
                debug!(job_id, "cancelled");
                Ok(())
            }
            None => Err(ServiceError::Fatal(format!("unknown job {}", job_id))),
        }
    }
}
