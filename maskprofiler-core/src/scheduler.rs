//! Bounded-concurrency submission and polling of profile-job executions.
//!
//! One task owns all in-flight state: a pending queue sorted ascending by
//! job id and a running set bounded by the parallelism limit. Each cycle
//! backfills free slots, sleeps one poll interval, then polls every running
//! execution and retires the terminal ones. "Parallel" bounds in-flight
//! remote executions, not local threads.

use crate::error::MaskProfilerError;
use crate::remote::{ExecutionStatus, MaskingApi, ProfileJob};
use crate::Result;
use std::collections::VecDeque;
use std::time::Duration;

/// Default pause between status polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Terminal result of one driven execution.
#[derive(Debug, Clone)]
pub struct JobOutcome {
    pub job_id: i64,
    pub execution_id: i64,
    pub status: ExecutionStatus,
}

/// Drives profile jobs to a terminal status through one [`MaskingApi`]
/// session.
pub struct JobExecutionScheduler<'a, C: MaskingApi + ?Sized> {
    api: &'a C,
    poll_interval: Duration,
}

impl<'a, C: MaskingApi + ?Sized> JobExecutionScheduler<'a, C> {
    pub fn new(api: &'a C) -> Self {
        Self::with_poll_interval(api, DEFAULT_POLL_INTERVAL)
    }

    pub fn with_poll_interval(api: &'a C, poll_interval: Duration) -> Self {
        Self { api, poll_interval }
    }

    /// Submits one job and polls it to a terminal status.
    ///
    /// # Errors
    /// `NotFound` if `job_id` is absent from `jobs`; no execution is started
    /// in that case.
    pub async fn run_single(&self, job_id: i64, jobs: &[ProfileJob]) -> Result<JobOutcome> {
        if !jobs.iter().any(|j| j.profile_job_id == job_id) {
            return Err(MaskProfilerError::not_found(format!("profile job {job_id}")));
        }

        let execution_id = self.api.start_execution(job_id).await?;
        let status = self.poll_to_terminal(execution_id).await?;
        let outcome = JobOutcome {
            job_id,
            execution_id,
            status,
        };
        log_outcome(&outcome);
        Ok(outcome)
    }

    /// Runs every job to completion one at a time, ascending by job id.
    pub async fn run_serial(&self, jobs: &[ProfileJob]) -> Result<Vec<JobOutcome>> {
        let sorted = sort_by_id(jobs);
        let mut outcomes = Vec::with_capacity(sorted.len());
        for job in sorted {
            let execution_id = self.api.start_execution(job.profile_job_id).await?;
            let status = self.poll_to_terminal(execution_id).await?;
            let outcome = JobOutcome {
                job_id: job.profile_job_id,
                execution_id,
                status,
            };
            log_outcome(&outcome);
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }

    /// Runs every job to completion with at most `max_parallel` executions
    /// in flight. Submission order is ascending job id; completion order is
    /// whatever the engine produces, observed at poll granularity.
    ///
    /// `max_parallel` of 0 is treated as 1. An empty job list returns
    /// immediately.
    pub async fn run_parallel(
        &self,
        jobs: &[ProfileJob],
        max_parallel: usize,
    ) -> Result<Vec<JobOutcome>> {
        if jobs.is_empty() {
            tracing::info!("No profile jobs to run");
            return Ok(Vec::new());
        }

        let bound = max_parallel.max(1);
        tracing::info!(
            "Running {} profile job(s), at most {bound} in parallel",
            jobs.len()
        );

        let mut pending: VecDeque<ProfileJob> = sort_by_id(jobs).into();
        let mut running: Vec<(i64, i64)> = Vec::with_capacity(bound);
        let mut outcomes = Vec::with_capacity(jobs.len());

        while !pending.is_empty() || !running.is_empty() {
            while running.len() < bound {
                let Some(job) = pending.pop_front() else { break };
                let execution_id = self.api.start_execution(job.profile_job_id).await?;
                running.push((job.profile_job_id, execution_id));
            }

            tokio::time::sleep(self.poll_interval).await;

            let mut still_running = Vec::with_capacity(running.len());
            for (job_id, execution_id) in running.drain(..) {
                let state = self.api.execution_status(execution_id).await?;
                if state.status.is_terminal() {
                    let outcome = JobOutcome {
                        job_id,
                        execution_id,
                        status: state.status,
                    };
                    log_outcome(&outcome);
                    outcomes.push(outcome);
                } else {
                    tracing::debug!(
                        "Execution {execution_id} (jobId={job_id}) still {}",
                        state.status
                    );
                    still_running.push((job_id, execution_id));
                }
            }
            running = still_running;
        }

        Ok(outcomes)
    }

    /// Polls right after submission, then sleeps one interval between polls.
    async fn poll_to_terminal(&self, execution_id: i64) -> Result<ExecutionStatus> {
        loop {
            let state = self.api.execution_status(execution_id).await?;
            if state.status.is_terminal() {
                return Ok(state.status);
            }
            tracing::debug!("Execution {execution_id} still {}", state.status);
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

fn sort_by_id(jobs: &[ProfileJob]) -> Vec<ProfileJob> {
    let mut sorted = jobs.to_vec();
    sorted.sort_by_key(|j| j.profile_job_id);
    sorted
}

fn log_outcome(outcome: &JobOutcome) {
    if outcome.status.is_failure() {
        tracing::error!(
            "Job {} finished with status {} (executionId={})",
            outcome.job_id,
            outcome.status,
            outcome.execution_id
        );
    } else {
        tracing::info!(
            "Job {} finished with status {} (executionId={})",
            outcome.job_id,
            outcome.status,
            outcome.execution_id
        );
    }
}
