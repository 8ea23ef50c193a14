use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use time::OffsetDateTime;
use uuid::Uuid;

use super::model::{FailureKind, Job, JobFailure, JobRequest, JobState};
use crate::error::{Result, ServerError};

/// Authoritative record of all jobs and the only place job state mutates.
///
/// Every execution context (handlers, scheduler, worker slots, the reap
/// sweep) goes through the single mutex here, so a transition either sees
/// the state it expected or fails with `Conflict`. Two workers can never
/// both claim the same job.
pub struct JobStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    jobs: HashMap<Uuid, Job>,
    /// Submission order. `created_at` never changes, so this doubles as the
    /// FIFO admission order and as a tie-breaker for equal timestamps.
    order: Vec<Uuid>,
}

impl Default for JobStore {
    fn default() -> Self {
        Self::new()
    }
}

impl JobStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Insert a new job in `Queued` state. Requests are validated at the
    /// API boundary before they reach the store.
    pub fn create(&self, request: JobRequest) -> Job {
        let job = Job::new(request);
        let mut inner = self.inner.lock().unwrap();
        inner.order.push(job.id);
        inner.jobs.insert(job.id, job.clone());
        job
    }

    pub fn get(&self, id: Uuid) -> Result<Job> {
        let inner = self.inner.lock().unwrap();
        inner
            .jobs
            .get(&id)
            .cloned()
            .ok_or(ServerError::NotFound(id))
    }

    /// Compare-and-transition: the sole mutation entry point.
    ///
    /// Atomically moves the job from `expected` to `to`, failing with
    /// `Conflict` if the current state is not `expected` and with
    /// `InvalidTransition` if the edge is not a legal lifecycle edge.
    /// Field discipline lives here so callers cannot get it wrong:
    /// claiming stamps `started_at` (first attempt only) and bumps
    /// `attempt_count`, requeueing clears a previous attempt's error, and
    /// entering a terminal state stamps `finished_at`.
    pub fn transition(
        &self,
        id: Uuid,
        expected: JobState,
        to: JobState,
        failure: Option<JobFailure>,
    ) -> Result<Job> {
        let mut inner = self.inner.lock().unwrap();
        let job = inner.jobs.get_mut(&id).ok_or(ServerError::NotFound(id))?;
        Self::apply(job, expected, to, failure)
    }

    /// Cancel semantics per state: queued jobs cancel immediately, running
    /// jobs get the cooperative flag and keep running until the worker
    /// observes it, an already-cancelled job acks idempotently, and
    /// succeeded/failed jobs reject the request.
    pub fn request_cancel(&self, id: Uuid) -> Result<Job> {
        let mut inner = self.inner.lock().unwrap();
        let job = inner.jobs.get_mut(&id).ok_or(ServerError::NotFound(id))?;
        match job.state {
            JobState::Queued => {
                job.cancel_requested = true;
                Self::apply(job, JobState::Queued, JobState::Cancelled, None)
            }
            JobState::Running => {
                job.cancel_requested = true;
                Ok(job.clone())
            }
            JobState::Cancelled => Ok(job.clone()),
            JobState::Succeeded | JobState::Failed => Err(ServerError::InvalidTransition {
                from: job.state,
                to: JobState::Cancelled,
            }),
        }
    }

    /// Flag read used by the executing worker's cancellation poll.
    pub fn cancel_requested(&self, id: Uuid) -> bool {
        let inner = self.inner.lock().unwrap();
        inner.jobs.get(&id).is_some_and(|j| j.cancel_requested)
    }

    /// Snapshot of all jobs in submission order, optionally filtered.
    pub fn list(&self, filter: Option<JobState>) -> Vec<Job> {
        let inner = self.inner.lock().unwrap();
        inner
            .order
            .iter()
            .filter_map(|id| inner.jobs.get(id))
            .filter(|job| filter.is_none_or(|state| job.state == state))
            .cloned()
            .collect()
    }

    /// Force-fail every `Running` job whose last claim is older than the
    /// cutoff. The worker that owned such a job is presumed dead; if it
    /// does report later its transition fails with `Conflict` and is
    /// dropped. Repeated sweeps are no-ops for already-reaped jobs since
    /// they are no longer `Running`.
    pub fn reap(&self, older_than: Duration) -> Vec<Job> {
        let cutoff = OffsetDateTime::now_utc() - older_than;
        let mut inner = self.inner.lock().unwrap();
        let mut reaped = Vec::new();
        for job in inner.jobs.values_mut() {
            if job.state != JobState::Running {
                continue;
            }
            let stale = job.claimed_at.is_some_and(|at| at < cutoff);
            if !stale {
                continue;
            }
            let failure = JobFailure {
                kind: FailureKind::WorkerLost,
                message: format!(
                    "no worker update for over {}s, presumed lost",
                    older_than.as_secs()
                ),
            };
            if let Ok(job) = Self::apply(job, JobState::Running, JobState::Failed, Some(failure)) {
                reaped.push(job);
            }
        }
        reaped
    }

    fn apply(
        job: &mut Job,
        expected: JobState,
        to: JobState,
        failure: Option<JobFailure>,
    ) -> Result<Job> {
        if job.state != expected {
            return Err(ServerError::Conflict {
                expected,
                actual: job.state,
            });
        }
        if !job.state.can_transition_to(to) {
            return Err(ServerError::InvalidTransition {
                from: job.state,
                to,
            });
        }

        let now = OffsetDateTime::now_utc();
        match (job.state, to) {
            (JobState::Queued, JobState::Running) => {
                job.started_at.get_or_insert(now);
                job.claimed_at = Some(now);
                job.attempt_count += 1;
            }
            (JobState::Running, JobState::Queued) => {
                job.error = None;
            }
            _ => {}
        }
        if to == JobState::Failed {
            job.error = failure;
        }
        if to.is_terminal() {
            job.finished_at = Some(now);
        }
        job.state = to;
        Ok(job.clone())
    }
}
