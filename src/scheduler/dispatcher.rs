use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Notify, OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::settings::AppConfig;
use crate::error::ServerError;
use crate::modules::jobs::model::{Job, JobState};
use crate::modules::jobs::store::JobStore;
use crate::workers::{self, Transcoder};

/// Fallback tick so queued work is picked up even if a kick is lost.
const TICK_INTERVAL: Duration = Duration::from_millis(500);

/// A claimed job on its way to a worker slot. The permit is the slot
/// reservation; it rides along and is released by the worker when the job
/// finishes.
pub struct Assignment {
    pub job_id: Uuid,
    pub permit: OwnedSemaphorePermit,
}

#[derive(Clone)]
pub struct SchedulerHandle {
    notify: Arc<Notify>,
}

impl SchedulerHandle {
    /// Trigger a scheduling tick. Called on submission and whenever a
    /// worker slot frees up.
    pub fn kick(&self) {
        self.notify.notify_one();
    }
}

/// Wire up and spawn the broker runtime: the scheduling loop, the worker
/// slots consuming the bounded handoff channel, and the periodic reap
/// sweep. Everything winds down when the shutdown token fires.
pub fn start(
    config: &AppConfig,
    store: Arc<JobStore>,
    transcoder: Arc<dyn Transcoder>,
    shutdown: CancellationToken,
) -> SchedulerHandle {
    let capacity = config.max_concurrent_jobs.max(1);
    let notify = Arc::new(Notify::new());
    let slots = Arc::new(Semaphore::new(capacity));
    let (tx, rx) = async_channel::bounded::<Assignment>(capacity);

    for slot in 0..capacity {
        tokio::spawn(workers::transcoder::run_slot(
            slot,
            store.clone(),
            transcoder.clone(),
            rx.clone(),
            notify.clone(),
            config.max_attempts,
            config.cancel_poll,
            shutdown.clone(),
        ));
    }

    tokio::spawn(reap_loop(
        store.clone(),
        config.reap_after,
        config.reap_interval,
        shutdown.clone(),
    ));

    tokio::spawn(run(store, slots, tx, notify.clone(), shutdown));

    info!(max_concurrent_jobs = capacity, "scheduler started");
    SchedulerHandle { notify }
}

async fn run(
    store: Arc<JobStore>,
    slots: Arc<Semaphore>,
    tx: async_channel::Sender<Assignment>,
    notify: Arc<Notify>,
    shutdown: CancellationToken,
) {
    let mut timer = tokio::time::interval(TICK_INTERVAL);
    loop {
        tick(&store, &slots, &tx).await;
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("scheduler stopped");
                return;
            }
            _ = notify.notified() => {}
            _ = timer.tick() => {}
        }
    }
}

/// One scheduling pass: claim queued jobs in admission order while slot
/// permits are available. A permit is reserved before the claim, so a
/// `Running` job always holds an execution slot and the handoff channel
/// (capacity = slot count) can never fill up.
async fn tick(store: &Arc<JobStore>, slots: &Arc<Semaphore>, tx: &async_channel::Sender<Assignment>) {
    loop {
        let permit = match slots.clone().try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => return,
        };
        let Some(job) = claim_next(store) else {
            // Permit drops back into the pool until the next tick.
            return;
        };
        let assignment = Assignment {
            job_id: job.id,
            permit,
        };
        if tx.send(assignment).await.is_err() {
            return;
        }
    }
}

/// Claim the oldest queued job by submission order. Losing a claim race is
/// normal when ticks overlap; the loser just moves on to the next
/// candidate.
fn claim_next(store: &JobStore) -> Option<Job> {
    for candidate in store.list(Some(JobState::Queued)) {
        match store.transition(candidate.id, JobState::Queued, JobState::Running, None) {
            Ok(job) => {
                debug!(job_id = %job.id, attempt = job.attempt_count, "claimed job");
                return Some(job);
            }
            Err(ServerError::Conflict { .. }) => continue,
            Err(e) => {
                warn!(job_id = %candidate.id, error = %e, "unexpected claim failure");
                continue;
            }
        }
    }
    None
}

async fn reap_loop(
    store: Arc<JobStore>,
    older_than: Duration,
    interval: Duration,
    shutdown: CancellationToken,
) {
    let mut timer = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => return,
            _ = timer.tick() => {}
        }
        for job in store.reap(older_than) {
            warn!(
                job_id = %job.id,
                attempt = job.attempt_count,
                "reaped stale running job",
            );
        }
    }
}
