use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::ServerError;
use crate::modules::jobs::model::{FailureKind, JobFailure, JobRequest, JobState};
use crate::modules::jobs::store::JobStore;
use crate::scheduler::dispatcher::Assignment;

/// The external transcoding collaborator. Must report one of the three
/// outcomes and honor the cancellation token; killing its own process on
/// cancel is its responsibility, not the broker's.
#[async_trait]
pub trait Transcoder: Send + Sync {
    async fn run(
        &self,
        job_id: Uuid,
        request: JobRequest,
        cancel: CancellationToken,
    ) -> TranscodeOutcome;
}

#[derive(Debug)]
pub enum TranscodeOutcome {
    Completed,
    Cancelled,
    Failed { message: String },
}

/// Runs the `ffmpeg` binary as a child process.
pub struct FfmpegTranscoder {
    bin: String,
}

impl FfmpegTranscoder {
    pub fn new(bin: impl Into<String>) -> Self {
        Self { bin: bin.into() }
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn run(
        &self,
        job_id: Uuid,
        request: JobRequest,
        cancel: CancellationToken,
    ) -> TranscodeOutcome {
        let mut cmd = Command::new(&self.bin);
        cmd.arg("-nostdin").arg("-i").arg(&request.source);
        for opt in &request.options {
            cmd.arg(opt);
        }
        cmd.arg("-y").arg(&request.output);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                return TranscodeOutcome::Failed {
                    message: format!("failed to spawn {}: {}", self.bin, e),
                };
            }
        };

        // Drain stderr concurrently; ffmpeg writes enough there to fill the
        // pipe buffer and block itself otherwise.
        let stderr = child.stderr.take();
        let stderr_task = tokio::spawn(async move {
            let mut buf = String::new();
            if let Some(mut pipe) = stderr {
                let _ = pipe.read_to_string(&mut buf).await;
            }
            buf
        });

        let status = tokio::select! {
            status = child.wait() => Some(status),
            _ = cancel.cancelled() => None,
        };

        match status {
            None => {
                info!(job_id = %job_id, "cancel requested, killing {}", self.bin);
                let _ = child.start_kill();
                let _ = child.wait().await;
                stderr_task.abort();
                TranscodeOutcome::Cancelled
            }
            Some(Err(e)) => TranscodeOutcome::Failed {
                message: format!("failed to wait for {}: {}", self.bin, e),
            },
            Some(Ok(status)) if status.success() => TranscodeOutcome::Completed,
            Some(Ok(status)) => {
                let stderr = stderr_task.await.unwrap_or_default();
                TranscodeOutcome::Failed {
                    message: failure_message(&self.bin, status.code(), &stderr),
                }
            }
        }
    }
}

fn failure_message(bin: &str, code: Option<i32>, stderr: &str) -> String {
    let detail = stderr
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("");
    match (code, detail.is_empty()) {
        (Some(code), false) => format!("{bin} exited with status {code}: {detail}"),
        (Some(code), true) => format!("{bin} exited with status {code}"),
        (None, false) => format!("{bin} terminated by signal: {detail}"),
        (None, true) => format!("{bin} terminated by signal"),
    }
}

/// One worker slot. Consumes assignments until the channel closes or
/// shutdown is requested; each assignment carries the slot permit, which is
/// released (and the scheduler kicked) only after the job's final
/// transition is recorded.
pub async fn run_slot(
    slot: usize,
    store: Arc<JobStore>,
    transcoder: Arc<dyn Transcoder>,
    assignments: async_channel::Receiver<Assignment>,
    notify: Arc<Notify>,
    max_attempts: u32,
    cancel_poll: Duration,
    shutdown: CancellationToken,
) {
    info!(slot, "🎥 transcoder slot ready");
    loop {
        let assignment = tokio::select! {
            _ = shutdown.cancelled() => break,
            assignment = assignments.recv() => match assignment {
                Ok(assignment) => assignment,
                Err(_) => break,
            },
        };
        process_assignment(
            slot,
            &store,
            transcoder.as_ref(),
            assignment.job_id,
            max_attempts,
            cancel_poll,
        )
        .await;
        drop(assignment.permit);
        notify.notify_one();
    }
    info!(slot, "transcoder slot stopped");
}

async fn process_assignment(
    slot: usize,
    store: &JobStore,
    transcoder: &dyn Transcoder,
    job_id: Uuid,
    max_attempts: u32,
    cancel_poll: Duration,
) {
    let job = match store.get(job_id) {
        Ok(job) => job,
        Err(e) => {
            error!(slot, job_id = %job_id, error = %e, "assigned job vanished");
            return;
        }
    };

    // Cancel that landed between the claim and the handoff.
    if job.cancel_requested {
        finish(store, job_id, JobState::Cancelled, None);
        return;
    }

    info!(
        slot,
        job_id = %job_id,
        attempt = job.attempt_count,
        "📦 transcoding {} -> {}",
        job.request.source,
        job.request.output,
    );

    let token = CancellationToken::new();
    let mut exec = transcoder.run(job_id, job.request.clone(), token.clone());
    let mut poll = tokio::time::interval(cancel_poll);
    let outcome = loop {
        tokio::select! {
            outcome = &mut exec => break outcome,
            _ = poll.tick() => {
                if !token.is_cancelled() && store.cancel_requested(job_id) {
                    token.cancel();
                }
            }
        }
    };

    match outcome {
        TranscodeOutcome::Completed => {
            info!(slot, job_id = %job_id, "✅ transcode complete");
            finish(store, job_id, JobState::Succeeded, None);
        }
        TranscodeOutcome::Cancelled => {
            info!(slot, job_id = %job_id, "transcode cancelled");
            finish(store, job_id, JobState::Cancelled, None);
        }
        TranscodeOutcome::Failed { message } => {
            if job.attempt_count < max_attempts {
                warn!(
                    slot,
                    job_id = %job_id,
                    attempt = job.attempt_count,
                    max_attempts,
                    error = %message,
                    "transcode failed, requeueing",
                );
                finish(store, job_id, JobState::Queued, None);
            } else {
                error!(slot, job_id = %job_id, error = %message, "❌ transcode failed");
                let failure = JobFailure {
                    kind: FailureKind::Execution,
                    message,
                };
                finish(store, job_id, JobState::Failed, Some(failure));
            }
        }
    }
}

/// The slot's single compare-and-transition out of `Running`. A conflict
/// means the job changed state underneath us (reaped, typically) and the
/// result is dropped.
fn finish(store: &JobStore, job_id: Uuid, to: JobState, failure: Option<JobFailure>) {
    match store.transition(job_id, JobState::Running, to, failure) {
        Ok(_) => {}
        Err(ServerError::Conflict { actual, .. }) => {
            warn!(job_id = %job_id, state = %actual, "job no longer running, dropping worker result");
        }
        Err(e) => {
            error!(job_id = %job_id, error = %e, "failed to record worker result");
        }
    }
}
