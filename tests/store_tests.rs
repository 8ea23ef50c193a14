use std::sync::Arc;
use std::time::Duration;

use ffmpeg_server::error::ServerError;
use ffmpeg_server::modules::jobs::model::{FailureKind, JobFailure, JobRequest, JobState};
use ffmpeg_server::modules::jobs::store::JobStore;

fn request(source: &str) -> JobRequest {
    JobRequest {
        source: source.to_string(),
        output: format!("{source}.webm"),
        options: Vec::new(),
    }
}

fn execution_failure(message: &str) -> JobFailure {
    JobFailure {
        kind: FailureKind::Execution,
        message: message.to_string(),
    }
}

#[test]
fn test_create_starts_queued() {
    let store = JobStore::new();
    let job = store.create(request("a.mp4"));

    assert_eq!(job.state, JobState::Queued);
    assert_eq!(job.attempt_count, 0);
    assert!(job.started_at.is_none());
    assert!(job.finished_at.is_none());
    assert!(job.error.is_none());
    assert!(!job.cancel_requested);

    let fetched = store.get(job.id).unwrap();
    assert_eq!(fetched.state, JobState::Queued);
}

#[test]
fn test_get_unknown_job() {
    let store = JobStore::new();
    let id = uuid::Uuid::new_v4();
    assert!(matches!(store.get(id), Err(ServerError::NotFound(e)) if e == id));
}

#[test]
fn test_successful_lifecycle_walk() {
    let store = JobStore::new();
    let job = store.create(request("a.mp4"));

    let running = store
        .transition(job.id, JobState::Queued, JobState::Running, None)
        .unwrap();
    assert_eq!(running.state, JobState::Running);
    assert_eq!(running.attempt_count, 1);
    assert!(running.started_at.is_some());
    assert!(running.finished_at.is_none());

    let done = store
        .transition(job.id, JobState::Running, JobState::Succeeded, None)
        .unwrap();
    assert_eq!(done.state, JobState::Succeeded);
    assert!(done.finished_at.is_some());
    assert!(done.error.is_none());
}

#[test]
fn test_illegal_edges_rejected() {
    let store = JobStore::new();
    let job = store.create(request("a.mp4"));

    // Queued -> Succeeded skips Running.
    let err = store
        .transition(job.id, JobState::Queued, JobState::Succeeded, None)
        .unwrap_err();
    assert!(matches!(err, ServerError::InvalidTransition { .. }));
    assert_eq!(store.get(job.id).unwrap().state, JobState::Queued);

    // Queued -> Failed is not an edge either.
    let err = store
        .transition(job.id, JobState::Queued, JobState::Failed, None)
        .unwrap_err();
    assert!(matches!(err, ServerError::InvalidTransition { .. }));
}

#[test]
fn test_terminal_states_are_final() {
    let store = JobStore::new();
    let job = store.create(request("a.mp4"));
    store
        .transition(job.id, JobState::Queued, JobState::Running, None)
        .unwrap();
    store
        .transition(job.id, JobState::Running, JobState::Succeeded, None)
        .unwrap();

    for to in [
        JobState::Queued,
        JobState::Running,
        JobState::Failed,
        JobState::Cancelled,
    ] {
        let err = store
            .transition(job.id, JobState::Succeeded, to, None)
            .unwrap_err();
        assert!(
            matches!(err, ServerError::InvalidTransition { .. }),
            "edge to {to} should be rejected"
        );
    }
    assert_eq!(store.get(job.id).unwrap().state, JobState::Succeeded);
}

#[test]
fn test_stale_expectation_conflicts() {
    let store = JobStore::new();
    let job = store.create(request("a.mp4"));
    store
        .transition(job.id, JobState::Queued, JobState::Running, None)
        .unwrap();

    let err = store
        .transition(job.id, JobState::Queued, JobState::Running, None)
        .unwrap_err();
    assert!(matches!(
        err,
        ServerError::Conflict {
            expected: JobState::Queued,
            actual: JobState::Running,
        }
    ));
}

#[test]
fn test_concurrent_claims_one_winner() {
    let store = Arc::new(JobStore::new());
    let job = store.create(request("a.mp4"));

    let mut results = Vec::new();
    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                scope.spawn(move || {
                    store.transition(job.id, JobState::Queued, JobState::Running, None)
                })
            })
            .collect();
        for handle in handles {
            results.push(handle.join().unwrap());
        }
    });

    let winners = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1, "exactly one claim must win");
    for result in results {
        if let Err(err) = result {
            assert!(matches!(err, ServerError::Conflict { .. }));
        }
    }
    let job = store.get(job.id).unwrap();
    assert_eq!(job.state, JobState::Running);
    assert_eq!(job.attempt_count, 1);
}

#[test]
fn test_requeue_clears_error_and_keeps_started_at() {
    let store = JobStore::new();
    let job = store.create(request("a.mp4"));

    let first = store
        .transition(job.id, JobState::Queued, JobState::Running, None)
        .unwrap();
    let first_start = first.started_at.unwrap();

    let requeued = store
        .transition(job.id, JobState::Running, JobState::Queued, None)
        .unwrap();
    assert_eq!(requeued.state, JobState::Queued);
    assert!(requeued.error.is_none());
    assert!(requeued.finished_at.is_none());

    let second = store
        .transition(job.id, JobState::Queued, JobState::Running, None)
        .unwrap();
    assert_eq!(second.attempt_count, 2);
    assert_eq!(second.started_at.unwrap(), first_start);

    let failed = store
        .transition(
            job.id,
            JobState::Running,
            JobState::Failed,
            Some(execution_failure("boom")),
        )
        .unwrap();
    assert_eq!(failed.error.unwrap().message, "boom");
    assert!(failed.finished_at.is_some());
}

#[test]
fn test_cancel_queued_is_immediate() {
    let store = JobStore::new();
    let job = store.create(request("a.mp4"));

    let cancelled = store.request_cancel(job.id).unwrap();
    assert_eq!(cancelled.state, JobState::Cancelled);
    assert!(cancelled.started_at.is_none());
    assert!(cancelled.finished_at.is_some());
}

#[test]
fn test_cancel_running_sets_flag_only() {
    let store = JobStore::new();
    let job = store.create(request("a.mp4"));
    store
        .transition(job.id, JobState::Queued, JobState::Running, None)
        .unwrap();

    let acked = store.request_cancel(job.id).unwrap();
    assert_eq!(acked.state, JobState::Running);
    assert!(acked.cancel_requested);
    assert!(store.cancel_requested(job.id));
    assert!(acked.finished_at.is_none());
}

#[test]
fn test_cancel_is_idempotent() {
    let store = JobStore::new();
    let job = store.create(request("a.mp4"));

    let first = store.request_cancel(job.id).unwrap();
    let second = store.request_cancel(job.id).unwrap();
    assert_eq!(first.state, JobState::Cancelled);
    assert_eq!(second.state, JobState::Cancelled);
    assert_eq!(first.finished_at, second.finished_at);
}

#[test]
fn test_cancel_finished_job_rejected() {
    let store = JobStore::new();
    let job = store.create(request("a.mp4"));
    store
        .transition(job.id, JobState::Queued, JobState::Running, None)
        .unwrap();
    store
        .transition(job.id, JobState::Running, JobState::Succeeded, None)
        .unwrap();

    let err = store.request_cancel(job.id).unwrap_err();
    assert!(matches!(
        err,
        ServerError::InvalidTransition {
            from: JobState::Succeeded,
            to: JobState::Cancelled,
        }
    ));
}

#[test]
fn test_list_preserves_submission_order() {
    let store = JobStore::new();
    let a = store.create(request("a.mp4"));
    let b = store.create(request("b.mp4"));
    let c = store.create(request("c.mp4"));

    store
        .transition(b.id, JobState::Queued, JobState::Running, None)
        .unwrap();

    let all = store.list(None);
    let ids: Vec<_> = all.iter().map(|j| j.id).collect();
    assert_eq!(ids, vec![a.id, b.id, c.id]);

    let queued = store.list(Some(JobState::Queued));
    let queued_ids: Vec<_> = queued.iter().map(|j| j.id).collect();
    assert_eq!(queued_ids, vec![a.id, c.id]);

    let running = store.list(Some(JobState::Running));
    assert_eq!(running.len(), 1);
    assert_eq!(running[0].id, b.id);
}

#[test]
fn test_reap_fails_stale_running_jobs_once() {
    let store = JobStore::new();
    let stale = store.create(request("a.mp4"));
    let queued = store.create(request("b.mp4"));
    store
        .transition(stale.id, JobState::Queued, JobState::Running, None)
        .unwrap();

    std::thread::sleep(Duration::from_millis(20));

    let reaped = store.reap(Duration::from_millis(1));
    assert_eq!(reaped.len(), 1);
    assert_eq!(reaped[0].id, stale.id);
    assert_eq!(reaped[0].state, JobState::Failed);
    let failure = reaped[0].error.clone().unwrap();
    assert_eq!(failure.kind, FailureKind::WorkerLost);
    let finished_at = reaped[0].finished_at.unwrap();

    // A second sweep finds nothing and changes nothing.
    assert!(store.reap(Duration::from_millis(1)).is_empty());
    let after = store.get(stale.id).unwrap();
    assert_eq!(after.state, JobState::Failed);
    assert_eq!(after.finished_at.unwrap(), finished_at);
    assert_eq!(after.error.unwrap().kind, FailureKind::WorkerLost);

    // Queued jobs are never reaped.
    assert_eq!(store.get(queued.id).unwrap().state, JobState::Queued);
}

#[test]
fn test_reap_spares_fresh_running_jobs() {
    let store = JobStore::new();
    let job = store.create(request("a.mp4"));
    store
        .transition(job.id, JobState::Queued, JobState::Running, None)
        .unwrap();

    assert!(store.reap(Duration::from_secs(3600)).is_empty());
    assert_eq!(store.get(job.id).unwrap().state, JobState::Running);
}

#[test]
fn test_worker_result_after_reap_is_a_conflict() {
    let store = JobStore::new();
    let job = store.create(request("a.mp4"));
    store
        .transition(job.id, JobState::Queued, JobState::Running, None)
        .unwrap();

    std::thread::sleep(Duration::from_millis(20));
    assert_eq!(store.reap(Duration::from_millis(1)).len(), 1);

    // The presumed-dead worker reports after all; its result is rejected.
    let err = store
        .transition(job.id, JobState::Running, JobState::Succeeded, None)
        .unwrap_err();
    assert!(matches!(err, ServerError::Conflict { .. }));
    assert_eq!(store.get(job.id).unwrap().state, JobState::Failed);
}
