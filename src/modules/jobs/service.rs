use tracing::info;
use uuid::Uuid;
use validator::Validate;

use super::dto::{CancelJobResponse, JobResponse, SubmitJobRequest, SubmitJobResponse};
use super::model::{JobRequest, JobState};
use crate::error::{Result, ServerError};
use crate::state::AppState;

pub struct JobService;

impl JobService {
    pub fn submit(state: &AppState, req: SubmitJobRequest) -> Result<SubmitJobResponse> {
        req.validate()
            .map_err(|e| ServerError::Validation(e.to_string()))?;
        if req.source.trim().is_empty() {
            return Err(ServerError::Validation("source must not be blank".into()));
        }
        if req.output.trim().is_empty() {
            return Err(ServerError::Validation("output must not be blank".into()));
        }
        if req.source == req.output {
            return Err(ServerError::Validation(
                "output must differ from source".into(),
            ));
        }

        let job = state.jobs.create(JobRequest::from(req));
        state.scheduler.kick();
        info!(job_id = %job.id, source = %job.request.source, "job submitted");
        Ok(SubmitJobResponse { id: job.id })
    }

    pub fn status(state: &AppState, id: Uuid) -> Result<JobResponse> {
        state.jobs.get(id).map(JobResponse::from)
    }

    pub fn cancel(state: &AppState, id: Uuid) -> Result<CancelJobResponse> {
        let job = state.jobs.request_cancel(id)?;
        info!(job_id = %job.id, state = %job.state, "cancel requested");
        Ok(CancelJobResponse {
            id: job.id,
            state: job.state,
        })
    }

    pub fn list(state: &AppState, state_filter: Option<String>) -> Result<Vec<JobResponse>> {
        let filter = match state_filter {
            Some(token) => Some(token.parse::<JobState>().map_err(|_| {
                ServerError::Validation(format!("unknown state filter: {token}"))
            })?),
            None => None,
        };
        Ok(state
            .jobs
            .list(filter)
            .into_iter()
            .map(JobResponse::from)
            .collect())
    }
}
