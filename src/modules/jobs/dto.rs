use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::model::{Job, JobFailure, JobRequest, JobState};

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct SubmitJobRequest {
    /// Input file or URI handed to the transcoder.
    #[validate(length(min = 1, message = "source must not be empty"))]
    pub source: String,

    /// Output file the transcoder writes.
    #[validate(length(min = 1, message = "output must not be empty"))]
    pub output: String,

    /// Extra transcoder arguments, passed through between input and output.
    #[serde(default)]
    #[validate(
        length(max = 64, message = "at most 64 options are allowed"),
        custom(function = validate_options)
    )]
    pub options: Vec<String>,
}

fn validate_options(options: &[String]) -> Result<(), ValidationError> {
    if options.iter().any(|opt| opt.trim().is_empty()) {
        let mut err = ValidationError::new("empty_option");
        err.message = Some("options must not contain empty entries".into());
        return Err(err);
    }
    Ok(())
}

impl From<SubmitJobRequest> for JobRequest {
    fn from(req: SubmitJobRequest) -> Self {
        Self {
            source: req.source,
            output: req.output,
            options: req.options,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SubmitJobResponse {
    pub id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CancelJobResponse {
    pub id: Uuid,
    pub state: JobState,
}

/// Full job record as returned by status and list queries.
#[derive(Debug, Serialize, ToSchema)]
pub struct JobResponse {
    pub id: Uuid,
    pub request: JobRequest,
    pub state: JobState,
    #[serde(with = "time::serde::iso8601")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::iso8601::option")]
    pub started_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::iso8601::option")]
    pub finished_at: Option<OffsetDateTime>,
    pub error: Option<JobFailure>,
    pub attempt_count: u32,
    pub cancel_requested: bool,
}

impl From<Job> for JobResponse {
    fn from(job: Job) -> Self {
        Self {
            id: job.id,
            request: job.request,
            state: job.state,
            created_at: job.created_at,
            started_at: job.started_at,
            finished_at: job.finished_at,
            error: job.error,
            attempt_count: job.attempt_count,
            cancel_requested: job.cancel_requested,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListJobsQuery {
    pub state: Option<String>,
}
