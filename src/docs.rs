use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::modules::jobs::handler::submit_job,
        crate::modules::jobs::handler::get_job,
        crate::modules::jobs::handler::cancel_job,
        crate::modules::jobs::handler::list_jobs,
    ),
    components(
        schemas(
            crate::modules::jobs::dto::SubmitJobRequest,
            crate::modules::jobs::dto::SubmitJobResponse,
            crate::modules::jobs::dto::CancelJobResponse,
            crate::modules::jobs::dto::JobResponse,
            crate::modules::jobs::model::JobRequest,
            crate::modules::jobs::model::JobState,
            crate::modules::jobs::model::JobFailure,
            crate::modules::jobs::model::FailureKind,
            crate::common::response::ErrorResponse,
            crate::common::response::ErrorBody,
        )
    ),
    tags(
        (name = "Jobs", description = "Transcoding job submission and lifecycle")
    )
)]
pub struct ApiDoc;
