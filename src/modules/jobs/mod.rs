use axum::Router;
use axum::routing::{get, post};

use crate::state::AppState;

pub mod dto;
pub mod handler;
pub mod model;
pub mod service;
pub mod store;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(handler::submit_job).get(handler::list_jobs))
        .route(
            "/{id}",
            get(handler::get_job).delete(handler::cancel_job),
        )
}
