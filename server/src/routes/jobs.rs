use axum::routing::{get, post};
use axum::Router;

use crate::handlers::job_handlers::{create_job, get_job};

pub fn job_routes() -> Router {
    Router::new()
        .route("/jobs", post(create_job))
        .route("/jobs/{jobId}", get(get_job))
}
