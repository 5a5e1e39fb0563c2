use axum::{
    extract::Path,
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::models::job::JobStatus;
use crate::state::AppState;
use crate::worker;

#[derive(Deserialize)]
pub struct CreateJobPayload {
    pub city: String,
}

#[derive(Serialize)]
pub struct JobCreatedResponse {
    #[serde(rename = "jobId")]
    pub job_id: Uuid,
    #[serde(rename = "currentWeather")]
    pub current_weather: serde_json::Value,
}

#[derive(Serialize)]
pub struct JobStatusBody {
    #[serde(rename = "jobId")]
    pub job_id: Uuid,
    pub city: String,
    pub status: JobStatus,
    pub result_data: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// POST /api/jobs
pub async fn create_job(
    Extension(state): Extension<AppState>,
    Json(payload): Json<CreateJobPayload>,
) -> Result<impl IntoResponse, (StatusCode, Json<serde_json::Value>)> {
    let city = payload.city.trim().to_string();
    if city.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "city must not be empty" })),
        ));
    }

    // 1) Record the job; the analysis hangs off this row
    let job = state.store.create(&city).await.map_err(|e| {
        tracing::error!("create_job: could not persist job for {city}: {e}");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "could not create analysis job" })),
        )
    })?;

    // 2) Run the analysis in the background, like the standalone worker would
    let state_clone = state.clone();
    let job_id = job.job_id;
    let job_city = job.city.clone();
    tokio::spawn(async move {
        worker::run_analysis(state_clone, job_id, job_city).await;
    });

    // 3) Resolve the city for the immediate current-conditions answer
    let location = state.weather.geocode(&city).await.map_err(|e| {
        tracing::error!("create_job: geocoding {city} failed: {e}");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "weather lookup failed" })),
        )
    })?;
    let Some(location) = location else {
        return Err((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("no coordinates found for {city}") })),
        ));
    };

    let current_weather = state
        .weather
        .current_weather(location.latitude, location.longitude)
        .await
        .map_err(|e| {
            tracing::error!("create_job: current weather for {city} failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "weather lookup failed" })),
            )
        })?;

    Ok((
        StatusCode::CREATED,
        Json(JobCreatedResponse {
            job_id: job.job_id,
            current_weather,
        }),
    ))
}

/// GET /api/jobs/{jobId}
pub async fn get_job(
    Extension(state): Extension<AppState>,
    Path(job_id): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, Json<serde_json::Value>)> {
    let not_found = || {
        (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "job not found" })),
        )
    };
    // malformed ids read the same as ids that never existed
    let Ok(job_id) = Uuid::parse_str(&job_id) else {
        return Err(not_found());
    };

    let job = state.store.get(job_id).await.map_err(|e| {
        tracing::error!("get_job {job_id}: {e}");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "an internal server error occurred" })),
        )
    })?;
    let Some(job) = job else {
        return Err(not_found());
    };

    // unfinished payloads are withheld until the job is COMPLETED
    let result_data = if job.status == JobStatus::Completed {
        job.result_data
    } else {
        None
    };

    Ok((
        StatusCode::OK,
        Json(JobStatusBody {
            job_id: job.job_id,
            city: job.city,
            status: job.status,
            result_data,
            created_at: job.created_at,
        }),
    ))
}
