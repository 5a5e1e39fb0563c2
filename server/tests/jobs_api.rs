//! Router-level tests: in-memory job store, stubbed Open-Meteo upstream.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::{Extension, Router};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use server::models::job::JobStatus;
use server::routes::{jobs::job_routes, suggestions::suggestion_routes};
use server::state::AppState;
use server::store::memory::MemoryJobStore;
use weather_service_cli::weather::OpenMeteoClient;

fn test_app(upstream: &MockServer) -> (Router, AppState) {
    let weather = OpenMeteoClient::with_bases(&upstream.uri(), &upstream.uri(), &upstream.uri())
        .expect("client builds");
    let state = AppState::new(Arc::new(MemoryJobStore::new()), weather);
    let app = Router::new()
        .nest("/api", job_routes())
        .nest("/api", suggestion_routes())
        .layer(Extension(state.clone()));
    (app, state)
}

async fn send_json(app: &Router, method_name: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder()
        .method(method_name)
        .uri(uri)
        .header("content-type", "application/json");
    let request = match body {
        Some(value) => builder
            .body(Body::from(serde_json::to_vec(&value).expect("serializes")))
            .expect("request builds"),
        None => builder.body(Body::empty()).expect("request builds"),
    };

    let response = app.clone().oneshot(request).await.expect("handler runs");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body reads");
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("body is json")
    };
    (status, value)
}

async fn mount_geocode_hit(upstream: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/v1/search"))
        .and(query_param("count", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                { "name": "Berlin", "latitude": 52.52, "longitude": 13.41, "country": "Germany" }
            ]
        })))
        .mount(upstream)
        .await;
}

async fn mount_weather_upstream(upstream: &MockServer) {
    mount_geocode_hit(upstream).await;
    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .and(query_param("current", "temperature_2m,weather_code"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "latitude": 52.52,
            "longitude": 13.41,
            "current": { "time": "2025-08-05T10:00", "temperature_2m": 21.4, "weather_code": 3 }
        })))
        .mount(upstream)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .and(query_param("forecast_days", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "hourly": {
                "time": ["2025-08-05T00:00", "2025-08-05T01:00"],
                "temperature_2m": [17.2, 16.8],
                "apparent_temperature": [16.0, 15.1],
                "relative_humidity_2m": [71.0, 74.0],
                "precipitation_probability": [10.0, 15.0],
                "wind_speed_10m": [8.4, 7.9]
            }
        })))
        .mount(upstream)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/archive"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "daily": {
                "time": ["2025-08-01", "2025-08-02"],
                "temperature_2m_max": [30.1, null],
                "temperature_2m_min": [18.2, null],
                "temperature_2m_mean": [24.0, null],
                "precipitation_sum": [2.0, null]
            }
        })))
        .mount(upstream)
        .await;
}

#[tokio::test]
async fn submitting_a_city_answers_immediately_and_completes_in_background() {
    let upstream = MockServer::start().await;
    mount_weather_upstream(&upstream).await;
    let (app, _state) = test_app(&upstream);

    let (status, body) =
        send_json(&app, "POST", "/api/jobs", Some(json!({ "city": "Berlin" }))).await;
    assert_eq!(status, StatusCode::CREATED);
    let job_id = body["jobId"].as_str().expect("jobId present").to_string();
    assert_eq!(body["currentWeather"]["current"]["temperature_2m"], json!(21.4));

    // the spawned analysis finishes on its own; result_data appears only then
    let deadline = tokio::time::Instant::now() + Duration::from_secs(3);
    let finished = loop {
        let (status, body) = send_json(&app, "GET", &format!("/api/jobs/{job_id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        match body["status"].as_str() {
            Some("COMPLETED") => break body,
            Some("PENDING") | Some("IN_PROGRESS") => {
                assert!(body["result_data"].is_null(), "payload leaked early");
            }
            other => panic!("unexpected status {other:?}"),
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "analysis never completed"
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    };

    let payload = finished["result_data"].as_str().expect("payload present");
    let analysis: Value = serde_json::from_str(payload).expect("payload is json");
    assert_eq!(analysis["chart_data"]["hourly_today"].as_array().map(Vec::len), Some(2));
    assert_eq!(analysis["chart_data"]["daily_yearly"].as_array().map(Vec::len), Some(2));
    assert_eq!(finished["city"], json!("Berlin"));
}

#[tokio::test]
async fn blank_city_is_rejected() {
    let upstream = MockServer::start().await;
    let (app, _state) = test_app(&upstream);

    let (status, body) =
        send_json(&app, "POST", "/api/jobs", Some(json!({ "city": "   " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().is_some_and(|e| !e.is_empty()));
    // validation happens before anything talks to the provider
    assert!(upstream
        .received_requests()
        .await
        .expect("recording enabled")
        .is_empty());
}

#[tokio::test]
async fn unknown_city_is_a_404_but_the_job_record_remains() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "results": [] })))
        .mount(&upstream)
        .await;
    let (app, _state) = test_app(&upstream);

    let (status, body) =
        send_json(&app, "POST", "/api/jobs", Some(json!({ "city": "Atlantis" }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"]
        .as_str()
        .is_some_and(|e| e.contains("Atlantis")));
}

#[tokio::test]
async fn unknown_and_malformed_job_ids_read_as_404() {
    let upstream = MockServer::start().await;
    let (app, _state) = test_app(&upstream);

    let (status, body) = send_json(
        &app,
        "GET",
        "/api/jobs/5b9e1dcd-5d2a-4a52-b6c8-fc33a54ba5b7",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], json!("job not found"));

    let (status, body) = send_json(&app, "GET", "/api/jobs/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], json!("job not found"));
}

#[tokio::test]
async fn pending_jobs_withhold_result_data() {
    let upstream = MockServer::start().await;
    let (app, state) = test_app(&upstream);

    let job = state.store.create("Berlin").await.expect("create");
    let (status, body) = send_json(&app, "GET", &format!("/api/jobs/{}", job.job_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!(JobStatus::Pending));
    assert!(body["result_data"].is_null());
    assert!(body["createdAt"].as_str().is_some());
}

#[tokio::test]
async fn suggestions_come_back_formatted_and_cached() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/search"))
        .and(query_param("name", "ber"))
        .and(query_param("count", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                { "name": "Berlin", "latitude": 52.52, "longitude": 13.41, "country": "Germany" },
                { "name": "Bern", "latitude": 46.95, "longitude": 7.45, "country": "Switzerland" }
            ]
        })))
        .expect(1)
        .mount(&upstream)
        .await;
    let (app, _state) = test_app(&upstream);

    for _ in 0..2 {
        let (status, body) = send_json(&app, "GET", "/api/search-suggestions?q=Ber", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["suggestions"],
            json!(["Berlin, Germany", "Bern, Switzerland"])
        );
    }
}

#[tokio::test]
async fn short_queries_answer_empty_without_calling_upstream() {
    let upstream = MockServer::start().await;
    let (app, _state) = test_app(&upstream);

    let (status, body) = send_json(&app, "GET", "/api/search-suggestions?q=b", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["suggestions"], json!([]));
    assert!(upstream
        .received_requests()
        .await
        .expect("recording enabled")
        .is_empty());
}

#[tokio::test]
async fn upstream_failure_turns_into_a_500() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/search"))
        .respond_with(ResponseTemplate::new(400))
        .mount(&upstream)
        .await;
    let (app, _state) = test_app(&upstream);

    let (status, body) = send_json(&app, "GET", "/api/search-suggestions?q=berlin", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().is_some());
}
