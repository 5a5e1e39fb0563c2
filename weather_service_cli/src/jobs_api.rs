//! Client for the dashboard backend's job endpoints.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum JobsApiError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("invalid server url: {0}")]
    Url(#[from] url::ParseError),
    #[error("server answered {status}: {message}")]
    Server {
        status: reqwest::StatusCode,
        message: String,
    },
}

#[derive(Debug, Serialize)]
struct CreateJobBody<'a> {
    city: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JobCreated {
    #[serde(rename = "jobId")]
    pub job_id: String,
    #[serde(rename = "currentWeather")]
    pub current_weather: serde_json::Value,
}

/// Wire shape of `GET /api/jobs/{jobId}`. `status` stays a plain string so
/// values this client does not know about survive untouched.
#[derive(Debug, Clone, Deserialize)]
pub struct JobStatusResponse {
    #[serde(rename = "jobId")]
    pub job_id: String,
    pub city: String,
    pub status: String,
    pub result_data: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: String,
}

#[derive(Debug, Deserialize)]
struct SuggestionsBody {
    suggestions: Vec<String>,
}

pub struct JobsApiClient {
    client: Client,
    base_url: Url,
}

impl JobsApiClient {
    pub fn new(base_url: &str) -> Result<Self, JobsApiError> {
        Ok(Self {
            client: Client::builder().timeout(REQUEST_TIMEOUT).build()?,
            base_url: Url::parse(base_url)?,
        })
    }

    /// POST /api/jobs: create an analysis job, returning its id and the
    /// current conditions for the city.
    pub async fn submit_job(&self, city: &str) -> Result<JobCreated, JobsApiError> {
        let url = self.base_url.join("api/jobs")?;
        let res = self
            .client
            .post(url)
            .json(&CreateJobBody { city })
            .send()
            .await?;
        Self::decode(res).await
    }

    /// GET /api/jobs/{jobId}: one status snapshot.
    pub async fn job_status(&self, job_id: &str) -> Result<JobStatusResponse, JobsApiError> {
        let url = self.base_url.join(&format!("api/jobs/{job_id}"))?;
        let res = self.client.get(url).send().await?;
        Self::decode(res).await
    }

    /// GET /api/search-suggestions: autocomplete candidates for a partial
    /// city string.
    pub async fn search_suggestions(&self, partial: &str) -> Result<Vec<String>, JobsApiError> {
        let mut url = self.base_url.join("api/search-suggestions")?;
        url.query_pairs_mut().append_pair("q", partial);
        let res = self.client.get(url).send().await?;
        let body: SuggestionsBody = Self::decode(res).await?;
        Ok(body.suggestions)
    }

    async fn decode<T: serde::de::DeserializeOwned>(
        res: reqwest::Response,
    ) -> Result<T, JobsApiError> {
        let status = res.status();
        if !status.is_success() {
            let message = match res.json::<ApiErrorBody>().await {
                Ok(body) => body.error,
                Err(_) => status.to_string(),
            };
            return Err(JobsApiError::Server { status, message });
        }
        Ok(res.json::<T>().await?)
    }
}
