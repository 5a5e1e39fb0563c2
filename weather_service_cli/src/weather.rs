//! Open-Meteo client: geocoding, current conditions, hourly forecast and
//! the trailing-year daily archive.

use std::time::Duration;

use backoff::{future::retry, ExponentialBackoff};
use chrono::NaiveDate;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use url::Url;

const GEOCODING_URL: &str = "https://geocoding-api.open-meteo.com/";
const FORECAST_URL: &str = "https://api.open-meteo.com/";
const ARCHIVE_URL: &str = "https://archive-api.open-meteo.com/";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const RETRY_CAP: Duration = Duration::from_secs(20);

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    #[error("{endpoint} answered {status}")]
    Status {
        endpoint: &'static str,
        status: reqwest::StatusCode,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeoMatch {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub country: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeocodingResponse {
    results: Option<Vec<GeoMatch>>,
}

/// Column-oriented hourly block, one day of forecast.
#[derive(Debug, Clone, Deserialize)]
pub struct HourlySeries {
    pub time: Vec<String>,
    pub temperature_2m: Vec<f64>,
    pub apparent_temperature: Vec<f64>,
    pub relative_humidity_2m: Vec<f64>,
    pub precipitation_probability: Vec<f64>,
    pub wind_speed_10m: Vec<f64>,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    hourly: HourlySeries,
}

/// Column-oriented daily block from the archive API.
#[derive(Debug, Clone, Deserialize)]
pub struct DailySeries {
    pub time: Vec<String>,
    pub temperature_2m_max: Vec<Option<f64>>,
    pub temperature_2m_min: Vec<Option<f64>>,
    pub temperature_2m_mean: Vec<Option<f64>>,
    pub precipitation_sum: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct ArchiveResponse {
    daily: DailySeries,
}

pub struct OpenMeteoClient {
    client: Client,
    geocoding_base: Url,
    forecast_base: Url,
    archive_base: Url,
}

impl OpenMeteoClient {
    pub fn new() -> Result<Self, ProviderError> {
        Self::with_bases(GEOCODING_URL, FORECAST_URL, ARCHIVE_URL)
    }

    /// Build a client against alternative base URLs (test servers, proxies).
    pub fn with_bases(
        geocoding: &str,
        forecast: &str,
        archive: &str,
    ) -> Result<Self, ProviderError> {
        Ok(Self {
            client: Client::builder().timeout(REQUEST_TIMEOUT).build()?,
            geocoding_base: Url::parse(geocoding)?,
            forecast_base: Url::parse(forecast)?,
            archive_base: Url::parse(archive)?,
        })
    }

    /// Resolve a city name to its best coordinate match, `None` when the
    /// geocoder has never heard of it.
    pub async fn geocode(&self, city: &str) -> Result<Option<GeoMatch>, ProviderError> {
        let mut url = self.geocoding_base.join("v1/search")?;
        url.query_pairs_mut()
            .append_pair("name", city)
            .append_pair("count", "1")
            .append_pair("language", "en")
            .append_pair("format", "json");

        let body: GeocodingResponse = self.get_json("geocoding", url).await?;
        Ok(body.results.unwrap_or_default().into_iter().next())
    }

    /// Up to five "Name, Country" candidates for a partial city string.
    pub async fn suggestions(&self, partial: &str) -> Result<Vec<String>, ProviderError> {
        let mut url = self.geocoding_base.join("v1/search")?;
        url.query_pairs_mut()
            .append_pair("name", partial)
            .append_pair("count", "5")
            .append_pair("language", "en")
            .append_pair("format", "json");

        let body: GeocodingResponse = self.get_json("geocoding", url).await?;
        let suggestions = body
            .results
            .unwrap_or_default()
            .into_iter()
            .map(|m| match m.country {
                Some(country) if !country.is_empty() => format!("{}, {}", m.name, country),
                _ => m.name,
            })
            .collect();
        Ok(suggestions)
    }

    /// Current conditions block, passed through verbatim to the dashboard.
    pub async fn current_weather(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<serde_json::Value, ProviderError> {
        let mut url = self.forecast_base.join("v1/forecast")?;
        url.query_pairs_mut()
            .append_pair("latitude", &latitude.to_string())
            .append_pair("longitude", &longitude.to_string())
            .append_pair("current", "temperature_2m,weather_code");

        self.get_json("forecast", url).await
    }

    /// One day of hourly forecast for the analysis charts.
    pub async fn hourly_forecast(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<HourlySeries, ProviderError> {
        let mut url = self.forecast_base.join("v1/forecast")?;
        url.query_pairs_mut()
            .append_pair("latitude", &latitude.to_string())
            .append_pair("longitude", &longitude.to_string())
            .append_pair(
                "hourly",
                "temperature_2m,apparent_temperature,relative_humidity_2m,precipitation_probability,wind_speed_10m",
            )
            .append_pair("forecast_days", "1")
            .append_pair("timezone", "auto");

        let body: ForecastResponse = self.get_json("forecast", url).await?;
        Ok(body.hourly)
    }

    /// Daily history between two dates, inclusive.
    pub async fn daily_history(
        &self,
        latitude: f64,
        longitude: f64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<DailySeries, ProviderError> {
        let mut url = self.archive_base.join("v1/archive")?;
        url.query_pairs_mut()
            .append_pair("latitude", &latitude.to_string())
            .append_pair("longitude", &longitude.to_string())
            .append_pair("start_date", &start.format("%Y-%m-%d").to_string())
            .append_pair("end_date", &end.format("%Y-%m-%d").to_string())
            .append_pair(
                "daily",
                "temperature_2m_max,temperature_2m_min,temperature_2m_mean,apparent_temperature_max,precipitation_sum,wind_speed_10m_max",
            )
            .append_pair("timezone", "auto");

        let body: ArchiveResponse = self.get_json("archive", url).await?;
        Ok(body.daily)
    }

    // Server-side hiccups are retried with backoff; anything else fails fast.
    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        url: Url,
    ) -> Result<T, ProviderError> {
        let backoff = ExponentialBackoff {
            max_elapsed_time: Some(RETRY_CAP),
            ..ExponentialBackoff::default()
        };

        retry(backoff, || async {
            let res = self
                .client
                .get(url.clone())
                .send()
                .await
                .map_err(|e| backoff::Error::transient(ProviderError::Network(e)))?;

            let status = res.status();
            if status.is_server_error() {
                tracing::debug!("{endpoint} answered {status}, retrying");
                return Err(backoff::Error::transient(ProviderError::Status {
                    endpoint,
                    status,
                }));
            }
            if !status.is_success() {
                return Err(backoff::Error::permanent(ProviderError::Status {
                    endpoint,
                    status,
                }));
            }

            res.json::<T>()
                .await
                .map_err(|e| backoff::Error::permanent(ProviderError::Network(e)))
        })
        .await
    }
}
