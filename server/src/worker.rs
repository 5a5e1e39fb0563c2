//! Background analysis of a submitted city: one year of daily history plus
//! today's hourly forecast, condensed into the payload the dashboard charts.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Datelike, NaiveDate, Utc};
use futures::future::try_join;
use uuid::Uuid;
use weather_service_cli::weather::{DailySeries, HourlySeries, OpenMeteoClient, ProviderError};
use weather_service_cli::{AnalysisData, ChartData, DailyPoint, HottestDay, HourlyPoint, Insights};

use crate::state::AppState;
use crate::store::JobStore;

const SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);
const RETENTION_DAYS: i64 = 7;
const HISTORY_DAYS: i64 = 365;
const RAINY_DAY_THRESHOLD_MM: f64 = 1.0;

#[derive(Debug, thiserror::Error)]
enum AnalysisError {
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error("could not find coordinates for city: {0}")]
    UnknownCity(String),
}

/// Drives one job from PENDING to a terminal state.
pub async fn run_analysis(state: AppState, job_id: Uuid, city: String) {
    if let Err(e) = state.store.mark_in_progress(job_id).await {
        tracing::error!("job {job_id}: could not mark in progress: {e}");
        return;
    }

    match analyze_city(&state.weather, &city).await {
        Ok(analysis) => match serde_json::to_string(&analysis) {
            Ok(payload) => {
                if let Err(e) = state.store.complete(job_id, &payload).await {
                    tracing::error!("job {job_id}: could not store result: {e}");
                }
            }
            Err(e) => {
                tracing::error!("job {job_id}: could not serialize result: {e}");
                if let Err(db_e) = state.store.fail(job_id).await {
                    tracing::error!("job {job_id}: could not mark failed: {db_e}");
                }
            }
        },
        Err(e) => {
            tracing::warn!("job {job_id}: analysis for {city} failed: {e}");
            if let Err(db_e) = state.store.fail(job_id).await {
                tracing::error!("job {job_id}: could not mark failed: {db_e}");
            }
        }
    }
}

async fn analyze_city(
    weather: &OpenMeteoClient,
    city: &str,
) -> Result<AnalysisData, AnalysisError> {
    // search strings like "Delhi, India" geocode on the city part
    let name = city.split(',').next().unwrap_or(city).trim();
    let location = weather
        .geocode(name)
        .await?
        .ok_or_else(|| AnalysisError::UnknownCity(name.to_string()))?;

    let today = Utc::now().date_naive();
    let one_year_ago = today - chrono::Duration::days(HISTORY_DAYS);

    let (daily, hourly) = try_join(
        weather.daily_history(location.latitude, location.longitude, one_year_ago, today),
        weather.hourly_forecast(location.latitude, location.longitude),
    )
    .await?;

    Ok(build_analysis(&hourly, &daily, today))
}

fn build_analysis(hourly: &HourlySeries, daily: &DailySeries, today: NaiveDate) -> AnalysisData {
    let hourly_today = hourly
        .time
        .iter()
        .enumerate()
        .map(|(i, time)| HourlyPoint {
            time: time.clone(),
            temperature: hourly.temperature_2m.get(i).copied().unwrap_or_default(),
            apparent_temperature: hourly
                .apparent_temperature
                .get(i)
                .copied()
                .unwrap_or_default(),
            relative_humidity_2m: hourly
                .relative_humidity_2m
                .get(i)
                .copied()
                .unwrap_or_default(),
            precipitation_probability: hourly
                .precipitation_probability
                .get(i)
                .copied()
                .unwrap_or_default(),
            wind_speed_10m: hourly.wind_speed_10m.get(i).copied().unwrap_or_default(),
        })
        .collect();

    let daily_yearly = daily
        .time
        .iter()
        .enumerate()
        .map(|(i, time)| DailyPoint {
            time: time.clone(),
            temperature_2m_max: daily.temperature_2m_max.get(i).copied().flatten(),
            temperature_2m_min: daily.temperature_2m_min.get(i).copied().flatten(),
            temperature_2m_mean: daily.temperature_2m_mean.get(i).copied().flatten(),
            precipitation_sum: daily.precipitation_sum.get(i).copied().flatten(),
        })
        .collect();

    AnalysisData {
        insights: build_insights(daily, today),
        chart_data: ChartData {
            hourly_today,
            daily_yearly,
        },
    }
}

fn build_insights(daily: &DailySeries, today: NaiveDate) -> Insights {
    let dated_max = || {
        daily
            .time
            .iter()
            .zip(daily.temperature_2m_max.iter())
            .filter_map(|(t, max)| {
                let date = NaiveDate::parse_from_str(t, "%Y-%m-%d").ok()?;
                Some((date, (*max)?))
            })
    };

    let hottest_day = dated_max()
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(date, temp)| HottestDay {
            date: date.format("%B %d, %Y").to_string(),
            temp: temp.round(),
        });

    // average daily maximum for this month, one year back
    let (sum, count) = dated_max()
        .filter(|(date, _)| date.year() == today.year() - 1 && date.month() == today.month())
        .fold((0.0, 0usize), |(sum, count), (_, max)| (sum + max, count + 1));
    let avg_temp_last_year = (count > 0).then(|| (sum / count as f64 * 10.0).round() / 10.0);

    let cutoff = today - chrono::Duration::days(90);
    let rainy_days_last_90 = daily
        .time
        .iter()
        .zip(daily.precipitation_sum.iter())
        .filter(|(t, precipitation)| {
            let Ok(date) = NaiveDate::parse_from_str(t, "%Y-%m-%d") else {
                return false;
            };
            date > cutoff && precipitation.map(|p| p > RAINY_DAY_THRESHOLD_MM).unwrap_or(false)
        })
        .count() as i64;

    Insights {
        hottest_day,
        avg_temp_last_year,
        rainy_days_last_90: Some(rainy_days_last_90),
    }
}

/// Periodically deletes terminal jobs that finished more than
/// `RETENTION_DAYS` ago.
pub async fn cleanup_loop(store: Arc<dyn JobStore>) {
    let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
    loop {
        ticker.tick().await;
        let cutoff = Utc::now() - chrono::Duration::days(RETENTION_DAYS);
        match store.sweep_completed_before(cutoff).await {
            Ok(0) => {}
            Ok(removed) => tracing::info!("cleanup removed {removed} finished jobs"),
            Err(e) => tracing::error!("cleanup sweep failed: {e}"),
        }
    }
}
