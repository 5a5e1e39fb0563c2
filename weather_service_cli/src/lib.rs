pub mod jobs_api;
pub mod poller;
pub mod utils;
pub mod weather;

use serde::{Deserialize, Serialize};

/// Decoded form of a finished job's `result_data` payload.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AnalysisData {
    pub insights: Insights,
    pub chart_data: ChartData,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Insights {
    pub hottest_day: Option<HottestDay>,
    pub avg_temp_last_year: Option<f64>,
    pub rainy_days_last_90: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct HottestDay {
    pub date: String,
    pub temp: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ChartData {
    pub hourly_today: Vec<HourlyPoint>,
    pub daily_yearly: Vec<DailyPoint>,
}

/// One hour of today's forecast, keyed the way the dashboard charts expect.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct HourlyPoint {
    pub time: String,
    pub temperature: f64,
    pub apparent_temperature: f64,
    pub relative_humidity_2m: f64,
    pub precipitation_probability: f64,
    pub wind_speed_10m: f64,
}

/// One day of the trailing-year archive. The archive reports the most recent
/// few days as null, hence the options.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DailyPoint {
    pub time: String,
    pub temperature_2m_max: Option<f64>,
    pub temperature_2m_min: Option<f64>,
    pub temperature_2m_mean: Option<f64>,
    pub precipitation_sum: Option<f64>,
}

impl AnalysisData {
    pub fn hourly_points(&self) -> usize {
        self.chart_data.hourly_today.len()
    }

    pub fn daily_points(&self) -> usize {
        self.chart_data.daily_yearly.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chart_data.hourly_today.is_empty() && self.chart_data.daily_yearly.is_empty()
    }
}
