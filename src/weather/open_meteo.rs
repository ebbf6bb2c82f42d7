//! Open-Meteo forecast client and response conversion
//!
//! One request returns the current conditions, an hourly precipitation
//! probability series and a daily outlook. The current-hour precipitation is
//! read from the hourly entry whose timestamp equals the current one.

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};

use super::WeatherProvider;
use crate::http::check_status;
use crate::models::{DailyForecast, WeatherReport};
use crate::{Result, TourPlanError};

pub const DEFAULT_BASE_URL: &str = "https://api.open-meteo.com/v1";
pub const DEFAULT_TIMEZONE: &str = "auto";
pub const DEFAULT_FORECAST_DAYS: usize = 7;

const DAILY_FIELDS: &str =
    "temperature_2m_max,temperature_2m_min,precipitation_probability_max,weathercode";

/// Forecast response from `OpenMeteo`
#[derive(Debug, Deserialize)]
pub struct ForecastResponse {
    pub current_weather: CurrentWeather,
    pub hourly: Option<HourlyData>,
    pub daily: Option<DailyData>,
}

#[derive(Debug, Deserialize)]
pub struct CurrentWeather {
    pub time: String,
    pub temperature: f64,
    #[serde(rename = "weathercode")]
    pub weather_code: Option<u16>,
}

#[derive(Debug, Deserialize)]
pub struct HourlyData {
    pub time: Vec<String>,
    pub precipitation_probability: Option<Vec<Option<f64>>>,
}

#[derive(Debug, Deserialize)]
pub struct DailyData {
    pub time: Vec<String>,
    #[serde(rename = "temperature_2m_max")]
    pub temperature_max: Option<Vec<Option<f64>>>,
    #[serde(rename = "temperature_2m_min")]
    pub temperature_min: Option<Vec<Option<f64>>>,
    #[serde(rename = "precipitation_probability_max")]
    pub precipitation_probability: Option<Vec<Option<f64>>>,
    #[serde(rename = "weathercode")]
    pub weather_code: Option<Vec<Option<u16>>>,
}

/// Convert `OpenMeteo` weather code to human-readable description
#[must_use]
pub fn weather_code_to_description(code: u16) -> &'static str {
    match code {
        0 => "Clear",
        1 => "Mainly Clear",
        2 => "Partly Cloudy",
        3 => "Overcast",
        45 => "Fog",
        48 => "Depositing Rime Fog",
        51 => "Light Drizzle",
        53 => "Moderate Drizzle",
        55 => "Dense Drizzle",
        56 => "Light Freezing Drizzle",
        57 => "Dense Freezing Drizzle",
        61 => "Slight Rain",
        63 => "Moderate Rain",
        65 => "Heavy Rain",
        66 => "Light Freezing Rain",
        67 => "Heavy Freezing Rain",
        71 => "Slight Snowfall",
        73 => "Moderate Snowfall",
        75 => "Heavy Snowfall",
        77 => "Snow Grains",
        80 => "Slight Rain Showers",
        81 => "Moderate Rain Showers",
        82 => "Violent Rain Showers",
        85 => "Slight Snow Showers",
        86 => "Heavy Snow Showers",
        95 => "Thunderstorm",
        96 => "Thunderstorm With Slight Hail",
        99 => "Thunderstorm With Heavy Hail",
        _ => "Unknown",
    }
}

fn to_percentage(value: f64) -> u8 {
    value.round().clamp(0.0, 100.0) as u8
}

fn value_at(series: Option<&Vec<Option<f64>>>, index: usize) -> Option<f64> {
    series.and_then(|values| values.get(index).copied().flatten())
}

impl ForecastResponse {
    /// Precipitation probability of the hourly entry matching the current
    /// timestamp. No match means the value is unknown.
    #[must_use]
    pub fn current_precipitation_probability(&self) -> Option<u8> {
        let hourly = self.hourly.as_ref()?;
        let Some(index) = hourly.time.iter().position(|t| *t == self.current_weather.time) else {
            debug!(
                current_time = %self.current_weather.time,
                "Current time not found in hourly time array"
            );
            return None;
        };
        value_at(hourly.precipitation_probability.as_ref(), index).map(to_percentage)
    }

    #[must_use]
    pub fn daily_forecast(&self, max_days: usize) -> Vec<DailyForecast> {
        let Some(daily) = &self.daily else {
            return Vec::new();
        };

        daily
            .time
            .iter()
            .take(max_days)
            .enumerate()
            .filter_map(|(i, day)| {
                let date = NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()?;
                let code = daily
                    .weather_code
                    .as_ref()
                    .and_then(|codes| codes.get(i).copied().flatten());
                Some(DailyForecast {
                    date,
                    temp_max: value_at(daily.temperature_max.as_ref(), i),
                    temp_min: value_at(daily.temperature_min.as_ref(), i),
                    precipitation_probability_pct: value_at(
                        daily.precipitation_probability.as_ref(),
                        i,
                    )
                    .map(to_percentage),
                    condition_summary: code.map(|c| weather_code_to_description(c).to_string()),
                })
            })
            .collect()
    }

    #[must_use]
    pub fn into_report(self, max_days: usize) -> WeatherReport {
        let condition_summary = self
            .current_weather
            .weather_code
            .map_or("Unknown", weather_code_to_description)
            .to_string();

        WeatherReport {
            temperature_c: self.current_weather.temperature,
            precipitation_probability_pct: self.current_precipitation_probability(),
            condition_summary,
            forecast: self.daily_forecast(max_days),
        }
    }
}

pub struct OpenMeteoClient {
    client: Client,
    base_url: String,
    timezone: String,
    forecast_days: usize,
}

impl OpenMeteoClient {
    #[must_use]
    pub fn new(client: Client, base_url: impl Into<String>, timezone: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timezone: timezone.into(),
            forecast_days: DEFAULT_FORECAST_DAYS,
        }
    }

    #[must_use]
    pub fn with_forecast_days(mut self, days: usize) -> Self {
        self.forecast_days = days;
        self
    }
}

#[async_trait]
impl WeatherProvider for OpenMeteoClient {
    #[instrument(name = "open_meteo_forecast", skip(self))]
    async fn forecast(&self, lat: f64, lon: f64) -> Result<WeatherReport> {
        debug!(timezone = %self.timezone, "Open-Meteo request");
        let url = format!("{}/forecast", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("latitude", lat.to_string()),
                ("longitude", lon.to_string()),
                ("current_weather", "true".to_string()),
                ("hourly", "precipitation_probability".to_string()),
                ("daily", DAILY_FIELDS.to_string()),
                ("forecast_days", self.forecast_days.to_string()),
                ("timezone", self.timezone.clone()),
            ])
            .send()
            .await?;
        let response = check_status(response, "weather service")?;

        let forecast: ForecastResponse = response.json().await.map_err(|e| {
            TourPlanError::malformed(format!("Failed to parse Open-Meteo forecast response: {e}"))
        })?;

        let report = forecast.into_report(self.forecast_days);
        debug!(
            temperature = report.temperature_c,
            precipitation = ?report.precipitation_probability_pct,
            summary = %report.condition_summary,
            "Open-Meteo parsed"
        );
        Ok(report)
    }
}
