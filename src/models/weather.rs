//! Weather model for current conditions and the daily outlook

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One day of the short-range forecast
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DailyForecast {
    pub date: NaiveDate,
    /// Maximum temperature in Celsius
    pub temp_max: Option<f64>,
    /// Minimum temperature in Celsius
    pub temp_min: Option<f64>,
    pub precipitation_probability_pct: Option<u8>,
    pub condition_summary: Option<String>,
}

/// Successful weather lookup
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct WeatherReport {
    /// Current temperature in Celsius
    pub temperature_c: f64,
    /// Precipitation probability for the current hour, `None` when the
    /// hourly series has no entry for the current timestamp
    pub precipitation_probability_pct: Option<u8>,
    pub condition_summary: String,
    pub forecast: Vec<DailyForecast>,
}

impl WeatherReport {
    /// Format temperature with unit
    #[must_use]
    pub fn format_temperature(&self) -> String {
        format!("{:.0}°C", self.temperature_c)
    }
}

/// Outcome of a weather fetch; failures carry a fixed user-facing message
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum WeatherResult {
    Report(WeatherReport),
    Unavailable { error_message: String },
}

impl WeatherResult {
    #[must_use]
    pub fn report(&self) -> Option<&WeatherReport> {
        match self {
            WeatherResult::Report(report) => Some(report),
            WeatherResult::Unavailable { .. } => None,
        }
    }

    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        match self {
            WeatherResult::Report(_) => None,
            WeatherResult::Unavailable { error_message } => Some(error_message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_temperature() {
        let report = WeatherReport {
            temperature_c: 21.6,
            precipitation_probability_pct: Some(10),
            condition_summary: "Clear".into(),
            forecast: vec![],
        };
        assert_eq!(report.format_temperature(), "22°C");
    }

    #[test]
    fn test_result_accessors() {
        let failed = WeatherResult::Unavailable {
            error_message: "down".into(),
        };
        assert!(failed.report().is_none());
        assert_eq!(failed.error_message(), Some("down"));
    }
}
