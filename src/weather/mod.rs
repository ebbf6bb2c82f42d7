//! Weather lookups for resolved coordinates
//!
//! [`WeatherFetcher`] never returns an error: after the retry budget is spent
//! it reports [`WeatherResult::Unavailable`] with a fixed message, so callers
//! see the same text whatever the underlying cause was.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{instrument, warn};

use crate::models::{WeatherReport, WeatherResult};
use crate::retry::RetryPolicy;
use crate::{Result, TourPlanError};

pub mod open_meteo;

pub use open_meteo::OpenMeteoClient;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const UNAVAILABLE_MESSAGE: &str = "Weather service temporarily unavailable";

/// Current conditions plus a short daily outlook for a coordinate
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn forecast(&self, lat: f64, lon: f64) -> Result<WeatherReport>;
}

pub struct WeatherFetcher {
    provider: Arc<dyn WeatherProvider>,
    retry: RetryPolicy,
    timeout: Duration,
}

impl WeatherFetcher {
    #[must_use]
    pub fn new(provider: Arc<dyn WeatherProvider>) -> Self {
        Self {
            provider,
            retry: RetryPolicy::new(3, Duration::from_millis(500)),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Per-attempt time limit; an attempt that runs over counts as a
    /// retryable failure.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[instrument(name = "fetch_weather", skip(self))]
    pub async fn fetch(&self, lat: f64, lon: f64) -> WeatherResult {
        let outcome = self
            .retry
            .run(|| async move {
                match tokio::time::timeout(self.timeout, self.provider.forecast(lat, lon)).await {
                    Ok(result) => result,
                    Err(_) => Err(TourPlanError::transient(format!(
                        "Weather request timed out after {:?}",
                        self.timeout
                    ))),
                }
            })
            .await;

        match outcome {
            Ok(report) => WeatherResult::Report(report),
            Err(e) => {
                warn!(error = %e, "Weather fetch failed");
                WeatherResult::Unavailable {
                    error_message: UNAVAILABLE_MESSAGE.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    fn report() -> WeatherReport {
        WeatherReport {
            temperature_c: 24.0,
            precipitation_probability_pct: Some(20),
            condition_summary: "Clear".into(),
            forecast: vec![],
        }
    }

    struct FlakyWeather {
        failures_before_success: u32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl WeatherProvider for FlakyWeather {
        async fn forecast(&self, _lat: f64, _lon: f64) -> Result<WeatherReport> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call <= self.failures_before_success {
                Err(TourPlanError::transient("connection reset by peer"))
            } else {
                Ok(report())
            }
        }
    }

    struct HangingWeather {
        calls: AtomicU32,
    }

    #[async_trait]
    impl WeatherProvider for HangingWeather {
        async fn forecast(&self, _lat: f64, _lon: f64) -> Result<WeatherReport> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(report())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_from_transient_failures() {
        let provider = Arc::new(FlakyWeather {
            failures_before_success: 2,
            calls: AtomicU32::new(0),
        });
        let result = WeatherFetcher::new(provider.clone()).fetch(12.97, 77.59).await;

        assert_eq!(result, WeatherResult::Report(report()));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_yield_fixed_message() {
        let provider = Arc::new(FlakyWeather {
            failures_before_success: u32::MAX,
            calls: AtomicU32::new(0),
        });
        let result = WeatherFetcher::new(provider.clone()).fetch(12.97, 77.59).await;

        assert_eq!(result.error_message(), Some(UNAVAILABLE_MESSAGE));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_counts_as_retryable_failure() {
        let provider = Arc::new(HangingWeather {
            calls: AtomicU32::new(0),
        });
        let start = Instant::now();
        let result = WeatherFetcher::new(provider.clone()).fetch(0.0, 0.0).await;

        assert!(result.report().is_none());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
        // three 10s timeouts plus 0.5s and 1s of backoff
        assert_eq!(start.elapsed(), Duration::from_millis(31_500));
    }
}
