//! Request orchestration: resolve a place, fan out to the weather and places
//! fetchers concurrently, then compose one result with a short summary.
//!
//! Only a failed resolution ends a request early. Fetcher failures become
//! lines in [`OrchestrationResult::errors`] and never affect the sibling.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use futures::future::OptionFuture;
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::{Result, TourPlanError};
use crate::config::TourPlanConfig;
use crate::geocode::{AliasTable, GeocodeResolver, NominatimClient, StaticFallbackTable};
use crate::http::build_client;
use crate::intent::{Intent, effective_intents};
use crate::models::{GeocodeResult, GeocodeSource, PlaceOfInterest, WeatherReport, WeatherResult};
use crate::places::{OverpassClient, PlacesFetcher, UNAVAILABLE_MESSAGE as PLACES_UNAVAILABLE};
use crate::retry::RetryPolicy;
use crate::weather::{OpenMeteoClient, WeatherFetcher};

pub const NO_DESTINATION_ERROR: &str = "No destination specified";
pub const NO_DESTINATION_TEXT: &str =
    "I couldn't identify a destination in your message. Please specify a city or place.";

/// Everything one request produced
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct OrchestrationResult {
    /// Resolved display name, or the candidate text when resolution failed
    pub place: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub geocode_source: Option<GeocodeSource>,
    pub weather: Option<WeatherReport>,
    /// Place names in discovery order
    pub places: Option<Vec<String>>,
    /// Same places with category and coordinates
    pub places_geo: Option<Vec<PlaceOfInterest>>,
    /// Natural-language summary
    pub text: String,
    pub errors: Vec<String>,
}

impl OrchestrationResult {
    fn no_destination() -> Self {
        Self {
            place: None,
            lat: None,
            lon: None,
            geocode_source: None,
            weather: None,
            places: None,
            places_geo: None,
            text: NO_DESTINATION_TEXT.to_string(),
            errors: vec![NO_DESTINATION_ERROR.to_string()],
        }
    }

    fn unresolved(candidate: &str, error: &TourPlanError) -> Self {
        Self {
            place: Some(candidate.to_string()),
            lat: None,
            lon: None,
            geocode_source: None,
            weather: None,
            places: None,
            places_geo: None,
            text: error.user_message(),
            errors: vec![format!("Location '{candidate}' not found")],
        }
    }
}

pub struct Orchestrator {
    resolver: GeocodeResolver,
    weather: WeatherFetcher,
    places: PlacesFetcher,
}

impl Orchestrator {
    #[must_use]
    pub fn new(resolver: GeocodeResolver, weather: WeatherFetcher, places: PlacesFetcher) -> Self {
        Self {
            resolver,
            weather,
            places,
        }
    }

    /// Build every collaborator against the real upstream services.
    pub fn from_config(config: &TourPlanConfig) -> Result<Self> {
        let user_agent = config.http.user_agent.as_str();

        let geocoding = &config.geocoding;
        let geocoder = NominatimClient::new(
            build_client(user_agent, Duration::from_secs(geocoding.timeout_seconds))?,
            geocoding.base_url.clone(),
        );
        let resolver = GeocodeResolver::new(
            Arc::new(geocoder),
            Arc::new(AliasTable::builtin()),
            Arc::new(StaticFallbackTable::builtin()),
        )
        .with_retry(RetryPolicy::from(&geocoding.retry))
        .with_cache_ttl(Duration::from_secs(geocoding.cache_ttl_seconds))
        .with_result_limit(geocoding.result_limit);

        let weather_cfg = &config.weather;
        let weather_timeout = Duration::from_secs(weather_cfg.timeout_seconds);
        let forecast = OpenMeteoClient::new(
            build_client(user_agent, weather_timeout)?,
            weather_cfg.base_url.clone(),
            weather_cfg.timezone.clone(),
        )
        .with_forecast_days(weather_cfg.forecast_days);
        let weather = WeatherFetcher::new(Arc::new(forecast))
            .with_retry(RetryPolicy::from(&weather_cfg.retry))
            .with_timeout(weather_timeout);

        let places_cfg = &config.places;
        let places_timeout = Duration::from_secs(places_cfg.timeout_seconds);
        let overpass = OverpassClient::new(
            build_client(user_agent, places_timeout)?,
            places_cfg.base_url.clone(),
        );
        let places = PlacesFetcher::new(Arc::new(overpass))
            .with_settings(places_cfg.search_settings())
            .with_retry(RetryPolicy::from(&places_cfg.retry))
            .with_timeout(places_timeout)
            .with_cache_ttl(Duration::from_secs(places_cfg.cache_ttl_seconds));

        info!(
            geocoder = %geocoding.base_url,
            weather = %weather_cfg.base_url,
            places = %places_cfg.base_url,
            "Orchestrator configured"
        );
        Ok(Self::new(resolver, weather, places))
    }

    /// Produce a result for `candidate`. An empty `wanted` set means every
    /// intent.
    #[instrument(skip(self))]
    pub async fn orchestrate(
        &self,
        candidate: Option<&str>,
        wanted: &BTreeSet<Intent>,
    ) -> OrchestrationResult {
        let Some(candidate) = candidate.map(str::trim).filter(|c| !c.is_empty()) else {
            warn!("No place candidate provided");
            return OrchestrationResult::no_destination();
        };

        let resolved = match self.resolver.resolve(candidate).await {
            Ok(resolved) => resolved,
            Err(e) => {
                info!(candidate, error = %e, "Place unresolved");
                return OrchestrationResult::unresolved(candidate, &e);
            }
        };

        let wanted = effective_intents(wanted);
        let (lat, lon) = (resolved.lat, resolved.lon);

        let weather_task: OptionFuture<_> = wanted
            .contains(&Intent::Weather)
            .then(|| self.weather.fetch(lat, lon))
            .into();
        let places_task: OptionFuture<_> = wanted
            .contains(&Intent::Places)
            .then(|| self.places.fetch(lat, lon))
            .into();
        let (weather, places) = tokio::join!(weather_task, places_task);

        let mut errors = Vec::new();

        let weather = match weather {
            Some(WeatherResult::Report(report)) => Some(report),
            Some(WeatherResult::Unavailable { error_message }) => {
                errors.push(error_message);
                None
            }
            None => None,
        };

        let places = match places {
            Some(Ok(found)) => Some(found),
            Some(Err(e)) => {
                warn!(error = %e, "Places fetch failed");
                errors.push(PLACES_UNAVAILABLE.to_string());
                None
            }
            None => None,
        };

        let text = compose_summary(&resolved, weather.as_ref(), places.as_deref());
        info!(
            place = %resolved.display_name,
            coordinates = %resolved.format_coordinates(),
            have_weather = weather.is_some(),
            places_count = places.as_ref().map_or(0, Vec::len),
            errors = errors.len(),
            "Orchestration complete"
        );

        OrchestrationResult {
            place: Some(resolved.display_name),
            lat: Some(lat),
            lon: Some(lon),
            geocode_source: Some(resolved.source),
            weather,
            places: places
                .as_ref()
                .map(|found| found.iter().map(|p| p.name.clone()).collect()),
            places_geo: places,
            text,
            errors,
        }
    }
}

fn weather_sentence(report: &WeatherReport) -> String {
    let temperature = report.format_temperature();
    match report.precipitation_probability_pct {
        Some(pct) => {
            format!("It's currently {temperature} with a {pct}% chance of precipitation.")
        }
        None => format!("Current temperature is {temperature}."),
    }
}

fn compose_summary(
    resolved: &GeocodeResult,
    weather: Option<&WeatherReport>,
    places: Option<&[PlaceOfInterest]>,
) -> String {
    let mut parts = Vec::new();
    if let Some(report) = weather {
        parts.push(weather_sentence(report));
    }
    if let Some(found) = places.filter(|found| !found.is_empty()) {
        let names: Vec<&str> = found.iter().map(|p| p.name.as_str()).collect();
        parts.push(format!("Places you can visit: {}.", names.join(", ")));
    }
    if parts.is_empty() {
        return format!("No data available for {}.", resolved.display_name);
    }
    parts.join(" ")
}
