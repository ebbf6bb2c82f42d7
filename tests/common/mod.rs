//! Counting fakes for the three upstream services

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tourplan::geocode::{AliasTable, GeocodeCandidate, StaticFallbackTable};
use tourplan::{
    GeocodeResolver, GeocodingProvider, Orchestrator, PlaceOfInterest, PlacesFetcher, PoiProvider,
    Result, TourPlanError, WeatherFetcher, WeatherProvider, WeatherReport,
};

#[derive(Default)]
pub struct FakeGeocoder {
    known: HashMap<String, (String, f64, f64)>,
    pub calls: AtomicU32,
}

impl FakeGeocoder {
    pub fn knowing(mut self, query: &str, display_name: &str, lat: f64, lon: f64) -> Self {
        self.known
            .insert(query.to_string(), (display_name.to_string(), lat, lon));
        self
    }
}

#[async_trait]
impl GeocodingProvider for FakeGeocoder {
    async fn search(&self, query: &str, _limit: usize) -> Result<Vec<GeocodeCandidate>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .known
            .get(query)
            .map(|(name, lat, lon)| GeocodeCandidate {
                display_name: name.clone(),
                lat: *lat,
                lon: *lon,
            })
            .into_iter()
            .collect())
    }
}

pub struct FakeWeather {
    report: Option<WeatherReport>,
    latency: Duration,
    pub calls: AtomicU32,
}

impl FakeWeather {
    pub fn sunny() -> Self {
        Self {
            report: Some(WeatherReport {
                temperature_c: 21.3,
                precipitation_probability_pct: Some(10),
                condition_summary: "Clear sky".into(),
                forecast: vec![],
            }),
            latency: Duration::ZERO,
            calls: AtomicU32::new(0),
        }
    }

    pub fn down() -> Self {
        Self {
            report: None,
            latency: Duration::ZERO,
            calls: AtomicU32::new(0),
        }
    }

    /// Answer only after `latency` has passed
    pub fn slow(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }
}

#[async_trait]
impl WeatherProvider for FakeWeather {
    async fn forecast(&self, _lat: f64, _lon: f64) -> Result<WeatherReport> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.report
            .clone()
            .ok_or_else(|| TourPlanError::transient("connection refused"))
    }
}

pub struct FakePlaces {
    names: Option<Vec<&'static str>>,
    latency: Duration,
    pub calls: AtomicU32,
}

impl FakePlaces {
    pub fn with(names: &[&'static str]) -> Self {
        Self {
            names: Some(names.to_vec()),
            latency: Duration::ZERO,
            calls: AtomicU32::new(0),
        }
    }

    pub fn down() -> Self {
        Self {
            names: None,
            latency: Duration::ZERO,
            calls: AtomicU32::new(0),
        }
    }

    pub fn slow(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }
}

#[async_trait]
impl PoiProvider for FakePlaces {
    async fn search(&self, _lat: f64, _lon: f64, _radius_m: u32) -> Result<Vec<PlaceOfInterest>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        match &self.names {
            Some(names) => Ok(names.iter().map(|n| PlaceOfInterest::named(*n)).collect()),
            None => Err(TourPlanError::transient("gateway timeout")),
        }
    }
}

pub struct Harness {
    pub geocoder: Arc<FakeGeocoder>,
    pub weather: Arc<FakeWeather>,
    pub places: Arc<FakePlaces>,
    pub orchestrator: Orchestrator,
}

impl Harness {
    pub fn calls(counter: &AtomicU32) -> u32 {
        counter.load(Ordering::SeqCst)
    }
}

/// Orchestrator over fakes, with no alias entries and one static entry
pub fn harness(geocoder: FakeGeocoder, weather: FakeWeather, places: FakePlaces) -> Harness {
    let geocoder = Arc::new(geocoder);
    let weather = Arc::new(weather);
    let places = Arc::new(places);

    let resolver = GeocodeResolver::new(
        geocoder.clone(),
        Arc::new(AliasTable::default()),
        Arc::new(StaticFallbackTable::default().with("goa", "Goa, India", 15.2993, 74.124)),
    );
    let orchestrator = Orchestrator::new(
        resolver,
        WeatherFetcher::new(weather.clone()),
        PlacesFetcher::new(places.clone()),
    );

    Harness {
        geocoder,
        weather,
        places,
        orchestrator,
    }
}

pub fn paris_geocoder() -> FakeGeocoder {
    FakeGeocoder::default().knowing("Paris", "Paris, Île-de-France, France", 48.8566, 2.3522)
}
