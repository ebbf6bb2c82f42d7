//! `TourPlan` - Tourism planning orchestrator
//!
//! Resolves a free-text destination to coordinates through a tiered
//! geocoder, then fetches weather and nearby points of interest
//! concurrently and composes a short natural-language summary.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod geocode;
pub mod http;
pub mod intent;
pub mod models;
pub mod orchestrator;
pub mod places;
pub mod retry;
pub mod telemetry;
pub mod weather;
pub mod web;

// Re-export core types for public API
pub use cache::TtlCache;
pub use config::TourPlanConfig;
pub use error::TourPlanError;
pub use geocode::{GeocodeResolver, GeocodingProvider};
pub use intent::Intent;
pub use models::{GeocodeResult, GeocodeSource, PlaceOfInterest, WeatherReport, WeatherResult};
pub use orchestrator::{OrchestrationResult, Orchestrator};
pub use places::{PlacesFetcher, PoiProvider};
pub use retry::RetryPolicy;
pub use weather::{WeatherFetcher, WeatherProvider};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, TourPlanError>;
