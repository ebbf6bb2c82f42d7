//! Data models for `TourPlan`
//!
//! This module contains the core domain models organized by concern:
//! - Location: resolved places and where their coordinates came from
//! - Weather: current conditions and the daily forecast
//! - Place: points of interest near a location

pub mod location;
pub mod place;
pub mod weather;

// Re-export all public types for convenient access
pub use location::{GeocodeResult, GeocodeSource};
pub use place::PlaceOfInterest;
pub use weather::{DailyForecast, WeatherReport, WeatherResult};
