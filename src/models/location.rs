//! Resolved place model

use serde::{Deserialize, Serialize};

/// Which resolution tier produced a [`GeocodeResult`]
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GeocodeSource {
    /// Live geocoding lookup (direct query or alias variant)
    Primary,
    /// Built-in coordinate table
    Static,
}

impl GeocodeSource {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            GeocodeSource::Primary => "primary",
            GeocodeSource::Static => "static",
        }
    }
}

/// A place name resolved to coordinates
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct GeocodeResult {
    /// Human-readable name as reported by the source
    pub display_name: String,
    /// Latitude in decimal degrees
    pub lat: f64,
    /// Longitude in decimal degrees
    pub lon: f64,
    pub source: GeocodeSource,
}

impl GeocodeResult {
    #[must_use]
    pub fn new(display_name: impl Into<String>, lat: f64, lon: f64, source: GeocodeSource) -> Self {
        Self {
            display_name: display_name.into(),
            lat,
            lon,
            source,
        }
    }

    /// Format location as coordinates string
    #[must_use]
    pub fn format_coordinates(&self) -> String {
        format!("{:.4}, {:.4}", self.lat, self.lon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_coordinates() {
        let result = GeocodeResult::new("Paris, France", 48.8566, 2.3522, GeocodeSource::Static);
        assert_eq!(result.format_coordinates(), "48.8566, 2.3522");
    }

    #[test]
    fn test_source_serializes_lowercase() {
        let json = serde_json::to_string(&GeocodeSource::Primary).unwrap();
        assert_eq!(json, "\"primary\"");
        assert_eq!(GeocodeSource::Static.as_str(), "static");
    }
}
