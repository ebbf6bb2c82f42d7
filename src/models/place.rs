//! Point-of-interest model

use serde::{Deserialize, Serialize};

/// A named attraction, park or historic site
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PlaceOfInterest {
    pub name: String,
    /// Matched tag family and value, e.g. `tourism:attraction`
    pub category: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

impl PlaceOfInterest {
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: None,
            lat: None,
            lon: None,
        }
    }
}
