//! Overpass API client for tourist points of interest
//!
//! Queries attractions, parks and historic sites around a point. Ways and
//! relations are returned with their center so every result can carry a
//! coordinate.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};

use super::PoiProvider;
use crate::http::check_status;
use crate::models::PlaceOfInterest;
use crate::{Result, TourPlanError};

pub const DEFAULT_BASE_URL: &str = "https://overpass-api.de/api/interpreter";

/// Tag filters chosen for common tourist points of interest
pub const PRIORITY_FILTERS: [&str; 3] =
    ["nwr[tourism=attraction]", "nwr[leisure=park]", "nwr[historic]"];

/// Tag families checked, in order, for an element's category
const CATEGORY_KEYS: [&str; 3] = ["tourism", "leisure", "historic"];

/// Build an Overpass QL union with one `around` clause per filter.
#[must_use]
pub fn build_query(lat: f64, lon: f64, radius_m: u32) -> String {
    let clauses: Vec<String> = PRIORITY_FILTERS
        .iter()
        .map(|filter| format!("  {filter}(around:{radius_m},{lat},{lon});"))
        .collect();
    format!("[out:json][timeout:25];\n(\n{}\n);\nout center;", clauses.join("\n"))
}

#[derive(Debug, Deserialize)]
struct OverpassResponse {
    #[serde(default)]
    elements: Vec<OverpassElement>,
}

#[derive(Debug, Deserialize)]
struct Center {
    lat: f64,
    lon: f64,
}

#[derive(Debug, Deserialize)]
struct OverpassElement {
    #[serde(rename = "type")]
    kind: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
    center: Option<Center>,
    #[serde(default)]
    tags: HashMap<String, String>,
}

impl OverpassElement {
    fn name(&self) -> Option<&str> {
        self.tags
            .get("name")
            .or_else(|| self.tags.get("name:en"))
            .map(String::as_str)
            .filter(|name| !name.trim().is_empty())
    }

    fn category(&self) -> Option<String> {
        CATEGORY_KEYS
            .iter()
            .find_map(|key| self.tags.get(*key).map(|value| format!("{key}:{value}")))
    }

    fn coordinates(&self) -> (Option<f64>, Option<f64>) {
        let is_point = self.kind.as_deref() == Some("node");
        match (self.lat, self.lon, &self.center) {
            (Some(lat), Some(lon), _) if is_point || self.center.is_none() => {
                (Some(lat), Some(lon))
            }
            (_, _, Some(center)) => (Some(center.lat), Some(center.lon)),
            _ => (None, None),
        }
    }

    fn into_place(self) -> Option<PlaceOfInterest> {
        let name = self.name()?.to_string();
        let (lat, lon) = self.coordinates();
        Some(PlaceOfInterest {
            name,
            category: self.category(),
            lat,
            lon,
        })
    }
}

/// Named places from an Overpass body, first occurrence of each name kept.
fn parse_elements(response: OverpassResponse) -> Vec<PlaceOfInterest> {
    let mut seen = HashSet::new();
    response
        .elements
        .into_iter()
        .filter_map(OverpassElement::into_place)
        .filter(|place| seen.insert(place.name.clone()))
        .collect()
}

pub struct OverpassClient {
    client: Client,
    endpoint: String,
}

impl OverpassClient {
    #[must_use]
    pub fn new(client: Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl PoiProvider for OverpassClient {
    #[instrument(name = "overpass_search", skip(self))]
    async fn search(&self, lat: f64, lon: f64, radius_m: u32) -> Result<Vec<PlaceOfInterest>> {
        let query = build_query(lat, lon, radius_m);
        debug!("Overpass request dispatch");

        let response = self
            .client
            .post(&self.endpoint)
            .form(&[("data", query.as_str())])
            .send()
            .await?;
        let response = check_status(response, "places service")?;

        let body: OverpassResponse = response.json().await.map_err(|e| {
            TourPlanError::malformed(format!("Failed to parse Overpass response: {e}"))
        })?;

        let places = parse_elements(body);
        debug!(count = places.len(), "Overpass parsed");
        Ok(places)
    }
}
