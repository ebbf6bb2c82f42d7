//! Nominatim (OpenStreetMap) forward geocoding client

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, instrument};

use super::{GeocodeCandidate, GeocodingProvider};
use crate::http::check_status;
use crate::{Result, TourPlanError};

pub const DEFAULT_BASE_URL: &str = "https://nominatim.openstreetmap.org";

/// Ask for a few extra rows so duplicates can be dropped
const REQUEST_LIMIT: usize = 5;

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    display_name: Option<String>,
    lat: Option<Value>,
    lon: Option<Value>,
}

/// Nominatim returns coordinates as strings; accept numbers too.
fn parse_coordinate(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::String(s) => s.trim().parse().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

pub struct NominatimClient {
    client: Client,
    base_url: String,
}

impl NominatimClient {
    #[must_use]
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn parse_candidates(body: Value, limit: usize) -> Result<Vec<GeocodeCandidate>> {
        let Value::Array(items) = body else {
            return Err(TourPlanError::malformed(
                "Geocoding service returned unexpected data shape",
            ));
        };

        let mut candidates: Vec<GeocodeCandidate> = Vec::new();
        for item in items {
            let Ok(place) = serde_json::from_value::<NominatimPlace>(item) else {
                continue;
            };
            let Some(name) = place.display_name.filter(|n| !n.is_empty()) else {
                continue;
            };
            if candidates.iter().any(|c| c.display_name == name) {
                continue;
            }
            let (Some(lat), Some(lon)) = (
                parse_coordinate(place.lat.as_ref()),
                parse_coordinate(place.lon.as_ref()),
            ) else {
                continue;
            };
            candidates.push(GeocodeCandidate {
                display_name: name,
                lat,
                lon,
            });
            if candidates.len() >= limit {
                break;
            }
        }
        Ok(candidates)
    }
}

#[async_trait]
impl GeocodingProvider for NominatimClient {
    #[instrument(name = "nominatim_search", skip(self))]
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<GeocodeCandidate>> {
        info!("Geocode request");
        let url = format!("{}/search", self.base_url);
        let request_limit = REQUEST_LIMIT.max(limit).to_string();

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .query(&[
                ("q", query),
                ("format", "json"),
                ("addressdetails", "0"),
                ("limit", request_limit.as_str()),
            ])
            .send()
            .await?;
        let response = check_status(response, "geocoding service")?;

        let body: Value = response.json().await.map_err(|e| {
            TourPlanError::malformed(format!("Failed to parse geocoding response: {e}"))
        })?;

        let candidates = Self::parse_candidates(body, limit)?;
        debug!(count = candidates.len(), "Geocode parsed");
        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> NominatimClient {
        NominatimClient::new(Client::new(), server.uri())
    }

    #[test]
    fn test_parse_skips_unusable_rows() {
        let body = json!([
            {"display_name": "Paris, France", "lat": "48.8566", "lon": "2.3522"},
            {"display_name": "Paris, France", "lat": "1.0", "lon": "1.0"},
            {"lat": "1.0", "lon": "1.0"},
            {"display_name": "Broken", "lat": "north", "lon": "2.0"},
            {"display_name": "Paris, Texas", "lat": 33.66, "lon": -95.55},
        ]);
        let candidates = NominatimClient::parse_candidates(body, 3).unwrap();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].display_name, "Paris, France");
        assert_eq!(candidates[0].lat, 48.8566);
        assert_eq!(candidates[1].display_name, "Paris, Texas");
    }

    #[test]
    fn test_parse_respects_limit() {
        let body = json!([
            {"display_name": "A", "lat": "1", "lon": "1"},
            {"display_name": "B", "lat": "2", "lon": "2"},
            {"display_name": "C", "lat": "3", "lon": "3"},
        ]);
        let candidates = NominatimClient::parse_candidates(body, 2).unwrap();
        assert_eq!(candidates.len(), 2);
    }

    #[test]
    fn test_parse_rejects_non_list() {
        let err = NominatimClient::parse_candidates(json!({"error": "nope"}), 3).unwrap_err();
        assert!(matches!(err, TourPlanError::MalformedResponse { .. }));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_search_sends_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("q", "Paris"))
            .and(query_param("format", "json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {
                    "display_name": "Paris, Île-de-France, France",
                    "lat": "48.8588897",
                    "lon": "2.3200410"
                }
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let candidates = client_for(&server).search("Paris", 3).await.unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].lon, 2.3200410);
    }

    #[tokio::test]
    async fn test_rate_limit_is_transient() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let err = client_for(&server).search("Paris", 3).await.unwrap_err();
        assert!(matches!(err, TourPlanError::Transient { .. }));
    }

    #[tokio::test]
    async fn test_empty_list_is_not_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let candidates = client_for(&server).search("Atlantis", 3).await.unwrap();
        assert!(candidates.is_empty());
    }
}
