//! Nearby points of interest with adaptive search radius
//!
//! A search starts at the default radius. When it finds fewer places than
//! the limit, the radius is multiplied and the search repeated, up to a fixed
//! number of expansions. Results are merged by name, first occurrence wins,
//! and the merged list is truncated to the limit in discovery order.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::cache::{TtlCache, cache_key};
use crate::models::PlaceOfInterest;
use crate::retry::RetryPolicy;
use crate::{Result, TourPlanError};

pub mod overpass;

pub use overpass::OverpassClient;

pub const DEFAULT_RADIUS_M: u32 = 5000;
pub const RADIUS_EXPANSION_FACTOR: u32 = 2;
pub const MAX_EXPANSIONS: u32 = 1;
pub const POI_LIMIT: usize = 5;
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(600);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const UNAVAILABLE_MESSAGE: &str = "Places service temporarily unavailable";

/// Points of interest within `radius_m` metres of a coordinate
#[async_trait]
pub trait PoiProvider: Send + Sync {
    async fn search(&self, lat: f64, lon: f64, radius_m: u32) -> Result<Vec<PlaceOfInterest>>;
}

/// Radius expansion settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchSettings {
    pub initial_radius_m: u32,
    pub expansion_factor: u32,
    pub max_expansions: u32,
    pub limit: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            initial_radius_m: DEFAULT_RADIUS_M,
            expansion_factor: RADIUS_EXPANSION_FACTOR,
            max_expansions: MAX_EXPANSIONS,
            limit: POI_LIMIT,
        }
    }
}

pub struct PlacesFetcher {
    provider: Arc<dyn PoiProvider>,
    settings: SearchSettings,
    retry: RetryPolicy,
    timeout: Duration,
    cache: TtlCache<Vec<PlaceOfInterest>>,
}

impl PlacesFetcher {
    #[must_use]
    pub fn new(provider: Arc<dyn PoiProvider>) -> Self {
        Self {
            provider,
            settings: SearchSettings::default(),
            retry: RetryPolicy::new(3, Duration::from_millis(400)),
            timeout: DEFAULT_TIMEOUT,
            cache: TtlCache::new(DEFAULT_CACHE_TTL),
        }
    }

    #[must_use]
    pub fn with_settings(mut self, settings: SearchSettings) -> Self {
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache = TtlCache::new(ttl);
        self
    }

    /// Collect up to `limit` places around the coordinate.
    ///
    /// Issues at most `max_expansions + 1` searches. A failure of the first
    /// search is returned; a failure while expanding keeps what was found.
    #[instrument(name = "fetch_places", skip(self))]
    pub async fn fetch(&self, lat: f64, lon: f64) -> Result<Vec<PlaceOfInterest>> {
        let SearchSettings {
            initial_radius_m,
            expansion_factor,
            max_expansions,
            limit,
        } = self.settings;

        let mut radius = initial_radius_m;
        let mut round = 0;
        let mut seen: HashSet<String> = HashSet::new();
        let mut collected: Vec<PlaceOfInterest> = Vec::new();

        loop {
            debug!(radius, round, "Places fetch attempt");
            match self.fetch_round(lat, lon, radius).await {
                Ok(found) => {
                    for place in found {
                        if seen.insert(place.name.clone()) {
                            collected.push(place);
                        }
                    }
                }
                Err(e) if round == 0 => return Err(e),
                Err(e) => {
                    warn!(radius, error = %e, "Places expansion failed, keeping earlier results");
                    break;
                }
            }

            if collected.len() >= limit || round >= max_expansions {
                break;
            }
            radius = radius.saturating_mul(expansion_factor);
            round += 1;
        }

        collected.truncate(limit);
        debug!(count = collected.len(), "Places final");
        Ok(collected)
    }

    /// One cached, retried search at a fixed radius.
    async fn fetch_round(&self, lat: f64, lon: f64, radius_m: u32) -> Result<Vec<PlaceOfInterest>> {
        let key = cache_key(
            "places",
            [format!("{lat:.6}"), format!("{lon:.6}"), radius_m.to_string()],
        );
        self.cache
            .get_or_try_fetch(&key, || {
                self.retry.run(|| async move {
                    tokio::time::timeout(self.timeout, self.provider.search(lat, lon, radius_m))
                        .await
                        .unwrap_or_else(|_| {
                            Err(TourPlanError::transient(format!(
                                "Places request timed out after {:?}",
                                self.timeout
                            )))
                        })
                })
            })
            .await
    }
}
