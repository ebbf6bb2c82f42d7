//! Place resolution
//!
//! Resolves free text to coordinates by trying an ordered list of tiers:
//! the live geocoder, then alias variants through the same geocoder, then a
//! static coordinate table. The first tier that produces a result wins.
//! Successful resolutions are cached for a few minutes.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};

use crate::cache::{TtlCache, cache_key};
use crate::models::{GeocodeResult, GeocodeSource};
use crate::retry::RetryPolicy;
use crate::{Result, TourPlanError};

pub mod nominatim;
pub mod tables;

pub use nominatim::NominatimClient;
pub use tables::{AliasTable, StaticFallbackTable, normalize_place_key};

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);
pub const DEFAULT_RESULT_LIMIT: usize = 3;

/// One candidate from a geocoding lookup, in the provider's ranking order
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodeCandidate {
    pub display_name: String,
    pub lat: f64,
    pub lon: f64,
}

/// Forward geocoding service. An empty list means "no match".
#[async_trait]
pub trait GeocodingProvider: Send + Sync {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<GeocodeCandidate>>;
}

/// Resolution strategies, tried in the order given to the resolver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// Geocoder lookup for the text as typed
    Primary,
    /// Geocoder lookups for each alias variant of the normalized text
    Alias,
    /// Built-in coordinate table
    Static,
}

pub const DEFAULT_TIERS: [Tier; 3] = [Tier::Primary, Tier::Alias, Tier::Static];

pub struct GeocodeResolver {
    provider: Arc<dyn GeocodingProvider>,
    aliases: Arc<AliasTable>,
    static_places: Arc<StaticFallbackTable>,
    tiers: Vec<Tier>,
    retry: RetryPolicy,
    cache: TtlCache<GeocodeResult>,
    result_limit: usize,
}

impl GeocodeResolver {
    /// Resolver with the default tier order, retry policy and cache TTL.
    #[must_use]
    pub fn new(
        provider: Arc<dyn GeocodingProvider>,
        aliases: Arc<AliasTable>,
        static_places: Arc<StaticFallbackTable>,
    ) -> Self {
        Self {
            provider,
            aliases,
            static_places,
            tiers: DEFAULT_TIERS.to_vec(),
            retry: RetryPolicy::default(),
            cache: TtlCache::new(DEFAULT_CACHE_TTL),
            result_limit: DEFAULT_RESULT_LIMIT,
        }
    }

    #[must_use]
    pub fn with_tiers(mut self, tiers: Vec<Tier>) -> Self {
        self.tiers = tiers;
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache = TtlCache::new(ttl);
        self
    }

    #[must_use]
    pub fn with_result_limit(mut self, limit: usize) -> Self {
        self.result_limit = limit.max(1);
        self
    }

    /// Resolve `text` to coordinates.
    ///
    /// Blank input fails without contacting the geocoder. When no tier
    /// produces a result the error is [`TourPlanError::GeocodeFailure`].
    #[instrument(name = "resolve_place", skip(self))]
    pub async fn resolve(&self, text: &str) -> Result<GeocodeResult> {
        let key = normalize_place_key(text);
        if key.is_empty() {
            return Err(TourPlanError::validation("Empty geocode query"));
        }

        let key = key.as_str();
        self.cache
            .get_or_try_fetch(&cache_key("geocode", [key]), || {
                self.resolve_uncached(text, key)
            })
            .await
    }

    async fn resolve_uncached(&self, text: &str, key: &str) -> Result<GeocodeResult> {
        for tier in &self.tiers {
            if let Some(result) = self.try_tier(*tier, text, key).await {
                info!(
                    place = %result.display_name,
                    lat = result.lat,
                    lon = result.lon,
                    source = result.source.as_str(),
                    ?tier,
                    "Resolved place"
                );
                return Ok(result);
            }
        }
        warn!(query = text, "All resolution tiers exhausted");
        Err(TourPlanError::geocode_failure(text.trim()))
    }

    async fn try_tier(&self, tier: Tier, text: &str, key: &str) -> Option<GeocodeResult> {
        match tier {
            Tier::Primary => self.primary_lookup(text.trim()).await,
            Tier::Alias => {
                let variants = self.aliases.variants(key);
                if !variants.is_empty() {
                    info!(original = text, ?variants, "Geocode alias fallback");
                }
                for variant in variants {
                    if let Some(result) = self.primary_lookup(variant).await {
                        return Some(result);
                    }
                }
                None
            }
            Tier::Static => {
                let result = self.static_places.lookup(key);
                if result.is_some() {
                    warn!(query = text, "Using static geocode fallback");
                }
                result
            }
        }
    }

    /// One geocoder lookup under the retry policy. Exhausted retries and
    /// empty answers both mean "no candidate from this lookup".
    async fn primary_lookup(&self, query: &str) -> Option<GeocodeResult> {
        let outcome = self
            .retry
            .run(|| self.provider.search(query, self.result_limit))
            .await;

        match outcome {
            Ok(candidates) => {
                let first = candidates.into_iter().next();
                if first.is_none() {
                    debug!(query, "Geocoder returned no candidates");
                }
                first.map(|c| {
                    GeocodeResult::new(c.display_name, c.lat, c.lon, GeocodeSource::Primary)
                })
            }
            Err(e) => {
                warn!(query, error = %e, "Geocode lookup failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Geocoder answering from a fixed map and recording every query.
    #[derive(Default)]
    struct ScriptedGeocoder {
        answers: HashMap<String, Vec<GeocodeCandidate>>,
        failing: Vec<String>,
        queries: Mutex<Vec<String>>,
    }

    impl ScriptedGeocoder {
        fn answer(mut self, query: &str, name: &str, lat: f64, lon: f64) -> Self {
            self.answers.entry(query.to_string()).or_default().push(GeocodeCandidate {
                display_name: name.to_string(),
                lat,
                lon,
            });
            self
        }

        fn fail(mut self, query: &str) -> Self {
            self.failing.push(query.to_string());
            self
        }

        fn queries(&self) -> Vec<String> {
            self.queries.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl GeocodingProvider for ScriptedGeocoder {
        async fn search(&self, query: &str, _limit: usize) -> Result<Vec<GeocodeCandidate>> {
            self.queries.lock().unwrap().push(query.to_string());
            if self.failing.iter().any(|q| q == query) {
                return Err(TourPlanError::transient("Rate limited by geocoding service"));
            }
            Ok(self.answers.get(query).cloned().unwrap_or_default())
        }
    }

    fn resolver(geocoder: Arc<ScriptedGeocoder>) -> GeocodeResolver {
        let aliases = AliasTable::default().with(
            "bombay",
            vec!["mumbai".to_string(), "mumbai, india".to_string()],
        );
        let statics = StaticFallbackTable::default().with("goa", "Goa, India", 15.2993, 74.1240);
        GeocodeResolver::new(geocoder, Arc::new(aliases), Arc::new(statics))
            .with_retry(RetryPolicy::new(3, Duration::from_millis(500)))
    }

    #[tokio::test(start_paused = true)]
    async fn test_primary_tier_takes_first_candidate() {
        let geocoder = Arc::new(
            ScriptedGeocoder::default()
                .answer("Paris", "Paris, France", 48.85, 2.35)
                .answer("Paris", "Paris, Texas", 33.66, -95.55),
        );
        let result = resolver(geocoder.clone()).resolve("Paris").await.unwrap();

        assert_eq!(result.source, GeocodeSource::Primary);
        assert_eq!(result.display_name, "Paris, France");
        assert_eq!((result.lat, result.lon), (48.85, 2.35));
        assert_eq!(geocoder.queries(), ["Paris"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_alias_variants_tried_in_order() {
        let geocoder = Arc::new(
            ScriptedGeocoder::default().answer("mumbai, india", "Mumbai, India", 19.07, 72.87),
        );
        let result = resolver(geocoder.clone()).resolve("Bombay").await.unwrap();

        assert_eq!(result.source, GeocodeSource::Primary);
        assert_eq!(result.display_name, "Mumbai, India");
        assert_eq!(geocoder.queries(), ["Bombay", "mumbai", "mumbai, india"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_static_tier_returns_exact_coordinates() {
        let geocoder = Arc::new(ScriptedGeocoder::default());
        let result = resolver(geocoder).resolve("  GOA ").await.unwrap();

        assert_eq!(result.source, GeocodeSource::Static);
        assert_eq!(result.display_name, "Goa, India");
        assert_eq!((result.lat, result.lon), (15.2993, 74.1240));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_place_fails() {
        let geocoder = Arc::new(ScriptedGeocoder::default());
        let err = resolver(geocoder).resolve("Atlantis").await.unwrap_err();
        assert!(matches!(err, TourPlanError::GeocodeFailure { ref query } if query == "Atlantis"));
    }

    #[tokio::test]
    async fn test_blank_input_makes_no_upstream_call() {
        let geocoder = Arc::new(ScriptedGeocoder::default());
        let err = resolver(geocoder.clone()).resolve("   ").await.unwrap_err();
        assert!(matches!(err, TourPlanError::Validation { .. }));
        assert!(geocoder.queries().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limited_primary_is_retried_before_alias() {
        let geocoder = Arc::new(
            ScriptedGeocoder::default()
                .fail("Bombay")
                .answer("mumbai", "Mumbai, India", 19.07, 72.87),
        );
        let result = resolver(geocoder.clone()).resolve("Bombay").await.unwrap();

        assert_eq!(result.display_name, "Mumbai, India");
        assert_eq!(geocoder.queries(), ["Bombay", "Bombay", "Bombay", "mumbai"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cache_suppresses_repeat_lookups_until_expiry() {
        let geocoder =
            Arc::new(ScriptedGeocoder::default().answer("Paris", "Paris, France", 48.85, 2.35));
        let resolver = resolver(geocoder.clone());

        let first = resolver.resolve("Paris").await.unwrap();
        let second = resolver.resolve("paris ").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(geocoder.queries().len(), 1);

        tokio::time::advance(DEFAULT_CACHE_TTL + Duration::from_secs(1)).await;
        resolver.resolve("Paris").await.unwrap();
        assert_eq!(geocoder.queries().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_resolution_is_not_cached() {
        let geocoder = Arc::new(ScriptedGeocoder::default());
        let resolver = resolver(geocoder.clone());

        assert!(resolver.resolve("Atlantis").await.is_err());
        assert!(resolver.resolve("Atlantis").await.is_err());
        assert_eq!(geocoder.queries(), ["Atlantis", "Atlantis"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tier_order_is_configurable() {
        let geocoder =
            Arc::new(ScriptedGeocoder::default().answer("Goa", "Goa, India (live)", 15.3, 74.1));
        let result = resolver(geocoder.clone())
            .with_tiers(vec![Tier::Static, Tier::Primary])
            .resolve("Goa")
            .await
            .unwrap();

        assert_eq!(result.source, GeocodeSource::Static);
        assert!(geocoder.queries().is_empty());
    }
}
