//! Built-in lookup tables for place resolution.
//!
//! Both tables are keyed by the normalized place name (trimmed, lowercase)
//! and are read-only once constructed.

use std::collections::HashMap;

use crate::models::{GeocodeResult, GeocodeSource};

/// Normalize free text for table lookups and cache keys.
#[must_use]
pub fn normalize_place_key(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

const BUILTIN_ALIASES: &[(&str, &[&str])] = &[
    ("bangalore", &["bengaluru", "bengaluru, india"]),
    ("bengaluru", &["bengaluru, india", "bengaluru, karnataka"]),
    ("bombay", &["mumbai", "mumbai, india"]),
    ("calcutta", &["kolkata", "kolkata, india"]),
    ("madras", &["chennai", "chennai, india"]),
    ("peking", &["beijing", "beijing, china"]),
    ("saigon", &["ho chi minh city", "ho chi minh city, vietnam"]),
    ("paris", &["paris, france"]),
    ("london", &["london, uk", "london, united kingdom"]),
    ("tokyo", &["tokyo, japan"]),
    ("new york", &["new york, usa", "new york city"]),
    ("goa", &["goa, india"]),
];

const BUILTIN_STATIC: &[(&str, &str, f64, f64)] = &[
    ("bengaluru", "Bengaluru, India", 12.9716, 77.5946),
    ("bangalore", "Bengaluru, India", 12.9716, 77.5946),
    ("goa", "Goa, India", 15.2993, 74.1240),
    ("mumbai", "Mumbai, India", 19.0760, 72.8777),
    ("delhi", "Delhi, India", 28.6139, 77.2090),
    ("paris", "Paris, France", 48.8566, 2.3522),
    ("london", "London, United Kingdom", 51.5072, -0.1276),
    ("tokyo", "Tokyo, Japan", 35.6762, 139.6503),
    ("new york", "New York City, USA", 40.7128, -74.0060),
];

/// Alternate query strings to try when the direct lookup finds nothing
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    entries: HashMap<String, Vec<String>>,
}

impl AliasTable {
    #[must_use]
    pub fn builtin() -> Self {
        BUILTIN_ALIASES
            .iter()
            .map(|(key, variants)| {
                (
                    *key,
                    variants.iter().map(|v| v.to_string()).collect::<Vec<_>>(),
                )
            })
            .collect()
    }

    #[must_use]
    pub fn with(mut self, key: &str, variants: Vec<String>) -> Self {
        self.entries.insert(normalize_place_key(key), variants);
        self
    }

    /// Variants for a normalized key, in the order they should be tried
    #[must_use]
    pub fn variants(&self, key: &str) -> &[String] {
        self.entries.get(key).map(Vec::as_slice).unwrap_or_default()
    }
}

impl<'a> FromIterator<(&'a str, Vec<String>)> for AliasTable {
    fn from_iter<T: IntoIterator<Item = (&'a str, Vec<String>)>>(iter: T) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(key, variants)| (normalize_place_key(key), variants))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct StaticPlace {
    display_name: String,
    lat: f64,
    lon: f64,
}

/// Last-resort coordinates for well-known places
#[derive(Debug, Clone, Default)]
pub struct StaticFallbackTable {
    entries: HashMap<String, StaticPlace>,
}

impl StaticFallbackTable {
    #[must_use]
    pub fn builtin() -> Self {
        let mut table = Self::default();
        for (key, name, lat, lon) in BUILTIN_STATIC {
            table = table.with(key, name, *lat, *lon);
        }
        table
    }

    #[must_use]
    pub fn with(mut self, key: &str, display_name: &str, lat: f64, lon: f64) -> Self {
        self.entries.insert(
            normalize_place_key(key),
            StaticPlace {
                display_name: display_name.to_string(),
                lat,
                lon,
            },
        );
        self
    }

    /// Result tagged [`GeocodeSource::Static`] for a normalized key
    #[must_use]
    pub fn lookup(&self, key: &str) -> Option<GeocodeResult> {
        self.entries.get(key).map(|place| {
            GeocodeResult::new(
                place.display_name.clone(),
                place.lat,
                place.lon,
                GeocodeSource::Static,
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Paris", "paris")]
    #[case("  New   York ", "new york")]
    #[case("BANGALORE\t", "bangalore")]
    #[case("   ", "")]
    fn test_normalize_place_key(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(normalize_place_key(input), expected);
    }

    #[test]
    fn test_builtin_aliases_keep_order() {
        let aliases = AliasTable::builtin();
        assert_eq!(aliases.variants("bombay"), ["mumbai", "mumbai, india"]);
        assert!(aliases.variants("atlantis").is_empty());
    }

    #[test]
    fn test_builtin_static_lookup() {
        let table = StaticFallbackTable::builtin();
        let paris = table.lookup("paris").unwrap();
        assert_eq!(paris.display_name, "Paris, France");
        assert_eq!(paris.lat, 48.8566);
        assert_eq!(paris.lon, 2.3522);
        assert_eq!(paris.source, GeocodeSource::Static);
        assert!(table.lookup("atlantis").is_none());
    }

    #[test]
    fn test_custom_entries_are_normalized() {
        let table = StaticFallbackTable::default().with("  Rivendell ", "Rivendell", 1.0, 2.0);
        assert!(table.lookup("rivendell").is_some());

        let aliases = AliasTable::default().with("Gondor", vec!["minas tirith".into()]);
        assert_eq!(aliases.variants("gondor"), ["minas tirith"]);
    }
}
