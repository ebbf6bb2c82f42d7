//! Lightweight message heuristics: which place is meant and what the user
//! wants to know about it. Pattern and keyword matching only.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::TourPlanError;

/// A block of information the caller asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    Places,
    Weather,
}

impl Intent {
    pub const ALL: [Intent; 2] = [Intent::Places, Intent::Weather];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Places => "places",
            Intent::Weather => "weather",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Intent {
    type Err = TourPlanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "places" => Ok(Intent::Places),
            "weather" => Ok(Intent::Weather),
            other => Err(TourPlanError::validation(format!("Unknown intent '{other}'"))),
        }
    }
}

/// An empty request means every block.
#[must_use]
pub fn effective_intents(wanted: &BTreeSet<Intent>) -> BTreeSet<Intent> {
    if wanted.is_empty() {
        Intent::ALL.into_iter().collect()
    } else {
        wanted.clone()
    }
}

static PLACE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:in|at|for|to|about)\s+([A-Z][A-Za-z0-9'\- ]{2,})")
        .expect("place pattern is a valid regex")
});

const WEATHER_KEYWORDS: [&str; 8] = [
    "weather",
    "temperature",
    "rain",
    "sunny",
    "forecast",
    "climate",
    "hot",
    "cold",
];

const PLACES_KEYWORDS: [&str; 12] = [
    "place",
    "places",
    "attraction",
    "attractions",
    "visit",
    "tour",
    "tourist",
    "poi",
    "park",
    "about",
    "tell",
    "show",
];

/// Guess the destination named in `message`.
///
/// A preposition followed by a name ("weather in Paris") wins; otherwise all
/// capitalised words longer than two characters are joined.
#[must_use]
pub fn extract_place(message: &str) -> Option<String> {
    if let Some(found) = PLACE_PATTERN.captures(message).and_then(|c| c.get(1)) {
        let candidate = found.as_str().split_whitespace().collect::<Vec<_>>().join(" ");
        if !candidate.is_empty() {
            debug!(candidate, "Extracted place from preposition");
            return Some(candidate);
        }
    }

    let capitalised: Vec<&str> = message
        .split_whitespace()
        .filter(|word| {
            word.chars().next().is_some_and(char::is_uppercase) && word.chars().count() > 2
        })
        .collect();
    if capitalised.is_empty() {
        debug!("No place extracted");
        return None;
    }

    let candidate = capitalised.join(" ");
    debug!(candidate, "Extracted place from capitalised words");
    Some(candidate)
}

/// Keyword-based intent detection. An ambiguous message yields an empty set.
#[must_use]
pub fn detect_intents(message: &str) -> BTreeSet<Intent> {
    let lowered = message.to_lowercase();
    let mut intents = BTreeSet::new();
    if WEATHER_KEYWORDS.iter().any(|k| lowered.contains(k)) {
        intents.insert(Intent::Weather);
    }
    if PLACES_KEYWORDS.iter().any(|k| lowered.contains(k)) {
        intents.insert(Intent::Places);
    }
    debug!(?intents, "Detected intents");
    intents
}
