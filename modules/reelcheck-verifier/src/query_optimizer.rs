//! Claim text → validated search configuration.
//!
//! The planner's output is untrusted. Every field is checked against an
//! allow-list here and replaced with its default on violation, so nothing
//! unvalidated reaches a `WebSearcher`.

use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::traits::QueryPlanner;

pub const REGIONS: &[&str] = &[
    "us-en", "uk-en", "ca-en", "au-en", "de-de", "fr-fr", "es-es", "it-it", "ru-ru", "cn-zh",
    "jp-jp", "kr-kr", "in-en", "br-pt", "mx-es", "ar-es", "nl-nl", "se-sv", "no-no", "dk-da",
    "fi-fi", "pl-pl", "wt-wt",
];
pub const DEFAULT_REGION: &str = "us-en";

pub const BACKENDS: &[&str] = &[
    "auto",
    "bing",
    "brave",
    "duckduckgo",
    "google",
    "mojeek",
    "mullvad_brave",
    "mullvad_google",
    "yandex",
    "yahoo",
    "wikipedia",
];
pub const DEFAULT_BACKEND: &str = "auto";

pub const DEFAULT_MAX_RESULTS: u32 = 10;
pub const MAX_RESULTS_RANGE: (u32, u32) = (1, 200);

// --- Validated config ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SafeSearch {
    On,
    #[default]
    Moderate,
    Off,
}

impl SafeSearch {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "on" => Some(SafeSearch::On),
            "moderate" => Some(SafeSearch::Moderate),
            "off" => Some(SafeSearch::Off),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeLimit {
    #[serde(rename = "d")]
    Day,
    #[serde(rename = "w")]
    Week,
    #[serde(rename = "m")]
    Month,
    #[serde(rename = "y")]
    Year,
}

impl TimeLimit {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "d" => Some(TimeLimit::Day),
            "w" => Some(TimeLimit::Week),
            "m" => Some(TimeLimit::Month),
            "y" => Some(TimeLimit::Year),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            TimeLimit::Day => "d",
            TimeLimit::Week => "w",
            TimeLimit::Month => "m",
            TimeLimit::Year => "y",
        }
    }
}

/// Search parameters that passed validation. Only constructible through
/// [`SearchConfig::validate`] or [`SearchConfig::default_for`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchConfig {
    query: String,
    region: &'static str,
    safesearch: SafeSearch,
    time_limit: Option<TimeLimit>,
    max_results: u32,
    backend: String,
}

impl SearchConfig {
    /// Safe defaults around the trimmed text.
    pub fn default_for(text: &str) -> Self {
        Self {
            query: text.trim().to_string(),
            region: DEFAULT_REGION,
            safesearch: SafeSearch::default(),
            time_limit: None,
            max_results: DEFAULT_MAX_RESULTS,
            backend: DEFAULT_BACKEND.to_string(),
        }
    }

    /// Check every planner field against its allow-list. Returns `None` only
    /// when the plan has no usable query.
    pub fn validate(plan: &RawSearchPlan) -> Option<Self> {
        let query = plan.query.as_deref().map(str::trim).filter(|q| !q.is_empty())?;
        Some(Self {
            query: query.to_string(),
            region: validate_region(plan.region.as_deref()),
            safesearch: plan
                .safesearch
                .as_deref()
                .and_then(SafeSearch::parse)
                .unwrap_or_default(),
            time_limit: plan.timelimit.as_deref().and_then(TimeLimit::parse),
            max_results: validate_max_results(&plan.max_results),
            backend: validate_backend(plan.backend.as_deref()),
        })
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn region(&self) -> &'static str {
        self.region
    }

    pub fn safesearch(&self) -> SafeSearch {
        self.safesearch
    }

    pub fn time_limit(&self) -> Option<TimeLimit> {
        self.time_limit
    }

    pub fn max_results(&self) -> u32 {
        self.max_results
    }

    pub fn backend(&self) -> &str {
        &self.backend
    }

    pub fn backends(&self) -> impl Iterator<Item = &str> {
        self.backend.split(',')
    }
}

fn validate_region(raw: Option<&str>) -> &'static str {
    let Some(raw) = raw else {
        return DEFAULT_REGION;
    };
    let wanted = raw.trim().to_ascii_lowercase();
    REGIONS
        .iter()
        .copied()
        .find(|r| *r == wanted)
        .unwrap_or(DEFAULT_REGION)
}

/// Numbers are truncated, numeric strings parsed, anything else is the
/// default. The result is always inside [`MAX_RESULTS_RANGE`].
fn validate_max_results(raw: &serde_json::Value) -> u32 {
    let (lo, hi) = MAX_RESULTS_RANGE;
    let parsed: Option<f64> = match raw {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed {
        Some(n) if n.is_finite() => n.trunc().clamp(lo as f64, hi as f64) as u32,
        _ => DEFAULT_MAX_RESULTS,
    }
}

/// A single backend or a comma list. Any unknown entry voids the whole value.
fn validate_backend(raw: Option<&str>) -> String {
    let Some(raw) = raw else {
        return DEFAULT_BACKEND.to_string();
    };
    let entries: Vec<String> = raw
        .split(',')
        .map(|b| b.trim().to_ascii_lowercase())
        .filter(|b| !b.is_empty())
        .collect();
    if entries.is_empty() || !entries.iter().all(|b| BACKENDS.contains(&b.as_str())) {
        return DEFAULT_BACKEND.to_string();
    }
    entries.join(",")
}

// --- Planner output ---

/// Unvalidated planner response. Every field may be missing or wrong.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RawSearchPlan {
    /// Concise keyword query for a web search engine.
    #[serde(default)]
    pub query: Option<String>,
    /// Region code such as us-en, uk-en, de-de, or wt-wt for no region.
    #[serde(default)]
    pub region: Option<String>,
    /// One of on, moderate, off.
    #[serde(default)]
    pub safesearch: Option<String>,
    /// Recency window: d, w, m, y, or null for any time.
    #[serde(default)]
    pub timelimit: Option<String>,
    /// Number of results between 1 and 200.
    #[serde(default)]
    #[schemars(with = "Option<u32>")]
    pub max_results: serde_json::Value,
    /// Backend preference: auto, or a comma list such as google,wikipedia.
    #[serde(default)]
    pub backend: Option<String>,
}

// --- Optimizer ---

#[derive(Clone)]
pub struct QueryOptimizer {
    planner: Arc<dyn QueryPlanner>,
}

impl QueryOptimizer {
    pub fn new(planner: Arc<dyn QueryPlanner>) -> Self {
        Self { planner }
    }

    /// Never fails: a planner error or an empty planned query falls back to
    /// the default config around the claim text.
    pub async fn optimize(&self, claim: &str) -> SearchConfig {
        match self.planner.plan(claim).await {
            Ok(plan) => match SearchConfig::validate(&plan) {
                Some(config) => {
                    info!(
                        query = config.query(),
                        region = config.region(),
                        max_results = config.max_results(),
                        backend = config.backend(),
                        "Search plan validated"
                    );
                    config
                }
                None => {
                    warn!(claim, "Planner returned an empty query, using defaults");
                    SearchConfig::default_for(claim)
                }
            },
            Err(e) => {
                warn!(claim, error = %e, "Query planning failed, using defaults");
                SearchConfig::default_for(claim)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn plan(value: serde_json::Value) -> RawSearchPlan {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn valid_plan_passes_through() {
        let config = SearchConfig::validate(&plan(json!({
            "query": "  acme layoffs 2025 ",
            "region": "UK-EN",
            "safesearch": "off",
            "timelimit": "w",
            "max_results": 25,
            "backend": "google, wikipedia"
        })))
        .unwrap();
        assert_eq!(config.query(), "acme layoffs 2025");
        assert_eq!(config.region(), "uk-en");
        assert_eq!(config.safesearch(), SafeSearch::Off);
        assert_eq!(config.time_limit(), Some(TimeLimit::Week));
        assert_eq!(config.max_results(), 25);
        assert_eq!(config.backend(), "google,wikipedia");
    }

    #[test]
    fn unknown_region_falls_back_to_default() {
        for bad in ["xx-yy", "", "us_en", "united states"] {
            let config = SearchConfig::validate(&plan(json!({"query": "q", "region": bad}))).unwrap();
            assert_eq!(config.region(), DEFAULT_REGION, "region {bad:?}");
        }
    }

    #[test]
    fn region_output_is_always_in_allow_list() {
        for raw in REGIONS.iter().copied().chain(["zz-zz", "US-EN", " de-de "]) {
            let config = SearchConfig::validate(&plan(json!({"query": "q", "region": raw}))).unwrap();
            assert!(REGIONS.contains(&config.region()));
        }
    }

    #[test]
    fn max_results_is_clamped() {
        let cases = [
            (json!(0), 1),
            (json!(-40), 1),
            (json!(500), 200),
            (json!(12.9), 12),
            (json!("75"), 75),
            (json!("lots"), DEFAULT_MAX_RESULTS),
            (json!(null), DEFAULT_MAX_RESULTS),
            (json!([3]), DEFAULT_MAX_RESULTS),
        ];
        for (raw, expected) in cases {
            let config =
                SearchConfig::validate(&plan(json!({"query": "q", "max_results": raw.clone()}))).unwrap();
            assert_eq!(config.max_results(), expected, "input {raw}");
            assert!((1..=200).contains(&config.max_results()));
        }
    }

    #[test]
    fn unknown_safesearch_and_timelimit_use_defaults() {
        let config = SearchConfig::validate(&plan(json!({
            "query": "q",
            "safesearch": "strict",
            "timelimit": "decade"
        })))
        .unwrap();
        assert_eq!(config.safesearch(), SafeSearch::Moderate);
        assert_eq!(config.time_limit(), None);
    }

    #[test]
    fn any_unknown_backend_voids_the_list() {
        let config =
            SearchConfig::validate(&plan(json!({"query": "q", "backend": "google,altavista"}))).unwrap();
        assert_eq!(config.backend(), "auto");

        let config = SearchConfig::validate(&plan(json!({"query": "q", "backend": " , "}))).unwrap();
        assert_eq!(config.backend(), "auto");
    }

    #[test]
    fn blank_query_is_rejected() {
        assert!(SearchConfig::validate(&plan(json!({"query": "   "}))).is_none());
        assert!(SearchConfig::validate(&RawSearchPlan::default()).is_none());
    }

    #[test]
    fn default_for_trims_text() {
        let config = SearchConfig::default_for("  The Earth orbits the Sun  ");
        assert_eq!(config.query(), "The Earth orbits the Sun");
        assert_eq!(config.region(), "us-en");
        assert_eq!(config.safesearch(), SafeSearch::Moderate);
        assert_eq!(config.time_limit(), None);
        assert_eq!(config.max_results(), 10);
        assert_eq!(config.backend(), "auto");
    }
}
