use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

use crate::query_optimizer::{SafeSearch, SearchConfig};
use crate::traits::{SearchResult, WebSearcher};

const SERPER_URL: &str = "https://google.serper.dev/search";
/// Serper pages cap out at 100 results.
const SERPER_MAX_NUM: u32 = 100;

// --- Serper (Google Search) ---

pub struct SerperSearcher {
    api_key: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct SerperResponse {
    #[serde(default)]
    organic: Vec<SerperResult>,
}

#[derive(Debug, Deserialize)]
struct SerperResult {
    #[serde(default)]
    link: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    snippet: String,
}

impl SerperSearcher {
    pub fn new(api_key: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
        }
    }
}

/// Request body for a validated config.
pub fn serper_body(config: &SearchConfig) -> serde_json::Value {
    let wikipedia_only = config.backends().all(|b| b == "wikipedia");
    let q = if wikipedia_only {
        format!("{} site:wikipedia.org", config.query())
    } else {
        config.query().to_string()
    };

    let mut body = serde_json::json!({
        "q": q,
        "num": config.max_results().min(SERPER_MAX_NUM),
    });

    if let Some((country, lang)) = config.region().split_once('-') {
        if country != "wt" {
            // Serper uses "gb" where the region list says "uk".
            let gl = if country == "uk" { "gb" } else { country };
            body["gl"] = gl.into();
            body["hl"] = lang.into();
        }
    }
    if let Some(limit) = config.time_limit() {
        body["tbs"] = format!("qdr:{}", limit.code()).into();
    }
    if config.safesearch() == SafeSearch::On {
        body["safe"] = "active".into();
    }
    body
}

#[async_trait]
impl WebSearcher for SerperSearcher {
    async fn search(&self, config: &SearchConfig) -> Result<Vec<SearchResult>> {
        let body = serper_body(config);
        info!(query = config.query(), region = config.region(), "Serper search");

        let resp = self
            .client
            .post(SERPER_URL)
            .header("X-API-KEY", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .context("Serper API request failed")?
            .error_for_status()
            .context("Serper API returned an error status")?;

        let data: SerperResponse = resp
            .json()
            .await
            .context("Failed to parse Serper response")?;

        let results: Vec<SearchResult> = data
            .organic
            .into_iter()
            .filter(|r| !r.link.is_empty())
            .map(|r| SearchResult {
                url: r.link,
                title: r.title,
                snippet: r.snippet,
            })
            .collect();

        info!(query = config.query(), count = results.len(), "Serper search complete");
        Ok(results)
    }
}
