use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use spider_transformations::transformation::content::{
    transform_content_input, ReturnFormat, TransformConfig, TransformInput,
};
use tracing::{info, warn};

use crate::traits::PageScraper;

const SCRAPE_UA: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Main-content markdown of an HTML document.
pub fn readable_text(url: &str, html: &[u8]) -> String {
    let parsed_url = url::Url::parse(url).ok();
    let config = TransformConfig {
        readability: true,
        main_content: true,
        return_format: ReturnFormat::Markdown,
        filter_images: true,
        filter_svg: true,
        clean_html: true,
    };
    let input = TransformInput {
        url: parsed_url.as_ref(),
        content: html,
        screenshot_bytes: None,
        encoding: None,
        selector_config: None,
        ignore_tags: None,
    };
    transform_content_input(input, &config)
}

// --- HTTP + Readability scraper ---

/// Plain HTTP fetch followed by spider_transformations Readability extraction.
/// No JS rendering; pages that need it come back empty and are dropped.
pub struct ReadabilityScraper {
    client: reqwest::Client,
}

impl ReadabilityScraper {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(20))
                .user_agent(SCRAPE_UA)
                .build()
                .unwrap_or_default(),
        }
    }
}

impl Default for ReadabilityScraper {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PageScraper for ReadabilityScraper {
    async fn scrape(&self, url: &str) -> Result<String> {
        let parsed = url::Url::parse(url).context("Invalid URL")?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            bail!("Only http/https URLs are allowed, got: {}", parsed.scheme());
        }

        info!(url, scraper = self.name(), "Scraping URL");
        let resp = self
            .client
            .get(parsed)
            .send()
            .await
            .with_context(|| format!("Request failed for {url}"))?;
        if !resp.status().is_success() {
            bail!("{url} returned {}", resp.status());
        }
        let html = resp.bytes().await.context("Failed to read page body")?;

        let text = readable_text(url, &html);
        if text.trim().is_empty() {
            warn!(url, scraper = self.name(), "Empty content after Readability extraction");
            return Ok(String::new());
        }

        info!(url, scraper = self.name(), bytes = text.len(), "Scraped successfully");
        Ok(text)
    }

    fn name(&self) -> &str {
        "readability"
    }
}
