use std::collections::HashSet;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{info, warn};

use ai_client::truncate_to_char_boundary;

use crate::query_optimizer::{QueryOptimizer, SearchConfig};
use crate::traits::{PageScraper, WebSearcher};

/// Per-page cap on evidence text, in bytes at a char boundary.
pub const PASSAGE_MAX_BYTES: usize = 1000;
/// Passages handed to the verification call.
pub const MAX_PASSAGES: usize = 5;

const STOPWORDS: &[&str] = &[
    "the", "and", "for", "that", "this", "with", "from", "was", "were", "are", "has", "have",
    "had", "his", "her", "its", "their", "they", "you", "but", "not", "all", "any", "can", "will",
    "into", "than", "then", "there", "been", "about", "which", "who", "what", "when", "where",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvidencePassage {
    pub url: String,
    pub passage: String,
}

/// What a single retrieval found. Empty is a normal outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Retrieval {
    pub config: SearchConfig,
    /// Deduplicated, in search-rank order.
    pub sources: Vec<String>,
    pub evidence: Vec<EvidencePassage>,
}

impl Retrieval {
    pub fn empty(config: SearchConfig) -> Self {
        Self {
            config,
            sources: Vec::new(),
            evidence: Vec::new(),
        }
    }

    pub fn has_evidence(&self) -> bool {
        !self.evidence.is_empty()
    }

    /// Evidence block for the verification prompt. States explicitly when
    /// nothing was found.
    pub fn evidence_summary(&self) -> String {
        if self.evidence.is_empty() {
            return "No evidence found: the web search returned no usable pages for this claim."
                .to_string();
        }
        self.evidence
            .iter()
            .enumerate()
            .map(|(i, e)| format!("[{}] Source: {}\n{}", i + 1, e.url, e.passage))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

#[derive(Clone)]
pub struct WebRetriever {
    optimizer: QueryOptimizer,
    searcher: Arc<dyn WebSearcher>,
    scraper: Arc<dyn PageScraper>,
    concurrency: usize,
}

impl WebRetriever {
    pub fn new(
        optimizer: QueryOptimizer,
        searcher: Arc<dyn WebSearcher>,
        scraper: Arc<dyn PageScraper>,
        concurrency: usize,
    ) -> Self {
        Self {
            optimizer,
            searcher,
            scraper,
            concurrency: concurrency.max(1),
        }
    }

    /// Plan, search, extract. Search and extraction failures are contained:
    /// the result is simply smaller (possibly empty).
    pub async fn retrieve(&self, claim: &str) -> Retrieval {
        let config = self.optimizer.optimize(claim).await;

        let results = match self.searcher.search(&config).await {
            Ok(results) => results,
            Err(e) => {
                warn!(query = config.query(), error = %e, "Search failed, continuing without evidence");
                return Retrieval::empty(config);
            }
        };

        let sources = dedup_urls(results.into_iter().map(|r| r.url));
        if sources.is_empty() {
            info!(query = config.query(), "Search returned no candidate URLs");
            return Retrieval::empty(config);
        }

        let scraper = &self.scraper;
        let pages: Vec<Option<EvidencePassage>> = stream::iter(sources.iter().cloned())
            .map(|url| async move {
                match scraper.scrape(&url).await {
                    Ok(text) if !text.trim().is_empty() => Some(EvidencePassage {
                        passage: truncate_to_char_boundary(text.trim(), PASSAGE_MAX_BYTES).to_string(),
                        url,
                    }),
                    Ok(_) => {
                        warn!(url = url.as_str(), scraper = scraper.name(), "Empty extraction, skipping");
                        None
                    }
                    Err(e) => {
                        warn!(url = url.as_str(), scraper = scraper.name(), error = %e, "Extraction failed, skipping");
                        None
                    }
                }
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        let extracted: Vec<EvidencePassage> = pages.into_iter().flatten().collect();
        let evidence = select_passages(config.query(), extracted, MAX_PASSAGES);

        info!(
            query = config.query(),
            sources = sources.len(),
            passages = evidence.len(),
            "Retrieval complete"
        );

        Retrieval {
            config,
            sources,
            evidence,
        }
    }
}

/// Drop fragments, non-http(s) URLs and repeats. First occurrence wins.
pub fn dedup_urls(urls: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for raw in urls {
        let Ok(mut parsed) = url::Url::parse(raw.trim()) else {
            continue;
        };
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            continue;
        }
        parsed.set_fragment(None);
        let normalized = parsed.to_string();
        if seen.insert(normalized.clone()) {
            out.push(normalized);
        }
    }
    out
}

fn query_terms(query: &str) -> HashSet<String> {
    query
        .split(|c: char| !c.is_alphanumeric())
        .map(str::to_lowercase)
        .filter(|t| t.chars().count() >= 3 && !STOPWORDS.contains(&t.as_str()))
        .collect()
}

/// Keep the `limit` passages sharing the most distinct terms with the query.
/// Ties keep their incoming (search-rank) order.
pub fn select_passages(query: &str, passages: Vec<EvidencePassage>, limit: usize) -> Vec<EvidencePassage> {
    let terms = query_terms(query);
    let mut scored: Vec<(usize, EvidencePassage)> = passages
        .into_iter()
        .map(|p| {
            let words = query_terms(&p.passage);
            (terms.intersection(&words).count(), p)
        })
        .collect();
    scored.sort_by(|a, b| b.0.cmp(&a.0));
    scored.into_iter().take(limit).map(|(_, p)| p).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passage(url: &str, text: &str) -> EvidencePassage {
        EvidencePassage {
            url: url.to_string(),
            passage: text.to_string(),
        }
    }

    #[test]
    fn dedup_keeps_rank_order_and_strips_fragments() {
        let urls = vec![
            "https://a.example/story".to_string(),
            "https://b.example/".to_string(),
            "https://a.example/story#comments".to_string(),
            "ftp://files.example/x".to_string(),
            "not a url".to_string(),
            "https://c.example/".to_string(),
        ];
        assert_eq!(
            dedup_urls(urls),
            vec![
                "https://a.example/story".to_string(),
                "https://b.example/".to_string(),
                "https://c.example/".to_string(),
            ]
        );
    }

    #[test]
    fn select_prefers_overlap_and_keeps_rank_on_ties() {
        let passages = vec![
            passage("https://1", "weather today is sunny"),
            passage("https://2", "Acme announced layoffs of 500 staff"),
            passage("https://3", "unrelated recipe"),
            passage("https://4", "Acme layoffs confirmed"),
        ];
        let picked = select_passages("Acme announced layoffs", passages, 3);
        let urls: Vec<&str> = picked.iter().map(|p| p.url.as_str()).collect();
        assert_eq!(urls, vec!["https://2", "https://4", "https://1"]);
    }

    #[test]
    fn select_caps_at_limit() {
        let passages = (0..9).map(|i| passage(&format!("https://{i}"), "x")).collect();
        assert_eq!(select_passages("anything", passages, MAX_PASSAGES).len(), MAX_PASSAGES);
    }

    #[test]
    fn stopwords_and_short_tokens_do_not_count() {
        let terms = query_terms("The Earth is in the sky");
        assert!(terms.contains("earth"));
        assert!(terms.contains("sky"));
        assert!(!terms.contains("the"));
        assert!(!terms.contains("is"));
    }

    #[test]
    fn empty_retrieval_says_no_evidence() {
        let r = Retrieval::empty(SearchConfig::default_for("q"));
        assert!(!r.has_evidence());
        assert!(r.evidence_summary().starts_with("No evidence found"));
    }

    #[test]
    fn summary_numbers_sources() {
        let mut r = Retrieval::empty(SearchConfig::default_for("q"));
        r.evidence = vec![passage("https://a", "alpha"), passage("https://b", "beta")];
        let summary = r.evidence_summary();
        assert!(summary.contains("[1] Source: https://a\nalpha"));
        assert!(summary.contains("[2] Source: https://b\nbeta"));
    }
}
