// Collaborator boundaries for the verification pipeline.
//
// Every external capability (link lookup, media download, speech-to-text,
// generative calls, search, page extraction) sits behind one of these traits.
// Production adapters live in `adapters`; `testing` has deterministic mocks.

use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;

use reelcheck_common::{
    KnowledgeAssessment, MediaArtifacts, Narrative, NotWorthyResponse, ResolvedMedia,
    VerificationResult, Verdict, VideoAnalysis,
};

use crate::query_optimizer::{RawSearchPlan, SearchConfig};
use crate::retriever::Retrieval;

// ---------------------------------------------------------------------------
// Media
// ---------------------------------------------------------------------------

#[async_trait]
pub trait LinkResolver: Send + Sync {
    /// Validate a post link and locate its video.
    async fn resolve(&self, url: &str) -> Result<ResolvedMedia>;
}

#[async_trait]
pub trait MediaAcquirer: Send + Sync {
    /// Download the video and derive its audio track. Artifacts already on
    /// disk are reused.
    async fn acquire(&self, media: &ResolvedMedia) -> Result<MediaArtifacts>;
}

#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Speech to text. Returns an empty string on any failure.
    async fn transcribe(&self, audio_path: &Path) -> String;
}

#[async_trait]
pub trait ContentOracle: Send + Sync {
    async fn analyze(&self, video_path: &Path, transcript: Option<&str>) -> Result<VideoAnalysis>;
}

// ---------------------------------------------------------------------------
// Verification
// ---------------------------------------------------------------------------

#[async_trait]
pub trait KnowledgeOracle: Send + Sync {
    /// Can the claim be settled from background knowledge, without live data?
    async fn assess(&self, claim: &str) -> Result<KnowledgeAssessment>;

    /// Judge the claim from background knowledge, with what the video showed
    /// as context.
    async fn verify_internally(&self, claim: &str, video_evidence: &str) -> Result<Verdict>;

    /// Judge the claim against retrieved evidence. An empty retrieval is a
    /// valid input and should push the verdict toward Unverifiable.
    async fn verify_with_evidence(
        &self,
        claim: &str,
        video_evidence: &str,
        retrieval: &Retrieval,
    ) -> Result<Verdict>;
}

#[async_trait]
pub trait FallbackOracle: Send + Sync {
    /// Secondary web-grounded check. Sources in the verdict are its citations.
    async fn verify(&self, claim: &str) -> Result<Verdict>;
    fn name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// Retrieval
// ---------------------------------------------------------------------------

#[async_trait]
pub trait QueryPlanner: Send + Sync {
    /// Single generative call turning claim text into an unvalidated plan.
    async fn plan(&self, claim: &str) -> Result<RawSearchPlan>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub url: String,
    pub title: String,
    pub snippet: String,
}

#[async_trait]
pub trait WebSearcher: Send + Sync {
    /// Only ever called with a validated config.
    async fn search(&self, config: &SearchConfig) -> Result<Vec<SearchResult>>;
}

#[async_trait]
pub trait PageScraper: Send + Sync {
    /// Main-content text of a page. Empty string means nothing usable.
    async fn scrape(&self, url: &str) -> Result<String>;
    fn name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// Narrative
// ---------------------------------------------------------------------------

#[async_trait]
pub trait Narrator: Send + Sync {
    /// Overall label, summary and recommendation for a set of results.
    async fn narrate(&self, results: &[VerificationResult], overall_score: f64) -> Result<Narrative>;

    async fn not_worthy(&self, analysis: &VideoAnalysis) -> Result<NotWorthyResponse>;
}
