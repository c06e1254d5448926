// Test mocks for the verification pipeline.
//
// One mock per collaborator trait, each HashMap-keyed with builder methods
// (`.on_claim()`, `.on_query()`, `.on_page()` ...) and call counters, so chain
// tests can assert exactly which external calls happened. Unregistered keys
// return `Err`, never a silent default.
//
// `MockWorld` bundles one of each and builds a `Pipeline` from them.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;

use reelcheck_common::{
    AuthenticityLabel, Claim, KnowledgeAssessment, MediaArtifacts, Narrative, NotWorthyResponse,
    ResolvedMedia, VerificationResult, Verdict, VideoAnalysis,
};

use crate::orchestrator::{Pipeline, PipelineDeps};
use crate::query_optimizer::{RawSearchPlan, SearchConfig};
use crate::retriever::Retrieval;
use crate::traits::{
    ContentOracle, FallbackOracle, KnowledgeOracle, LinkResolver, MediaAcquirer, Narrator,
    PageScraper, QueryPlanner, SearchResult, Transcriber, WebSearcher,
};

// ---------------------------------------------------------------------------
// Test constants and helpers
// ---------------------------------------------------------------------------

pub const REEL_URL: &str = "https://www.instagram.com/reel/C0ffee123/";
pub const REEL_SHORTCODE: &str = "C0ffee123";

pub fn claim(text: &str, worth_verifying: bool) -> Claim {
    Claim::new(text, format!("video shows: {text}"), worth_verifying)
}

pub fn verdict(score: f64, label: AuthenticityLabel) -> Verdict {
    Verdict::new(score, label, format!("{label} per mock"), 0.8)
}

pub fn resolved_media(shortcode: &str) -> ResolvedMedia {
    ResolvedMedia {
        shortcode: shortcode.to_string(),
        video_url: format!("https://cdn.example/{shortcode}.mp4"),
        width: Some(720),
        height: Some(1280),
        filename: format!("instagram_{shortcode}.mp4"),
    }
}

pub fn worthy_analysis(claims: Vec<Claim>) -> VideoAnalysis {
    VideoAnalysis {
        category: "news".to_string(),
        claims,
        summary: "A presenter makes several factual statements.".to_string(),
        is_worthy: true,
        why_not_worthy: None,
    }
}

pub fn not_worthy_analysis(category: &str) -> VideoAnalysis {
    VideoAnalysis {
        category: category.to_string(),
        claims: Vec::new(),
        summary: "A dog chases its tail.".to_string(),
        is_worthy: false,
        why_not_worthy: Some("Pure entertainment.".to_string()),
    }
}

pub fn search_result(url: &str) -> SearchResult {
    SearchResult {
        url: url.to_string(),
        title: format!("Title for {url}"),
        snippet: String::new(),
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

// ---------------------------------------------------------------------------
// Media mocks
// ---------------------------------------------------------------------------

/// Resolves registered URLs only.
#[derive(Default)]
pub struct MockResolver {
    links: HashMap<String, ResolvedMedia>,
    calls: AtomicUsize,
}

impl MockResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_link(mut self, url: &str, media: ResolvedMedia) -> Self {
        self.links.insert(url.to_string(), media);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LinkResolver for MockResolver {
    async fn resolve(&self, url: &str) -> Result<ResolvedMedia> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.links
            .get(url)
            .cloned()
            .ok_or_else(|| anyhow!("MockResolver: no link registered for {url}"))
    }
}

/// Pretends to download into `/tmp/reels`, or fails with a fixed message.
#[derive(Default)]
pub struct MockAcquirer {
    failure: Option<String>,
    calls: AtomicUsize,
}

impl MockAcquirer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaAcquirer for MockAcquirer {
    async fn acquire(&self, media: &ResolvedMedia) -> Result<MediaArtifacts> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.failure {
            bail!("{message}");
        }
        let stem = media.filename.trim_end_matches(".mp4");
        Ok(MediaArtifacts {
            video_path: PathBuf::from("/tmp/reels/video").join(&media.filename),
            audio_path: PathBuf::from("/tmp/reels/audio").join(format!("{stem}.mp3")),
        })
    }
}

/// Returns a fixed transcript. Empty means "transcription failed".
pub struct MockTranscriber {
    transcript: String,
    calls: AtomicUsize,
}

impl MockTranscriber {
    pub fn new(transcript: &str) -> Self {
        Self {
            transcript: transcript.to_string(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self::new("")
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transcriber for MockTranscriber {
    async fn transcribe(&self, _audio_path: &Path) -> String {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.transcript.clone()
    }
}

/// Returns one configured analysis for any video. Records transcripts seen.
#[derive(Default)]
pub struct MockContentOracle {
    analysis: Option<VideoAnalysis>,
    transcripts: Mutex<Vec<Option<String>>>,
}

impl MockContentOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn returning(analysis: VideoAnalysis) -> Self {
        Self {
            analysis: Some(analysis),
            transcripts: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        lock(&self.transcripts).len()
    }

    pub fn transcripts_seen(&self) -> Vec<Option<String>> {
        lock(&self.transcripts).clone()
    }
}

#[async_trait]
impl ContentOracle for MockContentOracle {
    async fn analyze(&self, _video_path: &Path, transcript: Option<&str>) -> Result<VideoAnalysis> {
        lock(&self.transcripts).push(transcript.map(str::to_string));
        self.analysis
            .clone()
            .ok_or_else(|| anyhow!("MockContentOracle: no analysis configured"))
    }
}

// ---------------------------------------------------------------------------
// Verification mocks
// ---------------------------------------------------------------------------

/// Claim-keyed knowledge oracle.
/// `.on_claim(text, can_verify)` registers the assessment; `.on_internal()`
/// and `.on_web()` register verdicts for the two verification calls.
#[derive(Default)]
pub struct MockKnowledge {
    assessments: HashMap<String, bool>,
    internal: HashMap<String, Verdict>,
    web: HashMap<String, Verdict>,
    assess_calls: AtomicUsize,
    internal_calls: AtomicUsize,
    web_calls: AtomicUsize,
    retrievals: Mutex<Vec<Retrieval>>,
    internal_evidence: Mutex<Vec<String>>,
}

impl MockKnowledge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_claim(mut self, claim: &str, can_verify: bool) -> Self {
        self.assessments.insert(claim.to_string(), can_verify);
        self
    }

    pub fn on_internal(mut self, claim: &str, verdict: Verdict) -> Self {
        self.internal.insert(claim.to_string(), verdict);
        self
    }

    pub fn on_web(mut self, claim: &str, verdict: Verdict) -> Self {
        self.web.insert(claim.to_string(), verdict);
        self
    }

    pub fn assess_calls(&self) -> usize {
        self.assess_calls.load(Ordering::SeqCst)
    }

    pub fn internal_calls(&self) -> usize {
        self.internal_calls.load(Ordering::SeqCst)
    }

    pub fn web_calls(&self) -> usize {
        self.web_calls.load(Ordering::SeqCst)
    }

    /// Total calls across all three operations.
    pub fn calls(&self) -> usize {
        self.assess_calls() + self.internal_calls() + self.web_calls()
    }

    pub fn retrievals_seen(&self) -> Vec<Retrieval> {
        lock(&self.retrievals).clone()
    }

    /// Video evidence passed to each internal verification, in call order.
    pub fn internal_evidence_seen(&self) -> Vec<String> {
        lock(&self.internal_evidence).clone()
    }
}

#[async_trait]
impl KnowledgeOracle for MockKnowledge {
    async fn assess(&self, claim: &str) -> Result<KnowledgeAssessment> {
        self.assess_calls.fetch_add(1, Ordering::SeqCst);
        let can_verify = *self
            .assessments
            .get(claim)
            .ok_or_else(|| anyhow!("MockKnowledge: no assessment registered for {claim}"))?;
        Ok(KnowledgeAssessment {
            can_verify,
            reasoning: "mock".to_string(),
            complexity: "simple".to_string(),
            requires_current_data: !can_verify,
        })
    }

    async fn verify_internally(&self, claim: &str, video_evidence: &str) -> Result<Verdict> {
        self.internal_calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.internal_evidence).push(video_evidence.to_string());
        self.internal
            .get(claim)
            .cloned()
            .ok_or_else(|| anyhow!("MockKnowledge: no internal verdict registered for {claim}"))
    }

    async fn verify_with_evidence(
        &self,
        claim: &str,
        _video_evidence: &str,
        retrieval: &Retrieval,
    ) -> Result<Verdict> {
        self.web_calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.retrievals).push(retrieval.clone());
        if let Some(verdict) = self.web.get(claim) {
            return Ok(verdict.clone());
        }
        if !retrieval.has_evidence() {
            return Ok(Verdict::unverifiable("No evidence found."));
        }
        bail!("MockKnowledge: no web verdict registered for {claim}")
    }
}

/// Claim-keyed fallback. Unregistered claims are an error.
#[derive(Default)]
pub struct MockFallback {
    verdicts: HashMap<String, Verdict>,
    calls: AtomicUsize,
}

impl MockFallback {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_claim(mut self, claim: &str, verdict: Verdict) -> Self {
        self.verdicts.insert(claim.to_string(), verdict);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FallbackOracle for MockFallback {
    async fn verify(&self, claim: &str) -> Result<Verdict> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.verdicts
            .get(claim)
            .cloned()
            .ok_or_else(|| anyhow!("MockFallback: no verdict registered for {claim}"))
    }

    fn name(&self) -> &str {
        "mock-fallback"
    }
}

// ---------------------------------------------------------------------------
// Retrieval mocks
// ---------------------------------------------------------------------------

/// Claim-keyed planner. Unregistered claims fail, which exercises the
/// optimizer's default config.
#[derive(Default)]
pub struct MockPlanner {
    plans: HashMap<String, RawSearchPlan>,
    calls: AtomicUsize,
}

impl MockPlanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_claim(mut self, claim: &str, plan: RawSearchPlan) -> Self {
        self.plans.insert(claim.to_string(), plan);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QueryPlanner for MockPlanner {
    async fn plan(&self, claim: &str) -> Result<RawSearchPlan> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.plans
            .get(claim)
            .cloned()
            .ok_or_else(|| anyhow!("MockPlanner: no plan registered for {claim}"))
    }
}

/// Query-keyed search results. Records every config it was called with.
#[derive(Default)]
pub struct MockSearcher {
    results: HashMap<String, Vec<SearchResult>>,
    configs: Mutex<Vec<SearchConfig>>,
}

impl MockSearcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_query(mut self, query: &str, results: Vec<SearchResult>) -> Self {
        self.results.insert(query.to_string(), results);
        self
    }

    pub fn calls(&self) -> usize {
        lock(&self.configs).len()
    }

    pub fn configs_seen(&self) -> Vec<SearchConfig> {
        lock(&self.configs).clone()
    }
}

#[async_trait]
impl WebSearcher for MockSearcher {
    async fn search(&self, config: &SearchConfig) -> Result<Vec<SearchResult>> {
        lock(&self.configs).push(config.clone());
        self.results
            .get(config.query())
            .cloned()
            .ok_or_else(|| anyhow!("MockSearcher: no results registered for {}", config.query()))
    }
}

/// URL-keyed page text. Unregistered URLs fail.
#[derive(Default)]
pub struct MockScraper {
    pages: HashMap<String, String>,
    calls: AtomicUsize,
}

impl MockScraper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_page(mut self, url: &str, text: &str) -> Self {
        self.pages.insert(url.to_string(), text.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageScraper for MockScraper {
    async fn scrape(&self, url: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| anyhow!("MockScraper: no page registered for {url}"))
    }

    fn name(&self) -> &str {
        "mock"
    }
}

// ---------------------------------------------------------------------------
// MockNarrator
// ---------------------------------------------------------------------------

/// Fixed narrative, or failure when none is configured.
#[derive(Default)]
pub struct MockNarrator {
    narrative: Option<Narrative>,
    not_worthy: Option<NotWorthyResponse>,
    narrate_calls: AtomicUsize,
    not_worthy_calls: AtomicUsize,
}

impl MockNarrator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_narrative(mut self, label: &str, summary: &str, recommendation: &str) -> Self {
        self.narrative = Some(Narrative {
            overall_authenticity: label.to_string(),
            summary: summary.to_string(),
            recommendation: recommendation.to_string(),
        });
        self
    }

    pub fn with_not_worthy(mut self, response: NotWorthyResponse) -> Self {
        self.not_worthy = Some(response);
        self
    }

    pub fn narrate_calls(&self) -> usize {
        self.narrate_calls.load(Ordering::SeqCst)
    }

    pub fn not_worthy_calls(&self) -> usize {
        self.not_worthy_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Narrator for MockNarrator {
    async fn narrate(&self, _results: &[VerificationResult], _overall_score: f64) -> Result<Narrative> {
        self.narrate_calls.fetch_add(1, Ordering::SeqCst);
        self.narrative
            .clone()
            .ok_or_else(|| anyhow!("MockNarrator: narrative generation unavailable"))
    }

    async fn not_worthy(&self, _analysis: &VideoAnalysis) -> Result<NotWorthyResponse> {
        self.not_worthy_calls.fetch_add(1, Ordering::SeqCst);
        self.not_worthy
            .clone()
            .ok_or_else(|| anyhow!("MockNarrator: not-worthy summary unavailable"))
    }
}

// ---------------------------------------------------------------------------
// MockWorld
// ---------------------------------------------------------------------------

/// One mock per collaborator. Defaults resolve [`REEL_URL`], acquire
/// successfully, transcribe to a short text, and fail everything else until
/// configured. Replace fields before calling [`MockWorld::pipeline`].
pub struct MockWorld {
    pub resolver: Arc<MockResolver>,
    pub acquirer: Arc<MockAcquirer>,
    pub transcriber: Arc<MockTranscriber>,
    pub content_oracle: Arc<MockContentOracle>,
    pub knowledge: Arc<MockKnowledge>,
    pub fallback: Arc<MockFallback>,
    pub planner: Arc<MockPlanner>,
    pub searcher: Arc<MockSearcher>,
    pub scraper: Arc<MockScraper>,
    pub narrator: Arc<MockNarrator>,
}

impl MockWorld {
    pub fn new() -> Self {
        Self {
            resolver: Arc::new(MockResolver::new().on_link(REEL_URL, resolved_media(REEL_SHORTCODE))),
            acquirer: Arc::new(MockAcquirer::new()),
            transcriber: Arc::new(MockTranscriber::new("Hello and welcome to today's update.")),
            content_oracle: Arc::new(MockContentOracle::new()),
            knowledge: Arc::new(MockKnowledge::new()),
            fallback: Arc::new(MockFallback::new()),
            planner: Arc::new(MockPlanner::new()),
            searcher: Arc::new(MockSearcher::new()),
            scraper: Arc::new(MockScraper::new()),
            narrator: Arc::new(MockNarrator::new()),
        }
    }

    pub fn deps(&self) -> PipelineDeps {
        PipelineDeps::builder()
            .resolver(self.resolver.clone())
            .acquirer(self.acquirer.clone())
            .transcriber(self.transcriber.clone())
            .content_oracle(self.content_oracle.clone())
            .knowledge(self.knowledge.clone())
            .fallback(self.fallback.clone())
            .planner(self.planner.clone())
            .searcher(self.searcher.clone())
            .scraper(self.scraper.clone())
            .narrator(self.narrator.clone())
            .scrape_concurrency(2)
            .build()
    }

    pub fn pipeline(&self) -> Pipeline {
        Pipeline::new(self.deps())
    }
}

impl Default for MockWorld {
    fn default() -> Self {
        Self::new()
    }
}
