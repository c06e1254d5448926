//! Top-level run state machine.
//!
//! Init → ResolvingLink → AcquiringMedia → Transcribing → Analyzing →
//! {NotWorthy | Verifying → Aggregating} → Completed, with any failure up to
//! and including Analyzing routed straight to Failed. Every stage emits its
//! `started` event before doing work, and a run emits exactly one terminal
//! message.

use std::sync::Arc;

use chrono::Utc;
use futures::Stream;
use serde_json::json;
use tracing::{info, warn};
use typed_builder::TypedBuilder;
use uuid::Uuid;

use reelcheck_common::{
    Claim, MediaArtifacts, NotWorthyResponse, ReelCheckError, ResolvedMedia, RunOutcome, RunReport, Stage,
    VerificationResult, VideoAnalysis,
};

use crate::aggregator::{Aggregator, NarrativeSource};
use crate::claim_verifier::{ClaimVerifier, Route};
use crate::progress::{BufferedChannel, ChannelMessage, Emitter, ProgressChannel, PushChannel};
use crate::query_optimizer::QueryOptimizer;
use crate::retriever::WebRetriever;
use crate::traits::{
    ContentOracle, FallbackOracle, KnowledgeOracle, LinkResolver, MediaAcquirer, Narrator,
    PageScraper, QueryPlanner, Transcriber, WebSearcher,
};

/// Characters of claim text quoted in per-claim progress messages.
const CLAIM_PREVIEW_CHARS: usize = 100;

/// Long-lived collaborators, constructed once and shared by every run.
#[derive(Clone, TypedBuilder)]
pub struct PipelineDeps {
    pub resolver: Arc<dyn LinkResolver>,
    pub acquirer: Arc<dyn MediaAcquirer>,
    pub transcriber: Arc<dyn Transcriber>,
    pub content_oracle: Arc<dyn ContentOracle>,
    pub knowledge: Arc<dyn KnowledgeOracle>,
    pub fallback: Arc<dyn FallbackOracle>,
    pub planner: Arc<dyn QueryPlanner>,
    pub searcher: Arc<dyn WebSearcher>,
    pub scraper: Arc<dyn PageScraper>,
    pub narrator: Arc<dyn Narrator>,
    #[builder(default = 4)]
    pub scrape_concurrency: usize,
}

enum RunState {
    Init,
    ResolvingLink,
    AcquiringMedia(ResolvedMedia),
    Transcribing(MediaArtifacts),
    Analyzing {
        artifacts: MediaArtifacts,
        transcript: Option<String>,
    },
    NotWorthy(VideoAnalysis),
    Verifying(Vec<Claim>),
    Aggregating(Vec<VerificationResult>),
    Completed(RunOutcome),
    Failed {
        stage: Stage,
        error: ReelCheckError,
    },
}

/// Shares no mutable state between runs; clone freely.
#[derive(Clone)]
pub struct Pipeline {
    resolver: Arc<dyn LinkResolver>,
    acquirer: Arc<dyn MediaAcquirer>,
    transcriber: Arc<dyn Transcriber>,
    content_oracle: Arc<dyn ContentOracle>,
    narrator: Arc<dyn Narrator>,
    verifier: ClaimVerifier,
    aggregator: Aggregator,
}

impl Pipeline {
    pub fn new(deps: PipelineDeps) -> Self {
        let optimizer = QueryOptimizer::new(deps.planner);
        let retriever = WebRetriever::new(optimizer, deps.searcher, deps.scraper, deps.scrape_concurrency);
        Self {
            resolver: deps.resolver,
            acquirer: deps.acquirer,
            transcriber: deps.transcriber,
            content_oracle: deps.content_oracle,
            narrator: deps.narrator.clone(),
            verifier: ClaimVerifier::new(deps.knowledge, retriever, deps.fallback),
            aggregator: Aggregator::new(deps.narrator),
        }
    }

    pub fn verifier(&self) -> &ClaimVerifier {
        &self.verifier
    }

    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    /// Drive one run to its terminal state, reporting through `channel`.
    /// Never fails: hard failures come back as `RunOutcome::Failed`.
    pub async fn run(&self, url: &str, channel: &dyn ProgressChannel) -> RunOutcome {
        let run_id = Uuid::new_v4().to_string();
        let started_at = Utc::now();
        channel.begin(&run_id, started_at);
        info!(run_id = run_id.as_str(), url, "Run started");

        let mut emitter = Emitter::new(channel);
        let mut state = RunState::Init;
        let outcome = loop {
            state = match state {
                RunState::Completed(outcome) => break outcome,
                RunState::Failed { stage, error } => {
                    break RunOutcome::Failed {
                        stage,
                        message: error.to_string(),
                    }
                }
                other => self.step(other, url, &mut emitter).await,
            };
        };

        let elapsed_ms = (Utc::now() - started_at).num_milliseconds();
        match &outcome {
            RunOutcome::Failed { stage, message } => {
                warn!(run_id = run_id.as_str(), %stage, message = message.as_str(), elapsed_ms, "Run failed")
            }
            _ => info!(run_id = run_id.as_str(), elapsed_ms, "Run completed"),
        }

        emitter.finish(&outcome);
        outcome
    }

    /// Request/response form: the full event log plus the outcome.
    pub async fn run_buffered(&self, url: &str) -> RunReport {
        let channel = BufferedChannel::new();
        self.run(url, &channel).await;
        channel.into_report()
    }

    /// Live form. The run is spawned and keeps going if the stream is
    /// dropped; its remaining messages are discarded.
    pub fn stream(&self, url: impl Into<String>) -> impl Stream<Item = ChannelMessage> + Send + 'static {
        let pipeline = self.clone();
        let url = url.into();
        async_stream::stream! {
            let (channel, mut rx) = PushChannel::new();
            tokio::spawn(async move {
                pipeline.run(&url, &channel).await;
            });
            while let Some(message) = rx.recv().await {
                yield message;
            }
        }
    }

    async fn step(&self, state: RunState, url: &str, emitter: &mut Emitter<'_>) -> RunState {
        match state {
            RunState::Init => RunState::ResolvingLink,

            RunState::ResolvingLink => {
                let stage = Stage::ResolvingLink;
                emitter.started(stage, "Validating link");
                match self.resolver.resolve(url).await {
                    Ok(media) => {
                        emitter.succeeded(
                            stage,
                            "Link resolved",
                            Some(json!({ "shortcode": media.shortcode, "filename": media.filename })),
                        );
                        RunState::AcquiringMedia(media)
                    }
                    Err(e) => fail(emitter, stage, ReelCheckError::InvalidLink(format!("{e:#}"))),
                }
            }

            RunState::AcquiringMedia(media) => {
                let stage = Stage::AcquiringMedia;
                emitter.started(stage, "Downloading video and extracting audio");
                match self.acquirer.acquire(&media).await {
                    Ok(artifacts) => {
                        emitter.succeeded(
                            stage,
                            "Video and audio saved",
                            Some(json!({
                                "video_path": artifacts.video_path.display().to_string(),
                                "audio_path": artifacts.audio_path.display().to_string(),
                            })),
                        );
                        RunState::Transcribing(artifacts)
                    }
                    Err(e) => fail(emitter, stage, ReelCheckError::Acquisition(format!("{e:#}"))),
                }
            }

            RunState::Transcribing(artifacts) => {
                let stage = Stage::Transcribing;
                emitter.started(stage, "Transcribing audio");
                let transcript = self.transcriber.transcribe(&artifacts.audio_path).await;
                let transcript = if transcript.trim().is_empty() {
                    emitter.warning(stage, "Transcript unavailable, continuing without it");
                    None
                } else {
                    emitter.succeeded(
                        stage,
                        "Transcript ready",
                        Some(json!({ "chars": transcript.chars().count() })),
                    );
                    Some(transcript)
                };
                RunState::Analyzing {
                    artifacts,
                    transcript,
                }
            }

            RunState::Analyzing {
                artifacts,
                transcript,
            } => {
                let stage = Stage::Analyzing;
                emitter.started(stage, "Analyzing video content");
                match self
                    .content_oracle
                    .analyze(&artifacts.video_path, transcript.as_deref())
                    .await
                {
                    Ok(analysis) => {
                        emitter.succeeded(
                            stage,
                            "Video analysis complete",
                            Some(json!({
                                "category": analysis.category,
                                "claim_count": analysis.claims.len(),
                                "is_worthy": analysis.is_worthy,
                            })),
                        );
                        if analysis.is_worthy {
                            RunState::Verifying(analysis.claims)
                        } else {
                            RunState::NotWorthy(analysis)
                        }
                    }
                    Err(e) => fail(emitter, stage, ReelCheckError::Analysis(format!("{e:#}"))),
                }
            }

            RunState::NotWorthy(analysis) => {
                let stage = Stage::NotWorthy;
                emitter.started(stage, "Video is not worth fact-checking, preparing summary");
                let response = match self.narrator.not_worthy(&analysis).await {
                    Ok(mut response) => {
                        response.category = analysis.category.clone();
                        response
                    }
                    Err(e) => {
                        let err = ReelCheckError::Narrative(format!("{e:#}"));
                        warn!(error = %err, "Using templated not-worthy response");
                        emitter.warning(stage, "Summary generation failed, using a standard response");
                        NotWorthyResponse::fallback(&analysis)
                    }
                };
                emitter.succeeded(stage, "Summary ready", None);
                RunState::Completed(RunOutcome::NotWorthy(response))
            }

            RunState::Verifying(claims) => {
                let stage = Stage::Verifying;
                emitter.started(stage, format!("Verifying {} claims", claims.len()));

                let mut results = Vec::with_capacity(claims.len());
                for (index, claim) in claims.iter().enumerate() {
                    let result = {
                        let mut on_route = |route: Route| {
                            emitter.started(
                                stage,
                                format!("Verifying claim: {} with {}", claim.text, route.describe()),
                            );
                        };
                        self.verifier.verify_with(claim, &mut on_route).await
                    };

                    emitter.succeeded(
                        stage,
                        format!(
                            "Claim: {} verified with {}",
                            claim_preview(&claim.text),
                            result.verification_method
                        ),
                        Some(json!({
                            "index": index,
                            "method": result.verification_method,
                            "label": result.authenticity_label,
                            "score": result.authenticity_score,
                        })),
                    );
                    results.push(result);
                }

                RunState::Aggregating(results)
            }

            RunState::Aggregating(results) => {
                let stage = Stage::Aggregating;
                emitter.started(stage, "Generating overall assessment");
                let (assessment, source) = self.aggregator.aggregate_with_source(results).await;
                if source == NarrativeSource::Template {
                    emitter.warning(stage, "Summary generation failed, using a templated summary");
                }
                emitter.succeeded(
                    stage,
                    "Assessment complete",
                    Some(json!({
                        "overall_score": assessment.overall_score,
                        "overall_authenticity": assessment.overall_authenticity,
                    })),
                );
                RunState::Completed(RunOutcome::Verified(assessment))
            }

            terminal @ (RunState::Completed(_) | RunState::Failed { .. }) => terminal,
        }
    }
}

fn fail(emitter: &mut Emitter<'_>, stage: Stage, error: ReelCheckError) -> RunState {
    emitter.failed(stage, error.to_string());
    RunState::Failed { stage, error }
}

/// First `CLAIM_PREVIEW_CHARS` characters, with `...` only when cut.
fn claim_preview(text: &str) -> String {
    if text.chars().count() <= CLAIM_PREVIEW_CHARS {
        return text.to_string();
    }
    let head: String = text.chars().take(CLAIM_PREVIEW_CHARS).collect();
    format!("{head}...")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_claims_are_not_ellipsized() {
        assert_eq!(claim_preview("The Earth orbits the Sun"), "The Earth orbits the Sun");
        let exact = "a".repeat(CLAIM_PREVIEW_CHARS);
        assert_eq!(claim_preview(&exact), exact);
    }

    #[test]
    fn long_claims_are_cut_at_a_char_boundary() {
        let long = "é".repeat(CLAIM_PREVIEW_CHARS + 5);
        let preview = claim_preview(&long);
        assert!(preview.ends_with("..."));
        assert_eq!(preview.chars().count(), CLAIM_PREVIEW_CHARS + 3);
    }
}

