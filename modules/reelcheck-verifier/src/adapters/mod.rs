//! Production implementations of the collaborator traits.

pub mod claude_judge;
pub mod gemini_oracle;
pub mod instagram;
pub mod media;
pub mod perplexity;
pub mod scraper;
pub mod search;
pub mod transcriber;

use std::sync::Arc;

use tracing::info;

use ai_client::{Claude, Gemini};
use reelcheck_common::Config;

use crate::orchestrator::{Pipeline, PipelineDeps};
use crate::traits::{FallbackOracle, Transcriber};

pub use claude_judge::ClaudeJudge;
pub use gemini_oracle::GeminiContentOracle;
pub use instagram::InstagramResolver;
pub use media::FfmpegAcquirer;
pub use perplexity::{PerplexityFallback, UnavailableFallback};
pub use scraper::ReadabilityScraper;
pub use search::SerperSearcher;
pub use transcriber::{DisabledTranscriber, WhisperTranscriber};

/// Wire every production adapter from config. Clients are built once here
/// and shared by all runs of the returned pipeline.
pub fn build_pipeline(config: &Config) -> Pipeline {
    let judge = Arc::new(ClaudeJudge::new(Claude::new(
        &config.anthropic_api_key,
        &config.claude_model,
    )));

    let transcriber: Arc<dyn Transcriber> = match &config.openai_api_key {
        Some(key) => Arc::new(WhisperTranscriber::new(key)),
        None => Arc::new(DisabledTranscriber),
    };
    let fallback: Arc<dyn FallbackOracle> = match &config.perplexity_api_key {
        Some(key) => Arc::new(PerplexityFallback::new(key, &config.perplexity_model)),
        None => Arc::new(UnavailableFallback),
    };

    info!(
        claude = %config.claude_model,
        gemini = %config.gemini_model,
        fallback = fallback.name(),
        artifact_dir = %config.artifact_dir.display(),
        "Building pipeline"
    );

    let deps = PipelineDeps::builder()
        .resolver(Arc::new(InstagramResolver::new()))
        .acquirer(Arc::new(FfmpegAcquirer::new(&config.artifact_dir)))
        .transcriber(transcriber)
        .content_oracle(Arc::new(GeminiContentOracle::new(Gemini::new(
            &config.gemini_api_key,
            &config.gemini_model,
        ))))
        .knowledge(judge.clone())
        .fallback(fallback)
        .planner(judge.clone())
        .searcher(Arc::new(SerperSearcher::new(&config.serper_api_key)))
        .scraper(Arc::new(ReadabilityScraper::new()))
        .narrator(judge)
        .scrape_concurrency(config.scrape_concurrency)
        .build();

    Pipeline::new(deps)
}
