use std::path::Path;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use tracing::{info, warn};

use ai_client::{extract_json_object, strip_code_blocks, Gemini, InlineMedia};
use reelcheck_common::VideoAnalysis;

use crate::traits::ContentOracle;

const ANALYSIS_PROMPT: &str = r#"You are an expert fact-checking analyst.

Your job is to analyze a short video and provide structured data.

Respond with a single JSON object of this shape:
{
  "category": "meme | educational | vlog | news | political | health | advertisement | ...",
  "summary": "one or two sentences describing the video",
  "is_worthy": true,
  "why_not_worthy": null,
  "claims": [
    { "claim": "...", "evidence": "...", "is_worth_verifying": true }
  ]
}

Tasks:
1. Classify the video category (e.g., meme, educational, vlog, political, etc.).
2. Determine whether the video is worthy of checking:
    - If it contains health, political, scientific, or potentially misleading claims, set is_worthy to true.
    - If it's just humor, entertainment, or doesn't contain any factual claims, set is_worthy to false and explain why in why_not_worthy.
3. If is_worthy is true, extract each major claim made:
    - claim: The specific factual statement, stated so it can be checked on its own. Name the people, places and numbers involved. For sales or offers, phrase it as "<item> at <price> in <place>".
    - evidence: What in the video supports it? (captions, speech, visuals)
    - is_worth_verifying: Whether it seems controversial, exaggerated, or false enough to need checking.
"#;

pub fn analysis_prompt(transcript: Option<&str>) -> String {
    match transcript.map(str::trim).filter(|t| !t.is_empty()) {
        Some(transcript) => format!(
            "{ANALYSIS_PROMPT}\nUse the transcript below to understand context. Do not include it in your final response.\n```\n{transcript}\n```\n"
        ),
        None => ANALYSIS_PROMPT.to_string(),
    }
}

pub fn mime_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "webm" => "video/webm",
        "avi" => "video/x-msvideo",
        "mov" => "video/quicktime",
        "mkv" => "video/x-matroska",
        _ => "video/mp4",
    }
}

/// Parse the model's answer, falling back to the first `{...}` in the text.
pub fn parse_analysis(raw: &str) -> Result<VideoAnalysis> {
    let cleaned = strip_code_blocks(raw);
    if let Ok(analysis) = serde_json::from_str::<VideoAnalysis>(cleaned) {
        return Ok(analysis);
    }
    let object = extract_json_object(raw).ok_or_else(|| anyhow!("No JSON object in video analysis"))?;
    serde_json::from_str(object).context("Video analysis JSON did not match the expected shape")
}

pub struct GeminiContentOracle {
    ai: Gemini,
}

impl GeminiContentOracle {
    pub fn new(ai: Gemini) -> Self {
        Self { ai }
    }
}

#[async_trait]
impl ContentOracle for GeminiContentOracle {
    async fn analyze(&self, video_path: &Path, transcript: Option<&str>) -> Result<VideoAnalysis> {
        let bytes = tokio::fs::read(video_path)
            .await
            .with_context(|| format!("Video file not found: {}", video_path.display()))?;
        let media = InlineMedia {
            mime_type: mime_for(video_path).to_string(),
            bytes,
        };
        info!(
            model = self.ai.model(),
            mime = %media.mime_type,
            bytes = media.bytes.len(),
            transcript = transcript.is_some(),
            "Analyzing video"
        );

        let raw = self
            .ai
            .generate_json(&analysis_prompt(transcript), Some(&media))
            .await?;
        let analysis = parse_analysis(&raw).inspect_err(|e| {
            warn!(error = %e, "Unparseable video analysis");
        })?;

        info!(
            category = %analysis.category,
            claims = analysis.claims.len(),
            is_worthy = analysis.is_worthy,
            "Video analysis parsed"
        );
        Ok(analysis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_follows_extension() {
        assert_eq!(mime_for(Path::new("a.MOV")), "video/quicktime");
        assert_eq!(mime_for(Path::new("a.webm")), "video/webm");
        assert_eq!(mime_for(Path::new("a.mkv")), "video/x-matroska");
        assert_eq!(mime_for(Path::new("a.avi")), "video/x-msvideo");
        assert_eq!(mime_for(Path::new("a.mp4")), "video/mp4");
        assert_eq!(mime_for(Path::new("noext")), "video/mp4");
    }

    #[test]
    fn transcript_is_appended_only_when_present() {
        assert!(!analysis_prompt(None).contains("transcript below"));
        assert!(!analysis_prompt(Some("   ")).contains("transcript below"));
        let prompt = analysis_prompt(Some("hello world"));
        assert!(prompt.contains("transcript below"));
        assert!(prompt.ends_with("```\nhello world\n```\n"));
    }

    #[test]
    fn parses_fenced_answer() {
        let raw = "```json\n{\"category\":\"news\",\"is_worthy\":true,\"claims\":[{\"claim\":\"X\",\"evidence\":\"Y\",\"is_worth_verifying\":true}]}\n```";
        let analysis = parse_analysis(raw).unwrap();
        assert_eq!(analysis.category, "news");
        assert_eq!(analysis.claims.len(), 1);
        assert!(analysis.claims[0].worth_verifying);
    }

    #[test]
    fn parses_object_buried_in_prose() {
        let raw = "Here you go: {\"category\":\"meme\",\"is_worthy\":false,\"why_not_worthy\":\"a joke\"} hope it helps";
        let analysis = parse_analysis(raw).unwrap();
        assert!(!analysis.is_worthy);
        assert_eq!(analysis.why_not_worthy.as_deref(), Some("a joke"));
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(parse_analysis("sorry, I cannot watch videos").is_err());
        assert!(parse_analysis("{\"category\": 3}").is_err());
    }
}
