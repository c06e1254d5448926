use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, warn};

use ai_client::{extract_json_object, strip_code_blocks, ChatAnswer, OpenAi};
use reelcheck_common::{AuthenticityLabel, Verdict};

use crate::traits::FallbackOracle;

pub const PERPLEXITY_BASE_URL: &str = "https://api.perplexity.ai";
const TEMPERATURE: f32 = 0.1;
const MAX_TOKENS: u32 = 2000;

const SYSTEM: &str =
    "You are a professional fact-checker that provides responses in valid JSON format only.";

pub fn fallback_prompt(claim: &str) -> String {
    format!(
        r#"Analyze the following claim and provide a detailed fact-check.

Claim: "{claim}"

Respond with valid JSON only, using exactly these fields:
{{
    "authenticity_score": <float between 0.0 and 1.0>,
    "authenticity_label": "<one of: True, False, Partially True, Misleading, Unverifiable>",
    "explanation": "<detailed explanation based on web evidence with sources>",
    "evidence_sources": ["<URLs used for verification>"],
    "confidence": <float between 0.0 and 1.0>
}}

authenticity_score: 1.0 = completely true, 0.0 = completely false, 0.5 = uncertain."#
    )
}

#[derive(Debug, Default, Deserialize)]
struct FallbackResponse {
    #[serde(default)]
    authenticity_score: Option<f64>,
    #[serde(default)]
    authenticity_label: Option<String>,
    #[serde(default)]
    explanation: Option<String>,
    #[serde(default)]
    evidence_sources: Option<serde_json::Value>,
    #[serde(default)]
    confidence: Option<f64>,
}

/// Turn a fallback answer into a verdict. Unparseable text becomes an
/// Unverifiable verdict carrying the text as its explanation. Sources are the
/// provider's citations, then any URLs the JSON lists, deduplicated.
pub fn parse_fallback_answer(answer: &ChatAnswer) -> Verdict {
    let content = answer.content.trim();
    let parsed = serde_json::from_str::<FallbackResponse>(strip_code_blocks(content))
        .ok()
        .or_else(|| {
            extract_json_object(content).and_then(|obj| serde_json::from_str(obj).ok())
        });

    let Some(response) = parsed else {
        warn!("Fallback answer was not JSON");
        let explanation = if content.is_empty() {
            "No explanation provided"
        } else {
            content
        };
        return Verdict::unverifiable(explanation).with_sources(answer.citations.clone());
    };

    let listed: Vec<String> = match response.evidence_sources {
        Some(serde_json::Value::Array(items)) => items
            .into_iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    };
    let mut sources: Vec<String> = Vec::new();
    for url in answer.citations.iter().cloned().chain(listed) {
        if !url.trim().is_empty() && !sources.contains(&url) {
            sources.push(url);
        }
    }

    let label = response
        .authenticity_label
        .as_deref()
        .map(AuthenticityLabel::parse_lenient)
        .unwrap_or(AuthenticityLabel::Unverifiable);
    let explanation = response
        .explanation
        .filter(|e| !e.trim().is_empty())
        .unwrap_or_else(|| "No explanation provided".to_string());

    Verdict::new(
        response.authenticity_score.unwrap_or(0.5),
        label,
        explanation,
        response.confidence.unwrap_or(0.5),
    )
    .with_sources(sources)
}

/// Perplexity's web-grounded chat, reached through the OpenAI-compatible client.
pub struct PerplexityFallback {
    ai: OpenAi,
}

impl PerplexityFallback {
    pub fn new(api_key: &str, model: &str) -> Self {
        Self {
            ai: OpenAi::new(api_key, model).with_base_url(PERPLEXITY_BASE_URL),
        }
    }

    pub fn with_client(ai: OpenAi) -> Self {
        Self { ai }
    }
}

#[async_trait]
impl FallbackOracle for PerplexityFallback {
    async fn verify(&self, claim: &str) -> Result<Verdict> {
        info!(model = self.ai.model(), "Fallback verification");
        let answer = self
            .ai
            .chat_completion(SYSTEM, fallback_prompt(claim), TEMPERATURE, MAX_TOKENS)
            .await?;
        let verdict = parse_fallback_answer(&answer);
        info!(
            label = %verdict.label,
            sources = verdict.sources.len(),
            "Fallback verification complete"
        );
        Ok(verdict)
    }

    fn name(&self) -> &str {
        "perplexity"
    }
}

/// Stand-in when no fallback key is configured. Every call is an error, which
/// the verifier records as an error result for the claim.
pub struct UnavailableFallback;

#[async_trait]
impl FallbackOracle for UnavailableFallback {
    async fn verify(&self, _claim: &str) -> Result<Verdict> {
        bail!("Fallback verification is not configured (PERPLEXITY_API_KEY not set)")
    }

    fn name(&self) -> &str {
        "unavailable"
    }
}
