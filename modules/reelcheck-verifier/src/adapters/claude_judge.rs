use anyhow::Result;
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use tracing::{debug, info};

use ai_client::Claude;
use reelcheck_common::{
    AuthenticityLabel, KnowledgeAssessment, Narrative, NotWorthyResponse, VerificationResult,
    Verdict, VideoAnalysis,
};

use crate::query_optimizer::{RawSearchPlan, BACKENDS, REGIONS};
use crate::retriever::Retrieval;
use crate::traits::{KnowledgeOracle, Narrator, QueryPlanner};

const FACT_CHECKER_SYSTEM: &str =
    "You are an expert fact-checker. Be precise, cite what you rely on, and prefer Unverifiable over guessing.";

pub const DEFAULT_ASSESSMENT_LABEL: &str = "Assessment Completed";
pub const DEFAULT_ASSESSMENT_SUMMARY: &str =
    "Analysis completed based on individual claim verification results.";
pub const DEFAULT_ASSESSMENT_RECOMMENDATION: &str =
    "Please review the individual claim results for detailed information.";

// --- Wire types ---

/// Verdict as the model returns it. Missing fields get neutral defaults.
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct VerdictResponse {
    /// 0.0 = completely false, 1.0 = completely true, 0.5 = uncertain.
    pub authenticity_score: Option<f64>,
    /// One of: True, False, Partially True, Misleading, Unverifiable.
    pub authenticity_label: Option<String>,
    pub explanation: Option<String>,
    /// How sure you are of this assessment, 0.0 to 1.0.
    pub confidence: Option<f64>,
}

impl VerdictResponse {
    pub fn into_verdict(self, default_explanation: &str) -> Verdict {
        let label = self
            .authenticity_label
            .as_deref()
            .map(AuthenticityLabel::parse_lenient)
            .unwrap_or(AuthenticityLabel::Unverifiable);
        let explanation = self
            .explanation
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| default_explanation.to_string());
        Verdict::new(
            self.authenticity_score.unwrap_or(0.5),
            label,
            explanation,
            self.confidence.unwrap_or(0.5),
        )
    }
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct NarrativeResponse {
    /// Short overall label for the reel, e.g. "Mostly Accurate" or "Misleading".
    pub overall_authenticity: Option<String>,
    pub summary: Option<String>,
    /// Clear recommendation for viewers of this content.
    pub recommendation: Option<String>,
}

impl NarrativeResponse {
    pub fn into_narrative(self) -> Narrative {
        fn or(value: Option<String>, default: &str) -> String {
            value
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        }
        Narrative {
            overall_authenticity: or(self.overall_authenticity, DEFAULT_ASSESSMENT_LABEL),
            summary: or(self.summary, DEFAULT_ASSESSMENT_SUMMARY),
            recommendation: or(self.recommendation, DEFAULT_ASSESSMENT_RECOMMENDATION),
        }
    }
}

// --- Prompts ---

pub fn knowledge_check_prompt(claim: &str) -> String {
    format!(
        r#"Decide whether the following claim can be verified from your existing knowledge alone, or whether it needs a web search for current or specific information.

Claim: "{claim}"

Consider:
1. Is this general knowledge, a historical fact, a scientific principle, a past event, or otherwise well-established information?
2. Does it require current events, recent news, specific statistics, or real-time data?
3. Does it involve specific people, companies, or events that might have recent developments?
4. Is this a fact or an opinion?

Set can_verify to true only when background knowledge is enough. complexity is one of simple, moderate, complex."#
    )
}

pub fn internal_verification_prompt(claim: &str, video_evidence: &str) -> String {
    format!(
        r#"Verify the following claim using your existing knowledge.

Claim: "{claim}"
Evidence from video: "{video_evidence}"

Consider:
1. Is the claim factually accurate based on established knowledge?
2. Is there any misleading information or missing context?
3. Are there any logical fallacies or misrepresentations?"#
    )
}

pub fn evidence_verification_prompt(claim: &str, video_evidence: &str, retrieval: &Retrieval) -> String {
    let sources = if retrieval.sources.is_empty() {
        "none".to_string()
    } else {
        retrieval.sources.join("\n")
    };
    format!(
        r#"Analyze the following claim using the provided web search evidence.

Claim: "{claim}"
Evidence from video: "{video_evidence}"

Web evidence:
{evidence}

Web sources:
{sources}

Based only on the web evidence:
1. Does it support or refute the claim?
2. Are there contradictions or additional context?
3. How credible are the sources?
If the evidence is missing or does not address the claim, answer Unverifiable."#,
        evidence = retrieval.evidence_summary(),
    )
}

pub fn planning_prompt(claim: &str, today: chrono::NaiveDate) -> String {
    format!(
        r#"Turn a claim into parameters for a web search that would confirm or refute it.

Current date: {today}

Claim: "{claim}"

Fields:
- query: concise keyword query. Add the current year for recent or news topics. Use quotes for exact phrases.
- region: one of {regions}.
- safesearch: on, moderate or off.
- timelimit: d, w, m, y for recent topics, or null.
- max_results: between 1 and 200, usually 10.
- backend: auto, or a comma list drawn from {backends}."#,
        regions = REGIONS.join(", "),
        backends = BACKENDS.join(", "),
    )
}

pub fn narrative_prompt(results: &[VerificationResult], overall_score: f64) -> String {
    let summaries = results
        .iter()
        .map(|r| {
            format!(
                "Claim: {}\nLabel: {}\nScore: {}\nExplanation: {}",
                r.claim, r.authenticity_label, r.authenticity_score, r.explanation
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");
    format!(
        r#"Provide the final assessment of a social media reel's authenticity from the individual claim results below.

Individual Claim Results:
{summaries}

Overall Score: {overall_score}"#
    )
}

pub fn not_worthy_prompt(analysis: &VideoAnalysis) -> String {
    format!(
        r#"A short video was judged not worth fact-checking.

Category: {category}
Description: {summary}
Reason given: {reason}

Write a short, friendly summary of what the video is, and explain in one or two sentences why it does not need fact-checking."#,
        category = analysis.category,
        summary = analysis.summary,
        reason = analysis.why_not_worthy.as_deref().unwrap_or("none"),
    )
}

// --- Judge ---

/// Claude-backed knowledge checks, query planning and narration.
pub struct ClaudeJudge {
    ai: Claude,
}

impl ClaudeJudge {
    pub fn new(ai: Claude) -> Self {
        Self { ai }
    }
}

#[async_trait]
impl KnowledgeOracle for ClaudeJudge {
    async fn assess(&self, claim: &str) -> Result<KnowledgeAssessment> {
        let assessment: KnowledgeAssessment = self
            .ai
            .extract(FACT_CHECKER_SYSTEM, knowledge_check_prompt(claim))
            .await?;
        debug!(
            can_verify = assessment.can_verify,
            complexity = %assessment.complexity,
            "Knowledge check"
        );
        Ok(assessment)
    }

    async fn verify_internally(&self, claim: &str, video_evidence: &str) -> Result<Verdict> {
        let response: VerdictResponse = self
            .ai
            .extract(
                FACT_CHECKER_SYSTEM,
                internal_verification_prompt(claim, video_evidence),
            )
            .await?;
        Ok(response.into_verdict("Analysis completed using LLM knowledge"))
    }

    async fn verify_with_evidence(
        &self,
        claim: &str,
        video_evidence: &str,
        retrieval: &Retrieval,
    ) -> Result<Verdict> {
        let response: VerdictResponse = self
            .ai
            .extract(
                FACT_CHECKER_SYSTEM,
                evidence_verification_prompt(claim, video_evidence, retrieval),
            )
            .await?;
        Ok(response.into_verdict("Analysis completed using web search evidence"))
    }
}

#[async_trait]
impl QueryPlanner for ClaudeJudge {
    async fn plan(&self, claim: &str) -> Result<RawSearchPlan> {
        let today = chrono::Utc::now().date_naive();
        let plan: RawSearchPlan = self
            .ai
            .extract(
                "You optimize web search queries for fact-checking.",
                planning_prompt(claim, today),
            )
            .await?;
        info!(query = ?plan.query, region = ?plan.region, "Search plan");
        Ok(plan)
    }
}

#[async_trait]
impl Narrator for ClaudeJudge {
    async fn narrate(&self, results: &[VerificationResult], overall_score: f64) -> Result<Narrative> {
        let response: NarrativeResponse = self
            .ai
            .extract(FACT_CHECKER_SYSTEM, narrative_prompt(results, overall_score))
            .await?;
        Ok(response.into_narrative())
    }

    async fn not_worthy(&self, analysis: &VideoAnalysis) -> Result<NotWorthyResponse> {
        self.ai
            .extract(
                "You summarize short social media videos for viewers.",
                not_worthy_prompt(analysis),
            )
            .await
    }
}
