use std::path::PathBuf;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Clamp into [0, 1]. NaN collapses to 0.
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

// --- Claims ---

/// A factual assertion extracted from a video. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Claim {
    #[serde(rename = "claim")]
    pub text: String,
    /// What in the video supports the claim (captions, speech, visuals).
    #[serde(default)]
    pub evidence: String,
    #[serde(rename = "is_worth_verifying", default = "default_true")]
    pub worth_verifying: bool,
}

fn default_true() -> bool {
    true
}

impl Claim {
    pub fn new(text: impl Into<String>, evidence: impl Into<String>, worth_verifying: bool) -> Self {
        Self {
            text: text.into(),
            evidence: evidence.into(),
            worth_verifying,
        }
    }
}

// --- Verification ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum VerificationMethod {
    Internal,
    Web,
    Fallback,
    Skipped,
    Error,
}

impl std::fmt::Display for VerificationMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VerificationMethod::Internal => write!(f, "internal"),
            VerificationMethod::Web => write!(f, "web"),
            VerificationMethod::Fallback => write!(f, "fallback"),
            VerificationMethod::Skipped => write!(f, "skipped"),
            VerificationMethod::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum AuthenticityLabel {
    True,
    False,
    #[serde(rename = "Partially True")]
    PartiallyTrue,
    Misleading,
    Unverifiable,
    #[serde(rename = "Not Verified")]
    NotVerified,
}

impl AuthenticityLabel {
    pub const ALL: [AuthenticityLabel; 6] = [
        AuthenticityLabel::True,
        AuthenticityLabel::False,
        AuthenticityLabel::PartiallyTrue,
        AuthenticityLabel::Misleading,
        AuthenticityLabel::Unverifiable,
        AuthenticityLabel::NotVerified,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AuthenticityLabel::True => "True",
            AuthenticityLabel::False => "False",
            AuthenticityLabel::PartiallyTrue => "Partially True",
            AuthenticityLabel::Misleading => "Misleading",
            AuthenticityLabel::Unverifiable => "Unverifiable",
            AuthenticityLabel::NotVerified => "Not Verified",
        }
    }

    /// Case- and separator-insensitive parse of model output. Anything
    /// unrecognised is `Unverifiable`.
    pub fn parse_lenient(raw: &str) -> Self {
        let normalized: String = raw
            .trim()
            .chars()
            .filter(|c| c.is_alphanumeric())
            .flat_map(char::to_lowercase)
            .collect();
        match normalized.as_str() {
            "true" => AuthenticityLabel::True,
            "false" => AuthenticityLabel::False,
            "partiallytrue" | "partlytrue" | "mixed" => AuthenticityLabel::PartiallyTrue,
            "misleading" => AuthenticityLabel::Misleading,
            "notverified" => AuthenticityLabel::NotVerified,
            _ => AuthenticityLabel::Unverifiable,
        }
    }
}

impl std::fmt::Display for AuthenticityLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated output of a single verification call, before it is bound to a
/// claim and a method.
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub score: f64,
    pub label: AuthenticityLabel,
    pub explanation: String,
    pub confidence: f64,
    pub sources: Vec<String>,
}

impl Verdict {
    pub fn new(
        score: f64,
        label: AuthenticityLabel,
        explanation: impl Into<String>,
        confidence: f64,
    ) -> Self {
        Self {
            score: clamp_unit(score),
            label,
            explanation: explanation.into(),
            confidence: clamp_unit(confidence),
            sources: Vec::new(),
        }
    }

    /// Neutral verdict used when a response is missing fields or found nothing.
    pub fn unverifiable(explanation: impl Into<String>) -> Self {
        Self::new(0.5, AuthenticityLabel::Unverifiable, explanation, 0.5)
    }

    pub fn with_sources(mut self, sources: Vec<String>) -> Self {
        self.sources = sources;
        self
    }
}

/// Exactly one per claim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub claim: String,
    pub verification_method: VerificationMethod,
    pub authenticity_score: f64,
    pub authenticity_label: AuthenticityLabel,
    pub explanation: String,
    /// Always `None` for internal, skipped and error results; an ordered
    /// (possibly empty) list for web and fallback.
    pub evidence_sources: Option<Vec<String>>,
    pub confidence: f64,
}

impl VerificationResult {
    pub fn from_verdict(claim: impl Into<String>, method: VerificationMethod, verdict: Verdict) -> Self {
        let evidence_sources = match method {
            VerificationMethod::Web | VerificationMethod::Fallback => Some(verdict.sources),
            VerificationMethod::Internal | VerificationMethod::Skipped | VerificationMethod::Error => None,
        };
        Self {
            claim: claim.into(),
            verification_method: method,
            authenticity_score: clamp_unit(verdict.score),
            authenticity_label: verdict.label,
            explanation: verdict.explanation,
            evidence_sources,
            confidence: clamp_unit(verdict.confidence),
        }
    }

    pub fn skipped(claim: impl Into<String>) -> Self {
        Self {
            claim: claim.into(),
            verification_method: VerificationMethod::Skipped,
            authenticity_score: 1.0,
            authenticity_label: AuthenticityLabel::NotVerified,
            explanation: "This claim was deemed not significant enough for verification.".to_string(),
            evidence_sources: None,
            confidence: 1.0,
        }
    }

    pub fn error(claim: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self {
            claim: claim.into(),
            verification_method: VerificationMethod::Error,
            authenticity_score: 0.5,
            authenticity_label: AuthenticityLabel::Unverifiable,
            explanation: format!("Unable to verify this claim due to: {reason}"),
            evidence_sources: None,
            confidence: 0.0,
        }
    }
}

// --- Assessment ---

/// Narrative fields produced by the synthesis call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Narrative {
    /// Short overall label, e.g. "Mostly Accurate" or "Misleading".
    pub overall_authenticity: String,
    pub summary: String,
    pub recommendation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverallAssessment {
    pub overall_authenticity: String,
    pub overall_score: f64,
    pub summary: String,
    pub recommendation: String,
    pub individual_claims: Vec<VerificationResult>,
}

/// Answer to "can this be checked from background knowledge alone?".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct KnowledgeAssessment {
    pub can_verify: bool,
    pub reasoning: String,
    /// One of simple, moderate, complex.
    pub complexity: String,
    pub requires_current_data: bool,
}

// --- Video analysis ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoAnalysis {
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub claims: Vec<Claim>,
    #[serde(default)]
    pub summary: String,
    #[serde(alias = "worthy")]
    pub is_worthy: bool,
    #[serde(default)]
    pub why_not_worthy: Option<String>,
}

fn default_category() -> String {
    "Unknown".to_string()
}

/// Terminal payload for videos with nothing worth checking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct NotWorthyResponse {
    pub summary: String,
    pub reason: String,
    pub category: String,
}

impl NotWorthyResponse {
    /// Templated response used when the narrative call fails.
    pub fn fallback(analysis: &VideoAnalysis) -> Self {
        let summary = if analysis.summary.trim().is_empty() {
            "This is a general entertainment video.".to_string()
        } else {
            analysis.summary.clone()
        };
        let reason = analysis
            .why_not_worthy
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or("No factual claims are made in this type of content.")
            .to_string();
        Self {
            summary,
            reason,
            category: analysis.category.clone(),
        }
    }
}

// --- Media ---

/// A validated post link and where its video lives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedMedia {
    pub shortcode: String,
    pub video_url: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Content-derived artifact name, `instagram_<shortcode>.mp4`.
    pub filename: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaArtifacts {
    pub video_path: PathBuf,
    pub audio_path: PathBuf,
}
