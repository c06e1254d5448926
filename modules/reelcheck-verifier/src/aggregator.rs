use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{info, warn};

use reelcheck_common::{
    clamp_unit, AuthenticityLabel, Narrative, OverallAssessment, ReelCheckError,
    VerificationResult,
};

use crate::traits::Narrator;

pub const NO_CLAIMS_LABEL: &str = "No Claims to Verify";
pub const NO_CLAIMS_SUMMARY: &str =
    "No factual claims were found in this video that require verification.";
pub const NO_CLAIMS_RECOMMENDATION: &str =
    "This content appears to be safe to view as it contains no verifiable claims.";

/// Where the narrative fields of an assessment came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NarrativeSource {
    Generated,
    Template,
    /// Empty input, nothing to narrate.
    Neutral,
}

#[derive(Clone)]
pub struct Aggregator {
    narrator: Arc<dyn Narrator>,
}

impl Aggregator {
    pub fn new(narrator: Arc<dyn Narrator>) -> Self {
        Self { narrator }
    }

    pub async fn aggregate(&self, results: Vec<VerificationResult>) -> OverallAssessment {
        self.aggregate_with_source(results).await.0
    }

    /// The score never depends on the narrative call succeeding.
    pub async fn aggregate_with_source(
        &self,
        results: Vec<VerificationResult>,
    ) -> (OverallAssessment, NarrativeSource) {
        let Some(score) = mean_score(&results) else {
            info!("No claims to aggregate, returning neutral assessment");
            return (neutral_assessment(), NarrativeSource::Neutral);
        };

        let (narrative, source) = match self.narrator.narrate(&results, score).await {
            Ok(narrative) => (narrative, NarrativeSource::Generated),
            Err(e) => {
                let err = ReelCheckError::Narrative(format!("{e:#}"));
                warn!(error = %err, "Using templated summary");
                (templated_narrative(&results, score), NarrativeSource::Template)
            }
        };

        info!(score, claims = results.len(), label = narrative.overall_authenticity.as_str(), "Aggregated");

        let assessment = OverallAssessment {
            overall_authenticity: narrative.overall_authenticity,
            overall_score: score,
            summary: narrative.summary,
            recommendation: narrative.recommendation,
            individual_claims: results,
        };
        (assessment, source)
    }
}

/// Unweighted mean; skipped claims count at their 1.0 score. `None` when empty.
pub fn mean_score(results: &[VerificationResult]) -> Option<f64> {
    if results.is_empty() {
        return None;
    }
    let total: f64 = results.iter().map(|r| r.authenticity_score).sum();
    Some(clamp_unit(total / results.len() as f64))
}

pub fn neutral_assessment() -> OverallAssessment {
    OverallAssessment {
        overall_authenticity: NO_CLAIMS_LABEL.to_string(),
        overall_score: 1.0,
        summary: NO_CLAIMS_SUMMARY.to_string(),
        recommendation: NO_CLAIMS_RECOMMENDATION.to_string(),
        individual_claims: Vec::new(),
    }
}

/// Deterministic narrative built only from the score and label counts.
pub fn templated_narrative(results: &[VerificationResult], score: f64) -> Narrative {
    let mut counts: BTreeMap<usize, (AuthenticityLabel, usize)> = BTreeMap::new();
    for r in results {
        let idx = AuthenticityLabel::ALL
            .iter()
            .position(|l| *l == r.authenticity_label)
            .unwrap_or(0);
        counts.entry(idx).or_insert((r.authenticity_label, 0)).1 += 1;
    }
    let breakdown = counts
        .values()
        .map(|(label, n)| format!("{n} {label}"))
        .collect::<Vec<_>>()
        .join(", ");

    let (label, recommendation) = if score >= 0.8 {
        (
            "Likely Authentic",
            "The checked claims largely hold up. Review the individual results for details.",
        )
    } else if score >= 0.5 {
        (
            "Mixed Accuracy",
            "Some claims could not be confirmed or are inaccurate. Treat this content with caution.",
        )
    } else {
        (
            "Likely Misleading",
            "Several claims appear false or misleading. Verify with trusted sources before sharing.",
        )
    };

    let noun = if results.len() == 1 { "claim" } else { "claims" };
    Narrative {
        overall_authenticity: label.to_string(),
        summary: format!(
            "Checked {} {noun} with an overall authenticity score of {:.2} ({breakdown}).",
            results.len(),
            score
        ),
        recommendation: recommendation.to_string(),
    }
}
