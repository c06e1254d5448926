//! Aggregator and QueryOptimizer against mock narrator / planner.

use std::sync::Arc;

use serde_json::json;

use reelcheck_common::{AuthenticityLabel, VerificationMethod, VerificationResult, Verdict};
use reelcheck_verifier::aggregator::{NarrativeSource, NO_CLAIMS_LABEL, NO_CLAIMS_RECOMMENDATION};
use reelcheck_verifier::query_optimizer::{RawSearchPlan, REGIONS};
use reelcheck_verifier::testing::*;
use reelcheck_verifier::{Aggregator, QueryOptimizer};

fn web_result(score: f64) -> VerificationResult {
    VerificationResult::from_verdict(
        "c",
        VerificationMethod::Web,
        Verdict::new(score, AuthenticityLabel::PartiallyTrue, "e", 0.7),
    )
}

// ---------------------------------------------------------------------------
// Aggregator
// ---------------------------------------------------------------------------

#[tokio::test]
async fn empty_results_are_neutral_and_skip_narration() {
    let narrator = Arc::new(MockNarrator::new().with_narrative("x", "y", "z"));
    let aggregator = Aggregator::new(narrator.clone());

    let (assessment, source) = aggregator.aggregate_with_source(vec![]).await;

    assert_eq!(source, NarrativeSource::Neutral);
    assert_eq!(assessment.overall_score, 1.0);
    assert_eq!(assessment.overall_authenticity, NO_CLAIMS_LABEL);
    assert_eq!(assessment.recommendation, NO_CLAIMS_RECOMMENDATION);
    assert_eq!(narrator.narrate_calls(), 0);
}

#[tokio::test]
async fn score_is_the_mean_regardless_of_narrative() {
    let lists: Vec<Vec<f64>> = vec![
        vec![0.3],
        vec![0.0, 1.0],
        vec![0.12, 0.57, 0.99, 0.41],
        (0..25).map(|i| (i as f64) / 24.0).collect(),
    ];

    for scores in lists {
        let expected = scores.iter().sum::<f64>() / scores.len() as f64;
        let results: Vec<VerificationResult> = scores.iter().copied().map(web_result).collect();

        let with_story = Aggregator::new(Arc::new(MockNarrator::new().with_narrative("L", "S", "R")))
            .aggregate(results.clone())
            .await;
        let without_story = Aggregator::new(Arc::new(MockNarrator::new()))
            .aggregate(results)
            .await;

        assert!((with_story.overall_score - expected).abs() < 1e-9);
        assert!((without_story.overall_score - expected).abs() < 1e-9);
    }
}

#[tokio::test]
async fn generated_narrative_fills_text_fields() {
    let aggregator = Aggregator::new(Arc::new(MockNarrator::new().with_narrative(
        "Misleading",
        "The main claim is false.",
        "Do not share.",
    )));

    let (assessment, source) = aggregator
        .aggregate_with_source(vec![web_result(0.1), web_result(0.2)])
        .await;

    assert_eq!(source, NarrativeSource::Generated);
    assert_eq!(assessment.overall_authenticity, "Misleading");
    assert_eq!(assessment.summary, "The main claim is false.");
    assert_eq!(assessment.recommendation, "Do not share.");
    assert_eq!(assessment.individual_claims.len(), 2);
}

// ---------------------------------------------------------------------------
// QueryOptimizer
// ---------------------------------------------------------------------------

#[tokio::test]
async fn planner_error_yields_default_config() {
    let optimizer = QueryOptimizer::new(Arc::new(MockPlanner::new()));

    let config = optimizer.optimize("  Is coffee bad for you?  ").await;

    assert_eq!(config.query(), "Is coffee bad for you?");
    assert_eq!(config.region(), "us-en");
    assert_eq!(config.max_results(), 10);
    assert_eq!(config.backend(), "auto");
}

#[tokio::test]
async fn planner_empty_query_yields_default_config() {
    let claim = "Vaccines contain microchips";
    let planner = MockPlanner::new().on_claim(
        claim,
        RawSearchPlan {
            query: Some("".into()),
            region: Some("de-de".into()),
            ..Default::default()
        },
    );
    let optimizer = QueryOptimizer::new(Arc::new(planner));

    let config = optimizer.optimize(claim).await;

    assert_eq!(config.query(), claim);
    assert_eq!(config.region(), "us-en");
}

#[tokio::test]
async fn planner_garbage_is_normalized() {
    let claim = "Gas costs $9 a gallon";
    let garbage = [
        json!({"query": "gas price", "region": 42, "max_results": "many"}),
        json!({"query": "gas price", "region": "moon-base", "max_results": -3}),
        json!({"query": "gas price", "region": "WT-WT", "max_results": 1e9}),
    ];

    for raw in garbage {
        // A non-string region fails to deserialize; model that as a planner error.
        let plan: Option<RawSearchPlan> = serde_json::from_value(raw).ok();
        let planner = match plan {
            Some(plan) => MockPlanner::new().on_claim(claim, plan),
            None => MockPlanner::new(),
        };
        let config = QueryOptimizer::new(Arc::new(planner)).optimize(claim).await;

        assert!(REGIONS.contains(&config.region()));
        assert!((1..=200).contains(&config.max_results()));
    }
}
