//! Claim verifier chain tests.
//!
//! Each test follows MOCK → FUNCTION → OUTPUT: configure the fake oracles,
//! search engine and scraper, call `ClaimVerifier::verify`, assert on the
//! result and on which external calls happened.

use std::sync::Arc;

use serde_json::json;

use reelcheck_common::{AuthenticityLabel, VerificationMethod, Verdict};
use reelcheck_verifier::query_optimizer::RawSearchPlan;
use reelcheck_verifier::testing::*;
use reelcheck_verifier::{ClaimVerifier, Route};

fn verifier(world: &MockWorld) -> ClaimVerifier {
    world.pipeline().verifier().clone()
}

// ---------------------------------------------------------------------------
// Skip
// ---------------------------------------------------------------------------

#[tokio::test]
async fn claim_not_worth_verifying_is_skipped_without_external_calls() {
    let world = MockWorld::new();

    let result = verifier(&world).verify(&claim("My cat is the cutest", false)).await;

    assert_eq!(result.verification_method, VerificationMethod::Skipped);
    assert_eq!(result.authenticity_score, 1.0);
    assert_eq!(result.confidence, 1.0);
    assert_eq!(result.authenticity_label, AuthenticityLabel::NotVerified);
    assert!(result.evidence_sources.is_none());
    assert_eq!(world.knowledge.calls(), 0);
    assert_eq!(world.planner.calls(), 0);
    assert_eq!(world.searcher.calls(), 0);
    assert_eq!(world.fallback.calls(), 0);
}

// ---------------------------------------------------------------------------
// Internal knowledge
// ---------------------------------------------------------------------------

#[tokio::test]
async fn well_known_fact_is_verified_internally_with_null_sources() {
    let text = "The Earth orbits the Sun";
    let mut world = MockWorld::new();
    world.knowledge = Arc::new(
        MockKnowledge::new()
            .on_claim(text, true)
            .on_internal(text, verdict(0.98, AuthenticityLabel::True)),
    );

    let result = verifier(&world).verify(&claim(text, true)).await;

    assert_eq!(result.verification_method, VerificationMethod::Internal);
    assert_eq!(result.authenticity_label, AuthenticityLabel::True);
    assert!(result.evidence_sources.is_none());
    assert_eq!(world.knowledge.internal_calls(), 1);
    assert_eq!(world.knowledge.internal_evidence_seen(), vec![format!("video shows: {text}")]);
    assert_eq!(world.knowledge.web_calls(), 0);
    assert_eq!(world.searcher.calls(), 0);
    assert_eq!(world.fallback.calls(), 0);
}

#[tokio::test]
async fn internal_verdict_with_sources_still_reports_null_sources() {
    let text = "Water boils at 100C at sea level";
    let mut world = MockWorld::new();
    world.knowledge = Arc::new(
        MockKnowledge::new().on_claim(text, true).on_internal(
            text,
            verdict(0.9, AuthenticityLabel::True).with_sources(vec!["https://made.up".into()]),
        ),
    );

    let result = verifier(&world).verify(&claim(text, true)).await;

    assert!(result.evidence_sources.is_none());
}

// ---------------------------------------------------------------------------
// Web → fallback chain
// ---------------------------------------------------------------------------

#[tokio::test]
async fn no_search_results_escalates_to_exactly_one_fallback() {
    let text = "Company X announced layoffs yesterday";
    let mut world = MockWorld::new();
    world.knowledge = Arc::new(MockKnowledge::new().on_claim(text, false));
    world.searcher = Arc::new(MockSearcher::new().on_query(text, vec![]));
    world.fallback = Arc::new(MockFallback::new().on_claim(
        text,
        verdict(0.7, AuthenticityLabel::PartiallyTrue)
            .with_sources(vec!["https://news.example/x-layoffs".into()]),
    ));

    let result = verifier(&world).verify(&claim(text, true)).await;

    assert_eq!(result.verification_method, VerificationMethod::Fallback);
    assert_eq!(result.authenticity_label, AuthenticityLabel::PartiallyTrue);
    assert_eq!(
        result.evidence_sources,
        Some(vec!["https://news.example/x-layoffs".to_string()])
    );
    assert_eq!(world.knowledge.web_calls(), 1);
    assert_eq!(world.fallback.calls(), 1);

    // The web judge still ran, and saw an explicitly empty retrieval.
    let seen = world.knowledge.retrievals_seen();
    assert_eq!(seen.len(), 1);
    assert!(!seen[0].has_evidence());
    assert!(seen[0].evidence_summary().starts_with("No evidence found"));
}

#[tokio::test]
async fn unverifiable_fallback_is_not_chained_again() {
    let text = "A secret meeting happened last night";
    let mut world = MockWorld::new();
    world.knowledge = Arc::new(MockKnowledge::new().on_claim(text, false));
    world.searcher = Arc::new(MockSearcher::new().on_query(text, vec![]));
    world.fallback = Arc::new(
        MockFallback::new().on_claim(text, verdict(0.5, AuthenticityLabel::Unverifiable)),
    );

    let result = verifier(&world).verify(&claim(text, true)).await;

    assert_eq!(result.verification_method, VerificationMethod::Fallback);
    assert_eq!(result.authenticity_label, AuthenticityLabel::Unverifiable);
    assert_eq!(result.evidence_sources, Some(vec![]));
    assert_eq!(world.fallback.calls(), 1);
}

#[tokio::test]
async fn conclusive_web_verdict_never_calls_fallback() {
    let text = "The city council voted to close Main Street";
    let mut world = MockWorld::new();
    world.knowledge = Arc::new(
        MockKnowledge::new()
            .on_claim(text, false)
            .on_web(text, verdict(0.1, AuthenticityLabel::False)),
    );
    world.searcher = Arc::new(MockSearcher::new().on_query(
        text,
        vec![
            search_result("https://council.example/minutes"),
            search_result("https://paper.example/main-street"),
            search_result("https://council.example/minutes#item-4"),
        ],
    ));
    world.scraper = Arc::new(
        MockScraper::new()
            .on_page("https://council.example/minutes", "Council voted against closing Main Street.")
            .on_page("https://paper.example/main-street", "Main Street stays open, council says."),
    );

    let result = verifier(&world).verify(&claim(text, true)).await;

    assert_eq!(result.verification_method, VerificationMethod::Web);
    assert_eq!(result.authenticity_label, AuthenticityLabel::False);
    assert_eq!(
        result.evidence_sources,
        Some(vec![
            "https://council.example/minutes".to_string(),
            "https://paper.example/main-street".to_string(),
        ])
    );
    assert_eq!(world.fallback.calls(), 0);
}

#[tokio::test]
async fn per_url_extraction_failures_leave_partial_evidence() {
    let text = "Acme recalled 10,000 kettles";
    let mut world = MockWorld::new();
    world.knowledge = Arc::new(
        MockKnowledge::new()
            .on_claim(text, false)
            .on_web(text, verdict(0.8, AuthenticityLabel::True)),
    );
    world.searcher = Arc::new(MockSearcher::new().on_query(
        text,
        vec![
            search_result("https://a.example/recall"),
            search_result("https://b.example/broken"),
            search_result("https://c.example/empty"),
            search_result("https://d.example/recall"),
        ],
    ));
    world.scraper = Arc::new(
        MockScraper::new()
            .on_page("https://a.example/recall", "Acme recalled kettles over a fault.")
            .on_page("https://c.example/empty", "   ")
            .on_page("https://d.example/recall", &"Acme kettles recalled. ".repeat(200)),
    );

    let result = verifier(&world).verify(&claim(text, true)).await;

    assert_eq!(result.verification_method, VerificationMethod::Web);
    assert_eq!(result.evidence_sources.as_ref().map(Vec::len), Some(4));
    assert_eq!(world.scraper.calls(), 4);

    let retrieval = &world.knowledge.retrievals_seen()[0];
    let urls: Vec<&str> = retrieval.evidence.iter().map(|e| e.url.as_str()).collect();
    assert_eq!(urls.len(), 2);
    assert!(urls.contains(&"https://a.example/recall"));
    assert!(urls.contains(&"https://d.example/recall"));
    assert!(retrieval.evidence.iter().all(|e| e.passage.len() <= 1000));
}

#[tokio::test]
async fn search_failure_still_runs_web_judge() {
    let text = "Prices doubled this week";
    let mut world = MockWorld::new();
    world.knowledge = Arc::new(MockKnowledge::new().on_claim(text, false));
    // No results registered: the searcher errors.
    world.fallback = Arc::new(MockFallback::new().on_claim(text, verdict(0.3, AuthenticityLabel::Misleading)));

    let result = verifier(&world).verify(&claim(text, true)).await;

    assert_eq!(world.knowledge.web_calls(), 1);
    assert_eq!(result.verification_method, VerificationMethod::Fallback);
    assert_eq!(result.authenticity_label, AuthenticityLabel::Misleading);
}

#[tokio::test]
async fn routes_are_reported_in_order() {
    let text = "Company X announced layoffs yesterday";
    let mut world = MockWorld::new();
    world.knowledge = Arc::new(MockKnowledge::new().on_claim(text, false));
    world.searcher = Arc::new(MockSearcher::new().on_query(text, vec![]));
    world.fallback = Arc::new(MockFallback::new().on_claim(text, verdict(0.6, AuthenticityLabel::True)));

    let mut routes = Vec::new();
    verifier(&world)
        .verify_with(&claim(text, true), &mut |route: Route| routes.push(route))
        .await;

    assert_eq!(routes, vec![Route::WebSearch, Route::Fallback]);
}

// ---------------------------------------------------------------------------
// Query planning
// ---------------------------------------------------------------------------

#[tokio::test]
async fn planner_output_is_validated_before_search() {
    let text = "Stocks crashed 40% on Monday";
    let plan: RawSearchPlan = serde_json::from_value(json!({
        "query": "stock market crash monday",
        "region": "atlantis",
        "safesearch": "extreme",
        "timelimit": "w",
        "max_results": 9000,
        "backend": "google,askjeeves"
    }))
    .unwrap();

    let mut world = MockWorld::new();
    world.planner = Arc::new(MockPlanner::new().on_claim(text, plan));
    world.knowledge = Arc::new(
        MockKnowledge::new()
            .on_claim(text, false)
            .on_web(text, verdict(0.2, AuthenticityLabel::False)),
    );
    world.searcher = Arc::new(MockSearcher::new().on_query("stock market crash monday", vec![]));

    verifier(&world).verify(&claim(text, true)).await;

    let configs = world.searcher.configs_seen();
    assert_eq!(configs.len(), 1);
    assert_eq!(configs[0].query(), "stock market crash monday");
    assert_eq!(configs[0].region(), "us-en");
    assert_eq!(configs[0].max_results(), 200);
    assert_eq!(configs[0].backend(), "auto");
}

#[tokio::test]
async fn planner_failure_searches_with_trimmed_claim_text() {
    let text = "  Bread prices tripled  ";
    let mut world = MockWorld::new();
    world.knowledge = Arc::new(
        MockKnowledge::new()
            .on_claim(text, false)
            .on_web(text, verdict(0.2, AuthenticityLabel::False)),
    );
    world.searcher = Arc::new(MockSearcher::new().on_query("Bread prices tripled", vec![]));

    verifier(&world).verify(&claim(text, true)).await;

    let configs = world.searcher.configs_seen();
    assert_eq!(configs[0].query(), "Bread prices tripled");
    assert_eq!(configs[0].max_results(), 10);
}

// ---------------------------------------------------------------------------
// Error containment
// ---------------------------------------------------------------------------

#[tokio::test]
async fn knowledge_check_error_becomes_error_result() {
    let world = MockWorld::new(); // nothing registered: assess fails

    let result = verifier(&world).verify(&claim("Unregistered claim", true)).await;

    assert_eq!(result.verification_method, VerificationMethod::Error);
    assert_eq!(result.authenticity_label, AuthenticityLabel::Unverifiable);
    assert!(result.evidence_sources.is_none());
    assert!(result.explanation.starts_with("Unable to verify this claim due to:"));
    assert_eq!(world.fallback.calls(), 0);
}

#[tokio::test]
async fn web_judge_error_escalates_to_fallback() {
    let text = "Mayor resigned this morning";
    let mut world = MockWorld::new();
    world.knowledge = Arc::new(MockKnowledge::new().on_claim(text, false));
    world.searcher = Arc::new(MockSearcher::new().on_query(text, vec![search_result("https://x.example/")]));
    world.scraper = Arc::new(MockScraper::new().on_page("https://x.example/", "The mayor spoke today."));
    // Evidence present but no web verdict registered: the judge errors.
    world.fallback = Arc::new(MockFallback::new().on_claim(text, verdict(0.1, AuthenticityLabel::False)));

    let result = verifier(&world).verify(&claim(text, true)).await;

    assert_eq!(result.verification_method, VerificationMethod::Fallback);
    assert_eq!(result.authenticity_label, AuthenticityLabel::False);
    assert_eq!(world.fallback.calls(), 1);
}

#[tokio::test]
async fn fallback_error_becomes_error_result() {
    let text = "Festival cancelled due to storms";
    let mut world = MockWorld::new();
    world.knowledge = Arc::new(MockKnowledge::new().on_claim(text, false));
    world.searcher = Arc::new(MockSearcher::new().on_query(text, vec![]));

    let result = verifier(&world).verify(&claim(text, true)).await;

    assert_eq!(result.verification_method, VerificationMethod::Error);
    assert_eq!(world.fallback.calls(), 1);
}

#[tokio::test]
async fn scores_and_confidence_stay_in_unit_interval() {
    let text = "Overconfident oracle";
    let wild = Verdict {
        score: 3.5,
        label: AuthenticityLabel::True,
        explanation: "very sure".into(),
        confidence: -1.0,
        sources: vec![],
    };
    let mut world = MockWorld::new();
    world.knowledge = Arc::new(MockKnowledge::new().on_claim(text, true).on_internal(text, wild));

    let result = verifier(&world).verify(&claim(text, true)).await;

    assert!((0.0..=1.0).contains(&result.authenticity_score));
    assert!((0.0..=1.0).contains(&result.confidence));
}
