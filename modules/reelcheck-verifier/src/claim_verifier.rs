//! Per-claim routing: skip, internal knowledge, web evidence, or one
//! fallback check. Every failure is contained in the returned result.

use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};

use reelcheck_common::{
    AuthenticityLabel, Claim, ReelCheckError, Verdict, VerificationMethod, VerificationResult,
};

use crate::retriever::WebRetriever;
use crate::traits::{FallbackOracle, KnowledgeOracle};

/// Which check is about to run. Reported before the call is made.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Internal,
    WebSearch,
    Fallback,
}

impl Route {
    pub fn describe(&self) -> &'static str {
        match self {
            Route::Internal => "LLM",
            Route::WebSearch => "web search",
            Route::Fallback => "Perplexity",
        }
    }
}

/// Position in the web → fallback chain. `next` is exhausted after one
/// fallback, so the chain can never escalate twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attempt {
    Primary,
    Fallback,
}

impl Attempt {
    fn next(self) -> Option<Attempt> {
        match self {
            Attempt::Primary => Some(Attempt::Fallback),
            Attempt::Fallback => None,
        }
    }

    fn method(self) -> VerificationMethod {
        match self {
            Attempt::Primary => VerificationMethod::Web,
            Attempt::Fallback => VerificationMethod::Fallback,
        }
    }
}

#[derive(Clone)]
pub struct ClaimVerifier {
    knowledge: Arc<dyn KnowledgeOracle>,
    retriever: WebRetriever,
    fallback: Arc<dyn FallbackOracle>,
}

impl ClaimVerifier {
    pub fn new(
        knowledge: Arc<dyn KnowledgeOracle>,
        retriever: WebRetriever,
        fallback: Arc<dyn FallbackOracle>,
    ) -> Self {
        Self {
            knowledge,
            retriever,
            fallback,
        }
    }

    pub async fn verify(&self, claim: &Claim) -> VerificationResult {
        self.verify_with(claim, &mut |_: Route| {}).await
    }

    /// Like [`verify`](Self::verify), calling `on_route` before each check.
    pub async fn verify_with(
        &self,
        claim: &Claim,
        on_route: &mut (dyn FnMut(Route) + Send),
    ) -> VerificationResult {
        if !claim.worth_verifying {
            info!(claim = claim.text.as_str(), "Claim not worth verifying, skipping");
            return VerificationResult::skipped(&claim.text);
        }

        match self.dispatch(claim, on_route).await {
            Ok(result) => result,
            Err(e) => {
                let err = ReelCheckError::Verification(format!("{e:#}"));
                warn!(claim = claim.text.as_str(), error = %err, "Claim verification contained an error");
                VerificationResult::error(&claim.text, format!("{e:#}"))
            }
        }
    }

    async fn dispatch(
        &self,
        claim: &Claim,
        on_route: &mut (dyn FnMut(Route) + Send),
    ) -> Result<VerificationResult> {
        let assessment = self.knowledge.assess(&claim.text).await?;
        info!(
            claim = claim.text.as_str(),
            can_verify = assessment.can_verify,
            complexity = assessment.complexity.as_str(),
            requires_current_data = assessment.requires_current_data,
            "Knowledge assessment"
        );

        if assessment.can_verify {
            on_route(Route::Internal);
            let verdict = self
                .knowledge
                .verify_internally(&claim.text, &claim.evidence)
                .await?;
            return Ok(VerificationResult::from_verdict(
                &claim.text,
                VerificationMethod::Internal,
                verdict,
            ));
        }

        let mut attempt = Attempt::Primary;
        on_route(Route::WebSearch);
        loop {
            let verdict = match attempt {
                Attempt::Primary => {
                    let retrieval = self.retriever.retrieve(&claim.text).await;
                    let judged = self
                        .knowledge
                        .verify_with_evidence(&claim.text, &claim.evidence, &retrieval)
                        .await;
                    let verdict = match judged {
                        Ok(verdict) => verdict,
                        Err(e) => {
                            warn!(
                                claim = claim.text.as_str(),
                                error = %e,
                                "Web evidence check failed"
                            );
                            Verdict::unverifiable(format!("Error in web verification: {e}"))
                        }
                    };
                    verdict.with_sources(retrieval.sources)
                }
                Attempt::Fallback => self.fallback.verify(&claim.text).await?,
            };

            if verdict.label == AuthenticityLabel::Unverifiable {
                if let Some(next) = attempt.next() {
                    info!(
                        claim = claim.text.as_str(),
                        fallback = self.fallback.name(),
                        "Web check inconclusive, escalating to fallback"
                    );
                    on_route(Route::Fallback);
                    attempt = next;
                    continue;
                }
            }

            return Ok(VerificationResult::from_verdict(
                &claim.text,
                attempt.method(),
                verdict,
            ));
        }
    }
}
