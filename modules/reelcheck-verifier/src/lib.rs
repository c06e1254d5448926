pub mod adapters;
pub mod aggregator;
pub mod claim_verifier;
pub mod orchestrator;
pub mod progress;
pub mod query_optimizer;
pub mod retriever;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod traits;

pub use aggregator::Aggregator;
pub use claim_verifier::{ClaimVerifier, Route};
pub use orchestrator::{Pipeline, PipelineDeps};
pub use progress::{BufferedChannel, ChannelMessage, ProgressChannel, PushChannel};
pub use query_optimizer::{QueryOptimizer, SearchConfig};
pub use retriever::{Retrieval, WebRetriever};
