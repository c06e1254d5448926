use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};

use crate::types::{NotWorthyResponse, OverallAssessment};

// --- Stages ---

/// Work stages of a run, in the order they can occur. `NotWorthy` and
/// `Verifying` are alternative branches after `Analyzing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    ResolvingLink,
    AcquiringMedia,
    Transcribing,
    Analyzing,
    NotWorthy,
    Verifying,
    Aggregating,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::ResolvingLink => write!(f, "resolving_link"),
            Stage::AcquiringMedia => write!(f, "acquiring_media"),
            Stage::Transcribing => write!(f, "transcribing"),
            Stage::Analyzing => write!(f, "analyzing"),
            Stage::NotWorthy => write!(f, "not_worthy"),
            Stage::Verifying => write!(f, "verifying"),
            Stage::Aggregating => write!(f, "aggregating"),
        }
    }
}

/// Serialized as the observer-facing step token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StageStatus {
    #[serde(rename = "processing")]
    Started,
    #[serde(rename = "success")]
    Succeeded,
    #[serde(rename = "warning")]
    Warning,
    #[serde(rename = "failed")]
    Failed,
}

// --- Events ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// 0-based, strictly increasing within a run.
    pub seq: u64,
    pub ts: DateTime<Utc>,
    pub stage: Stage,
    #[serde(rename = "step")]
    pub status: StageStatus,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

// --- Terminal ---

/// How a run ended. Exactly one per run.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Verified(OverallAssessment),
    NotWorthy(NotWorthyResponse),
    Failed { stage: Stage, message: String },
}

impl RunOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, RunOutcome::Failed { .. })
    }
}

impl Serialize for RunOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        #[serde(untagged)]
        enum Response<'a> {
            Assessment(&'a OverallAssessment),
            NotWorthy(&'a NotWorthyResponse),
        }

        #[derive(Serialize)]
        #[serde(tag = "step", rename_all = "snake_case")]
        enum Wire<'a> {
            Completed { success: bool, response: Response<'a> },
            Error { stage: Stage, message: &'a str },
        }

        let wire = match self {
            RunOutcome::Verified(a) => Wire::Completed {
                success: true,
                response: Response::Assessment(a),
            },
            RunOutcome::NotWorthy(n) => Wire::Completed {
                success: false,
                response: Response::NotWorthy(n),
            },
            RunOutcome::Failed { stage, message } => Wire::Error {
                stage: *stage,
                message,
            },
        };
        wire.serialize(serializer)
    }
}

/// Ordered event log plus the terminal result, for request/response callers.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub events: Vec<ProgressEvent>,
    pub outcome: RunOutcome,
}
