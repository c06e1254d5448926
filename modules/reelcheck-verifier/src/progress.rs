//! Delivery of progress events and the terminal outcome to an observer.
//!
//! Two realizations: [`BufferedChannel`] collects everything for a single
//! response, [`PushChannel`] forwards each message as it happens to a live
//! observer that may go away at any time. Neither can fail a run.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use reelcheck_common::{ProgressEvent, ReelCheckError, RunOutcome, RunReport, Stage, StageStatus};

pub trait ProgressChannel: Send + Sync {
    /// Called once before the first event.
    fn begin(&self, _run_id: &str, _started_at: DateTime<Utc>) {}

    /// Best-effort. Must not block and must not panic.
    fn send(&self, event: ProgressEvent);

    /// Called exactly once, after the last event.
    fn finish(&self, outcome: &RunOutcome);
}

// ---------------------------------------------------------------------------
// Emitter
// ---------------------------------------------------------------------------

/// Stamps events with a per-run sequence number and hands them to a channel.
pub(crate) struct Emitter<'a> {
    channel: &'a dyn ProgressChannel,
    seq: u64,
}

impl<'a> Emitter<'a> {
    pub fn new(channel: &'a dyn ProgressChannel) -> Self {
        Self { channel, seq: 0 }
    }

    pub fn emit(
        &mut self,
        stage: Stage,
        status: StageStatus,
        message: impl Into<String>,
        data: Option<serde_json::Value>,
    ) {
        let event = ProgressEvent {
            seq: self.seq,
            ts: Utc::now(),
            stage,
            status,
            message: message.into(),
            data,
        };
        self.seq += 1;
        self.channel.send(event);
    }

    pub fn started(&mut self, stage: Stage, message: impl Into<String>) {
        self.emit(stage, StageStatus::Started, message, None);
    }

    pub fn succeeded(&mut self, stage: Stage, message: impl Into<String>, data: Option<serde_json::Value>) {
        self.emit(stage, StageStatus::Succeeded, message, data);
    }

    pub fn warning(&mut self, stage: Stage, message: impl Into<String>) {
        self.emit(stage, StageStatus::Warning, message, None);
    }

    pub fn failed(&mut self, stage: Stage, message: impl Into<String>) {
        self.emit(stage, StageStatus::Failed, message, None);
    }

    pub fn finish(&self, outcome: &RunOutcome) {
        self.channel.finish(outcome);
    }
}

// ---------------------------------------------------------------------------
// BufferedChannel
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct BufferedChannel {
    run: Mutex<Option<(String, DateTime<Utc>)>>,
    events: Mutex<Vec<ProgressEvent>>,
    outcome: Mutex<Option<RunOutcome>>,
}

impl BufferedChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Ordered log plus outcome. A run that never finished reports as failed
    /// at its last seen stage.
    pub fn into_report(self) -> RunReport {
        let events = self.events.into_inner().unwrap_or_else(|e| e.into_inner());
        let (run_id, started_at) = self
            .run
            .into_inner()
            .unwrap_or_else(|e| e.into_inner())
            .unwrap_or_else(|| (String::new(), Utc::now()));
        let outcome = self
            .outcome
            .into_inner()
            .unwrap_or_else(|e| e.into_inner())
            .unwrap_or_else(|| RunOutcome::Failed {
                stage: events.last().map(|e| e.stage).unwrap_or(Stage::ResolvingLink),
                message: "Run ended without a result".to_string(),
            });
        RunReport {
            run_id,
            started_at,
            events,
            outcome,
        }
    }
}

impl ProgressChannel for BufferedChannel {
    fn begin(&self, run_id: &str, started_at: DateTime<Utc>) {
        *self.run.lock().unwrap_or_else(|e| e.into_inner()) = Some((run_id.to_string(), started_at));
    }

    fn send(&self, event: ProgressEvent) {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).push(event);
    }

    fn finish(&self, outcome: &RunOutcome) {
        *self.outcome.lock().unwrap_or_else(|e| e.into_inner()) = Some(outcome.clone());
    }
}

// ---------------------------------------------------------------------------
// PushChannel
// ---------------------------------------------------------------------------

/// What a live observer receives.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ChannelMessage {
    Event(ProgressEvent),
    Terminal(RunOutcome),
}

/// Forwards each message immediately. Dropping the receiver is a disconnect;
/// once seen, no further send is attempted.
pub struct PushChannel {
    tx: mpsc::UnboundedSender<ChannelMessage>,
    disconnected: AtomicBool,
    attempts: AtomicUsize,
}

impl PushChannel {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ChannelMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let channel = Self {
            tx,
            disconnected: AtomicBool::new(false),
            attempts: AtomicUsize::new(0),
        };
        (channel, rx)
    }

    pub fn is_disconnected(&self) -> bool {
        self.disconnected.load(Ordering::SeqCst)
    }

    /// Number of send calls that reached the underlying channel.
    pub fn send_attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    fn push(&self, message: ChannelMessage) {
        if self.is_disconnected() {
            return;
        }
        if self.tx.is_closed() {
            self.disconnected.store(true, Ordering::SeqCst);
            debug!("Observer disconnected, dropping further progress");
            return;
        }

        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.tx.send(message).is_err() {
            self.disconnected.store(true, Ordering::SeqCst);
            let err = ReelCheckError::Delivery("observer went away mid-send".to_string());
            warn!(error = %err, "Progress delivery failed, observer marked disconnected");
        }
    }
}

impl ProgressChannel for PushChannel {
    fn send(&self, event: ProgressEvent) {
        self.push(ChannelMessage::Event(event));
    }

    fn finish(&self, outcome: &RunOutcome) {
        self.push(ChannelMessage::Terminal(outcome.clone()));
    }
}
