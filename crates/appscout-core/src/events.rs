//! Outbound events.
//!
//! Consumers (a voice-command registration layer, dashboards) subscribe via
//! a channel. Emission is best-effort: a dropped receiver never stalls or
//! fails the crawl.

use appscout_classify::ScreenKind;
use appscout_store::GraphSummary;
use crossbeam::channel::{unbounded, Receiver, Sender};

use crate::budget::StopReason;

/// Events the exploration engine emits as it works.
#[derive(Debug, Clone, PartialEq)]
pub enum ExplorerEvent {
    NewStateDiscovered {
        fingerprint: String,
        kind: ScreenKind,
        confidence: f64,
    },
    EdgeRecorded {
        from: String,
        to: String,
        action: String,
    },
    DangerousElementSkipped {
        element_label: String,
        reason: String,
    },
    SessionComplete {
        summary: GraphSummary,
        stop_reason: StopReason,
        complete: bool,
    },
}

/// Best-effort event publisher.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    sender: Option<Sender<ExplorerEvent>>,
}

impl EventSink {
    /// A sink that discards everything.
    pub fn disabled() -> Self {
        Self { sender: None }
    }

    /// A connected sink plus the consumer end.
    pub fn channel() -> (Self, Receiver<ExplorerEvent>) {
        let (tx, rx) = unbounded();
        (Self { sender: Some(tx) }, rx)
    }

    pub fn emit(&self, event: ExplorerEvent) {
        if let Some(sender) = &self.sender {
            // Receiver may be gone; that is the consumer's choice.
            let _ = sender.send(event);
        }
    }
}
