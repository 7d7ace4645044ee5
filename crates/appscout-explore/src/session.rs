//! Session wrapper.
//!
//! Owns the per-session plumbing the engine needs but callers should not
//! wire by hand: the event channel, the cancellation flag, and the config.
//! Each run gets a fresh store and graph; nothing leaks between sessions.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use appscout_core::{EventSink, ExploreError, ExplorerConfig, ExplorerEvent, PersistenceSink};
use crossbeam::channel::Receiver;

use crate::engine::{ExplorationEngine, ExplorationResult};
use crate::providers::{SnapshotProvider, UiActionExecutor};

pub struct ExplorationSession {
    app_id: String,
    config: ExplorerConfig,
    events: EventSink,
    cancel: Arc<AtomicBool>,
}

impl ExplorationSession {
    pub fn new(app_id: &str, config: ExplorerConfig) -> Self {
        Self {
            app_id: app_id.to_string(),
            config,
            events: EventSink::disabled(),
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Subscribe to engine events. Replaces any previous subscription.
    pub fn subscribe(&mut self) -> Receiver<ExplorerEvent> {
        let (sink, rx) = EventSink::channel();
        self.events = sink;
        rx
    }

    /// Handle for cooperative cancellation from another thread. The engine
    /// checks it every loop iteration and every wait poll.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    /// Run one exploration session against the given collaborators.
    pub fn run<P, E, S>(
        &self,
        provider: &mut P,
        executor: &mut E,
        sink: S,
    ) -> Result<ExplorationResult<S>, ExploreError>
    where
        P: SnapshotProvider,
        E: UiActionExecutor,
        S: PersistenceSink,
    {
        ExplorationEngine::new(
            &self.app_id,
            self.config.clone(),
            provider,
            executor,
            sink,
            self.events.clone(),
            Arc::clone(&self.cancel),
        )
        .run()
    }
}
