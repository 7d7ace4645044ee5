//! Persistence seam.
//!
//! The engine stages records while it acts (click-before-register) and
//! flushes them as batches, never one write per element. Delivery is
//! at-least-once: every row is keyed by fingerprint and upserted, so
//! replaying a batch after a crash cannot duplicate anything.

use std::collections::HashMap;

use appscout_classify::{ElementRecord, SafetyClass, ScreenKind};
use appscout_store::NavigationEdge;
use serde::{Deserialize, Serialize};

/// Persisted form of a screen state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateRow {
    pub fingerprint: String,
    pub package_id: String,
    pub kind: ScreenKind,
    pub confidence: f64,
    pub visited: bool,
}

/// Persisted form of an actionable element.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementRow {
    /// Fingerprint of the screen the element lives on.
    pub fingerprint: String,
    pub element_id: u32,
    pub label: Option<String>,
    pub classification: SafetyClass,
}

impl ElementRow {
    pub fn from_record(fingerprint: &str, record: &ElementRecord) -> Self {
        Self {
            fingerprint: fingerprint.to_string(),
            element_id: record.id,
            label: record.text.clone(),
            classification: record.classification,
        }
    }
}

/// One flush unit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersistBatch {
    pub states: Vec<StateRow>,
    pub elements: Vec<ElementRow>,
    pub edges: Vec<NavigationEdge>,
    /// False when the session aborted and this is a partial graph.
    pub session_complete: bool,
}

impl PersistBatch {
    pub fn is_empty(&self) -> bool {
        self.states.is_empty() && self.elements.is_empty() && self.edges.is_empty()
    }

    pub fn clear(&mut self) {
        self.states.clear();
        self.elements.clear();
        self.edges.clear();
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("persistence backend unavailable: {0}")]
    Unavailable(String),
}

/// Batched, idempotent persistence collaborator.
pub trait PersistenceSink {
    fn upsert_batch(&mut self, batch: &PersistBatch) -> Result<(), PersistError>;
}

/// In-memory sink. Upserts are keyed so replays do not duplicate.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub states: HashMap<String, StateRow>,
    pub elements: HashMap<(String, u32), ElementRow>,
    pub edges: HashMap<(String, String, String), NavigationEdge>,
    pub flush_count: u32,
    pub last_batch_complete: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PersistenceSink for MemorySink {
    fn upsert_batch(&mut self, batch: &PersistBatch) -> Result<(), PersistError> {
        for row in &batch.states {
            self.states.insert(row.fingerprint.clone(), row.clone());
        }
        for row in &batch.elements {
            self.elements
                .insert((row.fingerprint.clone(), row.element_id), row.clone());
        }
        for edge in &batch.edges {
            self.edges.insert(
                (edge.from.clone(), edge.to.clone(), edge.action.to_string()),
                edge.clone(),
            );
        }
        self.flush_count += 1;
        self.last_batch_complete = batch.session_complete;
        Ok(())
    }
}
