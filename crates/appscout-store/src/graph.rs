//! Navigation graph builder.
//!
//! Accumulates observed transitions between discovered screens. Edge
//! insertion is idempotent: replaying an identical transition collapses into
//! the existing edge. An edge referencing a fingerprint the graph has never
//! been told about is a programmer error and is reported loudly.

use std::collections::{HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};

/// What kind of interaction produced a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    Tap,
    Scroll,
    Back,
}

/// Description of the action that produced an edge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActionDescriptor {
    pub kind: ActionKind,
    /// Element id the action targeted, if any (Back has none).
    pub element_id: Option<u32>,
    /// Element label at the time of the action, for readable graphs.
    pub label: Option<String>,
}

impl ActionDescriptor {
    pub fn tap(element_id: u32, label: Option<String>) -> Self {
        Self {
            kind: ActionKind::Tap,
            element_id: Some(element_id),
            label,
        }
    }

    pub fn back() -> Self {
        Self {
            kind: ActionKind::Back,
            element_id: None,
            label: None,
        }
    }

    pub fn scroll() -> Self {
        Self {
            kind: ActionKind::Scroll,
            element_id: None,
            label: None,
        }
    }
}

impl std::fmt::Display for ActionDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.kind, &self.label) {
            (ActionKind::Tap, Some(label)) => write!(f, "tap:{label}"),
            (ActionKind::Tap, None) => write!(f, "tap:#{}", self.element_id.unwrap_or(0)),
            (ActionKind::Scroll, _) => write!(f, "scroll"),
            (ActionKind::Back, _) => write!(f, "back"),
        }
    }
}

/// An observed transition between two screen states.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationEdge {
    pub from: String,
    pub to: String,
    pub action: ActionDescriptor,
}

/// Invariant violations — bugs, not run-time conditions.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum GraphError {
    #[error("edge references unknown fingerprint {0}")]
    UnknownFingerprint(String),
}

/// Coverage summary for the session-complete event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSummary {
    pub state_count: u32,
    pub edge_count: u32,
    pub unreachable_count: u32,
}

/// Directed graph of screen states and action-triggered transitions.
#[derive(Debug, Default)]
pub struct NavigationGraph {
    known: HashSet<String>,
    outgoing: HashMap<String, Vec<NavigationEdge>>,
    edge_keys: HashSet<(String, String, String)>,
    root: Option<String>,
}

impl NavigationGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a discovered state. The first registered state becomes the
    /// root for reachability auditing.
    pub fn register_state(&mut self, fingerprint_hash: &str) {
        if self.root.is_none() {
            self.root = Some(fingerprint_hash.to_string());
        }
        self.known.insert(fingerprint_hash.to_string());
    }

    /// Record a transition. Idempotent: returns Ok(false) when the identical
    /// edge already exists. Unknown endpoints are invariant violations.
    pub fn add_edge(
        &mut self,
        from: &str,
        to: &str,
        action: ActionDescriptor,
    ) -> Result<bool, GraphError> {
        if !self.known.contains(from) {
            return Err(GraphError::UnknownFingerprint(from.to_string()));
        }
        if !self.known.contains(to) {
            return Err(GraphError::UnknownFingerprint(to.to_string()));
        }

        let key = (from.to_string(), to.to_string(), action.to_string());
        if !self.edge_keys.insert(key) {
            return Ok(false);
        }

        self.outgoing
            .entry(from.to_string())
            .or_default()
            .push(NavigationEdge {
                from: from.to_string(),
                to: to.to_string(),
                action,
            });
        Ok(true)
    }

    pub fn outgoing(&self, from: &str) -> &[NavigationEdge] {
        self.outgoing.get(from).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn state_count(&self) -> u32 {
        self.known.len() as u32
    }

    pub fn edge_count(&self) -> u32 {
        self.edge_keys.len() as u32
    }

    pub fn all_edges(&self) -> Vec<NavigationEdge> {
        let mut out: Vec<NavigationEdge> = self
            .outgoing
            .values()
            .flat_map(|edges| edges.iter().cloned())
            .collect();
        out.sort_by(|a, b| (&a.from, &a.to).cmp(&(&b.from, &b.to)));
        out
    }

    /// States unreachable from the root, for coverage auditing. A state with
    /// no path from the entry screen usually means a missed or misrecorded
    /// transition.
    pub fn unreachable(&self) -> Vec<String> {
        let Some(root) = &self.root else {
            return Vec::new();
        };
        let mut seen: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<&str> = VecDeque::new();
        seen.insert(root.as_str());
        queue.push_back(root.as_str());
        while let Some(current) = queue.pop_front() {
            for edge in self.outgoing(current) {
                if seen.insert(edge.to.as_str()) {
                    queue.push_back(edge.to.as_str());
                }
            }
        }
        let mut orphans: Vec<String> = self
            .known
            .iter()
            .filter(|k| !seen.contains(k.as_str()))
            .cloned()
            .collect();
        orphans.sort();
        orphans
    }

    pub fn summary(&self) -> GraphSummary {
        GraphSummary {
            state_count: self.state_count(),
            edge_count: self.edge_count(),
            unreachable_count: self.unreachable().len() as u32,
        }
    }
}
