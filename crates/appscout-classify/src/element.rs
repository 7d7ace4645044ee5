//! Element safety classification.
//!
//! Labels interactive elements Safe/Neutral/Dangerous before the engine may
//! act on them. Policy: a false negative on danger is strictly worse than
//! missed coverage, so anything ambiguous defaults to Neutral at low
//! priority — never Safe. Every classification carries the indicators that
//! produced it so a skipped element can be audited after the fact.

use std::collections::{HashMap, HashSet};

use appscout_snapshot::{Bounds, NodeRole, ScreenSnapshot, UiNode};
use serde::{Deserialize, Serialize};

/// Safety label for an actionable element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SafetyClass {
    Safe,
    Neutral,
    Dangerous,
}

/// Configurable danger vocabulary. Pure data, serde-loadable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DangerLexicon {
    /// Words whose presence marks an element Dangerous.
    pub danger_terms: Vec<String>,
    /// Words marking the dismissive path of a confirmation dialog.
    pub cancel_terms: Vec<String>,
    /// Words marking the committing path of a confirmation dialog.
    pub confirm_terms: Vec<String>,
}

impl Default for DangerLexicon {
    fn default() -> Self {
        Self {
            danger_terms: [
                "delete", "remove", "purchase", "buy", "pay", "logout", "log out",
                "sign out", "send", "submit payment", "uninstall", "erase", "format",
                "deactivate", "unsubscribe",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            cancel_terms: ["cancel", "back", "dismiss", "not now", "no"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            confirm_terms: ["confirm", "yes", "ok", "proceed", "continue"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// A classified actionable element.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementRecord {
    pub id: u32,
    pub role: NodeRole,
    pub text: Option<String>,
    pub bounds: Bounds,
    pub classification: SafetyClass,
    /// Confidence of the classification itself, in [0,1].
    pub confidence: f64,
    /// Signals that produced the classification, for audit.
    pub indicators: Vec<String>,
    /// Exploration ordering hint: higher explores first. Dangerous elements
    /// are never explored regardless of priority.
    pub priority: i32,
}

impl ElementRecord {
    /// Stable session-local identity for history tracking: role + text.
    pub fn history_key(&self) -> String {
        format!(
            "{}|{}",
            self.role.token(),
            self.text.as_deref().unwrap_or("").to_lowercase()
        )
    }
}

/// Session-local record of actions that went badly: the app backgrounded,
/// crashed, or the action repeatedly timed out.
#[derive(Debug, Default)]
pub struct ActionHistory {
    adverse: HashMap<String, u32>,
}

impl ActionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_adverse(&mut self, key: &str) {
        *self.adverse.entry(key.to_string()).or_insert(0) += 1;
    }

    pub fn adverse_count(&self, key: &str) -> u32 {
        self.adverse.get(key).copied().unwrap_or(0)
    }
}

/// Classifies actionable elements on a snapshot.
pub struct ElementClassifier {
    lexicon: DangerLexicon,
    history: ActionHistory,
}

impl ElementClassifier {
    pub fn new(lexicon: DangerLexicon) -> Self {
        Self {
            lexicon,
            history: ActionHistory::new(),
        }
    }

    /// Report that acting on an element backgrounded or crashed the app.
    /// It is down-ranked for the remainder of the session.
    pub fn record_adverse_outcome(&mut self, record: &ElementRecord) {
        log::warn!("adverse outcome for element {:?}", record.text);
        self.history.record_adverse(&record.history_key());
    }

    /// Classify every actionable element on the snapshot, ordered by
    /// exploration priority (highest first).
    pub fn classify_all(&self, snapshot: &ScreenSnapshot) -> Vec<ElementRecord> {
        let dialog_ids = dialog_member_ids(snapshot);
        let on_dialog = !dialog_ids.is_empty();
        let dialog_has_cancel = on_dialog
            && snapshot.actionable_nodes().iter().any(|n| {
                dialog_ids.contains(&n.id) && self.matches_any(n, &self.lexicon.cancel_terms)
            });

        let mut records: Vec<ElementRecord> = snapshot
            .actionable_nodes()
            .into_iter()
            .map(|node| self.classify_node(node, dialog_ids.contains(&node.id), dialog_has_cancel))
            .collect();

        records.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.id.cmp(&b.id)));
        records
    }

    fn classify_node(
        &self,
        node: &UiNode,
        on_dialog: bool,
        dialog_has_cancel: bool,
    ) -> ElementRecord {
        let mut indicators = Vec::new();
        let text = node.text.as_deref().unwrap_or("");
        let lowered = text.to_lowercase();

        let mut classification;
        let mut confidence;
        let mut priority;

        let danger_hits: Vec<&String> = self
            .lexicon
            .danger_terms
            .iter()
            .filter(|t| lowered.contains(t.as_str()))
            .collect();

        if !danger_hits.is_empty() {
            classification = SafetyClass::Dangerous;
            confidence = 0.9;
            priority = i32::MIN;
            for hit in danger_hits {
                indicators.push(format!("lexicon:{hit}"));
            }
        } else if on_dialog && self.matches_any(node, &self.lexicon.cancel_terms) {
            // The dismissive path of a dialog is the preferred way out.
            classification = SafetyClass::Safe;
            confidence = 0.85;
            priority = 100;
            indicators.push("dialog-cancel-path".to_string());
        } else if on_dialog
            && dialog_has_cancel
            && self.matches_any(node, &self.lexicon.confirm_terms)
        {
            // Confirm next to a cancel on a dialog smells like a destructive
            // confirmation; prefer the cancel path.
            classification = SafetyClass::Neutral;
            confidence = 0.6;
            priority = -50;
            indicators.push("dialog-confirm-path".to_string());
        } else {
            match node.role {
                NodeRole::Button | NodeRole::FloatingActionButton if !lowered.is_empty() => {
                    classification = SafetyClass::Safe;
                    confidence = 0.7;
                    priority = 50;
                    indicators.push("benign-button".to_string());
                }
                NodeRole::CheckBox | NodeRole::EditText => {
                    classification = SafetyClass::Neutral;
                    confidence = 0.6;
                    priority = 10;
                    indicators.push(format!("role:{}", node.role.token()));
                }
                _ => {
                    // Unknown defaults to Neutral at low priority, never Safe.
                    classification = SafetyClass::Neutral;
                    confidence = 0.4;
                    priority = 0;
                    indicators.push("unclassified-default".to_string());
                }
            }
        }

        let key = format!("{}|{}", node.role.token(), lowered);
        let adverse = self.history.adverse_count(&key);
        if adverse > 0 && classification != SafetyClass::Dangerous {
            priority -= 40 * adverse as i32;
            confidence = (confidence - 0.1 * adverse as f64).max(0.1);
            if classification == SafetyClass::Safe {
                classification = SafetyClass::Neutral;
            }
            indicators.push(format!("history:adverse-x{adverse}"));
        }

        ElementRecord {
            id: node.id,
            role: node.role,
            text: node.text.clone(),
            bounds: node.bounds,
            classification,
            confidence,
            indicators,
            priority,
        }
    }

    fn matches_any(&self, node: &UiNode, terms: &[String]) -> bool {
        let lowered = node.text.as_deref().unwrap_or("").to_lowercase();
        terms.iter().any(|t| lowered == *t || lowered.contains(t.as_str()))
    }
}

/// Ids of nodes living inside a Dialog subtree.
fn dialog_member_ids(snapshot: &ScreenSnapshot) -> HashSet<u32> {
    let mut out = HashSet::new();
    for visited in snapshot.walk() {
        if visited.node.role == NodeRole::Dialog {
            let mut stack = vec![visited.node];
            while let Some(n) = stack.pop() {
                out.insert(n.id);
                stack.extend(n.children.iter());
            }
        }
    }
    out
}
