//! Screen-kind analyzers.
//!
//! Each analyzer is a pure function of an immutable snapshot, producing zero
//! or more `(guess, raw_confidence, indicators)` candidates. Analyzers are
//! independent — they never read each other's output — so the calibrator can
//! fan them out in parallel and tests can exercise each one in isolation.

use appscout_snapshot::{NodeRole, ScreenSnapshot};
use serde::{Deserialize, Serialize};

/// Semantic kind of a screen, as needed for safe traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScreenKind {
    Login,
    Home,
    List,
    Detail,
    Form,
    Dialog,
    Loading,
    Error,
    Settings,
    Unknown,
}

impl std::fmt::Display for ScreenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ScreenKind::Login => "login",
            ScreenKind::Home => "home",
            ScreenKind::List => "list",
            ScreenKind::Detail => "detail",
            ScreenKind::Form => "form",
            ScreenKind::Dialog => "dialog",
            ScreenKind::Loading => "loading",
            ScreenKind::Error => "error",
            ScreenKind::Settings => "settings",
            ScreenKind::Unknown => "unknown",
        };
        write!(f, "{s}")
    }
}

/// One candidate produced by one analyzer.
#[derive(Debug, Clone)]
pub struct AnalyzerResult {
    pub guess: ScreenKind,
    /// Uncalibrated confidence in [0,1].
    pub raw_confidence: f64,
    /// Human-readable signals that produced this guess, for audit.
    pub indicators: Vec<String>,
}

/// An independent screen-kind analyzer.
pub trait Analyzer: Send + Sync {
    fn analyze(&self, snapshot: &ScreenSnapshot) -> Vec<AnalyzerResult>;

    /// Name used to look up this analyzer's weight in the calibration profile.
    fn name(&self) -> &'static str;
}

/// Traversal scope of the dominant match on a screen.
///
/// A match found deep inside a modal is weaker evidence about the screen as a
/// whole than a full-screen match; the calibrator multiplies by a per-scope
/// factor from the profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchScope {
    FullScreen,
    ModalDialog,
    NestedComponent,
}

/// Role/text census of a snapshot, shared by the structural analyzers.
#[derive(Debug, Default)]
struct Census {
    edit_texts: u32,
    buttons: u32,
    fabs: u32,
    progress_bars: u32,
    lists: u32,
    scrollables: u32,
    dialogs: u32,
    total: u32,
    dialog_depth: Option<u32>,
    max_depth: u32,
    login_words: Vec<String>,
    error_words: Vec<String>,
    settings_words: Vec<String>,
}

fn census(snapshot: &ScreenSnapshot) -> Census {
    let mut c = Census::default();
    for visited in snapshot.walk() {
        let node = visited.node;
        if !node.readable {
            continue;
        }
        c.total += 1;
        if visited.depth + 1 > c.max_depth {
            c.max_depth = visited.depth + 1;
        }
        match node.role {
            NodeRole::EditText => c.edit_texts += 1,
            NodeRole::Button => c.buttons += 1,
            NodeRole::FloatingActionButton => c.fabs += 1,
            NodeRole::ProgressBar => c.progress_bars += 1,
            NodeRole::List => {
                c.lists += 1;
                c.scrollables += 1;
            }
            NodeRole::ScrollView => c.scrollables += 1,
            NodeRole::Dialog => {
                c.dialogs += 1;
                if c.dialog_depth.is_none() {
                    c.dialog_depth = Some(visited.depth);
                }
            }
            _ => {}
        }
        if let Some(text) = &node.text {
            let lowered = text.to_lowercase();
            for word in ["sign in", "log in", "login", "password", "username"] {
                if lowered.contains(word) {
                    c.login_words.push(word.to_string());
                }
            }
            for word in ["error", "failed", "try again", "something went wrong"] {
                if lowered.contains(word) {
                    c.error_words.push(word.to_string());
                }
            }
            for word in ["settings", "preferences", "notifications", "privacy"] {
                if lowered.contains(word) {
                    c.settings_words.push(word.to_string());
                }
            }
        }
    }
    c
}

/// Matches structural signatures against known screen archetypes: input-field
/// clusters, FAB-style buttons, spinners, list dominance.
pub struct PatternMatcher;

impl Analyzer for PatternMatcher {
    fn analyze(&self, snapshot: &ScreenSnapshot) -> Vec<AnalyzerResult> {
        let c = census(snapshot);
        let mut out = Vec::new();

        if c.progress_bars > 0 && c.total <= 6 {
            out.push(AnalyzerResult {
                guess: ScreenKind::Loading,
                raw_confidence: 0.85,
                indicators: vec!["spinner-dominant".to_string()],
            });
        }

        if c.edit_texts >= 2 && !c.login_words.is_empty() {
            let mut indicators = vec!["input-field-cluster".to_string()];
            indicators.extend(c.login_words.iter().map(|w| format!("login-word:{w}")));
            out.push(AnalyzerResult {
                guess: ScreenKind::Login,
                raw_confidence: 0.85,
                indicators,
            });
        } else if c.edit_texts >= 2 {
            out.push(AnalyzerResult {
                guess: ScreenKind::Form,
                raw_confidence: 0.6,
                indicators: vec!["input-field-cluster".to_string()],
            });
        }

        if !c.error_words.is_empty() {
            out.push(AnalyzerResult {
                guess: ScreenKind::Error,
                raw_confidence: 0.7,
                indicators: c.error_words.iter().map(|w| format!("error-word:{w}")).collect(),
            });
        }

        if !c.settings_words.is_empty() && c.edit_texts == 0 {
            out.push(AnalyzerResult {
                guess: ScreenKind::Settings,
                raw_confidence: 0.55,
                indicators: c
                    .settings_words
                    .iter()
                    .map(|w| format!("settings-word:{w}"))
                    .collect(),
            });
        }

        if c.lists > 0 && c.edit_texts == 0 {
            out.push(AnalyzerResult {
                guess: ScreenKind::List,
                raw_confidence: 0.6,
                indicators: vec!["list-dominant".to_string()],
            });
        }

        if c.fabs > 0 && c.dialogs == 0 {
            out.push(AnalyzerResult {
                guess: ScreenKind::Home,
                raw_confidence: 0.5,
                indicators: vec!["fab-present".to_string()],
            });
        }

        if c.dialogs > 0 {
            out.push(AnalyzerResult {
                guess: ScreenKind::Dialog,
                raw_confidence: 0.8,
                indicators: vec!["dialog-node".to_string()],
            });
        }

        out
    }

    fn name(&self) -> &'static str {
        "pattern"
    }
}

/// Computes the traversal scope of a snapshot: full-screen content, a modal
/// dialog, or a nested in-page component.
pub struct HierarchyAnalyzer;

impl HierarchyAnalyzer {
    /// Pure scope computation, also used directly by the calibrator for the
    /// per-scope multiplier.
    pub fn scope(snapshot: &ScreenSnapshot) -> MatchScope {
        let c = census(snapshot);
        match c.dialog_depth {
            Some(depth) if depth <= 1 => MatchScope::ModalDialog,
            Some(_) => MatchScope::NestedComponent,
            None if c.max_depth > 6 => MatchScope::NestedComponent,
            None => MatchScope::FullScreen,
        }
    }
}

impl Analyzer for HierarchyAnalyzer {
    fn analyze(&self, snapshot: &ScreenSnapshot) -> Vec<AnalyzerResult> {
        match Self::scope(snapshot) {
            MatchScope::ModalDialog => vec![AnalyzerResult {
                guess: ScreenKind::Dialog,
                raw_confidence: 0.75,
                indicators: vec!["modal-scope".to_string()],
            }],
            _ => Vec::new(),
        }
    }

    fn name(&self) -> &'static str {
        "hierarchy"
    }
}

/// Contradiction detector. Not an `Analyzer` — it scores a specific guess
/// against the snapshot, producing a penalty the calibrator subtracts. The
/// cumulative penalty is capped by the profile so no single contradiction can
/// fully invalidate an otherwise strong match.
pub fn negative_penalty(
    snapshot: &ScreenSnapshot,
    guess: ScreenKind,
    per_indicator_penalty: f64,
    cap: f64,
) -> (f64, Vec<String>) {
    let c = census(snapshot);
    let mut indicators = Vec::new();

    match guess {
        ScreenKind::Login => {
            // A complex scrollable list contradicts a login screen.
            if c.lists > 0 && c.total > 10 {
                indicators.push("login-vs-complex-list".to_string());
            }
            if c.fabs > 0 {
                indicators.push("login-vs-fab".to_string());
            }
        }
        ScreenKind::Loading => {
            if !c.error_words.is_empty() {
                indicators.push("loading-vs-error".to_string());
            }
            if c.edit_texts > 0 {
                indicators.push("loading-vs-inputs".to_string());
            }
        }
        ScreenKind::List => {
            if c.lists == 0 {
                indicators.push("list-without-list-node".to_string());
            }
        }
        ScreenKind::Error => {
            if c.error_words.is_empty() {
                indicators.push("error-without-error-text".to_string());
            }
        }
        _ => {}
    }

    let penalty = (indicators.len() as f64 * per_indicator_penalty).min(cap);
    (penalty, indicators)
}

#[cfg(test)]
mod tests {
    use super::*;
    use appscout_snapshot::UiNode;

    fn login_screen() -> ScreenSnapshot {
        let root = UiNode::new(1, NodeRole::Container).with_children(vec![
            UiNode::new(2, NodeRole::EditText).with_text("Username"),
            UiNode::new(3, NodeRole::EditText).with_text("Password"),
            UiNode::new(4, NodeRole::Button).with_text("Sign In").clickable(),
        ]);
        ScreenSnapshot::new("com.example.app", 0, vec![root])
    }

    fn loading_screen() -> ScreenSnapshot {
        let root = UiNode::new(1, NodeRole::Container)
            .with_children(vec![UiNode::new(2, NodeRole::ProgressBar)]);
        ScreenSnapshot::new("com.example.app", 0, vec![root])
    }

    #[test]
    fn test_pattern_matcher_login() {
        let results = PatternMatcher.analyze(&login_screen());
        let login = results
            .iter()
            .find(|r| r.guess == ScreenKind::Login)
            .expect("login guess");
        assert!(login.raw_confidence >= 0.8);
        assert!(login.indicators.iter().any(|i| i == "input-field-cluster"));
    }

    #[test]
    fn test_pattern_matcher_loading() {
        let results = PatternMatcher.analyze(&loading_screen());
        assert!(results.iter().any(|r| r.guess == ScreenKind::Loading));
    }

    #[test]
    fn test_pattern_matcher_form_without_login_words() {
        let root = UiNode::new(1, NodeRole::Container).with_children(vec![
            UiNode::new(2, NodeRole::EditText).with_text("Street"),
            UiNode::new(3, NodeRole::EditText).with_text("City"),
        ]);
        let snap = ScreenSnapshot::new("com.example.app", 0, vec![root]);
        let results = PatternMatcher.analyze(&snap);
        assert!(results.iter().any(|r| r.guess == ScreenKind::Form));
        assert!(!results.iter().any(|r| r.guess == ScreenKind::Login));
    }

    #[test]
    fn test_hierarchy_full_screen() {
        assert_eq!(HierarchyAnalyzer::scope(&login_screen()), MatchScope::FullScreen);
    }

    #[test]
    fn test_hierarchy_modal_dialog() {
        let root = UiNode::new(1, NodeRole::Container).with_children(vec![UiNode::new(
            2,
            NodeRole::Dialog,
        )
        .with_children(vec![
            UiNode::new(3, NodeRole::Text).with_text("Are you sure?"),
            UiNode::new(4, NodeRole::Button).with_text("Cancel").clickable(),
        ])]);
        let snap = ScreenSnapshot::new("com.example.app", 0, vec![root]);
        assert_eq!(HierarchyAnalyzer::scope(&snap), MatchScope::ModalDialog);
        let results = HierarchyAnalyzer.analyze(&snap);
        assert!(results.iter().any(|r| r.guess == ScreenKind::Dialog));
    }

    #[test]
    fn test_negative_penalty_login_vs_list() {
        let mut children = vec![
            UiNode::new(2, NodeRole::EditText).with_text("Password"),
            UiNode::new(3, NodeRole::List),
        ];
        for i in 0..10 {
            children.push(UiNode::new(10 + i, NodeRole::Text).with_text("row"));
        }
        let root = UiNode::new(1, NodeRole::Container).with_children(children);
        let snap = ScreenSnapshot::new("com.example.app", 0, vec![root]);

        let (penalty, indicators) = negative_penalty(&snap, ScreenKind::Login, 0.1, 0.3);
        assert!(penalty > 0.0);
        assert!(indicators.iter().any(|i| i == "login-vs-complex-list"));
    }

    #[test]
    fn test_negative_penalty_capped() {
        let root = UiNode::new(1, NodeRole::Container).with_children(vec![
            UiNode::new(2, NodeRole::EditText).with_text("a"),
            UiNode::new(3, NodeRole::Text).with_text("Error: something went wrong"),
        ]);
        let snap = ScreenSnapshot::new("com.example.app", 0, vec![root]);
        // Two contradictions at 0.25 each would be 0.5; cap holds it at 0.3.
        let (penalty, indicators) = negative_penalty(&snap, ScreenKind::Loading, 0.25, 0.3);
        assert_eq!(indicators.len(), 2);
        assert!(penalty <= 0.3);
    }

    #[test]
    fn test_no_penalty_for_consistent_guess() {
        let (penalty, indicators) = negative_penalty(&login_screen(), ScreenKind::Login, 0.1, 0.3);
        assert_eq!(penalty, 0.0);
        assert!(indicators.is_empty());
    }
}
