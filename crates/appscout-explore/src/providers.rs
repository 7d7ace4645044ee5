//! Observation and action seams.
//!
//! The engine never talks to a device directly; it observes through a
//! `SnapshotProvider` and acts through a `UiActionExecutor`. Both report
//! dispatch results only — whether an action landed is established by
//! observing the next snapshot, never by the executor's return value.
//!
//! `ScriptedApp` is the in-crate double: a small screen graph driven by the
//! same traits, so engine behavior is testable without any device.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use appscout_snapshot::{ScreenSnapshot, UiNode};

/// Source of UI snapshots. `None` means the tree was transiently
/// unreadable; callers retry.
pub trait SnapshotProvider {
    fn snapshot(&mut self) -> Option<ScreenSnapshot>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollDirection {
    Down,
    Up,
}

/// Immediate dispatch outcome. `Rejected` means the action could not even
/// be issued (element gone, input blocked); it says nothing about what the
/// action did to the screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionResult {
    Accepted,
    Rejected(String),
}

/// Dispatches UI actions.
pub trait UiActionExecutor {
    fn tap(&mut self, element_id: u32) -> ActionResult;
    fn scroll(&mut self, direction: ScrollDirection) -> ActionResult;
    fn back(&mut self) -> ActionResult;
}

#[derive(Debug, Default)]
struct ScriptedInner {
    package_id: String,
    screens: HashMap<String, Vec<UiNode>>,
    /// (screen, element id) -> destination screen.
    transitions: HashMap<(String, u32), String>,
    /// Where the back action lands from each screen.
    back_links: HashMap<String, String>,
    /// Screen shown after scrolling the named screen.
    scroll_variants: HashMap<String, String>,
    current: String,
    clock_ms: u64,
    tick_ms: u64,
    fail_next_snapshots: u32,
    tap_counts: HashMap<u32, u32>,
    scroll_count: u32,
    back_count: u32,
}

impl ScriptedInner {
    fn has_element(&self, id: u32) -> bool {
        let Some(roots) = self.screens.get(&self.current) else {
            return false;
        };
        let mut stack: Vec<&UiNode> = roots.iter().collect();
        while let Some(node) = stack.pop() {
            if node.id == id {
                return true;
            }
            stack.extend(node.children.iter());
        }
        false
    }
}

/// Scripted screen-graph double. `split` hands out provider and executor
/// handles over shared state; the original keeps counters for assertions.
#[derive(Debug, Clone)]
pub struct ScriptedApp {
    inner: Rc<RefCell<ScriptedInner>>,
}

/// Provider handle over a [`ScriptedApp`].
#[derive(Debug, Clone)]
pub struct ScriptedProvider {
    inner: Rc<RefCell<ScriptedInner>>,
}

/// Executor handle over a [`ScriptedApp`].
#[derive(Debug, Clone)]
pub struct ScriptedExecutor {
    inner: Rc<RefCell<ScriptedInner>>,
}

impl ScriptedApp {
    pub fn new(package_id: &str, entry: &str) -> Self {
        let inner = ScriptedInner {
            package_id: package_id.to_string(),
            current: entry.to_string(),
            tick_ms: 100,
            ..Default::default()
        };
        Self {
            inner: Rc::new(RefCell::new(inner)),
        }
    }

    pub fn add_screen(&self, name: &str, roots: Vec<UiNode>) {
        self.inner
            .borrow_mut()
            .screens
            .insert(name.to_string(), roots);
    }

    pub fn add_transition(&self, from: &str, element_id: u32, to: &str) {
        self.inner
            .borrow_mut()
            .transitions
            .insert((from.to_string(), element_id), to.to_string());
    }

    pub fn add_back_link(&self, from: &str, to: &str) {
        self.inner
            .borrow_mut()
            .back_links
            .insert(from.to_string(), to.to_string());
    }

    pub fn add_scroll_variant(&self, from: &str, to: &str) {
        self.inner
            .borrow_mut()
            .scroll_variants
            .insert(from.to_string(), to.to_string());
    }

    /// Make the next `n` snapshots fail as transiently unreadable.
    pub fn fail_next_snapshots(&self, n: u32) {
        self.inner.borrow_mut().fail_next_snapshots = n;
    }

    pub fn split(&self) -> (ScriptedProvider, ScriptedExecutor) {
        (
            ScriptedProvider {
                inner: Rc::clone(&self.inner),
            },
            ScriptedExecutor {
                inner: Rc::clone(&self.inner),
            },
        )
    }

    pub fn current_screen(&self) -> String {
        self.inner.borrow().current.clone()
    }

    pub fn tap_count(&self, element_id: u32) -> u32 {
        self.inner
            .borrow()
            .tap_counts
            .get(&element_id)
            .copied()
            .unwrap_or(0)
    }

    pub fn scroll_count(&self) -> u32 {
        self.inner.borrow().scroll_count
    }

    pub fn back_count(&self) -> u32 {
        self.inner.borrow().back_count
    }
}

impl SnapshotProvider for ScriptedProvider {
    fn snapshot(&mut self) -> Option<ScreenSnapshot> {
        let mut inner = self.inner.borrow_mut();
        if inner.fail_next_snapshots > 0 {
            inner.fail_next_snapshots -= 1;
            return None;
        }
        inner.clock_ms += inner.tick_ms;
        let roots = inner.screens.get(&inner.current)?.clone();
        Some(ScreenSnapshot::new(
            &inner.package_id,
            inner.clock_ms,
            roots,
        ))
    }
}

impl UiActionExecutor for ScriptedExecutor {
    fn tap(&mut self, element_id: u32) -> ActionResult {
        let mut inner = self.inner.borrow_mut();
        *inner.tap_counts.entry(element_id).or_insert(0) += 1;
        let key = (inner.current.clone(), element_id);
        if let Some(next) = inner.transitions.get(&key).cloned() {
            inner.current = next;
            return ActionResult::Accepted;
        }
        if inner.has_element(element_id) {
            // Wired to nothing; the tap lands but the screen stays put.
            return ActionResult::Accepted;
        }
        ActionResult::Rejected(format!("no element {element_id} on screen"))
    }

    fn scroll(&mut self, _direction: ScrollDirection) -> ActionResult {
        let mut inner = self.inner.borrow_mut();
        inner.scroll_count += 1;
        if let Some(next) = inner.scroll_variants.get(&inner.current).cloned() {
            inner.current = next;
        }
        ActionResult::Accepted
    }

    fn back(&mut self) -> ActionResult {
        let mut inner = self.inner.borrow_mut();
        inner.back_count += 1;
        if let Some(prev) = inner.back_links.get(&inner.current).cloned() {
            inner.current = prev;
            return ActionResult::Accepted;
        }
        ActionResult::Rejected("no back destination".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use appscout_snapshot::NodeRole;

    fn two_screen_app() -> ScriptedApp {
        let app = ScriptedApp::new("com.example.app", "home");
        app.add_screen(
            "home",
            vec![UiNode::new(1, NodeRole::Button).with_text("Open").clickable()],
        );
        app.add_screen(
            "detail",
            vec![UiNode::new(2, NodeRole::Text).with_text("Detail body")],
        );
        app.add_transition("home", 1, "detail");
        app.add_back_link("detail", "home");
        app
    }

    #[test]
    fn test_tap_follows_transition() {
        let app = two_screen_app();
        let (mut provider, mut executor) = app.split();
        assert!(provider.snapshot().is_some());
        assert_eq!(executor.tap(1), ActionResult::Accepted);
        assert_eq!(app.current_screen(), "detail");
        assert_eq!(app.tap_count(1), 1);
    }

    #[test]
    fn test_back_returns_home() {
        let app = two_screen_app();
        let (_, mut executor) = app.split();
        executor.tap(1);
        assert_eq!(executor.back(), ActionResult::Accepted);
        assert_eq!(app.current_screen(), "home");
    }

    #[test]
    fn test_tap_missing_element_rejected() {
        let app = two_screen_app();
        let (_, mut executor) = app.split();
        assert!(matches!(executor.tap(99), ActionResult::Rejected(_)));
    }

    #[test]
    fn test_unwired_tap_is_accepted_noop() {
        let app = two_screen_app();
        let (_, mut executor) = app.split();
        executor.tap(1);
        // Element 2 exists on detail but leads nowhere.
        assert_eq!(executor.tap(2), ActionResult::Accepted);
        assert_eq!(app.current_screen(), "detail");
    }

    #[test]
    fn test_failed_snapshots_then_recover() {
        let app = two_screen_app();
        let (mut provider, _) = app.split();
        app.fail_next_snapshots(2);
        assert!(provider.snapshot().is_none());
        assert!(provider.snapshot().is_none());
        assert!(provider.snapshot().is_some());
    }

    #[test]
    fn test_clock_advances_per_snapshot() {
        let app = two_screen_app();
        let (mut provider, _) = app.split();
        let a = provider.snapshot().unwrap();
        let b = provider.snapshot().unwrap();
        assert!(b.captured_at_ms > a.captured_at_ms);
    }
}
