//! Immutable UI tree model.
//!
//! A `ScreenSnapshot` is one observation of a live, externally owned UI.
//! It is immutable once captured; everything downstream (fingerprinting,
//! classification) is a pure function of it. Traversal is iterative with a
//! seen-id guard because live trees can hand back stale subtrees that make
//! the same node appear twice.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Role of a UI node, as reported by the observation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeRole {
    Button,
    Text,
    EditText,
    Image,
    List,
    ScrollView,
    ProgressBar,
    CheckBox,
    Container,
    Dialog,
    FloatingActionButton,
    Unknown,
}

impl NodeRole {
    /// Stable token used in the fingerprint serialization. Never rename a
    /// token without accepting that every stored fingerprint changes.
    pub fn token(&self) -> &'static str {
        match self {
            NodeRole::Button => "button",
            NodeRole::Text => "text",
            NodeRole::EditText => "edittext",
            NodeRole::Image => "image",
            NodeRole::List => "list",
            NodeRole::ScrollView => "scrollview",
            NodeRole::ProgressBar => "progressbar",
            NodeRole::CheckBox => "checkbox",
            NodeRole::Container => "container",
            NodeRole::Dialog => "dialog",
            NodeRole::FloatingActionButton => "fab",
            NodeRole::Unknown => "unknown",
        }
    }
}

/// Pixel bounds of a node on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Bounds {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Bounds {
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(&self) -> i32 {
        (self.right - self.left).max(0)
    }

    pub fn height(&self) -> i32 {
        (self.bottom - self.top).max(0)
    }

    pub fn area(&self) -> i64 {
        self.width() as i64 * self.height() as i64
    }
}

/// One node in an observed UI tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiNode {
    /// Observation-layer node id, stable within one snapshot.
    pub id: u32,
    pub role: NodeRole,
    pub text: Option<String>,
    pub clickable: bool,
    pub enabled: bool,
    /// False when the node detached between observation and read.
    /// Unreadable nodes are skipped (and counted) rather than aborting.
    pub readable: bool,
    pub bounds: Bounds,
    pub children: Vec<UiNode>,
}

impl UiNode {
    pub fn new(id: u32, role: NodeRole) -> Self {
        Self {
            id,
            role,
            text: None,
            clickable: false,
            enabled: true,
            readable: true,
            bounds: Bounds::default(),
            children: Vec::new(),
        }
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.text = Some(text.to_string());
        self
    }

    pub fn clickable(mut self) -> Self {
        self.clickable = true;
        self
    }

    pub fn with_bounds(mut self, bounds: Bounds) -> Self {
        self.bounds = bounds;
        self
    }

    pub fn with_children(mut self, children: Vec<UiNode>) -> Self {
        self.children = children;
        self
    }
}

/// One observation of the live UI tree. Immutable once captured.
///
/// `captured_at_ms` and `frame_counter` are volatile: they differ between
/// otherwise-identical observations and must never enter the fingerprint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenSnapshot {
    pub package_id: String,
    pub captured_at_ms: u64,
    pub frame_counter: u64,
    pub roots: Vec<UiNode>,
}

impl ScreenSnapshot {
    pub fn new(package_id: &str, captured_at_ms: u64, roots: Vec<UiNode>) -> Self {
        Self {
            package_id: package_id.to_string(),
            captured_at_ms,
            frame_counter: 0,
            roots,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Walk the tree in deterministic pre-order (sibling index, not spatial
    /// position) using an explicit work-list. Nodes whose id was already seen
    /// are skipped — a stale subtree must not be visited twice.
    pub fn walk(&self) -> Vec<VisitedNode<'_>> {
        let mut out = Vec::new();
        let mut seen: HashSet<u32> = HashSet::new();
        // LIFO work-list; children pushed in reverse so the walk order is
        // first-sibling-first.
        let mut stack: Vec<(&UiNode, u32)> = Vec::new();
        for root in self.roots.iter().rev() {
            stack.push((root, 0));
        }
        while let Some((node, depth)) = stack.pop() {
            if !seen.insert(node.id) {
                log::debug!("duplicate node id {} in snapshot, skipping", node.id);
                continue;
            }
            out.push(VisitedNode { node, depth });
            for child in node.children.iter().rev() {
                stack.push((child, depth + 1));
            }
        }
        out
    }

    /// Count of readable nodes in the tree.
    pub fn element_count(&self) -> u32 {
        self.walk().iter().filter(|v| v.node.readable).count() as u32
    }

    /// Deepest nesting level, 1-based. 0 for an empty snapshot.
    pub fn max_depth(&self) -> u32 {
        self.walk()
            .iter()
            .map(|v| v.depth + 1)
            .max()
            .unwrap_or(0)
    }

    /// All clickable, enabled, readable nodes in walk order.
    pub fn actionable_nodes(&self) -> Vec<&UiNode> {
        self.walk()
            .into_iter()
            .filter(|v| v.node.readable && v.node.clickable && v.node.enabled)
            .map(|v| v.node)
            .collect()
    }
}

/// A node paired with its traversal depth (0 = root).
#[derive(Debug, Clone, Copy)]
pub struct VisitedNode<'a> {
    pub node: &'a UiNode,
    pub depth: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_tree() -> ScreenSnapshot {
        let root = UiNode::new(1, NodeRole::Container).with_children(vec![
            UiNode::new(2, NodeRole::Text).with_text("Hello"),
            UiNode::new(3, NodeRole::Button).with_text("Go").clickable(),
        ]);
        ScreenSnapshot::new("com.example.app", 1000, vec![root])
    }

    #[test]
    fn test_walk_order_is_sibling_index() {
        let snap = small_tree();
        let ids: Vec<u32> = snap.walk().iter().map(|v| v.node.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_walk_depths() {
        let snap = small_tree();
        let depths: Vec<u32> = snap.walk().iter().map(|v| v.depth).collect();
        assert_eq!(depths, vec![0, 1, 1]);
    }

    #[test]
    fn test_duplicate_id_visited_once() {
        // Stale subtree: node 2 appears under two parents.
        let root = UiNode::new(1, NodeRole::Container).with_children(vec![
            UiNode::new(2, NodeRole::Text).with_text("a"),
            UiNode::new(2, NodeRole::Text).with_text("a again"),
        ]);
        let snap = ScreenSnapshot::new("com.example.app", 0, vec![root]);
        assert_eq!(snap.walk().len(), 2);
    }

    #[test]
    fn test_element_count_skips_unreadable() {
        let mut detached = UiNode::new(4, NodeRole::Image);
        detached.readable = false;
        let root = UiNode::new(1, NodeRole::Container).with_children(vec![
            UiNode::new(2, NodeRole::Text),
            detached,
        ]);
        let snap = ScreenSnapshot::new("com.example.app", 0, vec![root]);
        assert_eq!(snap.element_count(), 2);
    }

    #[test]
    fn test_actionable_nodes_filters_disabled() {
        let mut disabled = UiNode::new(3, NodeRole::Button).clickable();
        disabled.enabled = false;
        let root = UiNode::new(1, NodeRole::Container).with_children(vec![
            UiNode::new(2, NodeRole::Button).with_text("Ok").clickable(),
            disabled,
        ]);
        let snap = ScreenSnapshot::new("com.example.app", 0, vec![root]);
        let actionable = snap.actionable_nodes();
        assert_eq!(actionable.len(), 1);
        assert_eq!(actionable[0].id, 2);
    }

    #[test]
    fn test_empty_snapshot() {
        let snap = ScreenSnapshot::new("com.example.app", 0, vec![]);
        assert!(snap.is_empty());
        assert_eq!(snap.element_count(), 0);
        assert_eq!(snap.max_depth(), 0);
    }

    #[test]
    fn test_bounds_area() {
        let b = Bounds::new(0, 0, 100, 50);
        assert_eq!(b.width(), 100);
        assert_eq!(b.height(), 50);
        assert_eq!(b.area(), 5000);
    }
}
