//! Screen fingerprinting.
//!
//! Canonicalizes a snapshot into a stable Sha256 digest so structurally
//! identical observations deduplicate. Only structural+textual content is
//! serialized: `role|clickable|normalized(text)` per node in deterministic
//! sibling-index order. Timestamps, frame counters, and anything else that
//! changes between otherwise-identical observations is excluded — including
//! any of those would make identical screens look "new" every tick.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::tree::ScreenSnapshot;

/// Sentinel hash for an empty or fully unreadable snapshot. Distinct from
/// any real digest (real hashes are 64 hex chars).
pub const EMPTY_SENTINEL: &str = "empty-screen";

/// Canonical hash of a snapshot plus auxiliary metrics.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint {
    pub hash: String,
    pub element_count: u32,
    pub max_depth: u32,
    /// Nodes skipped because they were detached/unreadable this tick.
    pub skipped_nodes: u32,
}

impl Fingerprint {
    pub fn is_empty_sentinel(&self) -> bool {
        self.hash == EMPTY_SENTINEL
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Short form for logs.
        let short = if self.hash.len() > 12 {
            &self.hash[..12]
        } else {
            &self.hash
        };
        write!(f, "{short}")
    }
}

/// Compute the fingerprint of a snapshot.
pub fn fingerprint(snapshot: &ScreenSnapshot) -> Fingerprint {
    let mut serialized = String::new();
    serialized.push_str(&snapshot.package_id);
    serialized.push('\n');

    let mut element_count = 0u32;
    let mut max_depth = 0u32;
    let mut skipped = 0u32;

    for visited in snapshot.walk() {
        if !visited.node.readable {
            skipped += 1;
            continue;
        }
        element_count += 1;
        if visited.depth + 1 > max_depth {
            max_depth = visited.depth + 1;
        }
        serialized.push_str(visited.node.role.token());
        serialized.push('|');
        serialized.push(if visited.node.clickable { '1' } else { '0' });
        serialized.push('|');
        serialized.push_str(&normalize(visited.node.text.as_deref().unwrap_or("")));
        serialized.push('\n');
    }

    if element_count == 0 {
        log::debug!("snapshot of {} had no readable nodes", snapshot.package_id);
        return Fingerprint {
            hash: EMPTY_SENTINEL.to_string(),
            element_count: 0,
            max_depth: 0,
            skipped_nodes: skipped,
        };
    }

    let mut hasher = Sha256::new();
    hasher.update(serialized.as_bytes());
    let hash = format!("{:x}", hasher.finalize());

    Fingerprint {
        hash,
        element_count,
        max_depth,
        skipped_nodes: skipped,
    }
}

/// Trim, case-fold, and collapse inner whitespace runs to a single space.
fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{NodeRole, UiNode};

    fn login_snapshot(captured_at_ms: u64, frame: u64) -> ScreenSnapshot {
        let root = UiNode::new(1, NodeRole::Container).with_children(vec![
            UiNode::new(2, NodeRole::EditText).with_text("Email"),
            UiNode::new(3, NodeRole::EditText).with_text("Password"),
            UiNode::new(4, NodeRole::Button).with_text("Sign In").clickable(),
        ]);
        let mut snap = ScreenSnapshot::new("com.example.app", captured_at_ms, vec![root]);
        snap.frame_counter = frame;
        snap
    }

    #[test]
    fn test_deterministic_for_identical_content() {
        let a = fingerprint(&login_snapshot(1000, 1));
        let b = fingerprint(&login_snapshot(1000, 1));
        assert_eq!(a.hash, b.hash);
    }

    #[test]
    fn test_volatile_fields_excluded() {
        // Same structure, different timestamp and frame counter.
        let a = fingerprint(&login_snapshot(1000, 1));
        let b = fingerprint(&login_snapshot(99_999, 42));
        assert_eq!(a.hash, b.hash);
    }

    #[test]
    fn test_included_field_change_changes_hash() {
        let a = fingerprint(&login_snapshot(0, 0));
        let mut snap = login_snapshot(0, 0);
        snap.roots[0].children[2].text = Some("Sign Up".to_string());
        let b = fingerprint(&snap);
        assert_ne!(a.hash, b.hash);
    }

    #[test]
    fn test_text_normalization() {
        let a = fingerprint(&login_snapshot(0, 0));
        let mut snap = login_snapshot(0, 0);
        snap.roots[0].children[2].text = Some("  SIGN   IN  ".to_string());
        let b = fingerprint(&snap);
        assert_eq!(a.hash, b.hash);
    }

    #[test]
    fn test_clickable_flag_is_structural() {
        let a = fingerprint(&login_snapshot(0, 0));
        let mut snap = login_snapshot(0, 0);
        snap.roots[0].children[2].clickable = false;
        let b = fingerprint(&snap);
        assert_ne!(a.hash, b.hash);
    }

    #[test]
    fn test_empty_snapshot_maps_to_sentinel() {
        let snap = ScreenSnapshot::new("com.example.app", 0, vec![]);
        let fp = fingerprint(&snap);
        assert!(fp.is_empty_sentinel());
        assert_eq!(fp.element_count, 0);
    }

    #[test]
    fn test_all_unreadable_maps_to_sentinel() {
        let mut node = UiNode::new(1, NodeRole::Container);
        node.readable = false;
        let snap = ScreenSnapshot::new("com.example.app", 0, vec![node]);
        let fp = fingerprint(&snap);
        assert!(fp.is_empty_sentinel());
        assert_eq!(fp.skipped_nodes, 1);
    }

    #[test]
    fn test_unreadable_node_skipped_not_fatal() {
        let mut snap = login_snapshot(0, 0);
        let mut detached = UiNode::new(9, NodeRole::Image);
        detached.readable = false;
        snap.roots[0].children.push(detached);
        let fp = fingerprint(&snap);
        assert_eq!(fp.skipped_nodes, 1);
        assert_eq!(fp.element_count, 4);
        // Skipped node does not perturb the digest.
        assert_eq!(fp.hash, fingerprint(&login_snapshot(0, 0)).hash);
    }

    #[test]
    fn test_metrics() {
        let fp = fingerprint(&login_snapshot(0, 0));
        assert_eq!(fp.element_count, 4);
        assert_eq!(fp.max_depth, 2);
        assert_eq!(fp.hash.len(), 64);
    }

    #[test]
    fn test_sibling_order_matters() {
        let a = fingerprint(&login_snapshot(0, 0));
        let mut snap = login_snapshot(0, 0);
        snap.roots[0].children.swap(0, 1);
        let b = fingerprint(&snap);
        assert_ne!(a.hash, b.hash);
    }
}
