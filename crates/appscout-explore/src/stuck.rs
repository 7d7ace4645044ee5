//! Per-(state, element) stuck tracking.
//!
//! A pair that keeps timing out is marked non-productive and never retried
//! for the rest of the session; a rejected dispatch disqualifies the pair
//! immediately. Suppression is session-local — the next session starts
//! clean, since the app may simply have been slow.

use std::collections::{HashMap, HashSet};

pub struct StuckTracker {
    threshold: u32,
    timeouts: HashMap<(String, u32), u32>,
    non_productive: HashSet<(String, u32)>,
}

impl StuckTracker {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold: threshold.max(1),
            timeouts: HashMap::new(),
            non_productive: HashSet::new(),
        }
    }

    /// Record a transition timeout for the pair. Returns true once the pair
    /// crosses the threshold and becomes non-productive.
    pub fn record_timeout(&mut self, state: &str, element_id: u32) -> bool {
        let key = (state.to_string(), element_id);
        let count = self.timeouts.entry(key.clone()).or_insert(0);
        *count += 1;
        if *count >= self.threshold {
            log::info!(
                "element {element_id} on {} non-productive after {count} timeouts",
                short(state)
            );
            self.non_productive.insert(key);
            true
        } else {
            false
        }
    }

    /// A rejected dispatch is conclusive on its own.
    pub fn mark_rejected(&mut self, state: &str, element_id: u32) {
        self.non_productive.insert((state.to_string(), element_id));
    }

    pub fn is_non_productive(&self, state: &str, element_id: u32) -> bool {
        self.non_productive
            .contains(&(state.to_string(), element_id))
    }

    pub fn non_productive_count(&self) -> usize {
        self.non_productive.len()
    }
}

/// First few characters of a state key for logs. Keys are hex digests in
/// practice but must not be assumed ASCII.
fn short(state: &str) -> String {
    state.chars().take(12).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_crossing() {
        let mut tracker = StuckTracker::new(2);
        assert!(!tracker.record_timeout("aaa", 1));
        assert!(!tracker.is_non_productive("aaa", 1));
        assert!(tracker.record_timeout("aaa", 1));
        assert!(tracker.is_non_productive("aaa", 1));
    }

    #[test]
    fn test_pairs_tracked_independently() {
        let mut tracker = StuckTracker::new(2);
        tracker.record_timeout("aaa", 1);
        tracker.record_timeout("bbb", 1);
        assert!(!tracker.is_non_productive("aaa", 1));
        assert!(!tracker.is_non_productive("bbb", 1));
    }

    #[test]
    fn test_rejection_is_immediate() {
        let mut tracker = StuckTracker::new(5);
        tracker.mark_rejected("aaa", 7);
        assert!(tracker.is_non_productive("aaa", 7));
        assert_eq!(tracker.non_productive_count(), 1);
    }

    #[test]
    fn test_zero_threshold_clamped() {
        let mut tracker = StuckTracker::new(0);
        assert!(tracker.record_timeout("aaa", 1));
    }

    #[test]
    fn test_log_key_truncation_respects_char_boundaries() {
        // Byte index 12 falls inside the two-byte 'ö'.
        assert_eq!(short("abcdefghijkömore"), "abcdefghijkö");
        assert_eq!(short("short"), "short");
    }
}
