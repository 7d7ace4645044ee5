//! Screen state store.
//!
//! Per-session dedup cache (fingerprint -> state), visited set, and ordered
//! history. A single mutex serializes capture/mark_visited so concurrent
//! observers can never double-create a state for one fingerprint. The store
//! lives exactly as long as one exploration session; nothing here is
//! process-wide.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use appscout_classify::Detection;
use appscout_snapshot::Fingerprint;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::state::ScreenState;

/// Result of a capture: the (possibly pre-existing) state and whether this
/// call created it.
#[derive(Debug, Clone)]
pub struct CaptureOutcome {
    pub state: ScreenState,
    pub created: bool,
}

/// Outcome of a bounded transition wait. Timeout is a value, not an error —
/// the caller decides whether to retry or backtrack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionWait {
    Changed(Fingerprint),
    TimedOut,
    Cancelled,
}

/// Poll parameters for `wait_for_transition`. Configurable so tests can run
/// near-instantaneously.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WaitOptions {
    pub timeout_ms: u64,
    pub poll_interval_ms: u64,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout_ms: 3000,
            poll_interval_ms: 100,
        }
    }
}

/// Store statistics, exposed for coverage auditing.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct StoreStats {
    pub total_states: u32,
    pub visited_states: u32,
    pub history_entries: u32,
    pub cache_hits: u32,
}

#[derive(Debug, Default)]
struct Inner {
    states: HashMap<String, ScreenState>,
    /// Ordered fingerprints as observed; consecutive duplicates collapsed.
    history: Vec<String>,
    cache_hits: u32,
}

/// Mutex-guarded screen state store. One instance per session.
#[derive(Debug, Default)]
pub struct ScreenStateStore {
    inner: Mutex<Inner>,
}

impl ScreenStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dedup capture: returns the existing state on a known fingerprint,
    /// otherwise creates and stores a new one. The single lock makes
    /// create-or-hit atomic.
    pub fn capture(
        &self,
        fingerprint: &Fingerprint,
        package_id: &str,
        detection: &Detection,
        depth: u32,
    ) -> CaptureOutcome {
        let mut inner = self.inner.lock().expect("store mutex poisoned");

        // Consecutive duplicates collapse in history.
        if inner.history.last().map(|h| h.as_str()) != Some(fingerprint.hash.as_str()) {
            let hash = fingerprint.hash.clone();
            inner.history.push(hash);
        }

        if let Some(existing) = inner.states.get_mut(&fingerprint.hash) {
            existing.observation_count += 1;
            let state = existing.clone();
            inner.cache_hits += 1;
            return CaptureOutcome {
                state,
                created: false,
            };
        }

        let state = ScreenState::new(
            fingerprint.clone(),
            package_id,
            detection.primary,
            detection.confidence,
            depth,
        );
        log::info!(
            "new screen state {} kind={} confidence={:.2}",
            fingerprint,
            detection.primary,
            detection.confidence
        );
        inner.states.insert(fingerprint.hash.clone(), state.clone());
        CaptureOutcome {
            state,
            created: true,
        }
    }

    /// Flip the visited flag. Returns false for an unknown fingerprint.
    pub fn mark_visited(&self, hash: &str) -> bool {
        let mut inner = self.inner.lock().expect("store mutex poisoned");
        match inner.states.get_mut(hash) {
            Some(state) => {
                state.visited = true;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, hash: &str) -> Option<ScreenState> {
        self.inner
            .lock()
            .expect("store mutex poisoned")
            .states
            .get(hash)
            .cloned()
    }

    pub fn contains(&self, hash: &str) -> bool {
        self.inner
            .lock()
            .expect("store mutex poisoned")
            .states
            .contains_key(hash)
    }

    /// Bounded poll for a fingerprint change. `probe` re-observes the UI and
    /// returns the current fingerprint. Never blocks past the timeout; the
    /// cancellation flag is checked every iteration. No lock is held while
    /// polling.
    pub fn wait_for_transition<F>(
        &self,
        from: &str,
        options: &WaitOptions,
        cancel: &AtomicBool,
        mut probe: F,
    ) -> TransitionWait
    where
        F: FnMut() -> Option<Fingerprint>,
    {
        let deadline = Instant::now() + Duration::from_millis(options.timeout_ms);
        loop {
            if cancel.load(Ordering::Relaxed) {
                return TransitionWait::Cancelled;
            }
            // A transient unreadable tree is retried next tick, non-fatal.
            if let Some(fp) = probe() {
                if fp.hash != from {
                    return TransitionWait::Changed(fp);
                }
            }
            if Instant::now() >= deadline {
                return TransitionWait::TimedOut;
            }
            std::thread::sleep(Duration::from_millis(options.poll_interval_ms));
        }
    }

    /// Ordered observation history, consecutive duplicates collapsed.
    pub fn history(&self) -> Vec<String> {
        self.inner
            .lock()
            .expect("store mutex poisoned")
            .history
            .clone()
    }

    pub fn stats(&self) -> StoreStats {
        let inner = self.inner.lock().expect("store mutex poisoned");
        StoreStats {
            total_states: inner.states.len() as u32,
            visited_states: inner.states.values().filter(|s| s.visited).count() as u32,
            history_entries: inner.history.len() as u32,
            cache_hits: inner.cache_hits,
        }
    }

    /// All states, for batch persistence.
    pub fn all_states(&self) -> Vec<ScreenState> {
        self.inner
            .lock()
            .expect("store mutex poisoned")
            .states
            .values()
            .cloned()
            .collect()
    }

    /// Fingerprints of states never visited, for coverage auditing.
    pub fn unvisited(&self) -> Vec<String> {
        self.inner
            .lock()
            .expect("store mutex poisoned")
            .states
            .values()
            .filter(|s| !s.visited)
            .map(|s| s.fingerprint.hash.clone())
            .collect()
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock().expect("store mutex poisoned");
        inner.states.clear();
        inner.history.clear();
        inner.cache_hits = 0;
    }
}
