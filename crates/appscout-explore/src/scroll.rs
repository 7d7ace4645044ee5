//! Scroll discovery.
//!
//! Scrollable screens hide actionable elements below the fold. Discovery
//! scrolls, lets the screen settle, re-snapshots, and compares fingerprints:
//! when two consecutive cycles produce the same fingerprint and element
//! count the content is exhausted and the loop halts. A hard attempt cap
//! guards against lazily-regenerating lists that never converge.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use appscout_core::ScrollConfig;
use appscout_snapshot::{fingerprint, NodeRole, ScreenSnapshot};

use crate::providers::{ActionResult, ScrollDirection, SnapshotProvider, UiActionExecutor};

/// What a discovery pass found.
#[derive(Debug)]
pub struct ScrollOutcome {
    /// Scrolls actually issued.
    pub attempts: u32,
    /// Snapshot after the last content change, when any scroll changed
    /// anything at all.
    pub final_snapshot: Option<ScreenSnapshot>,
    /// True when the loop stopped because content stopped changing, false
    /// when the attempt cap cut it off.
    pub halted_no_change: bool,
}

/// Whether the screen carries a scroll container worth probing.
pub fn has_scrollable(snapshot: &ScreenSnapshot) -> bool {
    snapshot
        .walk()
        .iter()
        .any(|v| matches!(v.node.role, NodeRole::List | NodeRole::ScrollView))
}

/// Run bounded scroll discovery from `base`.
pub fn discover<P, E>(
    provider: &mut P,
    executor: &mut E,
    config: &ScrollConfig,
    base: &ScreenSnapshot,
    cancel: &AtomicBool,
) -> ScrollOutcome
where
    P: SnapshotProvider,
    E: UiActionExecutor,
{
    let mut previous = fingerprint(base);
    let mut previous_count = base.element_count();
    let mut outcome = ScrollOutcome {
        attempts: 0,
        final_snapshot: None,
        halted_no_change: false,
    };

    while outcome.attempts < config.max_attempts {
        if cancel.load(Ordering::Relaxed) {
            break;
        }
        if let ActionResult::Rejected(reason) = executor.scroll(ScrollDirection::Down) {
            log::debug!("scroll rejected: {reason}");
            break;
        }
        outcome.attempts += 1;

        if config.settle_ms > 0 {
            std::thread::sleep(Duration::from_millis(config.settle_ms));
        }
        let Some(snapshot) = provider.snapshot() else {
            // Unreadable after a scroll; nothing trustworthy to diff.
            break;
        };
        let current = fingerprint(&snapshot);
        let current_count = snapshot.element_count();

        if current.hash == previous.hash && current_count == previous_count {
            outcome.halted_no_change = true;
            break;
        }
        previous = current;
        previous_count = current_count;
        outcome.final_snapshot = Some(snapshot);
    }

    log::debug!(
        "scroll discovery: {} attempts, exhausted={}",
        outcome.attempts,
        outcome.halted_no_change
    );
    outcome
}
