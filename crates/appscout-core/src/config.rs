//! Exploration configuration surface.
//!
//! Pure data, serde-loadable: calibration profile, danger lexicon, scroll
//! cap, transition timing, session budgets, stuck threshold, RNG seed.
//! Everything a deployment tunes without touching code lives here.

use appscout_classify::element::DangerLexicon;
use appscout_classify::CalibrationProfile;
use appscout_store::WaitOptions;
use serde::{Deserialize, Serialize};

use crate::budget::SessionBudget;

/// Scroll discovery parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScrollConfig {
    /// Hard cap on scroll attempts per screen. Prevents infinite loops on
    /// lazily-regenerating lists.
    pub max_attempts: u32,
    /// Delay after a scroll before re-snapshotting.
    pub settle_ms: u64,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            settle_ms: 300,
        }
    }
}

/// Full configuration for one exploration session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplorerConfig {
    pub calibration: CalibrationProfile,
    pub lexicon: DangerLexicon,
    pub scroll: ScrollConfig,
    /// Transition wait timing.
    pub transition: WaitOptions,
    pub budget: SessionBudget,
    /// Timeouts on one (state, element) pair before it is marked
    /// non-productive for the session.
    pub stuck_retry_threshold: u32,
    /// RNG seed for reproducible tie-breaking in action selection.
    pub seed: u64,
    /// Snapshot retries on a transiently unreadable tree.
    pub observation_retries: u32,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            calibration: CalibrationProfile::default(),
            lexicon: DangerLexicon::default(),
            scroll: ScrollConfig::default(),
            transition: WaitOptions::default(),
            budget: SessionBudget::default(),
            stuck_retry_threshold: 2,
            seed: 42,
            observation_retries: 3,
        }
    }
}

impl ExplorerConfig {
    /// Fast timings for tests: waits resolve in a few milliseconds.
    pub fn fast() -> Self {
        Self {
            transition: WaitOptions {
                timeout_ms: 20,
                poll_interval_ms: 1,
            },
            scroll: ScrollConfig {
                max_attempts: 5,
                settle_ms: 0,
            },
            ..Self::default()
        }
    }
}
