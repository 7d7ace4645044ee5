use appscout_classify::ScreenKind;
use appscout_snapshot::Fingerprint;
use serde::{Deserialize, Serialize};

/// A distinct discovered screen. Created on first-seen fingerprint only;
/// mutated only to flip the visited flag or append metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenState {
    pub fingerprint: Fingerprint,
    pub package_id: String,
    pub kind: ScreenKind,
    pub confidence: f64,
    pub visited: bool,
    /// DFS depth at which this screen was first reached.
    pub first_seen_depth: u32,
    /// Times this fingerprint has been observed (cache hits included).
    pub observation_count: u32,
}

impl ScreenState {
    pub fn new(
        fingerprint: Fingerprint,
        package_id: &str,
        kind: ScreenKind,
        confidence: f64,
        first_seen_depth: u32,
    ) -> Self {
        Self {
            fingerprint,
            package_id: package_id.to_string(),
            kind,
            confidence,
            visited: false,
            first_seen_depth,
            observation_count: 1,
        }
    }
}
