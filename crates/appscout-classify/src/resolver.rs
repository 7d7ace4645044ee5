//! Multi-state resolution.
//!
//! A snapshot may legitimately carry more than one state (an error banner on
//! top of a dialog, say). The resolver picks one primary and keeps only
//! secondaries drawn from an explicit compatibility allow-list; mutually
//! exclusive pairs are rejected and resolved by strength, then recency.

use crate::analyzer::ScreenKind;

/// A candidate (kind, calibrated confidence) pair, ordered by arrival.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub kind: ScreenKind,
    pub confidence: f64,
}

/// Resolved primary plus compatible secondaries.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub primary: Candidate,
    pub secondaries: Vec<Candidate>,
    /// Candidates dropped for incompatibility, for audit.
    pub rejected: Vec<ScreenKind>,
}

/// Pairs of kinds allowed to co-occur on one snapshot. Order-insensitive.
/// Everything not listed is mutually exclusive.
const COMPATIBLE: &[(ScreenKind, ScreenKind)] = &[
    (ScreenKind::Error, ScreenKind::Dialog),
    (ScreenKind::Login, ScreenKind::Dialog),
    (ScreenKind::Form, ScreenKind::Dialog),
    (ScreenKind::Settings, ScreenKind::Dialog),
    (ScreenKind::Detail, ScreenKind::Dialog),
    (ScreenKind::List, ScreenKind::Dialog),
    (ScreenKind::Home, ScreenKind::Dialog),
    (ScreenKind::Home, ScreenKind::List),
    (ScreenKind::Detail, ScreenKind::List),
    (ScreenKind::Settings, ScreenKind::List),
    (ScreenKind::Error, ScreenKind::Form),
    (ScreenKind::Error, ScreenKind::Login),
];

/// Whether two kinds may co-occur.
pub fn compatible(a: ScreenKind, b: ScreenKind) -> bool {
    if a == b {
        return true;
    }
    COMPATIBLE
        .iter()
        .any(|&(x, y)| (x == a && y == b) || (x == b && y == a))
}

/// Resolve a set of candidates into primary + compatible secondaries.
///
/// The strongest candidate wins primary; ties break toward the most recent
/// (later in the list). Secondaries must be compatible with the primary AND
/// with every already-accepted secondary.
pub fn resolve(candidates: &[Candidate]) -> Option<Resolution> {
    if candidates.is_empty() {
        return None;
    }

    let mut primary_idx = 0;
    for (i, c) in candidates.iter().enumerate() {
        // `>=` so the most recent of equal-strength candidates wins.
        if c.confidence >= candidates[primary_idx].confidence {
            primary_idx = i;
        }
    }
    let primary = candidates[primary_idx].clone();

    let mut secondaries: Vec<Candidate> = Vec::new();
    let mut rejected = Vec::new();
    for (i, c) in candidates.iter().enumerate() {
        if i == primary_idx || c.kind == primary.kind {
            continue;
        }
        let ok = compatible(primary.kind, c.kind)
            && secondaries.iter().all(|s| compatible(s.kind, c.kind));
        if ok {
            secondaries.push(c.clone());
        } else {
            rejected.push(c.kind);
        }
    }

    Some(Resolution {
        primary,
        secondaries,
        rejected,
    })
}
