//! Detection accuracy tracking.
//!
//! Optionally records detection-vs-ground-truth pairs during offline tuning
//! and computes running accuracy, precision, recall, and F1 per screen kind.
//! Feeding it is the caller's choice; the classifier never requires it.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::analyzer::ScreenKind;

/// One recorded detection against known ground truth.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroundTruthPair {
    pub detected: ScreenKind,
    pub actual: ScreenKind,
    pub confidence: f64,
}

/// Per-kind confusion counts.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct KindCounts {
    pub true_positives: u32,
    pub false_positives: u32,
    pub false_negatives: u32,
}

/// Derived metrics for one kind.
#[derive(Debug, Clone, Copy)]
pub struct KindMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

/// Running accuracy aggregator.
#[derive(Debug, Clone, Default)]
pub struct DetectionAccuracy {
    pairs: Vec<GroundTruthPair>,
    counts: HashMap<ScreenKind, KindCounts>,
    correct: u32,
    total: u32,
}

impl DetectionAccuracy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one detection against ground truth.
    pub fn record(&mut self, detected: ScreenKind, actual: ScreenKind, confidence: f64) {
        self.pairs.push(GroundTruthPair {
            detected,
            actual,
            confidence,
        });
        self.total += 1;
        if detected == actual {
            self.correct += 1;
            self.counts.entry(actual).or_default().true_positives += 1;
        } else {
            self.counts.entry(detected).or_default().false_positives += 1;
            self.counts.entry(actual).or_default().false_negatives += 1;
        }
    }

    /// Overall accuracy across all kinds.
    pub fn accuracy(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.correct as f64 / self.total as f64
        }
    }

    /// Precision/recall/F1 for one kind. Zero denominators yield 0.0.
    pub fn metrics_for(&self, kind: ScreenKind) -> KindMetrics {
        let c = self.counts.get(&kind).copied().unwrap_or_default();
        let precision = ratio(c.true_positives, c.true_positives + c.false_positives);
        let recall = ratio(c.true_positives, c.true_positives + c.false_negatives);
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };
        KindMetrics {
            precision,
            recall,
            f1,
        }
    }

    pub fn recorded_pairs(&self) -> &[GroundTruthPair] {
        &self.pairs
    }

    pub fn sample_count(&self) -> u32 {
        self.total
    }
}

fn ratio(num: u32, den: u32) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_tracker() {
        let t = DetectionAccuracy::new();
        assert_eq!(t.accuracy(), 0.0);
        assert_eq!(t.sample_count(), 0);
        let m = t.metrics_for(ScreenKind::Login);
        assert_eq!(m.precision, 0.0);
        assert_eq!(m.recall, 0.0);
        assert_eq!(m.f1, 0.0);
    }

    #[test]
    fn test_accuracy() {
        let mut t = DetectionAccuracy::new();
        t.record(ScreenKind::Login, ScreenKind::Login, 0.9);
        t.record(ScreenKind::Home, ScreenKind::Home, 0.8);
        t.record(ScreenKind::List, ScreenKind::Home, 0.6);
        t.record(ScreenKind::Login, ScreenKind::Login, 0.85);

        assert!((t.accuracy() - 0.75).abs() < 1e-9);
        assert_eq!(t.sample_count(), 4);
    }

    #[test]
    fn test_precision_recall_f1() {
        let mut t = DetectionAccuracy::new();
        // Login: 2 TP, 1 FP (detected Login, actually Home),
        // 1 FN (actually Login, detected Form).
        t.record(ScreenKind::Login, ScreenKind::Login, 0.9);
        t.record(ScreenKind::Login, ScreenKind::Login, 0.9);
        t.record(ScreenKind::Login, ScreenKind::Home, 0.5);
        t.record(ScreenKind::Form, ScreenKind::Login, 0.5);

        let m = t.metrics_for(ScreenKind::Login);
        assert!((m.precision - 2.0 / 3.0).abs() < 1e-9);
        assert!((m.recall - 2.0 / 3.0).abs() < 1e-9);
        assert!((m.f1 - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_misdetection_counts_both_sides() {
        let mut t = DetectionAccuracy::new();
        t.record(ScreenKind::List, ScreenKind::Home, 0.5);

        let list = t.metrics_for(ScreenKind::List);
        let home = t.metrics_for(ScreenKind::Home);
        assert_eq!(list.precision, 0.0); // 0 TP, 1 FP
        assert_eq!(home.recall, 0.0); // 0 TP, 1 FN
    }
}
