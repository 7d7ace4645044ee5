//! Confidence calibration.
//!
//! Fans the analyzer ensemble out over a snapshot (analyzers are pure, so
//! they run in parallel), groups candidates by guess, and combines them with
//! a data-driven weighting profile: weighted analyzer confidences, times the
//! hierarchy-scope multiplier, plus the temporal adjustment, minus the capped
//! negative-indicator penalty, clamped to [0,1]. Profiles are plain data and
//! swappable at runtime so offline tuning never touches code.

use std::collections::HashMap;

use appscout_snapshot::ScreenSnapshot;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::analyzer::{
    negative_penalty, Analyzer, AnalyzerResult, HierarchyAnalyzer, MatchScope, PatternMatcher,
    ScreenKind,
};
use crate::resolver::{self, Candidate};
use crate::temporal::{TemporalConfig, TemporalValidator};

/// Data-only calibration profile. Weights and thresholds, never logic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationProfile {
    /// Per-analyzer weight, keyed by `Analyzer::name()`. Missing = 1.0.
    pub analyzer_weights: HashMap<String, f64>,
    pub full_screen_multiplier: f64,
    pub modal_dialog_multiplier: f64,
    pub nested_component_multiplier: f64,
    pub temporal: TemporalConfig,
    /// Penalty per matched negative indicator.
    pub negative_indicator_penalty: f64,
    /// Hard cap on the cumulative negative penalty.
    pub negative_cap: f64,
    /// Below this, the detection is recorded as Unknown.
    pub ambiguity_threshold: f64,
}

impl Default for CalibrationProfile {
    fn default() -> Self {
        let mut analyzer_weights = HashMap::new();
        analyzer_weights.insert("pattern".to_string(), 1.0);
        analyzer_weights.insert("hierarchy".to_string(), 0.8);
        Self {
            analyzer_weights,
            full_screen_multiplier: 1.0,
            modal_dialog_multiplier: 0.85,
            nested_component_multiplier: 0.7,
            temporal: TemporalConfig::default(),
            negative_indicator_penalty: 0.1,
            negative_cap: 0.3,
            ambiguity_threshold: 0.4,
        }
    }
}

impl CalibrationProfile {
    pub fn weight_for(&self, analyzer: &str) -> f64 {
        self.analyzer_weights.get(analyzer).copied().unwrap_or(1.0)
    }

    pub fn scope_multiplier(&self, scope: MatchScope) -> f64 {
        match scope {
            MatchScope::FullScreen => self.full_screen_multiplier,
            MatchScope::ModalDialog => self.modal_dialog_multiplier,
            MatchScope::NestedComponent => self.nested_component_multiplier,
        }
    }
}

/// Final classification of one snapshot.
#[derive(Debug, Clone)]
pub struct Detection {
    pub primary: ScreenKind,
    /// Calibrated confidence in [0,1].
    pub confidence: f64,
    /// Compatible secondary states, strongest first.
    pub secondaries: Vec<ScreenKind>,
    /// Every indicator that contributed, for audit.
    pub indicators: Vec<String>,
    /// True when confidence fell below the ambiguity threshold and the
    /// primary was downgraded to Unknown.
    pub ambiguous: bool,
}

/// The state classifier: analyzer ensemble + calibrator + temporal state.
pub struct StateClassifier {
    analyzers: Vec<Box<dyn Analyzer>>,
    profile: CalibrationProfile,
    temporal: TemporalValidator,
}

impl StateClassifier {
    pub fn new(profile: CalibrationProfile) -> Self {
        let temporal = TemporalValidator::new(profile.temporal.clone());
        Self {
            analyzers: vec![Box::new(PatternMatcher), Box::new(HierarchyAnalyzer)],
            profile,
            temporal,
        }
    }

    /// Swap the calibration profile at runtime. Temporal state is kept; the
    /// new thresholds apply from the next observation.
    pub fn set_profile(&mut self, profile: CalibrationProfile) {
        self.temporal = TemporalValidator::new(profile.temporal.clone());
        self.profile = profile;
    }

    pub fn profile(&self) -> &CalibrationProfile {
        &self.profile
    }

    /// Classify one snapshot. Stateful only through the temporal validator.
    pub fn classify(&mut self, snapshot: &ScreenSnapshot) -> Detection {
        // Independent analyzers run concurrently against one another.
        let raw: Vec<(&'static str, Vec<AnalyzerResult>)> = self
            .analyzers
            .par_iter()
            .map(|a| (a.name(), a.analyze(snapshot)))
            .collect();

        // Group weighted confidences by guess.
        let mut by_guess: HashMap<ScreenKind, (f64, f64, Vec<String>)> = HashMap::new();
        for (name, results) in &raw {
            let weight = self.profile.weight_for(name);
            for r in results {
                let entry = by_guess.entry(r.guess).or_insert((0.0, 0.0, Vec::new()));
                entry.0 += weight * r.raw_confidence;
                entry.1 += weight;
                entry.2.extend(r.indicators.iter().cloned());
            }
        }

        if by_guess.is_empty() {
            return Detection {
                primary: ScreenKind::Unknown,
                confidence: 0.0,
                secondaries: Vec::new(),
                indicators: Vec::new(),
                ambiguous: true,
            };
        }

        let scope = HierarchyAnalyzer::scope(snapshot);
        let scope_multiplier = self.profile.scope_multiplier(scope);

        // Calibrate each candidate: weighted mean * scope - negative penalty.
        let mut candidates: Vec<(Candidate, Vec<String>)> = Vec::new();
        // Deterministic candidate order regardless of HashMap iteration.
        let mut guesses: Vec<_> = by_guess.into_iter().collect();
        guesses.sort_by(|a, b| a.1 .0.partial_cmp(&b.1 .0).unwrap().reverse());
        for (guess, (weighted_sum, weight_total, mut indicators)) in guesses {
            let base = if weight_total > 0.0 {
                weighted_sum / weight_total
            } else {
                0.0
            };
            let (penalty, negative) = negative_penalty(
                snapshot,
                guess,
                self.profile.negative_indicator_penalty,
                self.profile.negative_cap,
            );
            indicators.extend(negative);
            let confidence = (base * scope_multiplier - penalty).clamp(0.0, 1.0);
            candidates.push((Candidate { kind: guess, confidence }, indicators));
        }

        let resolution = resolver::resolve(
            &candidates.iter().map(|(c, _)| c.clone()).collect::<Vec<_>>(),
        )
        .expect("candidates verified non-empty");

        // Temporal adjustment applies to the resolved primary only.
        let temporal = self
            .temporal
            .observe(resolution.primary.kind, snapshot.captured_at_ms);
        let confidence = (resolution.primary.confidence + temporal.adjustment).clamp(0.0, 1.0);

        let mut indicators: Vec<String> = candidates
            .iter()
            .find(|(c, _)| c.kind == resolution.primary.kind)
            .map(|(_, i)| i.clone())
            .unwrap_or_default();
        indicators.extend(temporal.indicators);

        let ambiguous = confidence < self.profile.ambiguity_threshold;
        let primary = if ambiguous {
            log::debug!(
                "ambiguous detection: {} at {:.2}, recording Unknown",
                resolution.primary.kind,
                confidence
            );
            ScreenKind::Unknown
        } else {
            resolution.primary.kind
        };

        Detection {
            primary,
            confidence,
            secondaries: resolution.secondaries.iter().map(|c| c.kind).collect(),
            indicators,
            ambiguous,
        }
    }
}
