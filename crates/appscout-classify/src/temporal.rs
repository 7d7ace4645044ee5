//! Temporal validation of screen-kind guesses.
//!
//! Tracks how long a guess persists across consecutive observations. Guesses
//! that hold for less than the transient threshold are penalized as likely
//! mid-transition noise; rapid alternation between two guesses ("flicker")
//! is penalized further; guesses that hold past the stable threshold earn a
//! small bonus. Timestamps come from the snapshot, never the wall clock, so
//! tests run instantly.

use serde::{Deserialize, Serialize};

use crate::analyzer::ScreenKind;

/// Thresholds and adjustment magnitudes. Tuning data, not logic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemporalConfig {
    /// Guesses younger than this are penalized.
    pub transient_ms: u64,
    /// Guesses older than this earn the stable bonus.
    pub stable_ms: u64,
    pub transient_penalty: f64,
    pub flicker_penalty: f64,
    pub stable_bonus: f64,
    /// Alternations within the window before flicker kicks in.
    pub flicker_threshold: u32,
}

impl Default for TemporalConfig {
    fn default() -> Self {
        Self {
            transient_ms: 500,
            stable_ms: 2000,
            transient_penalty: 0.15,
            flicker_penalty: 0.10,
            stable_bonus: 0.05,
            flicker_threshold: 3,
        }
    }
}

/// Adjustment produced for one observation.
#[derive(Debug, Clone)]
pub struct TemporalAdjustment {
    /// Signed confidence delta.
    pub adjustment: f64,
    pub indicators: Vec<String>,
}

/// Session-local guess-persistence tracker.
#[derive(Debug)]
pub struct TemporalValidator {
    config: TemporalConfig,
    current: Option<(ScreenKind, u64)>,
    previous: Option<ScreenKind>,
    /// Consecutive A->B->A style switches.
    alternations: u32,
}

impl TemporalValidator {
    pub fn new(config: TemporalConfig) -> Self {
        Self {
            config,
            current: None,
            previous: None,
            alternations: 0,
        }
    }

    /// Record an observation of `guess` at `at_ms` and return the adjustment.
    pub fn observe(&mut self, guess: ScreenKind, at_ms: u64) -> TemporalAdjustment {
        let mut indicators = Vec::new();

        let held_since = match self.current {
            Some((current, since)) if current == guess => since,
            Some((current, _)) => {
                // Guess changed. A switch back to the immediately previous
                // guess counts toward flicker.
                if self.previous == Some(guess) {
                    self.alternations += 1;
                } else {
                    self.alternations = 0;
                }
                self.previous = Some(current);
                self.current = Some((guess, at_ms));
                at_ms
            }
            None => {
                self.current = Some((guess, at_ms));
                at_ms
            }
        };

        let held_ms = at_ms.saturating_sub(held_since);
        let mut adjustment = 0.0;

        if held_ms < self.config.transient_ms {
            adjustment -= self.config.transient_penalty;
            indicators.push(format!("transient:{held_ms}ms"));
        } else if held_ms >= self.config.stable_ms {
            adjustment += self.config.stable_bonus;
            indicators.push(format!("stable:{held_ms}ms"));
        }

        if self.alternations >= self.config.flicker_threshold {
            adjustment -= self.config.flicker_penalty;
            indicators.push(format!("flicker:{}", self.alternations));
        }

        TemporalAdjustment {
            adjustment,
            indicators,
        }
    }

    /// Milliseconds the current guess has been held as of `at_ms`.
    pub fn held_ms(&self, at_ms: u64) -> u64 {
        match self.current {
            Some((_, since)) => at_ms.saturating_sub(since),
            None => 0,
        }
    }

    pub fn reset(&mut self) {
        self.current = None;
        self.previous = None;
        self.alternations = 0;
    }
}
