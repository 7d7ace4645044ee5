pub mod accuracy;
pub mod analyzer;
pub mod calibrate;
pub mod element;
pub mod resolver;
pub mod temporal;

pub use analyzer::{Analyzer, AnalyzerResult, MatchScope, ScreenKind};
pub use calibrate::{CalibrationProfile, Detection, StateClassifier};
pub use element::{ElementClassifier, ElementRecord, SafetyClass};
