//! End-to-end detection scenarios through the full classifier stack.

use appscout_classify::{
    CalibrationProfile, ElementClassifier, SafetyClass, ScreenKind, StateClassifier,
};
use appscout_classify::element::DangerLexicon;
use appscout_snapshot::{NodeRole, ScreenSnapshot, UiNode};

fn login_screen(at_ms: u64) -> ScreenSnapshot {
    let root = UiNode::new(1, NodeRole::Container).with_children(vec![
        UiNode::new(2, NodeRole::EditText).with_text("Username"),
        UiNode::new(3, NodeRole::EditText).with_text("Password"),
        UiNode::new(4, NodeRole::Button).with_text("Sign In").clickable(),
    ]);
    ScreenSnapshot::new("com.example.app", at_ms, vec![root])
}

fn confirm_dialog(at_ms: u64) -> ScreenSnapshot {
    let dialog = UiNode::new(2, NodeRole::Dialog).with_children(vec![
        UiNode::new(3, NodeRole::Text).with_text("Discard changes?"),
        UiNode::new(4, NodeRole::Button).with_text("Discard").clickable(),
        UiNode::new(5, NodeRole::Button).with_text("Cancel").clickable(),
    ]);
    let root = UiNode::new(1, NodeRole::Container).with_children(vec![dialog]);
    ScreenSnapshot::new("com.example.app", at_ms, vec![root])
}

#[test]
fn test_stable_observation_beats_flickering_one() {
    let mut stable = StateClassifier::new(CalibrationProfile::default());
    stable.classify(&login_screen(0));
    let settled = stable.classify(&login_screen(2500));

    let mut flickering = StateClassifier::new(CalibrationProfile::default());
    flickering.classify(&login_screen(0));
    flickering.classify(&confirm_dialog(400));
    flickering.classify(&login_screen(800));
    flickering.classify(&confirm_dialog(1200));
    let flickered = flickering.classify(&login_screen(1600));

    assert_eq!(settled.primary, ScreenKind::Login);
    assert!(flickered.confidence < settled.confidence);
}

#[test]
fn test_dialog_classification_drives_element_policy() {
    // The state classifier sees a modal; the element classifier must steer
    // toward its dismissive path on the same snapshot.
    let snap = confirm_dialog(3000);
    let mut states = StateClassifier::new(CalibrationProfile::default());
    states.classify(&confirm_dialog(0));
    let detection = states.classify(&snap);
    assert_eq!(detection.primary, ScreenKind::Dialog);

    let elements = ElementClassifier::new(DangerLexicon::default());
    let records = elements.classify_all(&snap);
    let first = &records[0];
    assert_eq!(first.text.as_deref(), Some("Cancel"));
    assert_eq!(first.classification, SafetyClass::Safe);
}

#[test]
fn test_detections_carry_auditable_indicators() {
    let mut classifier = StateClassifier::new(CalibrationProfile::default());
    classifier.classify(&login_screen(0));
    let detection = classifier.classify(&login_screen(2500));
    assert!(!detection.indicators.is_empty());

    let elements = ElementClassifier::new(DangerLexicon::default());
    for record in elements.classify_all(&login_screen(0)) {
        assert!(!record.indicators.is_empty(), "element {} lacks indicators", record.id);
    }
}

#[test]
fn test_tightened_profile_rejects_weak_matches() {
    let snap = {
        // A single button: weak evidence for anything.
        let root = UiNode::new(1, NodeRole::Container).with_children(vec![UiNode::new(
            2,
            NodeRole::FloatingActionButton,
        )
        .with_text("Compose")
        .clickable()]);
        ScreenSnapshot::new("com.example.app", 0, vec![root])
    };

    let mut lax = CalibrationProfile::default();
    lax.ambiguity_threshold = 0.1;
    let mut strict = CalibrationProfile::default();
    strict.ambiguity_threshold = 0.6;

    let accepted = StateClassifier::new(lax).classify(&snap);
    let rejected = StateClassifier::new(strict).classify(&snap);

    assert_eq!(accepted.primary, ScreenKind::Home);
    assert_eq!(rejected.primary, ScreenKind::Unknown);
    assert!(rejected.ambiguous);
    // The weak confidence is still reported for downstream tuning.
    assert!(rejected.confidence > 0.0);
}
