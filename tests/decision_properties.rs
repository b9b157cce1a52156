// Decision table scenarios for the fusion rules
use docverify::config::DecisionPolicy;
use docverify::pipeline::decision::{DecisionEngine, DecisionInputs};
use docverify::{Decision, VerificationStatus};
use rstest::rstest;

fn inputs(confidence: f64, authenticity: f64, tampering: bool, pattern: bool, keywords: bool, resolved: bool) -> DecisionInputs {
    DecisionInputs {
        confidence_score: confidence,
        authenticity_score: authenticity,
        tampering_detected: tampering,
        pattern_found: pattern,
        keywords_found: keywords,
        type_resolved: resolved,
    }
}

#[rstest]
#[case::clean(inputs(92.0, 95.0, false, true, true, true), VerificationStatus::Verified, Decision::Accept)]
#[case::review_band(inputs(50.0, 90.0, false, true, true, true), VerificationStatus::NeedsReview, Decision::Accept)]
#[case::review_ceiling_is_exclusive(inputs(70.0, 90.0, false, true, true, true), VerificationStatus::Verified, Decision::Accept)]
#[case::confidence_floor(inputs(44.9, 99.0, false, true, true, true), VerificationStatus::Rejected, Decision::Reject)]
#[case::tampered(inputs(90.0, 59.0, true, true, true, true), VerificationStatus::Rejected, Decision::Reject)]
#[case::tampering_at_floor(inputs(90.0, 60.0, true, true, true, true), VerificationStatus::Verified, Decision::Accept)]
#[case::low_authenticity_without_issues(inputs(90.0, 40.0, false, true, true, true), VerificationStatus::Verified, Decision::Accept)]
#[case::combined_floor(inputs(75.0, 30.0, false, true, true, true), VerificationStatus::Rejected, Decision::Reject)]
#[case::keywords_only(inputs(90.0, 90.0, false, false, true, true), VerificationStatus::Verified, Decision::Accept)]
#[case::no_identifiers(inputs(90.0, 90.0, false, false, false, true), VerificationStatus::Rejected, Decision::Reject)]
#[case::unresolved_type(inputs(90.0, 90.0, false, true, true, false), VerificationStatus::Rejected, Decision::Reject)]
fn decision_table(#[case] given: DecisionInputs, #[case] status: VerificationStatus, #[case] decision: Decision) {
    let outcome = DecisionEngine::new(DecisionPolicy::default()).decide(&given);
    assert_eq!(outcome.status, status);
    assert_eq!(outcome.decision, decision);
    assert!(!outcome.reasons.is_empty());
}

#[rstest]
fn status_and_decision_agree(
    #[values(0.0, 44.0, 45.0, 60.0, 69.9, 70.0, 100.0)] confidence: f64,
    #[values(0.0, 30.0, 59.9, 60.0, 100.0)] authenticity: f64,
    #[values(false, true)] tampering: bool,
) {
    let outcome = DecisionEngine::new(DecisionPolicy::default())
        .decide(&inputs(confidence, authenticity, tampering, true, true, true));
    let expected = match outcome.status {
        VerificationStatus::Rejected => Decision::Reject,
        _ => Decision::Accept,
    };
    assert_eq!(outcome.decision, expected);
    if outcome.decision == Decision::Accept {
        assert!(confidence >= 45.0);
        assert!(outcome.scores.combined_score.unwrap() >= 55.0);
    }
}

#[test]
fn custom_policy_moves_the_review_band() {
    let policy = DecisionPolicy { review_ceiling: 95.0, ..DecisionPolicy::default() };
    let outcome = DecisionEngine::new(policy).decide(&inputs(90.0, 90.0, false, true, true, true));
    assert_eq!(outcome.status, VerificationStatus::NeedsReview);
}

#[rstest]
#[case::low_confidence(inputs(40.0, 99.0, false, true, true, true), "quality too low")]
#[case::tampering_first(inputs(95.0, 50.0, true, true, true, true), "tampering detected")]
#[case::missing_identifiers(inputs(90.0, 95.0, false, false, false, true), "missing expected identifiers")]
fn rejection_cites_the_rule(#[case] given: DecisionInputs, #[case] cited: &str) {
    let outcome = DecisionEngine::new(DecisionPolicy::default()).decide(&given);
    assert_eq!(outcome.decision, Decision::Reject);
    assert_eq!(outcome.reasons.len(), 1);
    assert!(outcome.reasons[0].starts_with(cited), "{:?}", outcome.reasons);
}

#[test]
fn identical_inputs_are_deterministic() {
    let engine = DecisionEngine::new(DecisionPolicy::default());
    let given = inputs(52.0, 61.0, true, false, true, true);
    assert_eq!(engine.decide(&given), engine.decide(&given));
}
