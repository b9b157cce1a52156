// Decision engine: fuses AI confidence, forensic authenticity and pattern checks into a verdict
//
// Rules run in a fixed order and every rule that fires appends a reason. Rejection is sticky.
use crate::config::DecisionPolicy;
use crate::types::{Decision, Scores, VerificationStatus};

pub const REASON_INSUFFICIENT_TEXT: &str = "insufficient extracted text";
pub const REASON_TAMPERING: &str = "tampering detected";
pub const REASON_LOW_QUALITY: &str = "quality too low to trust extraction";
pub const REASON_UNKNOWN_TYPE: &str = "document type unidentifiable";
pub const REASON_MISSING_IDENTIFIERS: &str = "missing expected identifiers/keywords";
pub const REASON_PASSED: &str = "all verification checks passed";

/// Everything the decision depends on. Nothing else may influence the outcome.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecisionInputs {
    pub confidence_score: f64,
    pub authenticity_score: f64,
    pub tampering_detected: bool,
    pub pattern_found: bool,
    pub keywords_found: bool,
    pub type_resolved: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecisionOutcome {
    pub status: VerificationStatus,
    pub decision: Decision,
    pub reasons: Vec<String>,
    pub scores: Scores,
}

pub struct DecisionEngine {
    policy: DecisionPolicy,
}

impl DecisionEngine {
    pub fn new(policy: DecisionPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &DecisionPolicy {
        &self.policy
    }

    /// Structural rejection for documents whose OCR text is below the legibility floor.
    pub fn insufficient_text(&self) -> DecisionOutcome {
        DecisionOutcome {
            status: VerificationStatus::Rejected,
            decision: Decision::Reject,
            reasons: vec![REASON_INSUFFICIENT_TEXT.to_string()],
            scores: Scores {
                confidence_score: 0.0,
                authenticity_score: 0.0,
                combined_score: Some(0.0),
            },
        }
    }

    pub fn decide(&self, inputs: &DecisionInputs) -> DecisionOutcome {
        let p = &self.policy;
        let confidence = clamp(inputs.confidence_score);
        let authenticity = clamp(inputs.authenticity_score);

        let mut decision = Decision::Accept;
        let mut reasons = Vec::new();
        let mut reject = |reason: String| {
            decision = Decision::Reject;
            reasons.push(reason);
        };

        if inputs.tampering_detected && authenticity < p.tamper_score_floor {
            reject(format!("{} (authenticity {:.1})", REASON_TAMPERING, authenticity));
        }
        if confidence < p.confidence_floor {
            reject(format!("{} (confidence {:.1})", REASON_LOW_QUALITY, confidence));
        }
        if !inputs.type_resolved {
            reject(REASON_UNKNOWN_TYPE.to_string());
        }
        if !inputs.pattern_found && !inputs.keywords_found {
            reject(REASON_MISSING_IDENTIFIERS.to_string());
        }

        if decision == Decision::Reject {
            return DecisionOutcome {
                status: VerificationStatus::Rejected,
                decision,
                reasons,
                scores: Scores {
                    confidence_score: confidence,
                    authenticity_score: authenticity,
                    combined_score: None,
                },
            };
        }

        let combined = (confidence + authenticity) / 2.0;
        let scores = Scores {
            confidence_score: confidence,
            authenticity_score: authenticity,
            combined_score: Some(combined),
        };

        if combined < p.combined_floor {
            return DecisionOutcome {
                status: VerificationStatus::Rejected,
                decision: Decision::Reject,
                reasons: vec![format!(
                    "combined score {:.1} below {:.1}",
                    combined, p.combined_floor
                )],
                scores,
            };
        }

        if confidence < p.review_ceiling {
            return DecisionOutcome {
                status: VerificationStatus::NeedsReview,
                decision: Decision::Accept,
                reasons: vec![format!(
                    "confidence {:.1} in review band [{:.1}, {:.1})",
                    confidence, p.confidence_floor, p.review_ceiling
                )],
                scores,
            };
        }

        DecisionOutcome {
            status: VerificationStatus::Verified,
            decision: Decision::Accept,
            reasons: vec![REASON_PASSED.to_string()],
            scores,
        }
    }
}

fn clamp(score: f64) -> f64 {
    crate::pipeline::forensics::clamp_score(score)
}
