// End-to-end verification with fake OCR, AI and registry collaborators
mod common;

use common::*;
use docverify::collaborators::RegistryProbe;
use docverify::pipeline::decision::{REASON_INSUFFICIENT_TEXT, REASON_MISSING_IDENTIFIERS, REASON_PASSED, REASON_UNKNOWN_TYPE};
use docverify::types::NOT_CHECKED;
use docverify::{CrossReference, Decision, Document, DocumentVerifier, VerificationStatus, VerifierConfig};
use std::sync::Arc;
use std::time::Duration;

fn verifier(config: VerifierConfig, text: &str, extractor: Arc<FakeExtractor>) -> DocumentVerifier {
    DocumentVerifier::new(config, Arc::new(FixedText(text.to_string())), extractor).unwrap()
}

#[tokio::test]
async fn short_text_rejects_without_calling_ai() {
    let extractor = Arc::new(FakeExtractor::answering(extraction("PAN", 95.0)));
    let v = verifier(lenient_config(), "  ab  ", extractor.clone());

    let verdict = v.verify(Document::new(blank_png(), "blank.png")).await.unwrap();

    assert_eq!(verdict.status, VerificationStatus::Rejected);
    assert_eq!(verdict.decision, Decision::Reject);
    assert_eq!(verdict.reasons, vec![REASON_INSUFFICIENT_TEXT.to_string()]);
    assert_eq!(verdict.scores.confidence_score, 0.0);
    assert_eq!(verdict.scores.authenticity_score, 0.0);
    assert_eq!(verdict.registry_status, NOT_CHECKED);
    assert_eq!(extractor.call_count(), 0);
}

#[tokio::test]
async fn clean_pan_is_verified() {
    let extractor = Arc::new(FakeExtractor::answering(extraction("PAN", 90.0)));
    let v = verifier(lenient_config(), PAN_TEXT, extractor.clone());

    let verdict = v.verify(Document::new(blank_png(), "pan.png")).await.unwrap();

    assert_eq!(verdict.status, VerificationStatus::Verified);
    assert_eq!(verdict.decision, Decision::Accept);
    assert_eq!(verdict.reasons, vec![REASON_PASSED.to_string()]);
    assert_eq!(verdict.document_type, "PAN");
    assert_eq!(verdict.scores.authenticity_score, 100.0);
    assert_eq!(verdict.scores.combined_score, Some(95.0));
    assert_eq!(verdict.pattern.matched_numbers, vec!["ABCDE1234F"]);
    assert_eq!(
        verdict.extracted_data.get("document_number"),
        Some(&Some("ABCDE1234F".to_string()))
    );
    assert!(verdict.text_preview.starts_with("INCOME TAX DEPARTMENT"));
    assert_eq!(extractor.call_count(), 1);
}

#[tokio::test]
async fn moderate_confidence_needs_review() {
    let extractor = Arc::new(FakeExtractor::answering(extraction("PAN", 60.0)));
    let verdict = verifier(lenient_config(), PAN_TEXT, extractor)
        .verify(Document::new(blank_png(), "pan.png"))
        .await
        .unwrap();

    assert_eq!(verdict.status, VerificationStatus::NeedsReview);
    assert_eq!(verdict.decision, Decision::Accept);
    assert_eq!(verdict.scores.combined_score, Some(80.0));
}

#[tokio::test]
async fn unidentified_type_is_rejected() {
    let extractor = Arc::new(FakeExtractor::answering(extraction("Unknown", 90.0)));
    let verdict = verifier(lenient_config(), PAN_TEXT, extractor)
        .verify(Document::new(blank_png(), "mystery.png"))
        .await
        .unwrap();

    assert_eq!(verdict.status, VerificationStatus::Rejected);
    assert!(verdict.reasons.contains(&REASON_UNKNOWN_TYPE.to_string()));
    assert_eq!(verdict.scores.combined_score, None);
}

#[tokio::test]
async fn declared_type_drives_pattern_checks() {
    let extractor = Arc::new(FakeExtractor::answering(extraction("PAN", 90.0)));
    let document = Document::new(blank_png(), "claimed.png").with_type_hint("Aadhaar");
    let verdict = verifier(lenient_config(), PAN_TEXT, extractor).verify(document).await.unwrap();

    assert_eq!(verdict.document_type, "Aadhaar");
    assert_eq!(verdict.status, VerificationStatus::Rejected);
    assert!(verdict.reasons.contains(&REASON_MISSING_IDENTIFIERS.to_string()));
    assert!(verdict.notes.iter().any(|n| n.contains("differs from detected type PAN")));
}

#[tokio::test]
async fn ai_failure_is_a_collaborator_error() {
    let extractor = Arc::new(FakeExtractor::failing("upstream 503"));
    let err = verifier(lenient_config(), PAN_TEXT, extractor)
        .verify(Document::new(blank_png(), "pan.png"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "CollaboratorFailure");
}

#[tokio::test]
async fn undecodable_bytes_are_unsupported() {
    let extractor = Arc::new(FakeExtractor::answering(extraction("PAN", 90.0)));
    let err = verifier(lenient_config(), PAN_TEXT, extractor.clone())
        .verify(Document::new(b"definitely not an image".to_vec(), "notes.txt"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "UnsupportedFormat");
    assert_eq!(extractor.call_count(), 0);
}

#[tokio::test]
async fn tampering_above_floor_is_only_a_signal() {
    // default cutoffs: a flat page is "too smooth" (issue) and low-noise/low-colour (warnings)
    let extractor = Arc::new(FakeExtractor::answering(extraction("PAN", 90.0)));
    let verdict = verifier(VerifierConfig::default(), PAN_TEXT, extractor)
        .verify(Document::new(blank_png(), "flat.png"))
        .await
        .unwrap();

    assert!(verdict.forensics.tampering_detected);
    assert_eq!(verdict.scores.authenticity_score, 70.0);
    assert_eq!(verdict.status, VerificationStatus::Verified);
    assert!(!verdict.notes.is_empty());
}

#[tokio::test]
async fn cross_reference_reaches_extractor_and_registry_status_is_reported() {
    let extractor = Arc::new(FakeExtractor::answering(extraction("PAN", 90.0)));
    let v = verifier(lenient_config(), PAN_TEXT, extractor.clone())
        .with_registry(RegistryProbe::new(Arc::new(FoundInRegistry), Duration::from_secs(1)));

    let xref = CrossReference { name: Some("Ravi Kumar".into()), ..CrossReference::default() };
    let verdict = v
        .verify(Document::new(blank_png(), "pan.png").with_cross_reference(xref.clone()))
        .await
        .unwrap();

    assert_eq!(verdict.registry_status, "Verified - PAN ABCDE1234F found");
    let seen = extractor.last_request.lock().unwrap().clone().unwrap();
    assert_eq!(seen.cross_reference, Some(xref));
}

#[tokio::test]
async fn identical_inputs_give_identical_decisions() {
    let extractor = Arc::new(FakeExtractor::answering(extraction("PAN", 66.0)));
    let v = verifier(lenient_config(), PAN_TEXT, extractor);
    let a = v.verify(Document::new(blank_png(), "a.png")).await.unwrap();
    let b = v.verify(Document::new(blank_png(), "a.png")).await.unwrap();
    assert_eq!((a.status, a.decision, a.reasons, a.scores), (b.status, b.decision, b.reasons, b.scores));
}
