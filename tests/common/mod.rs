// Shared fakes and fixtures for the integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use docverify::collaborators::{ExtractionRequest, FieldExtractor, RegistryLookup, RegistryStatus};
use docverify::pipeline::TextRecognizer;
use docverify::types::AiExtraction;
use docverify::{Result, VerifierConfig, VerifyError};
use image::{DynamicImage, GrayImage, ImageFormat, Rgb, RgbImage};
use std::collections::BTreeMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub const PAN_TEXT: &str =
    "INCOME TAX DEPARTMENT GOVT. OF INDIA\nPermanent Account Number Card\nABCDE1234F\nRAVI KUMAR\n01/01/1990";

/// Returns the same text for every page.
pub struct FixedText(pub String);

impl TextRecognizer for FixedText {
    fn recognize(&self, _page: &GrayImage) -> Result<String> {
        Ok(self.0.clone())
    }
}

pub struct FakeExtractor {
    response: std::result::Result<AiExtraction, String>,
    pub calls: AtomicUsize,
    pub last_request: Mutex<Option<ExtractionRequest>>,
}

impl FakeExtractor {
    pub fn answering(extraction: AiExtraction) -> Self {
        Self { response: Ok(extraction), calls: AtomicUsize::new(0), last_request: Mutex::new(None) }
    }

    pub fn failing(message: &str) -> Self {
        Self { response: Err(message.to_string()), calls: AtomicUsize::new(0), last_request: Mutex::new(None) }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FieldExtractor for FakeExtractor {
    async fn extract(&self, request: &ExtractionRequest) -> Result<AiExtraction> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request.clone());
        self.response.clone().map_err(VerifyError::CollaboratorFailure)
    }
}

pub struct FoundInRegistry;

#[async_trait]
impl RegistryLookup for FoundInRegistry {
    async fn lookup(&self, document_type: &str, number: &str) -> Result<RegistryStatus> {
        Ok(RegistryStatus {
            status: format!("Verified - {} {} found", document_type, number),
            timestamp: "2024-01-01 00:00:00".into(),
        })
    }
}

pub fn extraction(document_type: &str, confidence: f64) -> AiExtraction {
    let mut fields = BTreeMap::new();
    fields.insert("name".to_string(), Some("RAVI KUMAR".to_string()));
    fields.insert("document_number".to_string(), Some("ABCDE1234F".to_string()));
    AiExtraction {
        document_type: document_type.to_string(),
        extracted_fields: fields,
        confidence_score: confidence,
        is_valid_format: true,
        data_quality_issues: vec![],
        suspicious_elements: vec![],
    }
}

/// Forensic cutoffs that a flat synthetic page passes cleanly.
pub fn lenient_config() -> VerifierConfig {
    let mut config = VerifierConfig::default();
    config.forensics.edge_low = 0.0;
    config.forensics.noise_low = 0.0;
    config.forensics.color_std_floor = 0.0;
    config
}

pub fn blank_png() -> Vec<u8> {
    let page = RgbImage::from_pixel(64, 64, Rgb([240, 240, 240]));
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(page).write_to(&mut buf, ImageFormat::Png).unwrap();
    buf.into_inner()
}
