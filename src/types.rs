// Core types for docverify: documents, reports, verdicts and the error taxonomy
use chrono::{DateTime, Utc};
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Optional identity used to cross-check the extracted fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossReference {
    pub name: Option<String>,
    pub dob: Option<String>,
    pub application_id: Option<String>,
}

impl CrossReference {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.dob.is_none() && self.application_id.is_none()
    }
}

/// A document submitted for one verification call.
#[derive(Debug, Clone)]
pub struct Document {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub type_hint: Option<String>,
    pub cross_reference: Option<CrossReference>,
}

impl Document {
    pub fn new(bytes: Vec<u8>, filename: impl Into<String>) -> Self {
        Self {
            bytes,
            filename: filename.into(),
            type_hint: None,
            cross_reference: None,
        }
    }

    pub fn with_type_hint(mut self, hint: impl Into<String>) -> Self {
        self.type_hint = Some(hint.into());
        self
    }

    pub fn with_cross_reference(mut self, cross_reference: CrossReference) -> Self {
        self.cross_reference = Some(cross_reference);
        self
    }
}

/// One standardized 3-channel page raster.
#[derive(Debug, Clone)]
pub struct Page {
    pub index: usize,
    pub image: RgbImage,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ForensicMetrics {
    pub ela_score: f64,
    pub edge_density: f64,
    pub noise_variance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForensicReport {
    pub authenticity_score: f64,
    pub tampering_detected: bool,
    pub issues: BTreeSet<String>,
    pub warnings: BTreeSet<String>,
    pub metrics: ForensicMetrics,
}

impl ForensicReport {
    /// Report for a document that never reached forensic analysis.
    pub fn empty() -> Self {
        Self {
            authenticity_score: 0.0,
            tampering_detected: false,
            issues: BTreeSet::new(),
            warnings: BTreeSet::new(),
            metrics: ForensicMetrics::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OcrResult {
    pub text: String,
}

impl OcrResult {
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}

/// Structured extraction returned by the AI collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiExtraction {
    pub document_type: String,
    pub extracted_fields: BTreeMap<String, Option<String>>,
    pub confidence_score: f64,
    pub is_valid_format: bool,
    #[serde(default)]
    pub data_quality_issues: Vec<String>,
    #[serde(default, alias = "tampering_indicators")]
    pub suspicious_elements: Vec<String>,
}

impl AiExtraction {
    pub fn document_number(&self) -> Option<&str> {
        self.extracted_fields
            .get("document_number")
            .and_then(|v| v.as_deref())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternValidation {
    pub pattern_found: bool,
    pub keywords_found: bool,
    pub keyword_count: usize,
    pub matched_numbers: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationStatus {
    Verified,
    NeedsReview,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Accept,
    Reject,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Scores {
    pub confidence_score: f64,
    pub authenticity_score: f64,
    pub combined_score: Option<f64>,
}

pub const NOT_CHECKED: &str = "Not Checked";

/// The immutable output of one verification call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationVerdict {
    pub filename: String,
    pub status: VerificationStatus,
    pub decision: Decision,
    pub document_type: String,
    pub reasons: Vec<String>,
    pub notes: Vec<String>,
    pub scores: Scores,
    pub forensics: ForensicReport,
    pub pattern: PatternValidation,
    pub extracted_data: BTreeMap<String, Option<String>>,
    pub registry_status: String,
    pub text_preview: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("OCR extraction failed: {0}")]
    OcrExtractionFailed(String),

    #[error("collaborator failure: {0}")]
    CollaboratorFailure(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl VerifyError {
    pub fn kind(&self) -> &'static str {
        match self {
            VerifyError::UnsupportedFormat(_) => "UnsupportedFormat",
            VerifyError::OcrExtractionFailed(_) => "OcrExtractionFailed",
            VerifyError::CollaboratorFailure(_) => "CollaboratorFailure",
            VerifyError::Config(_) => "Config",
        }
    }
}

pub type Result<T> = std::result::Result<T, VerifyError>;

/// Verdict-shaped entry for a document that could not be evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub status: String,
    pub filename: String,
    pub error_kind: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl ErrorReport {
    pub fn from_error(filename: impl Into<String>, error: &VerifyError) -> Self {
        Self {
            status: "ERROR".to_string(),
            filename: filename.into(),
            error_kind: error.kind().to_string(),
            message: error.to_string(),
            timestamp: Utc::now(),
        }
    }

    /// Entry for an input that could not even be read (missing file, permissions).
    pub fn unreadable(filename: impl Into<String>, detail: &str) -> Self {
        Self {
            status: "ERROR".to_string(),
            filename: filename.into(),
            error_kind: "UnreadableInput".to_string(),
            message: detail.to_string(),
            timestamp: Utc::now(),
        }
    }
}
