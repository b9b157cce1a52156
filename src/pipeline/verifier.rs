// Single-document verification: normalize -> {forensics, preprocess + OCR} -> AI -> patterns -> decision
use crate::collaborators::ai_extraction::{ExtractionRequest, FieldExtractor};
use crate::collaborators::registry::RegistryProbe;
use crate::config::VerifierConfig;
use crate::pipeline::decision::{DecisionEngine, DecisionInputs, DecisionOutcome};
use crate::pipeline::forensics::{reduce_reports, ForensicAnalyzer};
use crate::pipeline::normalizer::PageNormalizer;
use crate::pipeline::ocr_engine::{self, TextRecognizer};
use crate::pipeline::patterns::{is_resolved, PatternValidator};
use crate::pipeline::preprocess::Preprocessor;
use crate::types::{
    AiExtraction, Document, ForensicReport, OcrResult, PatternValidation, Result, VerificationVerdict,
    VerifyError, NOT_CHECKED,
};
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

const PREVIEW_CHARS: usize = 200;
const UNKNOWN_TYPE: &str = "Unknown";

/// The CPU-bound page stages, shared read-only across calls.
struct PageStages {
    normalizer: PageNormalizer,
    preprocessor: Preprocessor,
    analyzer: ForensicAnalyzer,
    page_separator: String,
}

impl PageStages {
    fn run(&self, recognizer: &dyn TextRecognizer, bytes: &[u8], filename: &str) -> Result<(ForensicReport, OcrResult)> {
        let pages = self.normalizer.normalize(bytes, filename)?;

        let mut reports = Vec::with_capacity(pages.len());
        let mut prepared = Vec::with_capacity(pages.len());
        for page in &pages {
            let report = self.analyzer.analyze_page(&page.image)?;
            debug!(page = page.index, score = report.authenticity_score, "forensic page report");
            reports.push(report);
            prepared.push(self.preprocessor.prepare(&page.image));
        }
        drop(pages);

        let ocr = ocr_engine::extract_text(recognizer, &prepared, &self.page_separator)?;
        Ok((reduce_reports(&reports), ocr))
    }
}

#[derive(Clone)]
pub struct DocumentVerifier {
    config: Arc<VerifierConfig>,
    stages: Arc<PageStages>,
    recognizer: Arc<dyn TextRecognizer>,
    extractor: Arc<dyn FieldExtractor>,
    patterns: Arc<PatternValidator>,
    engine: Arc<DecisionEngine>,
    registry: RegistryProbe,
}

impl DocumentVerifier {
    pub fn new(
        config: VerifierConfig,
        recognizer: Arc<dyn TextRecognizer>,
        extractor: Arc<dyn FieldExtractor>,
    ) -> Result<Self> {
        config.validate()?;
        let stages = PageStages {
            normalizer: PageNormalizer::new(&config.normalizer),
            preprocessor: Preprocessor::new(&config.preprocess),
            analyzer: ForensicAnalyzer::new(config.forensics.clone()),
            page_separator: config.ocr.page_separator.clone(),
        };
        Ok(Self {
            patterns: Arc::new(PatternValidator::new(&config.patterns)?),
            engine: Arc::new(DecisionEngine::new(config.decision.clone())),
            stages: Arc::new(stages),
            recognizer,
            extractor,
            registry: RegistryProbe::disabled(),
            config: Arc::new(config),
        })
    }

    pub fn with_registry(mut self, registry: RegistryProbe) -> Self {
        self.registry = registry;
        self
    }

    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    pub async fn verify(&self, document: Document) -> Result<VerificationVerdict> {
        let Document { bytes, filename, type_hint, cross_reference } = document;
        info!(filename = %filename, bytes = bytes.len(), "verifying document");

        let stages = Arc::clone(&self.stages);
        let recognizer = Arc::clone(&self.recognizer);
        let name = filename.clone();
        let (forensics, ocr) = tokio::task::spawn_blocking(move || stages.run(recognizer.as_ref(), &bytes, &name))
            .await
            .map_err(|e| VerifyError::OcrExtractionFailed(format!("page analysis task failed: {}", e)))??;

        let declared = type_hint.map(|t| t.trim().to_string()).filter(|t| !t.is_empty());
        let chars = ocr.char_count();
        debug!(chars, authenticity = forensics.authenticity_score, "page stages complete");

        if chars < self.config.ocr.min_text_chars {
            info!(filename = %filename, chars, "insufficient text, rejecting");
            let outcome = self.engine.insufficient_text();
            return Ok(VerificationVerdict {
                filename,
                status: outcome.status,
                decision: outcome.decision,
                document_type: declared.unwrap_or_else(|| UNKNOWN_TYPE.to_string()),
                reasons: outcome.reasons,
                notes: Vec::new(),
                scores: outcome.scores,
                forensics,
                pattern: PatternValidation::default(),
                extracted_data: BTreeMap::new(),
                registry_status: NOT_CHECKED.to_string(),
                text_preview: ocr_engine::preview(&ocr.text, PREVIEW_CHARS),
                timestamp: Utc::now(),
            });
        }

        let request = ExtractionRequest {
            text: ocr.text.clone(),
            cross_reference,
        };
        let ai = self.extractor.extract(&request).await?;

        let document_type = declared.clone().unwrap_or_else(|| ai.document_type.trim().to_string());
        let pattern = self.patterns.validate(&ocr.text, &document_type);
        let inputs = DecisionInputs {
            confidence_score: ai.confidence_score,
            authenticity_score: forensics.authenticity_score,
            tampering_detected: forensics.tampering_detected,
            pattern_found: pattern.pattern_found,
            keywords_found: pattern.keywords_found,
            type_resolved: is_resolved(&document_type),
        };
        let outcome = self.engine.decide(&inputs);
        let notes = self.collect_notes(&forensics, &ai, declared.as_deref());

        let registry = self.registry.check(&document_type, ai.document_number()).await;

        info!(
            filename = %filename,
            status = ?outcome.status,
            confidence = outcome.scores.confidence_score,
            authenticity = outcome.scores.authenticity_score,
            "verdict"
        );
        Ok(self.build_verdict(filename, document_type, outcome, notes, forensics, pattern, ai, registry.status, &ocr))
    }

    fn collect_notes(&self, forensics: &ForensicReport, ai: &AiExtraction, declared: Option<&str>) -> Vec<String> {
        let mut notes: Vec<String> = forensics.warnings.iter().cloned().collect();
        if !ai.is_valid_format {
            notes.push("extraction flagged a non-standard document format".to_string());
        }
        notes.extend(ai.data_quality_issues.iter().map(|i| format!("data quality: {}", i)));
        notes.extend(ai.suspicious_elements.iter().map(|s| format!("suspicious element: {}", s)));

        if let Some(declared) = declared {
            let detected = self.patterns.canonical_name(&ai.document_type);
            let expected = self.patterns.canonical_name(declared);
            if let (Some(detected), Some(expected)) = (detected, expected) {
                if detected != expected {
                    notes.push(format!(
                        "declared type {} differs from detected type {}",
                        declared, ai.document_type
                    ));
                }
            }
        }
        notes
    }

    #[allow(clippy::too_many_arguments)]
    fn build_verdict(
        &self,
        filename: String,
        document_type: String,
        outcome: DecisionOutcome,
        notes: Vec<String>,
        forensics: ForensicReport,
        pattern: PatternValidation,
        ai: AiExtraction,
        registry_status: String,
        ocr: &OcrResult,
    ) -> VerificationVerdict {
        VerificationVerdict {
            filename,
            status: outcome.status,
            decision: outcome.decision,
            document_type: if document_type.is_empty() { UNKNOWN_TYPE.to_string() } else { document_type },
            reasons: outcome.reasons,
            notes,
            scores: outcome.scores,
            forensics,
            pattern,
            extracted_data: ai.extracted_fields,
            registry_status,
            text_preview: ocr_engine::preview(&ocr.text, PREVIEW_CHARS),
            timestamp: Utc::now(),
        }
    }
}
