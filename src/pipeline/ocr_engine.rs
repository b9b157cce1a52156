// OCR engine: tesseract CLI behind a recognizer trait, plus multi-page aggregation
use crate::config::OcrConfig;
use crate::types::{OcrResult, Result, VerifyError};
use image::{GrayImage, ImageFormat};
use std::path::PathBuf;
use std::process::Command;
use tempfile::Builder;
use tracing::debug;

/// Recognizes the text on one preprocessed page.
pub trait TextRecognizer: Send + Sync {
    fn recognize(&self, page: &GrayImage) -> Result<String>;
}

/// Runs the `tesseract` binary configured in `[ocr]`.
pub struct TesseractCli {
    binary: PathBuf,
    language: String,
    psm: u8,
}

impl TesseractCli {
    pub fn new(config: &OcrConfig) -> Self {
        Self {
            binary: config.tesseract_path.clone(),
            language: config.language.clone(),
            psm: config.page_segmentation_mode,
        }
    }
}

impl TextRecognizer for TesseractCli {
    fn recognize(&self, page: &GrayImage) -> Result<String> {
        let input = Builder::new()
            .prefix("docverify-page-")
            .suffix(".png")
            .tempfile()
            .map_err(|e| VerifyError::OcrExtractionFailed(format!("temp file: {}", e)))?;
        page.save_with_format(input.path(), ImageFormat::Png)
            .map_err(|e| VerifyError::OcrExtractionFailed(format!("staging page: {}", e)))?;

        let output = Command::new(&self.binary)
            .arg(input.path())
            .arg("stdout")
            .args(["-l", &self.language])
            .args(["--psm", &self.psm.to_string()])
            .output()
            .map_err(|e| {
                VerifyError::OcrExtractionFailed(format!("cannot run {}: {}", self.binary.display(), e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(VerifyError::OcrExtractionFailed(format!("tesseract failed: {}", stderr.trim())));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Runs the recognizer over every page and joins the results in page order.
pub fn extract_text(recognizer: &dyn TextRecognizer, pages: &[GrayImage], separator: &str) -> Result<OcrResult> {
    let mut texts = Vec::with_capacity(pages.len());
    for (index, page) in pages.iter().enumerate() {
        let text = recognizer.recognize(page)?;
        debug!(page = index, chars = text.chars().count(), "recognized page");
        texts.push(text);
    }
    Ok(OcrResult {
        text: texts.join(separator).trim().to_string(),
    })
}

/// First `limit` characters of the text, with an ellipsis when truncated.
pub fn preview(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
