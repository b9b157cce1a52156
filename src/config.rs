// Configuration for docverify: every pipeline threshold lives here, loaded from TOML
use crate::types::VerifyError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct VerifierConfig {
    pub normalizer: NormalizerConfig,
    pub preprocess: PreprocessConfig,
    pub ocr: OcrConfig,
    pub forensics: ForensicThresholds,
    pub decision: DecisionPolicy,
    pub patterns: PatternConfig,
    pub ai: AiConfig,
    pub registry: RegistryConfig,
    pub batch: BatchConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct NormalizerConfig {
    pub pdf_dpi: u32,
    pub pdftoppm_path: PathBuf,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            pdf_dpi: 300,
            pdftoppm_path: PathBuf::from("pdftoppm"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Median filter radius used for denoising.
    pub denoise_radius: u32,
    /// Side of the local thresholding window, must be odd.
    pub threshold_window: u32,
    pub threshold_constant: i32,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            denoise_radius: 1,
            threshold_window: 11,
            threshold_constant: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct OcrConfig {
    pub tesseract_path: PathBuf,
    pub language: String,
    pub page_segmentation_mode: u8,
    pub page_separator: String,
    pub min_text_chars: usize,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            tesseract_path: PathBuf::from("tesseract"),
            language: "eng".to_string(),
            // 6 = assume a single uniform block of text
            page_segmentation_mode: 6,
            page_separator: "\n".to_string(),
            min_text_chars: 20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ForensicThresholds {
    pub jpeg_quality: u8,
    pub ela_issue_threshold: f64,
    pub ela_warning_threshold: f64,
    pub ela_issue_penalty: f64,
    pub ela_warning_penalty: f64,

    pub canny_low: f32,
    pub canny_high: f32,
    pub edge_low: f64,
    pub edge_high: f64,
    pub edge_low_penalty: f64,
    pub edge_high_penalty: f64,

    pub noise_low: f64,
    pub noise_high: f64,
    pub noise_penalty: f64,

    pub color_std_floor: f64,
    pub color_penalty: f64,

    pub block_size: u32,
    pub block_stride: u32,
    pub duplicate_block_threshold: usize,
    pub duplicate_penalty: f64,
}

impl Default for ForensicThresholds {
    fn default() -> Self {
        Self {
            jpeg_quality: 90,
            ela_issue_threshold: 15.0,
            ela_warning_threshold: 8.0,
            ela_issue_penalty: 25.0,
            ela_warning_penalty: 10.0,
            canny_low: 50.0,
            canny_high: 150.0,
            edge_low: 0.01,
            edge_high: 0.15,
            edge_low_penalty: 15.0,
            edge_high_penalty: 5.0,
            noise_low: 20.0,
            noise_high: 8000.0,
            noise_penalty: 5.0,
            color_std_floor: 10.0,
            color_penalty: 10.0,
            block_size: 16,
            block_stride: 32,
            duplicate_block_threshold: 10,
            duplicate_penalty: 10.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DecisionPolicy {
    pub tamper_score_floor: f64,
    pub confidence_floor: f64,
    pub combined_floor: f64,
    /// Upper bound (exclusive) of the confidence band routed to human review.
    pub review_ceiling: f64,
}

impl Default for DecisionPolicy {
    fn default() -> Self {
        Self {
            tamper_score_floor: 60.0,
            confidence_floor: 45.0,
            combined_floor: 55.0,
            review_ceiling: 70.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DocumentProfile {
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    pub keywords: Vec<String>,
    pub id_pattern: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PatternConfig {
    #[serde(default = "default_max_matches")]
    pub max_matches: usize,
    #[serde(default = "default_profiles")]
    pub profiles: Vec<DocumentProfile>,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            max_matches: default_max_matches(),
            profiles: default_profiles(),
        }
    }
}

fn default_max_matches() -> usize { 3 }

fn profile(name: &str, aliases: &[&str], keywords: &[&str], id_pattern: &str) -> DocumentProfile {
    DocumentProfile {
        name: name.to_string(),
        aliases: aliases.iter().map(|s| s.to_string()).collect(),
        keywords: keywords.iter().map(|s| s.to_string()).collect(),
        id_pattern: id_pattern.to_string(),
    }
}

fn default_profiles() -> Vec<DocumentProfile> {
    vec![
        profile(
            "Aadhaar",
            &["aadhar", "uid", "uidai"],
            &["aadhaar", "government of india", "unique identification", "uidai", "dob", "male", "female"],
            r"\b\d{4}\s?\d{4}\s?\d{4}\b",
        ),
        profile(
            "PAN",
            &["pan card", "permanent account number"],
            &["income tax department", "permanent account number", "govt. of india", "pan"],
            r"\b[A-Z]{5}[0-9]{4}[A-Z]\b",
        ),
        profile(
            "Driving License",
            &["driving licence", "dl"],
            &["driving licence", "driving license", "transport", "dl no", "validity"],
            r"\b[A-Z]{2}[-\s]?\d{2}[-\s]?\d{4,11}\b",
        ),
        profile(
            "Passport",
            &[],
            &["passport", "republic of india", "nationality", "place of birth", "date of expiry"],
            r"\b[A-Z][0-9]{7}\b",
        ),
        profile(
            "Income Certificate",
            &["income"],
            &["income certificate", "annual income", "tehsildar", "revenue department", "certify"],
            r"(?i)\b(?:certificate|application)\s*(?:no\.?|number)\s*[:\-]?\s*[A-Z0-9/\-]{4,}",
        ),
        profile(
            "Marksheet",
            &["mark sheet", "marks memo", "grade card", "transcript"],
            &["marks", "grade", "examination", "board", "roll no", "statement of marks", "university"],
            r"(?i)\broll\s*(?:no\.?|number)\s*[:\-]?\s*\d{4,}",
        ),
        profile(
            "Caste Certificate",
            &["caste", "community certificate"],
            &["caste certificate", "scheduled caste", "scheduled tribe", "other backward", "community"],
            r"(?i)\bcertificate\s*(?:no\.?|number)\s*[:\-]?\s*[A-Z0-9/\-]{4,}",
        ),
    ]
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AiConfig {
    pub endpoint: String,
    pub model: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    pub timeout_secs: u64,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.groq.com/openai/v1/chat/completions".to_string(),
            model: "llama-3.3-70b-versatile".to_string(),
            api_key_env: "GROQ_API_KEY".to_string(),
            timeout_secs: 30,
            temperature: 0.1,
            max_tokens: 1000,
        }
    }
}

impl AiConfig {
    pub fn api_key(&self) -> Option<String> {
        env::var(&self.api_key_env).ok().filter(|k| !k.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub enabled: bool,
    /// Helper program performing the registry lookup, called as `<command> <type> <number>`.
    pub command: Option<PathBuf>,
    pub timeout_secs: u64,
    pub username_env: String,
    pub password_env: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            command: None,
            timeout_secs: 45,
            username_env: "DIGILOCKER_USERNAME".to_string(),
            password_env: "DIGILOCKER_PASSWORD".to_string(),
        }
    }
}

impl RegistryConfig {
    /// Credentials from the environment, `None` when either is missing.
    pub fn credentials(&self) -> Option<(String, String)> {
        let user = env::var(&self.username_env).ok().filter(|v| !v.is_empty())?;
        let pass = env::var(&self.password_env).ok().filter(|v| !v.is_empty())?;
        Some((user, pass))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct BatchConfig {
    pub workers: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self { workers: 4 }
    }
}

impl VerifierConfig {
    pub fn load(path: &Path) -> Result<Self, VerifyError> {
        let content = fs::read_to_string(path)
            .map_err(|e| VerifyError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_toml(&content)
    }

    pub fn load_or_default(path: Option<&Path>) -> Result<Self, VerifyError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn from_toml(content: &str) -> Result<Self, VerifyError> {
        let config: Self = toml::from_str(content).map_err(|e| VerifyError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, VerifyError> {
        toml::to_string_pretty(self).map_err(|e| VerifyError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), VerifyError> {
        let invalid = |msg: String| Err(VerifyError::Config(msg));
        let f = &self.forensics;
        if f.ela_warning_threshold > f.ela_issue_threshold {
            return invalid("forensics.ela_warning_threshold exceeds ela_issue_threshold".into());
        }
        if f.edge_low > f.edge_high {
            return invalid("forensics.edge_low exceeds edge_high".into());
        }
        if f.noise_low > f.noise_high {
            return invalid("forensics.noise_low exceeds noise_high".into());
        }
        if f.jpeg_quality == 0 || f.jpeg_quality > 100 {
            return invalid(format!("forensics.jpeg_quality {} outside 1..=100", f.jpeg_quality));
        }
        if f.block_size == 0 || f.block_stride < f.block_size {
            return invalid("forensics.block_stride must be >= block_size > 0".into());
        }
        if self.preprocess.threshold_window < 3 || self.preprocess.threshold_window % 2 == 0 {
            return invalid(format!(
                "preprocess.threshold_window {} must be odd and >= 3",
                self.preprocess.threshold_window
            ));
        }
        let d = &self.decision;
        if d.review_ceiling < d.confidence_floor {
            return invalid("decision.review_ceiling is below confidence_floor".into());
        }
        for (name, value) in [
            ("tamper_score_floor", d.tamper_score_floor),
            ("confidence_floor", d.confidence_floor),
            ("combined_floor", d.combined_floor),
            ("review_ceiling", d.review_ceiling),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return invalid(format!("decision.{} {} outside 0..=100", name, value));
            }
        }
        if self.batch.workers == 0 {
            return invalid("batch.workers must be at least 1".into());
        }
        if self.normalizer.pdf_dpi == 0 {
            return invalid("normalizer.pdf_dpi must be positive".into());
        }
        for profile in &self.patterns.profiles {
            if let Err(e) = Regex::new(&profile.id_pattern) {
                return invalid(format!("patterns profile {}: {}", profile.name, e));
            }
        }
        Ok(())
    }
}
