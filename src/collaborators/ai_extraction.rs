// AI field extraction through a hosted chat-completions model; any off-shape answer is a CollaboratorFailure
use crate::config::AiConfig;
use crate::types::{AiExtraction, CrossReference, Result, VerifyError};
use async_trait::async_trait;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    pub text: String,
    pub cross_reference: Option<CrossReference>,
}

#[async_trait]
pub trait FieldExtractor: Send + Sync {
    async fn extract(&self, request: &ExtractionRequest) -> Result<AiExtraction>;
}

const SYSTEM_PROMPT: &str =
    "You are an expert document verification AI. Analyze documents and return structured JSON data only.";

pub struct ChatCompletionsExtractor {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
    temperature: f32,
    max_tokens: u32,
}

impl ChatCompletionsExtractor {
    pub fn new(config: &AiConfig, api_key: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| VerifyError::Config(format!("http client: {}", e)))?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    /// Builds the extractor with the key named by `api_key_env`.
    pub fn from_env(config: &AiConfig) -> Result<Self> {
        let key = config.api_key().ok_or_else(|| {
            VerifyError::Config(format!("{} is not set", config.api_key_env))
        })?;
        Self::new(config, key)
    }
}

#[async_trait]
impl FieldExtractor for ChatCompletionsExtractor {
    async fn extract(&self, request: &ExtractionRequest) -> Result<AiExtraction> {
        let started = Instant::now();
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": build_prompt(request) }
            ],
            "temperature": self.temperature,
            "max_tokens": self.max_tokens
        });

        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                let kind = if e.is_timeout() { "timed out" } else { "transport error" };
                warn!(error = %e, "AI extraction {}", kind);
                VerifyError::CollaboratorFailure(format!("AI extraction {}: {}", kind, e))
            })?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            return Err(VerifyError::CollaboratorFailure(format!(
                "AI extraction returned {}: {}",
                status, detail
            )));
        }

        let json: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| VerifyError::CollaboratorFailure(format!("AI response body: {}", e)))?;
        let content = json["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| VerifyError::CollaboratorFailure("AI response has no message content".into()))?;

        let extraction = parse_extraction(content)?;
        debug!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            document_type = %extraction.document_type,
            confidence = extraction.confidence_score,
            "AI extraction complete"
        );
        Ok(extraction)
    }
}

pub fn build_prompt(request: &ExtractionRequest) -> String {
    let mut prompt = format!(
        "Analyze this document text and provide a structured JSON response with the following information:

Document Text:
{}

Please identify:
1. document_type: The type of document (Aadhaar, PAN, Driving License, Passport, Income Certificate, Marksheet, etc.)
2. extracted_fields: Key information from the document (name, document_number, dob, address, etc. based on document type)
3. confidence_score: A score from 0-100 indicating OCR text quality and completeness
4. is_valid_format: Boolean indicating if the document follows standard format
5. data_quality_issues: List of problems with the text quality or completeness
6. suspicious_elements: List any signs of tampering or inconsistencies
",
        request.text
    );

    if let Some(xref) = request.cross_reference.as_ref().filter(|x| !x.is_empty()) {
        prompt.push_str("\nCompare the document against this applicant record and list mismatches under suspicious_elements:\n");
        for (label, value) in [
            ("name", &xref.name),
            ("dob", &xref.dob),
            ("application_id", &xref.application_id),
        ] {
            if let Some(value) = value {
                prompt.push_str(&format!("- {}: {}\n", label, value));
            }
        }
    }

    prompt.push_str("\nReturn ONLY valid JSON without any markdown formatting or explanation.\n");
    prompt
}

/// Parses model output into an extraction, tolerating a surrounding markdown fence.
pub fn parse_extraction(raw: &str) -> Result<AiExtraction> {
    let body = strip_fence(raw);
    let mut extraction: AiExtraction = serde_json::from_str(body)
        .map_err(|e| VerifyError::CollaboratorFailure(format!("AI response parsing failed: {}", e)))?;
    if !extraction.confidence_score.is_finite() {
        return Err(VerifyError::CollaboratorFailure("confidence_score is not a number".into()));
    }
    extraction.confidence_score = extraction.confidence_score.clamp(0.0, 100.0);
    Ok(extraction)
}

fn strip_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.split("```").next().unwrap_or(rest).trim()
}
