//! Scoring oracle client
//!
//! The oracle is a remote multimodal model that returns ten facial sub-scores
//! and two free-text fields. The rest of the service only sees the typed
//! [`ScoringOracle`] contract; transport and prompt details stay here.
//!
//! The model's reply is validated strictly: every sub-score must be present,
//! numeric and inside [0, 10]. Nothing is defaulted, coerced or clamped.

use async_trait::async_trait;
use base64::Engine;
use serde_json::{json, Map, Value};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};
use visage_common::config::OracleConfig;

use super::upload_validator::ValidatedImage;
use crate::models::{is_valid_score, AdditionalScores, DetailedScores};

/// Oracle failures
#[derive(Debug, Clone, Error, PartialEq)]
pub enum OracleError {
    #[error("Scoring service unavailable: {0}")]
    Unavailable(String),

    #[error("Scoring service did not answer within {0:?}")]
    Timeout(Duration),

    #[error("Scoring service returned a malformed response: {0}")]
    MalformedResponse(String),
}

impl OracleError {
    pub fn code(&self) -> &'static str {
        match self {
            OracleError::Unavailable(_) => "ORACLE_UNAVAILABLE",
            OracleError::Timeout(_) => "ORACLE_TIMEOUT",
            OracleError::MalformedResponse(_) => "ORACLE_MALFORMED_RESPONSE",
        }
    }
}

/// Validated oracle output
#[derive(Debug, Clone, PartialEq)]
pub struct OracleAssessment {
    pub detailed_scores: DetailedScores,
    pub additional_scores: AdditionalScores,
    pub scientific_explanation: String,
    pub recommendations: String,
}

/// Typed contract for the external scoring model
#[async_trait]
pub trait ScoringOracle: Send + Sync {
    /// Score one validated image
    async fn score(&self, image: &ValidatedImage) -> Result<OracleAssessment, OracleError>;

    /// Model identifier recorded with each analysis
    fn model_name(&self) -> &str;
}

/// Response keys for the four primary sub-metrics
pub const DETAILED_KEYS: [&str; 4] = [
    "symmetry_score",
    "proportion_score",
    "skin_quality_score",
    "features_harmony_score",
];

/// Response keys for the six secondary sub-metrics
pub const ADDITIONAL_KEYS: [&str; 6] = [
    "eye_appeal_score",
    "nose_harmony_score",
    "lip_aesthetics_score",
    "jawline_definition_score",
    "cheekbone_prominence_score",
    "facial_composition_score",
];

const ANALYSIS_PROMPT: &str = r#"You are assisting a facial aesthetics assessment tool.
Examine the face in the attached photograph and rate each of the following
dimensions on a scale from 0.0 to 10.0 (one decimal place):

symmetry_score, proportion_score, skin_quality_score, features_harmony_score,
eye_appeal_score, nose_harmony_score, lip_aesthetics_score,
jawline_definition_score, cheekbone_prominence_score, facial_composition_score

Base the ratings on established measures such as bilateral symmetry, facial
thirds and golden-ratio proportions, skin texture and tone, and the balance
between individual features.

Reply with exactly one JSON object and nothing else, using these keys:
{
  "symmetry_score": 0.0,
  "proportion_score": 0.0,
  "skin_quality_score": 0.0,
  "features_harmony_score": 0.0,
  "eye_appeal_score": 0.0,
  "nose_harmony_score": 0.0,
  "lip_aesthetics_score": 0.0,
  "jawline_definition_score": 0.0,
  "cheekbone_prominence_score": 0.0,
  "facial_composition_score": 0.0,
  "scientific_explanation": "a few sentences citing the measures used",
  "recommendations": "practical, respectful suggestions"
}

If no face is visible, still return the object with every score set to 0.0
and explain why in scientific_explanation."#;

/// Parse the model's text reply into a validated assessment
///
/// Any prose or code fences around the JSON object are ignored by taking the
/// span from the first `{` to the last `}`. Extra keys (for example a status
/// the model volunteers) are ignored.
pub fn parse_assessment(text: &str) -> Result<OracleAssessment, OracleError> {
    let malformed = |msg: &str| OracleError::MalformedResponse(msg.to_string());

    let start = text.find('{').ok_or_else(|| malformed("no JSON object in reply"))?;
    let end = text.rfind('}').ok_or_else(|| malformed("no JSON object in reply"))?;
    if end < start {
        return Err(malformed("no JSON object in reply"));
    }

    let value: Value = serde_json::from_str(&text[start..=end])
        .map_err(|e| OracleError::MalformedResponse(format!("invalid JSON: {}", e)))?;
    let obj = value
        .as_object()
        .ok_or_else(|| malformed("reply is not a JSON object"))?;

    let d = read_scores(obj, &DETAILED_KEYS)?;
    let a = read_scores(obj, &ADDITIONAL_KEYS)?;

    Ok(OracleAssessment {
        detailed_scores: DetailedScores {
            symmetry: d[0],
            proportions: d[1],
            skin_quality: d[2],
            features_harmony: d[3],
        },
        additional_scores: AdditionalScores {
            eye_appeal: a[0],
            nose_harmony: a[1],
            lip_aesthetics: a[2],
            jawline_definition: a[3],
            cheekbone_prominence: a[4],
            facial_composition: a[5],
        },
        scientific_explanation: read_text(obj, "scientific_explanation")?,
        recommendations: read_text(obj, "recommendations")?,
    })
}

fn read_scores<const N: usize>(
    obj: &Map<String, Value>,
    keys: &[&str; N],
) -> Result<[f64; N], OracleError> {
    let mut scores = [0.0; N];
    for (slot, key) in scores.iter_mut().zip(keys.iter()) {
        let value = obj.get(*key).ok_or_else(|| {
            OracleError::MalformedResponse(format!("missing sub-metric '{}'", key))
        })?;
        let number = value.as_f64().ok_or_else(|| {
            OracleError::MalformedResponse(format!("sub-metric '{}' is not a number", key))
        })?;
        if !is_valid_score(number) {
            return Err(OracleError::MalformedResponse(format!(
                "sub-metric '{}' = {} is outside [0, 10]",
                key, number
            )));
        }
        *slot = number;
    }
    Ok(scores)
}

fn read_text(obj: &Map<String, Value>, key: &str) -> Result<String, OracleError> {
    obj.get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| OracleError::MalformedResponse(format!("missing text field '{}'", key)))
}

/// Google Generative Language (Gemini) implementation
pub struct GeminiOracle {
    client: reqwest::Client,
    api_key: String,
    model_name: String,
    base_url: String,
    max_output_tokens: u32,
    temperature: f64,
    timeout: Duration,
}

impl GeminiOracle {
    pub fn new(config: &OracleConfig) -> Result<Self, OracleError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| OracleError::Unavailable(format!("HTTP client setup failed: {}", e)))?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            model_name: config.model_name.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            max_output_tokens: config.max_output_tokens,
            temperature: config.temperature,
            timeout: config.timeout(),
        })
    }

    /// Check if API key is configured
    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }

    fn request_body(&self, image: &ValidatedImage) -> Value {
        let data = base64::engine::general_purpose::STANDARD.encode(image.bytes());
        json!({
            "contents": [{
                "parts": [
                    { "text": ANALYSIS_PROMPT },
                    { "inline_data": { "mime_type": image.format().mime_type(), "data": data } }
                ]
            }],
            "generationConfig": {
                "maxOutputTokens": self.max_output_tokens,
                "temperature": self.temperature
            }
        })
    }
}

#[async_trait]
impl ScoringOracle for GeminiOracle {
    async fn score(&self, image: &ValidatedImage) -> Result<OracleAssessment, OracleError> {
        if !self.is_configured() {
            return Err(OracleError::Unavailable(
                "oracle API key is not configured".to_string(),
            ));
        }

        let url = format!("{}/models/{}:generateContent", self.base_url, self.model_name);
        debug!(
            model = %self.model_name,
            bytes = image.bytes().len(),
            "Requesting oracle assessment"
        );

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&self.request_body(image))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    OracleError::Timeout(self.timeout)
                } else {
                    // without_url keeps the API key query parameter out of the message
                    OracleError::Unavailable(e.without_url().to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = %status, "Oracle returned error status");
            return Err(OracleError::Unavailable(format!("upstream returned HTTP {}", status)));
        }

        let body: Value = response.json().await.map_err(|e| {
            if e.is_timeout() {
                OracleError::Timeout(self.timeout)
            } else {
                OracleError::MalformedResponse(format!("response is not JSON: {}", e.without_url()))
            }
        })?;

        let text = body
            .pointer("/candidates/0/content/parts/0/text")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                OracleError::MalformedResponse("response has no text candidate".to_string())
            })?;

        parse_assessment(text)
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
