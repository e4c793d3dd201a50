//! Counting scoring oracle stand-in

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use visage_api::models::{AdditionalScores, DetailedScores};
use visage_api::services::{OracleAssessment, OracleError, ScoringOracle, ValidatedImage};

pub const MOCK_MODEL: &str = "mock-oracle-1";

/// Oracle returning a configurable reply after an optional delay
pub struct MockOracle {
    reply: Mutex<Result<OracleAssessment, OracleError>>,
    delay: Duration,
    calls: AtomicUsize,
}

impl MockOracle {
    /// Every sub-metric scored `score`, so the overall score is exactly `score`
    pub fn uniform(score: f64) -> Self {
        Self {
            reply: Mutex::new(Ok(assessment(score))),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(err: OracleError) -> Self {
        Self {
            reply: Mutex::new(Err(err)),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Change the score returned by subsequent calls
    pub fn set_score(&self, score: f64) {
        *self.reply.lock().unwrap() = Ok(assessment(score));
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ScoringOracle for MockOracle {
    async fn score(&self, _image: &ValidatedImage) -> Result<OracleAssessment, OracleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.reply.lock().unwrap().clone()
    }

    fn model_name(&self) -> &str {
        MOCK_MODEL
    }
}

pub fn assessment(score: f64) -> OracleAssessment {
    OracleAssessment {
        detailed_scores: DetailedScores {
            symmetry: score,
            proportions: score,
            skin_quality: score,
            features_harmony: score,
        },
        additional_scores: AdditionalScores {
            eye_appeal: score,
            nose_harmony: score,
            lip_aesthetics: score,
            jawline_definition: score,
            cheekbone_prominence: score,
            facial_composition: score,
        },
        scientific_explanation: "Measured bilateral symmetry and facial thirds.".to_string(),
        recommendations: "Maintain current routine.".to_string(),
    }
}
