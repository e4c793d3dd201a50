//! Analysis record and score vector types
//!
//! An [`AnalysisRecord`] can only be assembled from a [`NewAnalysis`] plus an
//! id and timestamp handed out by the record store. Its `overall_score` and
//! `status` always come from the classifier, never from the caller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::services::classifier;

/// Number of sub-metrics contributing to the overall score
pub const SUB_METRIC_COUNT: usize = 10;

/// True when a sub-score is a finite number in [0, 10]
pub fn is_valid_score(value: f64) -> bool {
    value.is_finite() && (0.0..=10.0).contains(&value)
}

/// Three-valued feasibility classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeasibilityStatus {
    Denied,
    Improvable,
    Feasible,
}

impl FeasibilityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeasibilityStatus::Denied => "denied",
            FeasibilityStatus::Improvable => "improvable",
            FeasibilityStatus::Feasible => "feasible",
        }
    }
}

impl fmt::Display for FeasibilityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Primary sub-metrics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetailedScores {
    pub symmetry: f64,
    pub proportions: f64,
    pub skin_quality: f64,
    pub features_harmony: f64,
}

impl DetailedScores {
    pub fn values(&self) -> [f64; 4] {
        [
            self.symmetry,
            self.proportions,
            self.skin_quality,
            self.features_harmony,
        ]
    }
}

/// Secondary sub-metrics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdditionalScores {
    pub eye_appeal: f64,
    pub nose_harmony: f64,
    pub lip_aesthetics: f64,
    pub jawline_definition: f64,
    pub cheekbone_prominence: f64,
    pub facial_composition: f64,
}

impl AdditionalScores {
    pub fn values(&self) -> [f64; 6] {
        [
            self.eye_appeal,
            self.nose_harmony,
            self.lip_aesthetics,
            self.jawline_definition,
            self.cheekbone_prominence,
            self.facial_composition,
        ]
    }
}

/// Caller-supplied content of a record about to be created
///
/// Deliberately has no id, timestamp, status or overall score.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAnalysis {
    pub detailed_scores: DetailedScores,
    pub additional_scores: AdditionalScores,
    pub scientific_explanation: String,
    pub recommendations: String,
    /// Sanitized original filename
    pub filename: String,
    /// Identifier of the model that produced the scores
    pub ai_model: String,
    /// Wall time of the oracle call
    pub processing_time_ms: u64,
}

impl NewAnalysis {
    /// True when all ten sub-scores are in range
    pub fn scores_in_range(&self) -> bool {
        self.detailed_scores
            .values()
            .iter()
            .chain(self.additional_scores.values().iter())
            .all(|v| is_valid_score(*v))
    }
}

/// The persisted unit returned by create and get
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisRecord {
    id: Uuid,
    status: FeasibilityStatus,
    overall_score: f64,
    detailed_scores: DetailedScores,
    additional_scores: AdditionalScores,
    scientific_explanation: String,
    recommendations: String,
    created_at: DateTime<Utc>,
    filename: String,
    ai_model: String,
    processing_time_ms: u64,
}

impl AnalysisRecord {
    /// Assemble a record, deriving overall score and status
    pub(crate) fn assemble(id: Uuid, created_at: DateTime<Utc>, content: NewAnalysis) -> Self {
        let classification =
            classifier::classify(&content.detailed_scores, &content.additional_scores);

        Self {
            id,
            status: classification.status,
            overall_score: classification.overall_score,
            detailed_scores: content.detailed_scores,
            additional_scores: content.additional_scores,
            scientific_explanation: content.scientific_explanation,
            recommendations: content.recommendations,
            created_at,
            filename: content.filename,
            ai_model: content.ai_model,
            processing_time_ms: content.processing_time_ms,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn status(&self) -> FeasibilityStatus {
        self.status
    }

    pub fn overall_score(&self) -> f64 {
        self.overall_score
    }

    pub fn detailed_scores(&self) -> &DetailedScores {
        &self.detailed_scores
    }

    pub fn additional_scores(&self) -> &AdditionalScores {
        &self.additional_scores
    }

    pub fn scientific_explanation(&self) -> &str {
        &self.scientific_explanation
    }

    pub fn recommendations(&self) -> &str {
        &self.recommendations
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn ai_model(&self) -> &str {
        &self.ai_model
    }

    pub fn processing_time_ms(&self) -> u64 {
        self.processing_time_ms
    }

    /// Lightweight projection used by list
    pub fn summary(&self) -> AnalysisSummary {
        AnalysisSummary {
            id: self.id,
            overall_score: self.overall_score,
            created_at: self.created_at,
        }
    }
}

/// List entry: id, overall score and creation time only
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub id: Uuid,
    pub overall_score: f64,
    pub created_at: DateTime<Utc>,
}
