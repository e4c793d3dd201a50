//! Domain models

pub mod analysis;
pub mod statistics;

pub use analysis::{
    is_valid_score, AdditionalScores, AnalysisRecord, AnalysisSummary, DetailedScores,
    FeasibilityStatus, NewAnalysis, SUB_METRIC_COUNT,
};
pub use statistics::{ScoreDistribution, Statistics};
