//! Classifier: score vector → (overall score, feasibility status)
//!
//! The overall score is the unweighted mean of all ten sub-metrics, rounded
//! to one decimal place (half away from zero). Thresholds use an inclusive
//! lower bound, so a boundary value belongs to the higher band:
//!
//! | overall_score | status     |
//! |---------------|------------|
//! | < 4.0         | denied     |
//! | 4.0 ..< 7.0   | improvable |
//! | >= 7.0        | feasible   |

use crate::models::{AdditionalScores, DetailedScores, FeasibilityStatus, SUB_METRIC_COUNT};

/// Lowest overall score classified as improvable
pub const IMPROVABLE_THRESHOLD: f64 = 4.0;

/// Lowest overall score classified as feasible
pub const FEASIBLE_THRESHOLD: f64 = 7.0;

/// Classifier output
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub overall_score: f64,
    pub status: FeasibilityStatus,
}

/// Classify a validated score vector
pub fn classify(detailed: &DetailedScores, additional: &AdditionalScores) -> Classification {
    let overall_score = overall_score(detailed, additional);
    Classification {
        overall_score,
        status: status_for(overall_score),
    }
}

/// Mean of the ten sub-metrics rounded to one decimal
pub fn overall_score(detailed: &DetailedScores, additional: &AdditionalScores) -> f64 {
    let sum: f64 = detailed
        .values()
        .iter()
        .chain(additional.values().iter())
        .sum();

    round_half_away(sum / SUB_METRIC_COUNT as f64, 1)
}

/// Round half away from zero to `decimals` places
///
/// The scaled value is snapped to 1e-6 first so that binary representation
/// error (69.5 summing to 69.49999999999999) cannot flip the direction.
pub fn round_half_away(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    let snapped = (value * factor * 1e6).round() / 1e6;
    snapped.round() / factor
}

/// Map an overall score to its feasibility band
pub fn status_for(overall_score: f64) -> FeasibilityStatus {
    if overall_score < IMPROVABLE_THRESHOLD {
        FeasibilityStatus::Denied
    } else if overall_score < FEASIBLE_THRESHOLD {
        FeasibilityStatus::Improvable
    } else {
        FeasibilityStatus::Feasible
    }
}
