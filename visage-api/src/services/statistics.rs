//! Statistics aggregator
//!
//! Recomputed from the store on every request; there is no cached state.

use crate::db::analyses::{AnalysisStore, StoreError};
use crate::models::{ScoreDistribution, Statistics};
use crate::services::classifier::round_half_away;

/// Compute statistics over the full current record set
pub async fn compute_for(store: &AnalysisStore) -> Result<Statistics, StoreError> {
    let scores = store.overall_scores().await?;
    Ok(compute(&scores))
}

/// Compute count, rounded mean and histogram over overall scores
pub fn compute(scores: &[f64]) -> Statistics {
    let mut score_distribution = ScoreDistribution::default();
    for score in scores {
        score_distribution.increment(bucket_index(*score));
    }

    let average_score = if scores.is_empty() {
        0.0
    } else {
        round_half_away(scores.iter().sum::<f64>() / scores.len() as f64, 2)
    };

    Statistics {
        total_count: scores.len() as u64,
        average_score,
        score_distribution,
    }
}

/// Bucket for a score: `[0,2) [2,4) [4,6) [6,8) [8,10]`
pub fn bucket_index(score: f64) -> usize {
    if score < 2.0 {
        0
    } else if score < 4.0 {
        1
    } else if score < 6.0 {
        2
    } else if score < 8.0 {
        3
    } else {
        4
    }
}
