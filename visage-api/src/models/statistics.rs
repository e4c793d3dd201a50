//! Aggregate statistics over stored analyses

use serde::{Deserialize, Serialize};

/// Output of the statistics aggregator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub total_count: u64,
    /// Mean overall score rounded to two decimals; 0 when there are no records
    pub average_score: f64,
    pub score_distribution: ScoreDistribution,
}

/// Histogram over the five fixed score buckets
///
/// Buckets are `[0,2) [2,4) [4,6) [6,8) [8,10]` and are always serialized,
/// even when empty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreDistribution {
    #[serde(rename = "0-2")]
    pub very_low: u64,
    #[serde(rename = "2-4")]
    pub low: u64,
    #[serde(rename = "4-6")]
    pub medium: u64,
    #[serde(rename = "6-8")]
    pub high: u64,
    #[serde(rename = "8-10")]
    pub very_high: u64,
}

impl ScoreDistribution {
    /// Bucket labels in ascending order
    pub const LABELS: [&'static str; 5] = ["0-2", "2-4", "4-6", "6-8", "8-10"];

    /// Counts in ascending bucket order
    pub fn counts(&self) -> [u64; 5] {
        [self.very_low, self.low, self.medium, self.high, self.very_high]
    }

    pub(crate) fn increment(&mut self, bucket: usize) {
        match bucket {
            0 => self.very_low += 1,
            1 => self.low += 1,
            2 => self.medium += 1,
            3 => self.high += 1,
            _ => self.very_high += 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_distribution_serializes_all_buckets() {
        let json = serde_json::to_value(ScoreDistribution::default()).unwrap();
        for label in ScoreDistribution::LABELS {
            assert_eq!(json[label], 0, "bucket {} missing", label);
        }
    }
}
