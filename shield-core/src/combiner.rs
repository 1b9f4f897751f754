//! Weighted score combination

use crate::config::CombinerConfig;
use crate::types::{ModelKind, ModelScore};
use serde::{Deserialize, Serialize};

/// Result of combining one request's model scores
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CombinedScore {
    /// Σ(score × weight) / Σ(weight)
    pub weighted_mean: f64,
    /// Score after the supervised boost (equals `weighted_mean` when no boost applied)
    pub combined: f64,
    /// A flagged supervised classifier lifted the score
    pub boosted: bool,
}

/// Merges model scores into one weighted score
#[derive(Debug, Clone, Default)]
pub struct ScoreCombiner {
    config: CombinerConfig,
}

impl ScoreCombiner {
    /// Create combiner with the given weights
    pub fn new(config: CombinerConfig) -> Self {
        Self { config }
    }

    /// Static weight of a model family
    pub fn base_weight(&self, model: &ModelKind) -> f64 {
        match model {
            ModelKind::TextScam => self.config.text_scam_weight,
            ModelKind::TransactionRisk => self.config.transaction_risk_weight,
            ModelKind::TextAnomaly => self.config.text_anomaly_weight,
            ModelKind::TransactionAnomaly => self.config.transaction_anomaly_weight,
            ModelKind::Other(_) => self.config.default_weight,
        }
    }

    /// Weight after discounting anomaly evidence that its supervised classifier did not back
    pub fn effective_weight(&self, score: &ModelScore, all: &[ModelScore]) -> f64 {
        let weight = self.base_weight(&score.model);

        let contradicted = score
            .model
            .supervised_counterpart()
            .and_then(|kind| all.iter().find(|s| s.model == kind))
            .map_or(false, |supervised| !supervised.is_flagged);

        if contradicted {
            weight * self.config.anomaly_discount
        } else {
            weight
        }
    }

    /// Combine scores for one request
    pub fn combine(&self, scores: &[ModelScore]) -> CombinedScore {
        let mut weighted_sum = 0.0;
        let mut total_weight = 0.0;
        let mut max_supervised: u8 = 0;
        let mut supervised_flagged = false;

        for score in scores {
            let weight = self.effective_weight(score, scores);
            weighted_sum += f64::from(score.normalized_score) * weight;
            total_weight += weight;

            if score.model.is_supervised() {
                max_supervised = max_supervised.max(score.normalized_score);
                supervised_flagged |= score.is_flagged;
            }
        }

        let weighted_mean = if total_weight > 0.0 {
            weighted_sum / total_weight
        } else {
            0.0
        };

        // Anomaly evidence alone never triggers the boost
        let floor = f64::from(max_supervised) * self.config.supervised_boost;
        let boosted = supervised_flagged && floor > weighted_mean;
        let combined = if supervised_flagged {
            weighted_mean.max(floor)
        } else {
            weighted_mean
        };

        CombinedScore {
            weighted_mean,
            combined,
            boosted,
        }
    }
}
