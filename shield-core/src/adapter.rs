//! Model adapters: map raw predictor output onto [`ModelScore`]
//!
//! Adapters never fail. A supervised predictor that errors yields a neutral
//! score with the cause in `reasons`; an anomaly detector that errors (or is
//! not deployed) yields [`AnomalyEvidence::Absent`] so downstream logic skips it
//! instead of reading it as evidence of normality.

use crate::error::PredictorError;
use crate::features::TransactionFeatures;
use crate::predictor::{
    AnomalyPrediction, PredictedRiskLevel, TextAnomalyDetector, TextScamPrediction,
    TextScamPredictor, TransactionAnomalyDetector, TransactionRiskPrediction,
    TransactionRiskPredictor,
};
use crate::types::{ModelKind, ModelScore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// Outcome of an anomaly detector call
#[derive(Debug, Clone, PartialEq)]
pub enum AnomalyEvidence {
    /// Detector produced a score
    Observed(ModelScore),
    /// No evidence either way
    Absent(SkippedModel),
}

impl AnomalyEvidence {
    /// Score, if one was observed
    pub fn into_score(self) -> Option<ModelScore> {
        match self {
            AnomalyEvidence::Observed(score) => Some(score),
            AnomalyEvidence::Absent(_) => None,
        }
    }
}

/// A predictor whose output was left out of the assessment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedModel {
    /// Model name
    pub model_name: String,
    /// Why it was skipped
    pub cause: String,
}

/// Clamp a probability into [0, 1]; NaN counts as 0
fn unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Probability to 0-100
fn percent(probability: f64) -> u8 {
    (unit(probability) * 100.0).round() as u8
}

// =========================================================================
// TEXT SCAM CLASSIFIER
// =========================================================================

/// Invoke the text classifier and normalize its verdict
pub async fn text_scam(predictor: &dyn TextScamPredictor, text: &str) -> ModelScore {
    match predictor.predict(text).await {
        Ok(prediction) => from_text_prediction(&prediction),
        Err(e) => {
            warn!(
                "Text scam predictor failed, substituting neutral score: {}",
                e
            );
            ModelScore::neutral(
                ModelKind::TextScam,
                format!("Text analysis unavailable: {}", e),
            )
        }
    }
}

/// Confidence-only predictor: score is the rounded confidence
pub fn from_text_prediction(prediction: &TextScamPrediction) -> ModelScore {
    let confidence = unit(prediction.confidence);

    ModelScore {
        model: ModelKind::TextScam,
        raw_score: prediction.confidence,
        normalized_score: percent(confidence),
        is_flagged: prediction.is_scam,
        confidence,
        keywords: dedup_keywords(&prediction.top_keywords),
        reasons: text_reasons(prediction.is_scam, confidence, &prediction.top_keywords),
    }
}

fn dedup_keywords(keywords: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(keywords.len());
    for keyword in keywords {
        if !out.contains(keyword) {
            out.push(keyword.clone());
        }
    }
    out
}

fn text_reasons(is_scam: bool, confidence: f64, keywords: &[String]) -> Vec<String> {
    let mut reasons = Vec::new();
    if !is_scam {
        return reasons;
    }

    let headline = if confidence >= 0.8 {
        "Strong scam indicators detected"
    } else if confidence >= 0.6 {
        "Suspicious patterns identified"
    } else {
        "Some concerning elements found"
    };
    reasons.push(headline.to_string());

    // Upper-case entries are pattern labels (URGENCY_DETECTED), not words
    let words: Vec<&str> = keywords
        .iter()
        .map(String::as_str)
        .filter(|k| !is_pattern_label(k))
        .take(3)
        .collect();
    if !words.is_empty() {
        reasons.push(format!("Keywords: {}", words.join(", ")));
    }

    reasons
}

fn is_pattern_label(keyword: &str) -> bool {
    keyword.chars().any(|c| c.is_alphabetic()) && !keyword.chars().any(|c| c.is_lowercase())
}

// =========================================================================
// TRANSACTION RISK CLASSIFIER
// =========================================================================

/// Invoke the transaction classifier and normalize its verdict
pub async fn transaction_risk(
    predictor: &dyn TransactionRiskPredictor,
    features: &TransactionFeatures,
) -> ModelScore {
    match predictor.predict(features).await {
        Ok(prediction) => from_transaction_prediction(&prediction),
        Err(e) => {
            warn!(
                "Transaction risk predictor failed, substituting neutral score: {}",
                e
            );
            ModelScore::neutral(
                ModelKind::TransactionRisk,
                format!("Transaction analysis unavailable: {}", e),
            )
        }
    }
}

/// Already-normalized predictor: score passes through
pub fn from_transaction_prediction(prediction: &TransactionRiskPrediction) -> ModelScore {
    let normalized = prediction.risk_score.clamp(0, 100) as u8;

    ModelScore {
        model: ModelKind::TransactionRisk,
        raw_score: prediction.risk_score as f64,
        normalized_score: normalized,
        is_flagged: matches!(
            prediction.risk_level,
            PredictedRiskLevel::Medium | PredictedRiskLevel::High
        ),
        confidence: f64::from(normalized) / 100.0,
        keywords: Vec::new(),
        reasons: prediction.reasons.clone(),
    }
}

// =========================================================================
// ANOMALY DETECTORS
// =========================================================================

/// Invoke the text anomaly detector, if deployed
pub async fn text_anomaly(
    detector: Option<&Arc<dyn TextAnomalyDetector>>,
    text: &str,
) -> AnomalyEvidence {
    let outcome = match detector {
        Some(d) => d.score(text).await,
        None => Err(PredictorError::Unavailable("detector not configured".to_string())),
    };
    anomaly_evidence(ModelKind::TextAnomaly, outcome)
}

/// Invoke the transaction anomaly detector, if deployed
pub async fn transaction_anomaly(
    detector: Option<&Arc<dyn TransactionAnomalyDetector>>,
    features: &TransactionFeatures,
) -> AnomalyEvidence {
    let outcome = match detector {
        Some(d) => d.score(features).await,
        None => Err(PredictorError::Unavailable("detector not configured".to_string())),
    };
    anomaly_evidence(ModelKind::TransactionAnomaly, outcome)
}

fn anomaly_evidence(
    model: ModelKind,
    outcome: Result<AnomalyPrediction, PredictorError>,
) -> AnomalyEvidence {
    match outcome {
        Ok(prediction) => AnomalyEvidence::Observed(from_anomaly_prediction(model, &prediction)),
        Err(e) => {
            match &e {
                PredictorError::Unavailable(_) => debug!("{} skipped: {}", model, e),
                PredictorError::Failed(_) => warn!("{} failed, skipping: {}", model, e),
            }
            AnomalyEvidence::Absent(SkippedModel {
                model_name: model.as_str().to_string(),
                cause: e.to_string(),
            })
        }
    }
}

/// Anomaly score (0-1) to 0-100; the reason is kept only when flagged
pub fn from_anomaly_prediction(model: ModelKind, prediction: &AnomalyPrediction) -> ModelScore {
    let score = unit(prediction.anomaly_score);
    let reasons = if prediction.is_anomaly && !prediction.reason.is_empty() {
        vec![prediction.reason.clone()]
    } else {
        Vec::new()
    };

    ModelScore {
        model,
        raw_score: prediction.anomaly_score,
        normalized_score: percent(score),
        is_flagged: prediction.is_anomaly,
        confidence: score,
        keywords: Vec::new(),
        reasons,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct FailingText;

    #[async_trait]
    impl TextScamPredictor for FailingText {
        async fn predict(&self, _text: &str) -> Result<TextScamPrediction, PredictorError> {
            Err(PredictorError::Failed("vectorizer crashed".to_string()))
        }
    }

    struct FailingTxn;

    #[async_trait]
    impl TransactionRiskPredictor for FailingTxn {
        async fn predict(
            &self,
            _features: &TransactionFeatures,
        ) -> Result<TransactionRiskPrediction, PredictorError> {
            Err(PredictorError::Unavailable("model file missing".to_string()))
        }
    }

    struct BrokenAnomaly;

    #[async_trait]
    impl TextAnomalyDetector for BrokenAnomaly {
        async fn score(&self, _text: &str) -> Result<AnomalyPrediction, PredictorError> {
            Err(PredictorError::Failed("svm error".to_string()))
        }
    }

    fn features() -> TransactionFeatures {
        TransactionFeatures {
            transaction_amount: 1500.0,
            avg_transaction_amount: 2000.0,
            transactions_last_24h: 2,
            amount_spike_ratio: 0.75,
            is_new_receiver: false,
            is_new_device: false,
            time_since_last_txn_minutes: 300.0,
        }
    }

    #[test]
    fn test_text_confidence_rounded_to_score() {
        let score = from_text_prediction(&TextScamPrediction {
            is_scam: true,
            confidence: 0.876,
            top_keywords: vec![
                "cashback".to_string(),
                "URGENCY_DETECTED".to_string(),
                "receive".to_string(),
                "pay".to_string(),
                "rs".to_string(),
            ],
        });

        assert_eq!(score.normalized_score, 88);
        assert!(score.is_flagged);
        assert_eq!(score.reasons[0], "Strong scam indicators detected");
        assert_eq!(score.reasons[1], "Keywords: cashback, receive, pay");
        assert_eq!(score.keywords.len(), 5);
    }

    #[test]
    fn test_unflagged_text_has_no_reasons() {
        let score = from_text_prediction(&TextScamPrediction {
            is_scam: false,
            confidence: 0.12,
            top_keywords: vec!["debited".to_string()],
        });
        assert_eq!(score.normalized_score, 12);
        assert!(score.reasons.is_empty());
    }

    #[test]
    fn test_out_of_range_confidence_clamped() {
        let score = from_text_prediction(&TextScamPrediction {
            is_scam: true,
            confidence: 1.7,
            top_keywords: vec![],
        });
        assert_eq!(score.normalized_score, 100);
        assert_eq!(score.confidence, 1.0);
    }

    #[test]
    fn test_transaction_score_passes_through() {
        let score = from_transaction_prediction(&TransactionRiskPrediction {
            risk_score: 55,
            risk_level: PredictedRiskLevel::Medium,
            reasons: vec!["First transaction to this receiver".to_string()],
        });
        assert_eq!(score.normalized_score, 55);
        assert!(score.is_flagged);
        assert!((score.confidence - 0.55).abs() < 1e-9);

        let low = from_transaction_prediction(&TransactionRiskPrediction {
            risk_score: 12,
            risk_level: PredictedRiskLevel::Low,
            reasons: vec![],
        });
        assert!(!low.is_flagged);
    }

    #[tokio::test]
    async fn test_failing_supervised_predictors_are_neutral() {
        let text = text_scam(&FailingText, "hello").await;
        assert_eq!(text.normalized_score, 0);
        assert!(!text.is_flagged);
        assert!(text.reasons[0].starts_with("Text analysis unavailable"));

        let txn = transaction_risk(&FailingTxn, &features()).await;
        assert_eq!(txn.model, ModelKind::TransactionRisk);
        assert!(txn.reasons[0].contains("model file missing"));
    }

    #[tokio::test]
    async fn test_failing_anomaly_detector_is_absent() {
        let detector: Arc<dyn TextAnomalyDetector> = Arc::new(BrokenAnomaly);
        let evidence = text_anomaly(Some(&detector), "hello").await;
        match evidence {
            AnomalyEvidence::Absent(skipped) => {
                assert_eq!(skipped.model_name, "text_anomaly");
                assert!(skipped.cause.contains("svm error"));
            }
            other => panic!("expected absent evidence, got {:?}", other),
        }

        let missing = transaction_anomaly(None, &features()).await;
        assert!(missing.into_score().is_none());
    }

    #[test]
    fn test_anomaly_reason_kept_only_when_flagged() {
        let flagged = from_anomaly_prediction(
            ModelKind::TextAnomaly,
            &AnomalyPrediction {
                anomaly_score: 0.834,
                is_anomaly: true,
                reason: "Message pattern highly unusual".to_string(),
            },
        );
        assert_eq!(flagged.normalized_score, 83);
        assert_eq!(flagged.reasons.len(), 1);

        let calm = from_anomaly_prediction(
            ModelKind::TransactionAnomaly,
            &AnomalyPrediction {
                anomaly_score: 0.2,
                is_anomaly: false,
                reason: "Transaction follows normal behavioral patterns".to_string(),
            },
        );
        assert!(calm.reasons.is_empty());
    }
}
