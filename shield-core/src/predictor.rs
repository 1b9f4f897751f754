//! Contracts of the external fraud-signal predictors
//!
//! The core never trains or loads models itself; it only calls these traits.

use crate::error::PredictorError;
use crate::features::TransactionFeatures;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Verdict of the text scam classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextScamPrediction {
    /// Classified as a scam
    pub is_scam: bool,
    /// Scam probability (0-1)
    pub confidence: f64,
    /// Most indicative terms and pattern labels
    #[serde(default)]
    pub top_keywords: Vec<String>,
}

/// Transaction risk tier reported by the transaction classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictedRiskLevel {
    /// Low
    Low,
    /// Medium
    Medium,
    /// High
    High,
}

/// Verdict of the transaction risk classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRiskPrediction {
    /// Risk score (0-100)
    pub risk_score: i64,
    /// Risk tier
    pub risk_level: PredictedRiskLevel,
    /// Human-readable explanations
    #[serde(default)]
    pub reasons: Vec<String>,
}

/// Output of an anomaly detector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyPrediction {
    /// Deviation from normal (0 = normal, 1 = highly anomalous)
    pub anomaly_score: f64,
    /// Detector's own decision
    pub is_anomaly: bool,
    /// Explanation
    #[serde(default)]
    pub reason: String,
}

/// Supervised text scam classifier
#[async_trait]
pub trait TextScamPredictor: Send + Sync {
    /// Classify one message
    async fn predict(&self, text: &str) -> Result<TextScamPrediction, PredictorError>;
}

/// Supervised transaction risk classifier
#[async_trait]
pub trait TransactionRiskPredictor: Send + Sync {
    /// Score one transaction
    async fn predict(
        &self,
        features: &TransactionFeatures,
    ) -> Result<TransactionRiskPrediction, PredictorError>;
}

/// Text anomaly detector trained on legitimate messages only
#[async_trait]
pub trait TextAnomalyDetector: Send + Sync {
    /// Score one message
    async fn score(&self, text: &str) -> Result<AnomalyPrediction, PredictorError>;
}

/// Transaction anomaly detector trained on legitimate transactions only
#[async_trait]
pub trait TransactionAnomalyDetector: Send + Sync {
    /// Score one transaction
    async fn score(
        &self,
        features: &TransactionFeatures,
    ) -> Result<AnomalyPrediction, PredictorError>;
}

/// Predictor handles used by the assessor.
///
/// Anomaly detectors are optional; a missing detector is treated the same as
/// an unavailable one.
#[derive(Clone)]
pub struct Predictors {
    /// Text scam classifier
    pub text_scam: Arc<dyn TextScamPredictor>,
    /// Transaction risk classifier
    pub transaction_risk: Arc<dyn TransactionRiskPredictor>,
    /// Text anomaly detector
    pub text_anomaly: Option<Arc<dyn TextAnomalyDetector>>,
    /// Transaction anomaly detector
    pub transaction_anomaly: Option<Arc<dyn TransactionAnomalyDetector>>,
}

impl Predictors {
    /// Bundle with both supervised classifiers and no anomaly detectors
    pub fn new(
        text_scam: Arc<dyn TextScamPredictor>,
        transaction_risk: Arc<dyn TransactionRiskPredictor>,
    ) -> Self {
        Self {
            text_scam,
            transaction_risk,
            text_anomaly: None,
            transaction_anomaly: None,
        }
    }

    /// Attach a text anomaly detector
    pub fn with_text_anomaly(mut self, detector: Arc<dyn TextAnomalyDetector>) -> Self {
        self.text_anomaly = Some(detector);
        self
    }

    /// Attach a transaction anomaly detector
    pub fn with_transaction_anomaly(
        mut self,
        detector: Arc<dyn TransactionAnomalyDetector>,
    ) -> Self {
        self.transaction_anomaly = Some(detector);
        self
    }
}

impl std::fmt::Debug for Predictors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Predictors")
            .field("text_anomaly", &self.text_anomaly.is_some())
            .field("transaction_anomaly", &self.transaction_anomaly.is_some())
            .finish()
    }
}

/// Predictors returning fixed, recorded outputs.
///
/// Used to replay a past assessment from its recorded predictor responses.
/// A `None` slot behaves as an unavailable predictor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordedPredictions {
    /// Recorded text classifier verdict
    #[serde(default)]
    pub text_scam: Option<TextScamPrediction>,
    /// Recorded transaction classifier verdict
    #[serde(default)]
    pub transaction_risk: Option<TransactionRiskPrediction>,
    /// Recorded text anomaly score
    #[serde(default)]
    pub text_anomaly: Option<AnomalyPrediction>,
    /// Recorded transaction anomaly score
    #[serde(default)]
    pub transaction_anomaly: Option<AnomalyPrediction>,
}

fn recorded<T: Clone>(slot: &Option<T>, name: &str) -> Result<T, PredictorError> {
    slot.clone()
        .ok_or_else(|| PredictorError::Unavailable(format!("no recorded {} output", name)))
}

#[async_trait]
impl TextScamPredictor for RecordedPredictions {
    async fn predict(&self, _text: &str) -> Result<TextScamPrediction, PredictorError> {
        recorded(&self.text_scam, "text_scam")
    }
}

#[async_trait]
impl TransactionRiskPredictor for RecordedPredictions {
    async fn predict(
        &self,
        _features: &TransactionFeatures,
    ) -> Result<TransactionRiskPrediction, PredictorError> {
        recorded(&self.transaction_risk, "transaction_risk")
    }
}

#[async_trait]
impl TextAnomalyDetector for RecordedPredictions {
    async fn score(&self, _text: &str) -> Result<AnomalyPrediction, PredictorError> {
        recorded(&self.text_anomaly, "text_anomaly")
    }
}

#[async_trait]
impl TransactionAnomalyDetector for RecordedPredictions {
    async fn score(
        &self,
        _features: &TransactionFeatures,
    ) -> Result<AnomalyPrediction, PredictorError> {
        recorded(&self.transaction_anomaly, "transaction_anomaly")
    }
}

impl RecordedPredictions {
    /// Wire one recording into every predictor slot
    pub fn into_predictors(self) -> Predictors {
        let shared = Arc::new(self);
        Predictors::new(shared.clone(), shared.clone())
            .with_text_anomaly(shared.clone())
            .with_transaction_anomaly(shared)
    }
}
