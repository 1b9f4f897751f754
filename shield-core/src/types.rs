//! Core types for the shield risk core

use serde::{Deserialize, Serialize};
use std::fmt;

/// Risk score (0-100)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RiskScore(u8);

impl RiskScore {
    /// Create new risk score, clamped to 0-100
    pub fn new(score: u8) -> Self {
        Self(score.min(100))
    }

    /// Clamp an unbounded floating point score into 0-100, truncating the fraction
    pub fn from_f64(score: f64) -> Self {
        if !score.is_finite() || score <= 0.0 {
            return Self(0);
        }
        Self(score.min(100.0) as u8)
    }

    /// Get raw score
    pub fn score(&self) -> u8 {
        self.0
    }

    /// Check if high risk (>= 70)
    pub fn is_high_risk(&self) -> bool {
        self.0 >= 70
    }

    /// Check if medium risk (40-69)
    pub fn is_medium_risk(&self) -> bool {
        (40..70).contains(&self.0)
    }

    /// Check if low risk (< 40)
    pub fn is_low_risk(&self) -> bool {
        self.0 < 40
    }
}

impl fmt::Display for RiskScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Risk level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    /// Low risk (0-39)
    Low,
    /// Medium risk (40-69)
    Medium,
    /// High risk (70-100)
    High,
}

impl From<RiskScore> for RiskLevel {
    fn from(score: RiskScore) -> Self {
        if score.is_high_risk() {
            RiskLevel::High
        } else if score.is_medium_risk() {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

impl RiskLevel {
    /// Tier containing `score`
    pub fn from_score(score: u8) -> Self {
        RiskLevel::from(RiskScore::new(score))
    }

    /// Lowercase label
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }

    /// UI message and severity class for this tier
    pub fn display_hint(&self) -> DisplayHint {
        match self {
            RiskLevel::Low => DisplayHint {
                message: "This appears to be safe".to_string(),
                severity: DisplaySeverity::Success,
            },
            RiskLevel::Medium => DisplayHint {
                message: "Please verify before proceeding".to_string(),
                severity: DisplaySeverity::Warning,
            },
            RiskLevel::High => DisplayHint {
                message: "Warning: High risk detected!".to_string(),
                severity: DisplaySeverity::Danger,
            },
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Advisory action recommended to the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendedAction {
    /// Proceed normally
    Allow,
    /// Request additional verification (OTP/2FA)
    Verify,
    /// Show a warning before proceeding
    Warn,
    /// Escalate to a human reviewer
    ManualReview,
    /// Recommend blocking
    Block,
}

impl RecommendedAction {
    /// Action for a risk tier and the exact score inside it
    pub fn for_score(level: RiskLevel, score: RiskScore) -> Self {
        match level {
            RiskLevel::Low => RecommendedAction::Allow,
            RiskLevel::Medium if score.score() >= 60 => RecommendedAction::Warn,
            RiskLevel::Medium => RecommendedAction::Verify,
            RiskLevel::High if score.score() >= 85 => RecommendedAction::Block,
            RiskLevel::High => RecommendedAction::ManualReview,
        }
    }

    /// Why this action is recommended
    pub fn reason(&self) -> &'static str {
        match self {
            RecommendedAction::Allow => "Risk indicators are within acceptable range",
            RecommendedAction::Verify => {
                "Some risk indicators present - additional verification recommended"
            }
            RecommendedAction::Warn => "Multiple risk indicators detected - proceed with caution",
            RecommendedAction::ManualReview => "Significant risk detected - manual review required",
            RecommendedAction::Block => "High probability of fraud - transaction should be blocked",
        }
    }
}

/// UI severity class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplaySeverity {
    /// Green
    Success,
    /// Amber
    Warning,
    /// Red
    Danger,
}

/// Display hints for a decision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayHint {
    /// User-facing message
    pub message: String,
    /// Severity class
    pub severity: DisplaySeverity,
}

/// Predictor family that produced a [`ModelScore`]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ModelKind {
    /// Supervised text scam classifier
    TextScam,
    /// Supervised transaction risk classifier
    TransactionRisk,
    /// Text anomaly detector
    TextAnomaly,
    /// Transaction anomaly detector
    TransactionAnomaly,
    /// Any other predictor, weighted with the default weight
    Other(String),
}

impl ModelKind {
    /// Stable model name
    pub fn as_str(&self) -> &str {
        match self {
            ModelKind::TextScam => "text_scam",
            ModelKind::TransactionRisk => "transaction_risk",
            ModelKind::TextAnomaly => "text_anomaly",
            ModelKind::TransactionAnomaly => "transaction_anomaly",
            ModelKind::Other(name) => name,
        }
    }

    /// Trained to label risk vs. safe directly
    pub fn is_supervised(&self) -> bool {
        matches!(self, ModelKind::TextScam | ModelKind::TransactionRisk)
    }

    /// Trained on legitimate examples only
    pub fn is_anomaly(&self) -> bool {
        matches!(self, ModelKind::TextAnomaly | ModelKind::TransactionAnomaly)
    }

    /// Supervised classifier covering the same input as this anomaly detector
    pub fn supervised_counterpart(&self) -> Option<ModelKind> {
        match self {
            ModelKind::TextAnomaly => Some(ModelKind::TextScam),
            ModelKind::TransactionAnomaly => Some(ModelKind::TransactionRisk),
            _ => None,
        }
    }
}

impl From<String> for ModelKind {
    fn from(name: String) -> Self {
        match name.as_str() {
            "text_scam" => ModelKind::TextScam,
            "transaction_risk" => ModelKind::TransactionRisk,
            "text_anomaly" => ModelKind::TextAnomaly,
            "transaction_anomaly" => ModelKind::TransactionAnomaly,
            _ => ModelKind::Other(name),
        }
    }
}

impl From<ModelKind> for String {
    fn from(kind: ModelKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized output of one predictor invocation.
///
/// `keywords` is only populated by the text scam classifier and is empty for
/// every other family. `reasons` is empty when the predictor had nothing to say.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelScore {
    /// Producing predictor
    #[serde(rename = "model_name")]
    pub model: ModelKind,
    /// Score as reported by the predictor (probability or 0-100)
    pub raw_score: f64,
    /// Standardized score (0-100)
    pub normalized_score: u8,
    /// Predictor's binary decision
    pub is_flagged: bool,
    /// Predictor's confidence (0-1)
    pub confidence: f64,
    /// Top indicators, in the order reported
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Human-readable reasons
    #[serde(default)]
    pub reasons: Vec<String>,
}

impl ModelScore {
    /// Score substituted for a failed predictor: zero, unflagged, cause recorded
    pub fn neutral(model: ModelKind, reason: impl Into<String>) -> Self {
        Self {
            model,
            raw_score: 0.0,
            normalized_score: 0,
            is_flagged: false,
            confidence: 0.0,
            keywords: Vec::new(),
            reasons: vec![reason.into()],
        }
    }
}

/// Direction in which a fired rule moves the score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleImpact {
    /// Red flag
    Increase,
    /// Trust signal
    Decrease,
    /// Informational
    Neutral,
}

impl RuleImpact {
    /// Impact implied by a signed adjustment
    pub fn of(adjustment: i32) -> Self {
        match adjustment {
            a if a > 0 => RuleImpact::Increase,
            a if a < 0 => RuleImpact::Decrease,
            _ => RuleImpact::Neutral,
        }
    }
}

/// A policy rule that fired for a request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyRule {
    /// Rule identifier (e.g. "R001")
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// Direction of the adjustment
    pub impact: RuleImpact,
    /// Signed points added to the combined score
    pub score_adjustment: i32,
    /// Why the rule fired
    pub description: String,
}

/// Caller-supplied trust signals
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustContext {
    /// Account is verified and in good standing
    #[serde(default)]
    pub is_verified_user: bool,
    /// Recipient is one the user pays regularly
    #[serde(default)]
    pub is_regular_recipient: bool,
}

/// Which inputs a request supplied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputShape {
    /// Text message only
    TextOnly,
    /// Transaction only
    TransactionOnly,
    /// Text and transaction
    Combined,
}

impl InputShape {
    /// Shape for the supplied inputs; `None` when neither is present
    pub fn of(has_text: bool, has_transaction: bool) -> Option<Self> {
        match (has_text, has_transaction) {
            (true, true) => Some(InputShape::Combined),
            (true, false) => Some(InputShape::TextOnly),
            (false, true) => Some(InputShape::TransactionOnly),
            (false, false) => None,
        }
    }

    /// Text was supplied
    pub fn has_text(&self) -> bool {
        matches!(self, InputShape::TextOnly | InputShape::Combined)
    }

    /// Transaction was supplied
    pub fn has_transaction(&self) -> bool {
        matches!(self, InputShape::TransactionOnly | InputShape::Combined)
    }
}
