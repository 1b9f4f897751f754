//! Decision traces and explanations
//!
//! A [`DecisionTrace`] is the audit record of one assessment: what was supplied,
//! what every predictor said, which rules fired and how the final score was
//! reached. The summary line, UI reasons and explanation text are derived from it.

use crate::adapter::SkippedModel;
use crate::config::TraceConfig;
use crate::types::{
    InputShape, ModelKind, ModelScore, PolicyRule, RiskLevel, RiskScore, RuleImpact,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Instant;
use uuid::Uuid;

/// Primary reason when nothing was reported
pub const NO_CONCERNS: &str = "No specific concerns";

/// Audit record of one assessment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTrace {
    /// Unique id of this assessment
    pub trace_id: Uuid,
    /// Inputs the request supplied
    pub input_shape: InputShape,
    /// Caller supplied trust signals
    pub has_trust_context: bool,
    /// Model names in invocation order
    pub models_used: Vec<String>,
    /// Normalized score of every model that ran
    pub model_scores: Vec<ModelScore>,
    /// Anomaly detectors that produced no evidence
    pub skipped_models: Vec<SkippedModel>,
    /// Combined score before policy adjustments
    pub raw_combined_score: f64,
    /// Signed sum of fired rule adjustments
    pub policy_adjustment: i32,
    /// Clamped final score
    pub final_score: RiskScore,
    /// Fired rules in evaluation order
    pub fired_rules: Vec<PolicyRule>,
    /// Tier of the final score
    pub risk_level: RiskLevel,
    /// First entry of `all_reasons`
    pub primary_reason: String,
    /// Model reasons then rule descriptions, deduplicated and bounded
    pub all_reasons: Vec<String>,
    /// Human-readable explanation
    pub explanation: String,
    /// Wall time from request acceptance to decision, predictor calls included
    pub processing_time_ms: f64,
    /// When the decision was made
    pub created_at: DateTime<Utc>,
}

/// Collects trace data while an assessment runs
#[derive(Debug)]
pub struct TraceBuilder {
    started: Instant,
    limits: TraceConfig,
    input_shape: InputShape,
    has_trust_context: bool,
    model_scores: Vec<ModelScore>,
    skipped_models: Vec<SkippedModel>,
    raw_combined_score: f64,
    policy_adjustment: i32,
    fired_rules: Vec<PolicyRule>,
    final_score: RiskScore,
}

impl TraceBuilder {
    /// Start timing a new assessment. Create it before invoking predictors.
    pub fn new(input_shape: InputShape, limits: TraceConfig) -> Self {
        Self {
            started: Instant::now(),
            limits,
            input_shape,
            has_trust_context: false,
            model_scores: Vec::new(),
            skipped_models: Vec::new(),
            raw_combined_score: 0.0,
            policy_adjustment: 0,
            fired_rules: Vec::new(),
            final_score: RiskScore::new(0),
        }
    }

    /// Record whether the caller supplied trust signals
    pub fn trust_context(mut self, present: bool) -> Self {
        self.has_trust_context = present;
        self
    }

    /// Append a model score (call in invocation order)
    pub fn model_score(mut self, score: ModelScore) -> Self {
        self.model_scores.push(score);
        self
    }

    /// Record a detector that produced no evidence
    pub fn skipped(mut self, skipped: SkippedModel) -> Self {
        self.skipped_models.push(skipped);
        self
    }

    /// Combined score before policy
    pub fn combined(mut self, score: f64) -> Self {
        self.raw_combined_score = score;
        self
    }

    /// Fired rules and their total adjustment
    pub fn policy(mut self, adjustment: i32, fired: Vec<PolicyRule>) -> Self {
        self.policy_adjustment = adjustment;
        self.fired_rules = fired;
        self
    }

    /// Final clamped score
    pub fn final_score(mut self, score: RiskScore) -> Self {
        self.final_score = score;
        self
    }

    /// Finish the trace
    pub fn build(self) -> DecisionTrace {
        let risk_level = RiskLevel::from(self.final_score);

        let reasons = self
            .model_scores
            .iter()
            .flat_map(|s| s.reasons.iter())
            .chain(self.fired_rules.iter().map(|r| &r.description));
        let all_reasons = dedup_reasons(reasons, self.limits.max_trace_reasons);

        let primary_reason = all_reasons
            .first()
            .cloned()
            .unwrap_or_else(|| NO_CONCERNS.to_string());

        let explanation = explanation(risk_level, &self.model_scores, &self.fired_rules);

        DecisionTrace {
            trace_id: Uuid::new_v4(),
            input_shape: self.input_shape,
            has_trust_context: self.has_trust_context,
            models_used: self
                .model_scores
                .iter()
                .map(|s| s.model.as_str().to_string())
                .collect(),
            model_scores: self.model_scores,
            skipped_models: self.skipped_models,
            raw_combined_score: self.raw_combined_score,
            policy_adjustment: self.policy_adjustment,
            final_score: self.final_score,
            fired_rules: self.fired_rules,
            risk_level,
            primary_reason,
            all_reasons,
            explanation,
            processing_time_ms: self.started.elapsed().as_secs_f64() * 1000.0,
            created_at: Utc::now(),
        }
    }
}

/// Keep first occurrence of each reason (case-insensitive), at most `limit`
pub fn dedup_reasons<'a, I>(reasons: I, limit: usize) -> Vec<String>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut seen = HashSet::new();
    reasons
        .into_iter()
        .filter(|r| seen.insert(r.to_lowercase()))
        .take(limit)
        .cloned()
        .collect()
}

/// One-line summary for the decision
pub fn generate_summary(level: RiskLevel, score: RiskScore) -> String {
    match level {
        RiskLevel::High => format!("[ALERT] High risk detected (score: {})", score),
        RiskLevel::Medium => format!(
            "[CAUTION] Medium risk - verification recommended (score: {})",
            score
        ),
        RiskLevel::Low => format!("[OK] Low risk - appears safe (score: {})", score),
    }
}

/// Reasons shown to the user: flagged model reasons first, then red-flag rules
pub fn display_reasons(
    model_scores: &[ModelScore],
    fired_rules: &[PolicyRule],
    limits: &TraceConfig,
) -> Vec<String> {
    let from_models = model_scores
        .iter()
        .filter(|s| s.is_flagged)
        .flat_map(|s| s.reasons.iter().take(limits.max_reasons_per_model));
    let from_rules = fired_rules
        .iter()
        .filter(|r| r.impact == RuleImpact::Increase)
        .map(|r| &r.description);

    dedup_reasons(from_models.chain(from_rules), limits.max_display_reasons)
}

/// Human-readable explanation of a decision
pub fn explanation(
    level: RiskLevel,
    model_scores: &[ModelScore],
    fired_rules: &[PolicyRule],
) -> String {
    let mut parts: Vec<String> = Vec::new();

    parts.push(
        match level {
            RiskLevel::High => "This has been flagged as HIGH RISK.",
            RiskLevel::Medium => "This requires additional verification.",
            RiskLevel::Low => "This appears to be safe.",
        }
        .to_string(),
    );

    for score in model_scores.iter().filter(|s| s.is_flagged) {
        match score.model {
            ModelKind::TextScam => parts.push(format!(
                "Text analysis detected scam patterns with {:.0}% confidence.",
                score.confidence * 100.0
            )),
            ModelKind::TransactionRisk => parts.push(format!(
                "Transaction analysis shows elevated risk (score: {}).",
                score.normalized_score
            )),
            _ => {}
        }
    }

    let red_flags: Vec<&str> = fired_rules
        .iter()
        .filter(|r| r.impact == RuleImpact::Increase)
        .map(|r| r.name.as_str())
        .take(3)
        .collect();
    if !red_flags.is_empty() {
        parts.push(format!("Risk indicators: {}.", red_flags.join(", ")));
    }

    parts.join(" ")
}
