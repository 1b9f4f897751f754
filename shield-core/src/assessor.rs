//! Risk assessor
//!
//! Orchestrates one assessment: invoke the predictors, combine their scores,
//! apply policy, and build the decision and its trace. Holds no per-request
//! state, so one assessor can serve any number of concurrent requests.

use crate::adapter::{self, AnomalyEvidence};
use crate::combiner::ScoreCombiner;
use crate::config::ShieldConfig;
use crate::features::{TransactionFeatures, TransactionInput};
use crate::identifier::{self, IdentifierRiskResult};
use crate::policy::{PolicyEngine, PolicyOutcome};
use crate::predictor::Predictors;
use crate::trace::{self, DecisionTrace, TraceBuilder};
use crate::types::{
    DisplayHint, InputShape, ModelKind, ModelScore, RecommendedAction, RiskLevel, RiskScore,
    TrustContext,
};
use crate::{Result, ShieldError};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// One assessment request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssessmentRequest {
    /// Message to analyze (SMS, email, chat)
    #[serde(default)]
    pub text: Option<String>,
    /// Transaction to analyze
    #[serde(default)]
    pub transaction: Option<TransactionInput>,
    /// Caller trust signals
    #[serde(default)]
    pub trust: Option<TrustContext>,
    /// Attach the full decision trace
    #[serde(default)]
    pub include_trace: bool,
}

impl AssessmentRequest {
    /// Text-only request
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    /// Transaction-only request
    pub fn transaction(transaction: TransactionInput) -> Self {
        Self {
            transaction: Some(transaction),
            ..Default::default()
        }
    }

    /// Add a transaction
    pub fn with_transaction(mut self, transaction: TransactionInput) -> Self {
        self.transaction = Some(transaction);
        self
    }

    /// Add trust signals
    pub fn with_trust(mut self, trust: TrustContext) -> Self {
        self.trust = Some(trust);
        self
    }

    /// Request the decision trace
    pub fn with_trace(mut self) -> Self {
        self.include_trace = true;
        self
    }
}

/// Final decision for one request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskDecision {
    /// Final score (0-100)
    pub risk_score: RiskScore,
    /// Tier derived from the score
    pub risk_level: RiskLevel,
    /// `risk_level` is not LOW
    pub is_risky: bool,
    /// Advisory action
    pub action: RecommendedAction,
    /// Why the action is recommended
    pub action_reason: String,
    /// One-line summary
    pub summary: String,
    /// Reasons for the UI
    pub reasons: Vec<String>,
    /// UI message and severity
    pub display: DisplayHint,
    /// Audit trace, when requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<DecisionTrace>,
}

/// Simplified result of a text-only check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuickAssessment {
    /// Final score (0-100)
    pub risk_score: RiskScore,
    /// Tier derived from the score
    pub risk_level: RiskLevel,
    /// `risk_level` is not LOW
    pub is_risky: bool,
    /// Advisory action
    pub action: RecommendedAction,
    /// One-line summary
    pub summary: String,
    /// Reasons for the UI
    pub reasons: Vec<String>,
}

impl From<RiskDecision> for QuickAssessment {
    fn from(decision: RiskDecision) -> Self {
        Self {
            risk_score: decision.risk_score,
            risk_level: decision.risk_level,
            is_risky: decision.is_risky,
            action: decision.action,
            summary: decision.summary,
            reasons: decision.reasons,
        }
    }
}

/// Scores after invoking every predictor for a request
struct Evidence {
    scores: Vec<ModelScore>,
    skipped: Vec<adapter::SkippedModel>,
}

/// Risk assessor
#[derive(Debug, Clone)]
pub struct RiskAssessor {
    predictors: Predictors,
    combiner: ScoreCombiner,
    policy: PolicyEngine,
    config: ShieldConfig,
}

impl RiskAssessor {
    /// Create new risk assessor
    pub fn new(predictors: Predictors, config: ShieldConfig) -> Self {
        Self {
            predictors,
            combiner: ScoreCombiner::new(config.combiner.clone()),
            policy: PolicyEngine::new(),
            config,
        }
    }

    /// Assess a request
    pub async fn assess(&self, request: &AssessmentRequest) -> Result<RiskDecision> {
        let text = request.text.as_deref().filter(|t| !t.trim().is_empty());
        let features = request
            .transaction
            .clone()
            .map(TransactionInput::into_features)
            .transpose()?;

        let shape = InputShape::of(text.is_some(), features.is_some()).ok_or_else(|| {
            ShieldError::InvalidInput(
                "at least one of text or transaction must be provided".to_string(),
            )
        })?;
        let trust = request.trust.unwrap_or_default();

        // Timing covers the predictor calls
        let builder = TraceBuilder::new(shape, self.config.trace.clone())
            .trust_context(request.trust.is_some());

        let evidence = self.collect(text, features.as_ref()).await;

        let combined = self.combiner.combine(&evidence.scores);
        let mut outcome = self.policy.evaluate(&evidence.scores, shape, &trust);
        self.contain_anomaly(
            shape,
            &trust,
            &evidence.scores,
            combined.combined,
            &mut outcome,
        );

        let risk_score = RiskScore::from_f64(combined.combined + f64::from(outcome.adjustment));
        let risk_level = RiskLevel::from(risk_score);
        let action = RecommendedAction::for_score(risk_level, risk_score);

        let mut builder = builder
            .combined(combined.combined)
            .policy(outcome.adjustment, outcome.fired)
            .final_score(risk_score);
        for score in evidence.scores {
            builder = builder.model_score(score);
        }
        for skipped in evidence.skipped {
            builder = builder.skipped(skipped);
        }
        let decision_trace = builder.build();

        info!(
            "Assessment {} complete: score={} level={} action={:?}",
            decision_trace.trace_id, risk_score, risk_level, action
        );

        Ok(RiskDecision {
            risk_score,
            risk_level,
            is_risky: risk_level != RiskLevel::Low,
            action,
            action_reason: action.reason().to_string(),
            summary: trace::generate_summary(risk_level, risk_score),
            reasons: trace::display_reasons(
                &decision_trace.model_scores,
                &decision_trace.fired_rules,
                &self.config.trace,
            ),
            display: risk_level.display_hint(),
            trace: request.include_trace.then_some(decision_trace),
        })
    }

    /// Text-only assessment without trace
    pub async fn quick_assess(&self, text: &str) -> Result<QuickAssessment> {
        let decision = self.assess(&AssessmentRequest::text(text)).await?;
        Ok(decision.into())
    }

    /// `true` when the request is MEDIUM or HIGH risk
    pub async fn is_risky(
        &self,
        text: Option<&str>,
        transaction: Option<TransactionInput>,
    ) -> Result<bool> {
        let request = AssessmentRequest {
            text: text.map(str::to_string),
            transaction,
            ..Default::default()
        };
        Ok(self.assess(&request).await?.is_risky)
    }

    /// Score a payment identifier; advisory only
    pub fn score_identifier(
        &self,
        identifier: &str,
        display_name: Option<&str>,
    ) -> IdentifierRiskResult {
        identifier::score_identifier(identifier, display_name)
    }

    /// Invoke every applicable predictor concurrently, keeping the fixed order
    async fn collect(
        &self,
        text: Option<&str>,
        features: Option<&TransactionFeatures>,
    ) -> Evidence {
        let p = &self.predictors;

        let (text_score, transaction_score, text_anomaly, transaction_anomaly) = tokio::join!(
            async move {
                match text {
                    Some(t) => Some(adapter::text_scam(p.text_scam.as_ref(), t).await),
                    None => None,
                }
            },
            async move {
                match features {
                    Some(f) => {
                        Some(adapter::transaction_risk(p.transaction_risk.as_ref(), f).await)
                    }
                    None => None,
                }
            },
            async move {
                match text {
                    Some(t) => Some(adapter::text_anomaly(p.text_anomaly.as_ref(), t).await),
                    None => None,
                }
            },
            async move {
                match features {
                    Some(f) => {
                        Some(adapter::transaction_anomaly(p.transaction_anomaly.as_ref(), f).await)
                    }
                    None => None,
                }
            },
        );

        let mut evidence = Evidence {
            scores: text_score.into_iter().chain(transaction_score).collect(),
            skipped: Vec::new(),
        };
        for anomaly in [text_anomaly, transaction_anomaly].into_iter().flatten() {
            match anomaly {
                AnomalyEvidence::Observed(score) => evidence.scores.push(score),
                AnomalyEvidence::Absent(skipped) => evidence.skipped.push(skipped),
            }
        }
        evidence
    }

    /// Keep an uncorroborated text anomaly from deciding a HIGH verdict on a
    /// text-only request whose classifier did not flag.
    fn contain_anomaly(
        &self,
        shape: InputShape,
        trust: &TrustContext,
        scores: &[ModelScore],
        combined: f64,
        outcome: &mut PolicyOutcome,
    ) {
        let text_unflagged = scores
            .iter()
            .any(|s| s.model == ModelKind::TextScam && !s.is_flagged);
        let has_text_anomaly = scores.iter().any(|s| s.model == ModelKind::TextAnomaly);
        if shape != InputShape::TextOnly || !text_unflagged || !has_text_anomaly {
            return;
        }

        let without: Vec<ModelScore> = scores
            .iter()
            .filter(|s| s.model != ModelKind::TextAnomaly)
            .cloned()
            .collect();
        let baseline = self.combiner.combine(&without).combined
            + f64::from(self.policy.evaluate(&without, shape, trust).adjustment);
        let with_anomaly = combined + f64::from(outcome.adjustment);

        if let Some(rule) = self.policy.contain_text_anomaly(with_anomaly, baseline) {
            debug!("Applying {} ({})", rule.id, rule.name);
            outcome.adjustment += rule.score_adjustment;
            outcome.fired.push(rule);
        }
    }
}
