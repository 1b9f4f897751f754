//! Deterministic policy rules
//!
//! Rules are evaluated top to bottom from a fixed catalog. Independent rules all
//! fire and sum. The anomaly escalation group is evaluated in order and stops at
//! the first rule that fires.
//!
//! Anomaly detectors are supporting signals: they only escalate when some other
//! evidence corroborates them, and an uncorroborated text anomaly is capped below
//! the corroborated tier.

use crate::types::{InputShape, ModelKind, ModelScore, PolicyRule, RuleImpact, TrustContext};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Keywords from the text classifier that mark a known scam script
pub const SCAM_VOCABULARY: &[&str] = &[
    "collect", "blocked", "kyc", "expired", "lottery", "winner",
];

/// Anomaly score treated as high
pub const HIGH_ANOMALY: u8 = 70;
/// Transaction anomaly score that corroborates a high text anomaly
pub const CORROBORATING_TXN_ANOMALY: u8 = 60;
/// Lower bound of the moderate anomaly band
pub const MODERATE_ANOMALY: u8 = 50;
/// Classifier confidence treated as very high
pub const HIGH_CONFIDENCE: f64 = 0.90;
/// Amount spike multiplier treated as extreme
pub const EXTREME_SPIKE: f64 = 10.0;

/// Correction applied when an uncorroborated text anomaly would decide a HIGH verdict
pub const CONTAINMENT_RULE: (&str, &str) = ("R011", "Anomaly Containment");

/// Everything a rule may look at
#[derive(Debug, Clone, Copy)]
pub struct PolicyContext<'a> {
    /// All scores for the request, in invocation order
    pub scores: &'a [ModelScore],
    /// Supervised text classifier
    pub text: Option<&'a ModelScore>,
    /// Supervised transaction classifier
    pub transaction: Option<&'a ModelScore>,
    /// Text anomaly detector
    pub text_anomaly: Option<&'a ModelScore>,
    /// Transaction anomaly detector
    pub transaction_anomaly: Option<&'a ModelScore>,
    /// Inputs supplied with the request
    pub shape: InputShape,
    /// Caller trust signals
    pub trust: &'a TrustContext,
}

impl<'a> PolicyContext<'a> {
    /// Resolve named references into the score set
    pub fn new(scores: &'a [ModelScore], shape: InputShape, trust: &'a TrustContext) -> Self {
        let find = |kind: ModelKind| scores.iter().find(|s| s.model == kind);
        Self {
            scores,
            text: find(ModelKind::TextScam),
            transaction: find(ModelKind::TransactionRisk),
            text_anomaly: find(ModelKind::TextAnomaly),
            transaction_anomaly: find(ModelKind::TransactionAnomaly),
            shape,
            trust,
        }
    }

    fn text_anomaly_at_least(&self, threshold: u8) -> bool {
        self.text_anomaly
            .map_or(false, |s| s.normalized_score >= threshold)
    }

    fn transaction_anomaly_at_least(&self, threshold: u8) -> bool {
        self.transaction_anomaly
            .map_or(false, |s| s.normalized_score >= threshold)
    }

    fn high_anomaly(&self) -> bool {
        self.text_anomaly_at_least(HIGH_ANOMALY) || self.transaction_anomaly_at_least(HIGH_ANOMALY)
    }

    /// Secondary evidence required before an anomaly may escalate fully
    pub fn corroborated(&self) -> bool {
        let text_flagged = self.text.map_or(false, |s| s.is_flagged);
        let transaction_flagged = self.transaction.map_or(false, |s| s.is_flagged);
        let both_anomalies = self.text_anomaly_at_least(HIGH_ANOMALY)
            && self.transaction_anomaly_at_least(CORROBORATING_TXN_ANOMALY);
        let strong_transaction_anomaly =
            self.transaction_anomaly_at_least(HIGH_ANOMALY) && self.shape.has_transaction();

        text_flagged || transaction_flagged || both_anomalies || strong_transaction_anomaly
    }
}

/// What a matching rule contributes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Firing {
    /// Signed points
    pub adjustment: i32,
    /// Rationale shown in explanations
    pub description: String,
}

impl Firing {
    fn new(adjustment: i32, description: impl Into<String>) -> Option<Self> {
        Some(Self {
            adjustment,
            description: description.into(),
        })
    }
}

/// Catalog entry
#[derive(Clone, Copy)]
pub struct RuleDef {
    /// Rule identifier
    pub id: &'static str,
    /// Human-readable name
    pub name: &'static str,
    check: fn(&PolicyContext<'_>) -> Option<Firing>,
}

impl std::fmt::Debug for RuleDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleDef")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish()
    }
}

impl RuleDef {
    fn fire(&self, ctx: &PolicyContext<'_>) -> Option<PolicyRule> {
        (self.check)(ctx).map(|firing| PolicyRule {
            id: self.id.to_string(),
            name: self.name.to_string(),
            impact: RuleImpact::of(firing.adjustment),
            score_adjustment: firing.adjustment,
            description: firing.description,
        })
    }
}

// =========================================================================
// INDEPENDENT RULES
// =========================================================================

const INDEPENDENT_RULES: &[RuleDef] = &[
    RuleDef {
        id: "R001",
        name: "Double Confirmation",
        check: double_confirmation,
    },
    RuleDef {
        id: "R002",
        name: "High Confidence Detection",
        check: high_confidence,
    },
    RuleDef {
        id: "R003",
        name: "Known Scam Pattern",
        check: known_scam_pattern,
    },
    RuleDef {
        id: "R004",
        name: "Suspicious Context",
        check: suspicious_context,
    },
    RuleDef {
        id: "R005",
        name: "Extreme Amount Spike",
        check: extreme_amount_spike,
    },
    RuleDef {
        id: "R006",
        name: "Verified User",
        check: verified_user,
    },
    RuleDef {
        id: "R007",
        name: "Regular Recipient",
        check: regular_recipient,
    },
    RuleDef {
        id: "R008",
        name: "Consistently Low Risk",
        check: consistently_low,
    },
];

fn double_confirmation(ctx: &PolicyContext<'_>) -> Option<Firing> {
    let (text, transaction) = (ctx.text?, ctx.transaction?);
    if text.is_flagged && transaction.is_flagged {
        let description = "Both text and transaction analysis indicate high risk";
        return Firing::new(15, description);
    }
    None
}

fn high_confidence(ctx: &PolicyContext<'_>) -> Option<Firing> {
    // First matching classifier only
    let hit = ctx
        .scores
        .iter()
        .filter(|s| s.model.is_supervised())
        .find(|s| s.is_flagged && s.confidence >= HIGH_CONFIDENCE)?;

    Firing::new(
        10,
        format!(
            "{} detected with {:.0}% confidence",
            hit.model,
            hit.confidence * 100.0
        ),
    )
}

fn known_scam_pattern(ctx: &PolicyContext<'_>) -> Option<Firing> {
    let text = ctx.text?;
    let mut found: Vec<String> = Vec::new();
    for keyword in &text.keywords {
        let lower = keyword.to_lowercase();
        if SCAM_VOCABULARY.contains(&lower.as_str()) && !found.contains(&lower) {
            found.push(lower);
        }
    }

    if found.is_empty() {
        return None;
    }
    Firing::new(
        10,
        format!("Detected known scam keywords: {}", found.join(", ")),
    )
}

fn suspicious_context(ctx: &PolicyContext<'_>) -> Option<Firing> {
    let reasons = ctx.transaction?.reasons.join(" ").to_lowercase();
    if reasons.contains("new device") && reasons.contains("new receiver") {
        return Firing::new(15, "Transaction from new device to unknown receiver");
    }
    None
}

fn extreme_amount_spike(ctx: &PolicyContext<'_>) -> Option<Firing> {
    let transaction = ctx.transaction?;
    let spiked = transaction
        .reasons
        .iter()
        .filter(|r| r.to_lowercase().contains("higher than your average"))
        .filter_map(|r| spike_multiplier(r))
        .any(|m| m >= EXTREME_SPIKE);

    if spiked {
        return Firing::new(10, "Transaction amount far exceeds normal spending");
    }
    None
}

/// Multiplier from a token such as "25.0x" or "(12x"
fn spike_multiplier(reason: &str) -> Option<f64> {
    reason.split_whitespace().find_map(|token| {
        let token = token.trim_matches(|c: char| c == '(' || c == ')' || c == ',');
        let number = token.strip_suffix('x').or_else(|| token.strip_suffix('X'))?;
        number.parse::<f64>().ok().filter(|m| m.is_finite())
    })
}

fn verified_user(ctx: &PolicyContext<'_>) -> Option<Firing> {
    if ctx.trust.is_verified_user {
        return Firing::new(-10, "User account is verified and has good history");
    }
    None
}

fn regular_recipient(ctx: &PolicyContext<'_>) -> Option<Firing> {
    if ctx.trust.is_regular_recipient {
        return Firing::new(-15, "Transaction to a frequently used recipient");
    }
    None
}

fn consistently_low(ctx: &PolicyContext<'_>) -> Option<Firing> {
    if !ctx.scores.is_empty() && ctx.scores.iter().all(|s| s.normalized_score < 30) {
        return Firing::new(-5, "All risk indicators show low risk");
    }
    None
}

// =========================================================================
// ANOMALY ESCALATION (first match wins)
// =========================================================================

const ANOMALY_ESCALATION: &[RuleDef] = &[
    RuleDef {
        id: "R009",
        name: "Anomaly Escalation (Corroborated)",
        check: corroborated_escalation,
    },
    RuleDef {
        id: "R009",
        name: "Anomaly Signal (Text-Only, Capped)",
        check: capped_text_anomaly,
    },
    RuleDef {
        id: "R010",
        name: "Novel Pattern Warning",
        check: novel_pattern,
    },
];

fn corroborated_escalation(ctx: &PolicyContext<'_>) -> Option<Firing> {
    if ctx.high_anomaly() && ctx.corroborated() {
        return Firing::new(20, "Unusual pattern confirmed by multiple risk signals");
    }
    None
}

fn capped_text_anomaly(ctx: &PolicyContext<'_>) -> Option<Firing> {
    // Uncorroborated text anomaly must stay below the +20 tier
    if ctx.shape == InputShape::TextOnly
        && ctx.text_anomaly_at_least(HIGH_ANOMALY)
        && !ctx.corroborated()
    {
        return Firing::new(
            10,
            "Unusual text pattern detected - anomaly alone, escalation capped",
        );
    }
    None
}

fn novel_pattern(ctx: &PolicyContext<'_>) -> Option<Firing> {
    let moderate = |s: Option<&ModelScore>| {
        let band = MODERATE_ANOMALY..HIGH_ANOMALY;
        s.map_or(false, |s| band.contains(&s.normalized_score))
    };
    if moderate(ctx.text_anomaly) || moderate(ctx.transaction_anomaly) {
        let adjustment = if ctx.shape == InputShape::TextOnly {
            5
        } else {
            10
        };
        return Firing::new(
            adjustment,
            "Activity differs from typical patterns - supporting signal only",
        );
    }
    None
}

// =========================================================================
// ENGINE
// =========================================================================

/// Rules fired for one request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyOutcome {
    /// Sum of all fired adjustments (signed, unclamped)
    pub adjustment: i32,
    /// Fired rules in catalog order
    pub fired: Vec<PolicyRule>,
}

impl PolicyOutcome {
    /// Whether a rule with this id fired
    pub fn has_fired(&self, id: &str) -> bool {
        self.fired.iter().any(|r| r.id == id)
    }
}

/// Stateless policy engine
#[derive(Debug, Clone, Copy, Default)]
pub struct PolicyEngine;

impl PolicyEngine {
    /// Create policy engine
    pub fn new() -> Self {
        Self
    }

    /// (id, name) of every rule, in evaluation order
    pub fn catalog() -> Vec<(&'static str, &'static str)> {
        INDEPENDENT_RULES
            .iter()
            .chain(ANOMALY_ESCALATION.iter())
            .map(|r| (r.id, r.name))
            .chain(std::iter::once(CONTAINMENT_RULE))
            .collect()
    }

    /// Cap that keeps an uncorroborated text anomaly from lifting the final
    /// score into HIGH.
    ///
    /// `with_anomaly` and `without_anomaly` are combined score plus policy
    /// adjustment computed with and without the text anomaly score. Returns the
    /// (negative) correction that lands the final score on 69, or `None` when
    /// no correction is needed.
    pub fn contain_text_anomaly(
        &self,
        with_anomaly: f64,
        without_anomaly: f64,
    ) -> Option<PolicyRule> {
        let high = f64::from(HIGH_ANOMALY);
        if with_anomaly < high || without_anomaly >= high {
            return None;
        }

        let adjustment = (high - 1.0 - with_anomaly.floor()) as i32;
        debug!(
            "Text anomaly contained: {:.2} -> {:.2}",
            with_anomaly,
            with_anomaly + f64::from(adjustment)
        );
        Some(PolicyRule {
            id: CONTAINMENT_RULE.0.to_string(),
            name: CONTAINMENT_RULE.1.to_string(),
            impact: RuleImpact::Decrease,
            score_adjustment: adjustment,
            description: "Unusual text pattern alone cannot raise risk to high".to_string(),
        })
    }

    /// Evaluate every rule against one request's scores
    pub fn evaluate(
        &self,
        scores: &[ModelScore],
        shape: InputShape,
        trust: &TrustContext,
    ) -> PolicyOutcome {
        let ctx = PolicyContext::new(scores, shape, trust);

        let mut fired: Vec<PolicyRule> = INDEPENDENT_RULES
            .iter()
            .filter_map(|rule| rule.fire(&ctx))
            .collect();

        if let Some(escalation) = ANOMALY_ESCALATION.iter().find_map(|r| r.fire(&ctx)) {
            fired.push(escalation);
        }

        for rule in &fired {
            debug!(
                "Policy rule {} ({}) fired: {:+}",
                rule.id, rule.name, rule.score_adjustment
            );
        }

        PolicyOutcome {
            adjustment: fired.iter().map(|r| r.score_adjustment).sum(),
            fired,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{RiskLevel, RiskScore};

    fn score(model: ModelKind, normalized: u8, flagged: bool) -> ModelScore {
        ModelScore {
            model,
            raw_score: f64::from(normalized),
            normalized_score: normalized,
            is_flagged: flagged,
            confidence: f64::from(normalized) / 100.0,
            keywords: vec![],
            reasons: vec![],
        }
    }

    fn ids(outcome: &PolicyOutcome) -> Vec<&str> {
        outcome.fired.iter().map(|r| r.id.as_str()).collect()
    }

    fn adjustment_of(outcome: &PolicyOutcome, id: &str) -> Option<i32> {
        let rule = outcome.fired.iter().find(|r| r.id == id)?;
        Some(rule.score_adjustment)
    }

    #[test]
    fn test_double_confirmation_and_high_confidence_once() {
        let scores = [
            score(ModelKind::TextScam, 95, true),
            score(ModelKind::TransactionRisk, 92, true),
        ];
        let trust = TrustContext::default();
        let outcome = PolicyEngine::new().evaluate(&scores, InputShape::Combined, &trust);
        assert_eq!(ids(&outcome), vec!["R001", "R002"]);
        assert_eq!(outcome.adjustment, 25);

        let description = &outcome.fired[1].description;
        assert!(description.starts_with("text_scam detected with 95%"));
    }

    #[test]
    fn test_scam_keywords_case_insensitive() {
        let mut text = score(ModelKind::TextScam, 40, false);
        text.keywords = vec![
            "KYC".to_string(),
            "update".to_string(),
            "Expired".to_string(),
        ];
        let trust = TrustContext::default();
        let outcome = PolicyEngine::new().evaluate(&[text], InputShape::TextOnly, &trust);
        assert_eq!(ids(&outcome), vec!["R003"]);
        assert_eq!(
            outcome.fired[0].description,
            "Detected known scam keywords: kyc, expired"
        );
    }

    #[test]
    fn test_transaction_context_rules() {
        let mut txn = score(ModelKind::TransactionRisk, 80, true);
        txn.reasons = vec![
            "Amount is 37.5x higher than your average".to_string(),
            "Login from New Device".to_string(),
            "Payment to new receiver".to_string(),
        ];
        let trust = TrustContext::default();
        let outcome = PolicyEngine::new().evaluate(&[txn], InputShape::TransactionOnly, &trust);
        assert_eq!(ids(&outcome), vec!["R004", "R005"]);
        assert_eq!(outcome.adjustment, 25);
    }

    #[test]
    fn test_small_spike_does_not_fire() {
        let mut txn = score(ModelKind::TransactionRisk, 45, true);
        txn.reasons = vec!["Unusual amount (6.2x your average)".to_string()];
        let trust = TrustContext::default();
        let outcome = PolicyEngine::new().evaluate(&[txn], InputShape::TransactionOnly, &trust);
        assert!(!outcome.has_fired("R005"));
    }

    #[test]
    fn test_spike_multiplier_parsing() {
        let spike = spike_multiplier("Amount is 25.0x higher than your average");
        assert_eq!(spike, Some(25.0));
        let spike = spike_multiplier("Unusual amount (12x your average)");
        assert_eq!(spike, Some(12.0));
        let spike = spike_multiplier("First transaction to this receiver");
        assert_eq!(spike, None);
    }

    #[test]
    fn test_trust_signals_and_low_risk() {
        let scores = [score(ModelKind::TransactionRisk, 10, false)];
        let trust = TrustContext {
            is_verified_user: true,
            is_regular_recipient: true,
        };
        let outcome = PolicyEngine::new().evaluate(&scores, InputShape::TransactionOnly, &trust);
        assert_eq!(ids(&outcome), vec!["R006", "R007", "R008"]);
        assert_eq!(outcome.adjustment, -30);

        let mut fired = outcome.fired.iter();
        assert!(fired.all(|r| r.impact == RuleImpact::Decrease));
    }

    #[test]
    fn test_no_scores_fires_nothing() {
        let trust = TrustContext::default();
        let outcome = PolicyEngine::new().evaluate(&[], InputShape::TextOnly, &trust);
        assert!(outcome.fired.is_empty());
        assert_eq!(outcome.adjustment, 0);
    }

    #[test]
    fn test_corroborated_anomaly_escalation() {
        let scores = [
            score(ModelKind::TextScam, 75, true),
            score(ModelKind::TextAnomaly, 82, true),
        ];
        let trust = TrustContext::default();
        let outcome = PolicyEngine::new().evaluate(&scores, InputShape::TextOnly, &trust);
        assert_eq!(adjustment_of(&outcome, "R009"), Some(20));
        assert!(!outcome.has_fired("R010"));
    }

    #[test]
    fn test_uncorroborated_text_anomaly_capped() {
        let scores = [
            score(ModelKind::TextScam, 20, false),
            score(ModelKind::TextAnomaly, 95, true),
        ];
        let trust = TrustContext::default();
        let outcome = PolicyEngine::new().evaluate(&scores, InputShape::TextOnly, &trust);
        let escalation = outcome.fired.iter().find(|r| r.id == "R009").unwrap();
        assert_eq!(escalation.score_adjustment, 10);
        assert_eq!(escalation.name, "Anomaly Signal (Text-Only, Capped)");
    }

    #[test]
    fn test_uncorroborated_text_anomaly_in_combined_request_not_escalated() {
        let scores = [
            score(ModelKind::TextScam, 20, false),
            score(ModelKind::TransactionRisk, 15, false),
            score(ModelKind::TextAnomaly, 90, true),
            score(ModelKind::TransactionAnomaly, 40, false),
        ];
        let trust = TrustContext::default();
        let outcome = PolicyEngine::new().evaluate(&scores, InputShape::Combined, &trust);
        assert!(!outcome.has_fired("R009"));
        assert!(!outcome.has_fired("R010"));
    }

    #[test]
    fn test_both_anomalies_corroborate() {
        let scores = [
            score(ModelKind::TextScam, 20, false),
            score(ModelKind::TransactionRisk, 15, false),
            score(ModelKind::TextAnomaly, 72, true),
            score(ModelKind::TransactionAnomaly, 61, true),
        ];
        let trust = TrustContext::default();
        let ctx = PolicyContext::new(&scores, InputShape::Combined, &trust);
        assert!(ctx.corroborated());

        let outcome = PolicyEngine::new().evaluate(&scores, InputShape::Combined, &trust);
        assert_eq!(adjustment_of(&outcome, "R009"), Some(20));
    }

    #[test]
    fn test_moderate_anomaly_caution() {
        let engine = PolicyEngine::new();
        let trust = TrustContext::default();

        let text_only = [
            score(ModelKind::TextScam, 35, false),
            score(ModelKind::TextAnomaly, 55, false),
        ];
        let outcome = engine.evaluate(&text_only, InputShape::TextOnly, &trust);
        assert_eq!(ids(&outcome), vec!["R010"]);
        assert_eq!(outcome.adjustment, 5);

        let transaction_only = [
            score(ModelKind::TransactionRisk, 35, false),
            score(ModelKind::TransactionAnomaly, 69, true),
        ];
        let outcome = engine.evaluate(&transaction_only, InputShape::TransactionOnly, &trust);
        assert_eq!(ids(&outcome), vec!["R010"]);
        assert_eq!(outcome.adjustment, 10);
    }

    #[test]
    fn test_catalog_lists_every_rule_in_order() {
        let catalog = PolicyEngine::catalog();
        assert_eq!(catalog.len(), 12);
        assert_eq!(catalog[0], ("R001", "Double Confirmation"));
        assert_eq!(catalog[10].0, "R010");
        assert_eq!(catalog.last().unwrap().0, "R011");
    }

    #[test]
    fn test_containment_lands_on_medium_ceiling() {
        let engine = PolicyEngine::new();
        let rule = engine.contain_text_anomaly(78.4, 52.0).unwrap();
        assert_eq!(rule.score_adjustment, -9);
        assert_eq!(rule.impact, RuleImpact::Decrease);

        let contained = RiskScore::from_f64(78.4 - 9.0);
        assert_eq!(RiskLevel::from(contained), RiskLevel::Medium);

        assert!(engine.contain_text_anomaly(65.0, 40.0).is_none());
        // Already high without the anomaly
        assert!(engine.contain_text_anomaly(90.0, 75.0).is_none());
    }
}
