//! Payment identifier risk scoring
//!
//! Deterministic heuristics over `handle@provider` identifiers and an optional
//! display name. No predictor is involved. Results are advisory: a HIGH score
//! is a warning to the user, never an automatic block.

pub mod parser;
pub mod rules;

pub use parser::{HandleFeatures, ParsedIdentifier, ProviderKind};

use crate::types::{RiskLevel, RiskScore};
use rules::{RuleInput, RULES};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Raw score floor
pub const MIN_RAW_SCORE: i32 = -30;
/// Raw score ceiling
pub const MAX_RAW_SCORE: i32 = 150;

const NO_INDICATORS: &str = "No specific risk indicators detected";
const INVALID_FORMAT: &str = "Invalid payment identifier format";

/// Identifier risk tier; shares thresholds with [`RiskLevel`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierRiskLevel {
    /// Score below 40
    Low,
    /// Score 40-69
    Medium,
    /// Score 70 and above
    High,
    /// Malformed identifier
    Invalid,
}

impl From<RiskLevel> for IdentifierRiskLevel {
    fn from(level: RiskLevel) -> Self {
        match level {
            RiskLevel::Low => IdentifierRiskLevel::Low,
            RiskLevel::Medium => IdentifierRiskLevel::Medium,
            RiskLevel::High => IdentifierRiskLevel::High,
        }
    }
}

/// Points contributed by one rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleContribution {
    /// Rule id, e.g. `U007`
    pub rule_id: String,
    /// Rule display name
    pub name: String,
    /// Points added; negative for trust rules
    pub points: i32,
}

/// Parsed handle and provider metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandleInfo {
    /// Part before `@`, case preserved
    pub handle: String,
    /// Lowercased provider
    pub provider: String,
    /// Provider category
    pub provider_kind: ProviderKind,
    /// Provider is on a known list
    pub provider_known: bool,
    /// Shape features of the handle
    pub features: HandleFeatures,
}

/// Outcome of scoring one identifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentifierRiskResult {
    /// Identifier as supplied (trimmed)
    pub identifier: String,
    /// Lowercased `handle@provider`; absent when invalid
    pub normalized: Option<String>,
    /// Normalized score (0-100)
    pub risk_score: u8,
    /// Sum of rule points, clamped to [-30, 150]
    pub raw_score: i32,
    /// Tier of `risk_score`, or invalid
    pub risk_level: IdentifierRiskLevel,
    /// Reasons in rule order; never empty
    pub reasons: Vec<String>,
    /// One entry per rule that fired
    pub contributions: Vec<RuleContribution>,
    /// Parsed details; absent when invalid
    pub handle_info: Option<HandleInfo>,
}

impl IdentifierRiskResult {
    fn invalid(identifier: &str) -> Self {
        Self {
            identifier: identifier.to_string(),
            normalized: None,
            risk_score: 0,
            raw_score: 0,
            risk_level: IdentifierRiskLevel::Invalid,
            reasons: vec![INVALID_FORMAT.to_string()],
            contributions: Vec::new(),
            handle_info: None,
        }
    }

    /// Identifier was well-formed
    pub fn is_valid(&self) -> bool {
        self.risk_level != IdentifierRiskLevel::Invalid
    }
}

/// Map a clamped raw score onto 0-100
pub fn normalize(raw: i32) -> u8 {
    let clamped = raw.clamp(MIN_RAW_SCORE, MAX_RAW_SCORE);
    let span = f64::from(MAX_RAW_SCORE - MIN_RAW_SCORE);
    let scaled = (f64::from(clamped - MIN_RAW_SCORE) / span * 100.0).round();
    scaled.clamp(0.0, 100.0) as u8
}

/// Score a payment identifier with an optional display name
pub fn score_identifier(identifier: &str, display_name: Option<&str>) -> IdentifierRiskResult {
    let identifier = identifier.trim();

    let parsed = match parser::parse(identifier) {
        Some(parsed) => parsed,
        None => {
            debug!("Rejected malformed identifier");
            return IdentifierRiskResult::invalid(identifier);
        }
    };
    let features = HandleFeatures::extract(&parsed.handle);
    let input = RuleInput::new(&parsed, &features, display_name);

    let mut reasons = Vec::new();
    let mut contributions = Vec::new();
    for rule in RULES {
        if let Some(hit) = (rule.check)(&input) {
            reasons.push(hit.reason);
            contributions.push(RuleContribution {
                rule_id: rule.id.to_string(),
                name: rule.name.to_string(),
                points: hit.points,
            });
        }
    }

    let raw_score = contributions
        .iter()
        .map(|c| c.points)
        .sum::<i32>()
        .clamp(MIN_RAW_SCORE, MAX_RAW_SCORE);
    let risk_score = normalize(raw_score);
    let risk_level = RiskLevel::from(RiskScore::new(risk_score)).into();

    if reasons.is_empty() {
        reasons.push(NO_INDICATORS.to_string());
    }

    debug!(
        "Scored identifier {}: raw={} score={} rules={}",
        parsed.normalized(),
        raw_score,
        risk_score,
        contributions.len()
    );

    IdentifierRiskResult {
        identifier: identifier.to_string(),
        normalized: Some(parsed.normalized()),
        risk_score,
        raw_score,
        risk_level,
        reasons,
        contributions,
        handle_info: Some(HandleInfo {
            handle: parsed.handle.clone(),
            provider: parsed.provider.clone(),
            provider_kind: parsed.provider_kind,
            provider_known: parsed.provider_known(),
            features,
        }),
    }
}

/// (id, name) of every identifier rule, in evaluation order
pub fn rule_catalog() -> Vec<(&'static str, &'static str)> {
    RULES.iter().map(|r| (r.id, r.name)).collect()
}

/// Identifier scores HIGH
pub fn is_high_risk_identifier(identifier: &str, display_name: Option<&str>) -> bool {
    score_identifier(identifier, display_name).risk_level == IdentifierRiskLevel::High
}

/// Identifier is well-formed
pub fn is_valid_identifier(identifier: &str) -> bool {
    parser::parse(identifier).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_bounds() {
        assert_eq!(normalize(-30), 0);
        assert_eq!(normalize(-100), 0);
        assert_eq!(normalize(150), 100);
        assert_eq!(normalize(400), 100);
        assert_eq!(normalize(0), 17);
        assert_eq!(normalize(-15), 8);
    }

    #[test]
    fn test_invalid_identifier() {
        let result = score_identifier("not-an-identifier", None);
        assert_eq!(result.risk_level, IdentifierRiskLevel::Invalid);
        assert_eq!(result.risk_score, 0);
        assert!(result.handle_info.is_none());
        assert!(!result.is_valid());

        let empty = score_identifier("   ", Some("Bank"));
        assert_eq!(empty.risk_level, IdentifierRiskLevel::Invalid);
    }

    #[test]
    fn test_no_rule_fired_has_default_reason() {
        // 2 digits of 8 (25%), mixed, known provider: nothing fires
        let result = score_identifier("ravi.k99@okaxis", None);
        assert!(result.contributions.is_empty());
        assert_eq!(result.reasons, vec![NO_INDICATORS]);
        assert_eq!(result.risk_score, 17);
        assert_eq!(result.risk_level, IdentifierRiskLevel::Low);
    }

    #[test]
    fn test_unknown_provider_and_random_handle() {
        let result = score_identifier("x7k2m9q4@fastpay", None);
        let ids: Vec<&str> = result
            .contributions
            .iter()
            .map(|c| c.rule_id.as_str())
            .collect();
        assert_eq!(ids, vec!["U001", "U002", "U006"]);
        assert_eq!(result.raw_score, 5 + 20 + 20);
        let info = result.handle_info.unwrap();
        assert_eq!(info.provider_kind, ProviderKind::Unknown);
        assert!(!info.provider_known);
    }

    #[test]
    fn test_raw_score_clamped() {
        let result = score_identifier(
            "refund.cashback.lottery.kyc.1111@fastpay",
            Some("SBI Bank Refund Support"),
        );
        assert_eq!(result.raw_score, MAX_RAW_SCORE);
        assert_eq!(result.risk_score, 100);
        assert!(is_high_risk_identifier(
            "refund.cashback.lottery.kyc.1111@fastpay",
            Some("SBI Bank Refund Support")
        ));
    }

    #[test]
    fn test_catalog_and_validity_helpers() {
        let catalog = rule_catalog();
        assert_eq!(catalog.len(), 13);
        assert_eq!(catalog[0], ("U001", "Excessive Digits"));
        assert!(is_valid_identifier("shop@razorpay"));
        assert!(!is_valid_identifier("shop@razor_pay"));
    }

    #[test]
    fn test_result_serializes_levels_lowercase() {
        let json = serde_json::to_value(score_identifier("ramesh@okicici", None)).unwrap();
        assert_eq!(json["risk_level"], "low");
        assert_eq!(json["handle_info"]["provider_kind"], "personal_bank");

        let json = serde_json::to_value(score_identifier("bad", None)).unwrap();
        assert_eq!(json["risk_level"], "invalid");
    }
}
