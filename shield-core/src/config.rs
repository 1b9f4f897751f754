//! Tunable configuration
//!
//! Defaults reproduce the calibrated production values. Every field can be
//! overridden from the environment with the `SHIELD` prefix, e.g.
//! `SHIELD__COMBINER__SUPERVISED_BOOST=0.75`.

use crate::{Result, ShieldError};
use config::Environment;
use serde::{Deserialize, Serialize};

/// Root configuration
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct ShieldConfig {
    /// Score combination weights and factors
    pub combiner: CombinerConfig,
    /// Explanation limits
    pub trace: TraceConfig,
}

/// Score combiner weights
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CombinerConfig {
    /// Text scam classifier
    pub text_scam_weight: f64,
    /// Transaction risk classifier
    pub transaction_risk_weight: f64,
    /// Text anomaly detector
    pub text_anomaly_weight: f64,
    /// Transaction anomaly detector
    pub transaction_anomaly_weight: f64,
    /// Weight for predictors not listed above
    pub default_weight: f64,
    /// Multiplier on an anomaly weight when its supervised counterpart ran and did not flag
    pub anomaly_discount: f64,
    /// Floor applied to the highest supervised score when any supervised model flags
    pub supervised_boost: f64,
}

impl Default for CombinerConfig {
    fn default() -> Self {
        Self {
            text_scam_weight: 0.6,
            transaction_risk_weight: 0.7,
            text_anomaly_weight: 0.3,
            transaction_anomaly_weight: 0.3,
            default_weight: 0.5,
            anomaly_discount: 0.3,
            supervised_boost: 0.8,
        }
    }
}

/// Explanation limits
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TraceConfig {
    /// Reasons shown to the user
    pub max_display_reasons: usize,
    /// Reasons kept in the audit trace
    pub max_trace_reasons: usize,
    /// Reasons taken from each flagged model for display
    pub max_reasons_per_model: usize,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            max_display_reasons: 5,
            max_trace_reasons: 10,
            max_reasons_per_model: 2,
        }
    }
}

impl ShieldConfig {
    /// Load defaults overlaid with `SHIELD__*` environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = ShieldConfig::default();
        let c = &defaults.combiner;
        let t = &defaults.trace;

        let builder = config::Config::builder()
            // Combiner defaults
            .set_default("combiner.text_scam_weight", c.text_scam_weight)?
            .set_default(
                "combiner.transaction_risk_weight",
                c.transaction_risk_weight,
            )?
            .set_default("combiner.text_anomaly_weight", c.text_anomaly_weight)?
            .set_default(
                "combiner.transaction_anomaly_weight",
                c.transaction_anomaly_weight,
            )?
            .set_default("combiner.default_weight", c.default_weight)?
            .set_default("combiner.anomaly_discount", c.anomaly_discount)?
            .set_default("combiner.supervised_boost", c.supervised_boost)?
            // Trace defaults
            .set_default("trace.max_display_reasons", t.max_display_reasons as u64)?
            .set_default("trace.max_trace_reasons", t.max_trace_reasons as u64)?
            .set_default(
                "trace.max_reasons_per_model",
                t.max_reasons_per_model as u64,
            )?
            .add_source(
                Environment::with_prefix("SHIELD")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );

        let config: ShieldConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject weights and limits the engine cannot work with
    pub fn validate(&self) -> Result<()> {
        let c = &self.combiner;
        let weights = [
            ("text_scam_weight", c.text_scam_weight),
            ("transaction_risk_weight", c.transaction_risk_weight),
            ("text_anomaly_weight", c.text_anomaly_weight),
            ("transaction_anomaly_weight", c.transaction_anomaly_weight),
            ("default_weight", c.default_weight),
        ];
        for (name, weight) in weights {
            if !weight.is_finite() || weight < 0.0 {
                return Err(ShieldError::Config(format!(
                    "combiner.{} must be a non-negative number, got {}",
                    name, weight
                )));
            }
        }

        for (name, factor) in [
            ("anomaly_discount", c.anomaly_discount),
            ("supervised_boost", c.supervised_boost),
        ] {
            if !(0.0..=1.0).contains(&factor) {
                return Err(ShieldError::Config(format!(
                    "combiner.{} must be between 0 and 1, got {}",
                    name, factor
                )));
            }
        }

        let t = &self.trace;
        if t.max_display_reasons == 0 || t.max_trace_reasons == 0 || t.max_reasons_per_model == 0 {
            return Err(ShieldError::Config(
                "trace reason limits must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ShieldConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.combiner.supervised_boost, 0.8);
        assert_eq!(config.combiner.anomaly_discount, 0.3);
        assert_eq!(config.trace.max_display_reasons, 5);
    }

    #[test]
    fn test_from_env_without_overrides_matches_defaults() {
        let config = ShieldConfig::from_env().unwrap();
        assert_eq!(config, ShieldConfig::default());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = ShieldConfig::default();
        config.combiner.transaction_risk_weight = -0.1;
        assert!(matches!(config.validate(), Err(ShieldError::Config(_))));

        let mut config = ShieldConfig::default();
        config.combiner.supervised_boost = 1.5;
        assert!(config.validate().is_err());

        let mut config = ShieldConfig::default();
        config.trace.max_display_reasons = 0;
        assert!(config.validate().is_err());
    }
}
