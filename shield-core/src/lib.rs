//! Shield risk core
//!
//! Turns the outputs of independent fraud-signal predictors into one explainable
//! risk decision with a tier and an advisory action, and scores payment
//! identifiers with deterministic heuristics.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod adapter;
pub mod assessor;
pub mod combiner;
pub mod config;
pub mod error;
pub mod features;
pub mod identifier;
pub mod policy;
pub mod predictor;
pub mod trace;
pub mod types;

pub use assessor::{AssessmentRequest, QuickAssessment, RiskAssessor, RiskDecision};
pub use combiner::{CombinedScore, ScoreCombiner};
pub use config::ShieldConfig;
pub use error::{PredictorError, Result, ShieldError};
pub use features::{TransactionFeatures, TransactionInput};
pub use identifier::{score_identifier, IdentifierRiskLevel, IdentifierRiskResult};
pub use policy::{PolicyEngine, PolicyOutcome};
pub use predictor::{Predictors, RecordedPredictions};
pub use trace::{DecisionTrace, TraceBuilder};
pub use types::*;
