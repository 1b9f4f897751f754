//! Transaction features at the request boundary
//!
//! Raw [`TransactionInput`] is validated once and turned into
//! [`TransactionFeatures`], which is what predictors receive.

use crate::Result;
use serde::{Deserialize, Deserializer, Serialize};
use validator::Validate;

/// Transaction as supplied by the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct TransactionInput {
    /// Amount of the current transaction
    #[validate(range(min = 1.0, max = 10_000_000.0))]
    pub transaction_amount: f64,

    /// User's average transaction amount (last 30 days)
    #[validate(range(min = 0.0, max = 1_000_000.0))]
    #[serde(default)]
    pub avg_transaction_amount: f64,

    /// Number of transactions in the last 24 hours
    #[validate(range(max = 500))]
    #[serde(default)]
    pub transactions_last_24h: u32,

    /// Current amount over average; derived when absent
    #[validate(range(min = 0.0, max = 1_000.0))]
    #[serde(default)]
    pub amount_spike_ratio: Option<f64>,

    /// First transaction to this receiver
    #[serde(default, deserialize_with = "flag")]
    pub is_new_receiver: bool,

    /// Transaction from a new or unrecognized device
    #[serde(default, deserialize_with = "flag")]
    pub is_new_device: bool,

    /// Minutes since the user's previous transaction
    #[validate(range(min = 0.0, max = 525_600.0))]
    #[serde(default = "default_minutes_since_last")]
    pub time_since_last_txn_minutes: f64,
}

fn default_minutes_since_last() -> f64 {
    1_000.0
}

/// Accepts `true`/`false` as well as `0`/`1`
fn flag<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
    }

    match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => Ok(b),
        Flag::Int(0) => Ok(false),
        Flag::Int(1) => Ok(true),
        Flag::Int(other) => Err(serde::de::Error::custom(format!(
            "flag must be 0 or 1, got {}",
            other
        ))),
    }
}

impl TransactionInput {
    /// Validate ranges and derive the spike ratio. Performed once per request.
    pub fn into_features(self) -> Result<TransactionFeatures> {
        self.validate()?;

        let amount_spike_ratio = match self.amount_spike_ratio {
            Some(ratio) => ratio,
            None if self.avg_transaction_amount > 0.0 => {
                self.transaction_amount / self.avg_transaction_amount
            }
            // New user without history
            None => self.transaction_amount,
        };

        Ok(TransactionFeatures {
            transaction_amount: self.transaction_amount,
            avg_transaction_amount: self.avg_transaction_amount,
            transactions_last_24h: self.transactions_last_24h,
            amount_spike_ratio,
            is_new_receiver: self.is_new_receiver,
            is_new_device: self.is_new_device,
            time_since_last_txn_minutes: self.time_since_last_txn_minutes,
        })
    }
}

/// Validated fixed-field transaction features handed to predictors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionFeatures {
    /// Amount of the current transaction
    pub transaction_amount: f64,
    /// User's average transaction amount
    pub avg_transaction_amount: f64,
    /// Transactions in the last 24 hours
    pub transactions_last_24h: u32,
    /// Current amount over average
    pub amount_spike_ratio: f64,
    /// First transaction to this receiver
    pub is_new_receiver: bool,
    /// From a new device
    pub is_new_device: bool,
    /// Minutes since the previous transaction
    pub time_since_last_txn_minutes: f64,
}

impl TransactionFeatures {
    /// Feature vector in model training order, booleans as 0/1
    pub fn to_vector(&self) -> [f64; 7] {
        [
            self.transaction_amount,
            self.avg_transaction_amount,
            f64::from(self.transactions_last_24h),
            self.amount_spike_ratio,
            if self.is_new_receiver { 1.0 } else { 0.0 },
            if self.is_new_device { 1.0 } else { 0.0 },
            self.time_since_last_txn_minutes,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ShieldError;

    fn input(amount: f64, avg: f64) -> TransactionInput {
        TransactionInput {
            transaction_amount: amount,
            avg_transaction_amount: avg,
            transactions_last_24h: 2,
            amount_spike_ratio: None,
            is_new_receiver: false,
            is_new_device: false,
            time_since_last_txn_minutes: 300.0,
        }
    }

    #[test]
    fn test_spike_ratio_derived_from_average() {
        let features = input(1500.0, 2000.0).into_features().unwrap();
        assert!((features.amount_spike_ratio - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_spike_ratio_without_history_uses_amount() {
        let features = input(750.0, 0.0).into_features().unwrap();
        assert_eq!(features.amount_spike_ratio, 750.0);
    }

    #[test]
    fn test_supplied_spike_ratio_kept() {
        let mut raw = input(1500.0, 2000.0);
        raw.amount_spike_ratio = Some(4.0);
        assert_eq!(raw.into_features().unwrap().amount_spike_ratio, 4.0);
    }

    #[test]
    fn test_out_of_range_rejected() {
        let mut raw = input(1500.0, 2000.0);
        raw.transactions_last_24h = 900;
        assert!(matches!(raw.into_features(), Err(ShieldError::Validation(_))));

        assert!(input(0.0, 2000.0).into_features().is_err());
    }

    #[test]
    fn test_flags_accept_integers() {
        let raw: TransactionInput = serde_json::from_value(serde_json::json!({
            "transaction_amount": 75000,
            "avg_transaction_amount": 2000,
            "transactions_last_24h": 10,
            "is_new_receiver": 1,
            "is_new_device": true,
            "time_since_last_txn_minutes": 5
        }))
        .unwrap();
        assert!(raw.is_new_receiver);
        assert!(raw.is_new_device);

        let bad = serde_json::from_value::<TransactionInput>(serde_json::json!({
            "transaction_amount": 10,
            "is_new_device": 3
        }));
        assert!(bad.is_err());
    }

    #[test]
    fn test_vector_order() {
        let mut raw = input(1000.0, 500.0);
        raw.is_new_device = true;
        let v = raw.into_features().unwrap().to_vector();
        assert_eq!(v, [1000.0, 500.0, 2.0, 2.0, 0.0, 1.0, 300.0]);
    }
}
