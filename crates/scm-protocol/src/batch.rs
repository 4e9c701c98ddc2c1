//! Batch response shape: `{results:[{index, success, value|error}], total,
//! successful, failed}`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ExchangeError;

/// Outcome of one batch unit, addressed by its position in the input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub index: usize,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ExchangeError>,
}

impl BatchOutcome {
    pub fn ok(index: usize, value: Value) -> Self {
        Self {
            index,
            success: true,
            value: Some(value),
            error: None,
        }
    }

    pub fn failed(index: usize, error: ExchangeError) -> Self {
        Self {
            index,
            success: false,
            value: None,
            error: Some(error),
        }
    }
}

/// All outcomes of a batch in input order, with aggregate counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub results: Vec<BatchOutcome>,
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
}

impl BatchReport {
    /// Build a report from outcomes already ordered by index.
    pub fn from_outcomes(results: Vec<BatchOutcome>) -> Self {
        let successful = results.iter().filter(|r| r.success).count();
        let total = results.len();
        Self {
            results,
            total,
            successful,
            failed: total - successful,
        }
    }
}
