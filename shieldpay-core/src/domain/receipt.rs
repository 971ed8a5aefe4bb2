//! Ledger receipts

use serde::{Deserialize, Serialize};

/// Confirmation returned by one ledger operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub transaction_id: String,
    /// Full tool output, kept for diagnostics
    pub raw_output: String,
}

impl Receipt {
    pub fn new(transaction_id: impl Into<String>, raw_output: impl Into<String>) -> Self {
        Self {
            transaction_id: transaction_id.into(),
            raw_output: raw_output.into(),
        }
    }
}

/// Receipt of a committed workflow step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepReceipt {
    pub step: String,
    pub receipt: Receipt,
    /// Set by steps that create a holding account
    #[serde(skip_serializing_if = "Option::is_none")]
    pub holding_account: Option<String>,
}
