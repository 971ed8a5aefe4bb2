//! Result and error types for the core library

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure reported by the external ledger tooling.
///
/// `stderr` is kept verbatim: it is shown to the user as-is.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{stderr}")]
pub struct LedgerError {
    /// Process exit code, `None` when the command could not be spawned
    pub exit_code: Option<i32>,
    pub stderr: String,
}

impl LedgerError {
    pub fn new(exit_code: Option<i32>, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stderr: stderr.into(),
        }
    }
}

/// Core library error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("No wallet found")]
    NoWallet,

    #[error("Insufficient {asset}: need {required}, have {actual}")]
    InsufficientBalance {
        asset: String,
        required: Decimal,
        actual: Decimal,
    },

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Ledger unavailable: {0}")]
    LedgerUnavailable(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Key generation error: {0}")]
    KeyGeneration(String),

    #[error("Key derivation error: {0}")]
    KeyDerivation(String),

    #[error("A workflow is already running for user {0}")]
    WorkflowBusy(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a key derivation error
    pub fn key_derivation(msg: impl Into<String>) -> Self {
        Self::KeyDerivation(msg.into())
    }

    /// Text shown to the end user for a terminal failure
    pub fn user_message(&self) -> String {
        match self {
            Error::NoWallet => "No wallet found. Use /start.".to_string(),
            Error::InsufficientBalance { asset, required, actual } => {
                format!("Need >{} {} to proceed (you have {}).", required, asset, actual)
            }
            Error::Ledger(e) => format!("❌ Error: {}", e.stderr),
            Error::LedgerUnavailable(msg) => format!("❌ Could not read balances: {}", msg),
            Error::Validation(msg) => format!("❌ {}", msg),
            Error::WorkflowBusy(_) => {
                "⏳ Another operation is still running for your wallet. Try again when it finishes."
                    .to_string()
            }
            other => format!("❌ {}", other),
        }
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;

/// Operation result with optional context (for JSON output)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationResult<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub context: Option<HashMap<String, serde_json::Value>>,
}

impl<T> OperationResult<T> {
    /// Create a successful result
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            context: None,
        }
    }

    /// Create a failed result
    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            context: None,
        }
    }

    /// Create a failed result with context
    pub fn fail_with_context(
        error: impl Into<String>,
        context: HashMap<String, serde_json::Value>,
    ) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            context: Some(context),
        }
    }
}

impl<T> From<Result<T>> for OperationResult<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(Error::InsufficientBalance { asset, required, actual }) => {
                let mut context = HashMap::new();
                context.insert("asset".to_string(), serde_json::json!(asset));
                context.insert("required".to_string(), serde_json::json!(required.to_string()));
                context.insert("actual".to_string(), serde_json::json!(actual.to_string()));
                Self::fail_with_context("Insufficient balance", context)
            }
            Err(e) => Self::fail(e.to_string()),
        }
    }
}
