//! Unified error type for the budget workflow.
//!
//! Every fallible operation in the crate returns [`Result`], so callers can
//! propagate with `?` and match on the variant they care about.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Invalid amount: {amount}")]
    InvalidAmount { amount: f64 },

    #[error("Insufficient funds: available {available}, required {required}")]
    InsufficientFunds { available: f64, required: f64 },

    #[error("Budget not found: {id}")]
    BudgetNotFound { id: i64 },

    #[error("Approval rule not found: {id}")]
    RuleNotFound { id: i64 },

    #[error("Team not found: {team}")]
    TeamBudgetNotFound { team: String },

    #[error("Team budget not found: {id}")]
    TeamBudgetIdNotFound { id: i64 },

    #[error("Budget request not found: {id}")]
    RequestNotFound { id: i64 },

    #[error("Replication log not found: {id}")]
    ReplicationLogNotFound { id: i64 },

    #[error("Illegal budget transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Budget request {id} was already {status}")]
    RequestAlreadyResolved { id: i64, status: String },

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Integer conversion error: {0}")]
    IntConversion(#[from] std::num::TryFromIntError),
}

impl Error {
    /// Shorthand for a [`Error::Validation`] with the given message.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
