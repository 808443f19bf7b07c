use thiserror::Error;
use uuid::Uuid;

use crate::decimal::{Money, Rate};

#[derive(Error, Debug)]
pub enum LendingError {
    #[error("invalid principal: {amount}")]
    InvalidPrincipal {
        amount: Money,
    },

    #[error("invalid term: {months} months")]
    InvalidTerm {
        months: u32,
    },

    #[error("invalid interest rate: {rate}")]
    InvalidRate {
        rate: Rate,
    },

    #[error("invalid amount: {amount}")]
    InvalidAmount {
        amount: Money,
    },

    #[error("borrower mismatch: loan belongs to {expected}, got {provided}")]
    BorrowerMismatch {
        expected: Uuid,
        provided: Uuid,
    },

    #[error("amount exceeds request: requested {requested}, provided {provided}")]
    AmountExceedsRequest {
        requested: Money,
        provided: Money,
    },

    #[error("below minimum funding: minimum {minimum}, provided {provided}")]
    BelowMinimumFunding {
        minimum: Money,
        provided: Money,
    },

    #[error("insufficient funds: available {available}, requested {requested}")]
    InsufficientFunds {
        available: Money,
        requested: Money,
    },

    #[error("{entity} not found: {id}")]
    NotFound {
        entity: &'static str,
        id: String,
    },

    #[error("installment {number} already paid")]
    AlreadyPaid {
        number: u32,
    },

    #[error("invalid state: current {current}, expected {expected}")]
    InvalidState {
        current: String,
        expected: String,
    },

    #[error("invalid date: {message}")]
    InvalidDate {
        message: String,
    },

    #[error("invalid configuration: {message}")]
    InvalidConfiguration {
        message: String,
    },

    #[error("storage error: {message}")]
    Store {
        message: String,
    },
}

impl From<serde_json::Error> for LendingError {
    fn from(err: serde_json::Error) -> Self {
        LendingError::Store {
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LendingError>;
