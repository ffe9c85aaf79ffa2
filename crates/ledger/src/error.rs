//! The module contains the errors the engine can throw.
//!
//! Every variant except [`Database`] is a domain error: the request was
//! rejected and nothing was written. [`Database`] is the infrastructure class
//! (connection loss, constraint violations raised by the store, ...), which
//! callers should report as "try again later" rather than "invalid request".
//!
//! [`ConcurrencyConflict`] is the only retryable domain error: the balances
//! moved between the read and the conditional write, and the whole operation
//! must be resubmitted from fresh reads.
//!
//!  [`Database`]: EngineError::Database
//!  [`ConcurrencyConflict`]: EngineError::ConcurrencyConflict
use sea_orm::DbErr;
use thiserror::Error;
use uuid::Uuid;

use crate::{EntryStatus, MovementType};

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("{0} requires a member")]
    MissingMember(MovementType),
    #[error("pool {0} not found")]
    PoolNotFound(Uuid),
    #[error("member \"{0}\" not found")]
    MemberNotFound(String),
    #[error("ledger entry {0} not found")]
    EntryNotFound(Uuid),
    #[error("\"{0}\" already present!")]
    ExistingKey(String),
    #[error("Insufficient pool funds: available {available}, requested {requested}")]
    InsufficientPoolFunds { available: i64, requested: i64 },
    #[error("No outstanding debt: member balance is {balance}")]
    NoOutstandingDebt { balance: i64 },
    #[error("Repayment of {requested} exceeds outstanding debt, maximum is {max}")]
    OverRepayment { requested: i64, max: i64 },
    #[error("Balance {balance} cannot move by {delta} without overflowing")]
    BalanceOverflow { balance: i64, delta: i64 },
    #[error("Concurrent modification of {0}, please retry")]
    ConcurrencyConflict(String),
    #[error("ledger entry {entry_id} is {status}, not pending")]
    NotPending { entry_id: Uuid, status: EntryStatus },
    #[error("ledger entry {0} was already processed")]
    AlreadyProcessed(Uuid),
    #[error("no unsettled group fee for member \"{member_id}\" in batch {batch_id}")]
    DebtNotFound { member_id: String, batch_id: Uuid },
    #[error("Invalid stored data: {0}")]
    InvalidData(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl EngineError {
    /// Stable machine-readable code, suitable for API payloads.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidAmount(_) => "INVALID_AMOUNT",
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::MissingMember(_) => "MISSING_MEMBER",
            Self::PoolNotFound(_) => "POOL_NOT_FOUND",
            Self::MemberNotFound(_) => "MEMBER_NOT_FOUND",
            Self::EntryNotFound(_) => "ENTRY_NOT_FOUND",
            Self::ExistingKey(_) => "EXISTING_KEY",
            Self::InsufficientPoolFunds { .. } => "INSUFFICIENT_POOL_FUNDS",
            Self::NoOutstandingDebt { .. } => "NO_OUTSTANDING_DEBT",
            Self::OverRepayment { .. } => "OVER_REPAYMENT",
            Self::BalanceOverflow { .. } => "BALANCE_OVERFLOW",
            Self::ConcurrencyConflict(_) => "CONCURRENCY_CONFLICT",
            Self::NotPending { .. } => "NOT_PENDING",
            Self::AlreadyProcessed(_) => "ALREADY_PROCESSED",
            Self::DebtNotFound { .. } => "DEBT_NOT_FOUND",
            Self::InvalidData(_) => "INVALID_DATA",
            Self::Database(_) => "DATABASE_ERROR",
        }
    }

    /// Returns true if resubmitting the same request may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrencyConflict(_))
    }

    /// Returns true for storage-layer failures (as opposed to rejected requests).
    #[must_use]
    pub fn is_infrastructure(&self) -> bool {
        matches!(self, Self::Database(_))
    }
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::InvalidInput(a), Self::InvalidInput(b)) => a == b,
            (Self::MissingMember(a), Self::MissingMember(b)) => a == b,
            (Self::PoolNotFound(a), Self::PoolNotFound(b)) => a == b,
            (Self::MemberNotFound(a), Self::MemberNotFound(b)) => a == b,
            (Self::EntryNotFound(a), Self::EntryNotFound(b)) => a == b,
            (Self::ExistingKey(a), Self::ExistingKey(b)) => a == b,
            (
                Self::InsufficientPoolFunds {
                    available: a1,
                    requested: r1,
                },
                Self::InsufficientPoolFunds {
                    available: a2,
                    requested: r2,
                },
            ) => a1 == a2 && r1 == r2,
            (Self::NoOutstandingDebt { balance: a }, Self::NoOutstandingDebt { balance: b }) => {
                a == b
            }
            (
                Self::OverRepayment {
                    requested: r1,
                    max: m1,
                },
                Self::OverRepayment {
                    requested: r2,
                    max: m2,
                },
            ) => r1 == r2 && m1 == m2,
            (
                Self::BalanceOverflow {
                    balance: b1,
                    delta: d1,
                },
                Self::BalanceOverflow {
                    balance: b2,
                    delta: d2,
                },
            ) => b1 == b2 && d1 == d2,
            (Self::ConcurrencyConflict(a), Self::ConcurrencyConflict(b)) => a == b,
            (
                Self::NotPending {
                    entry_id: e1,
                    status: s1,
                },
                Self::NotPending {
                    entry_id: e2,
                    status: s2,
                },
            ) => e1 == e2 && s1 == s2,
            (Self::AlreadyProcessed(a), Self::AlreadyProcessed(b)) => a == b,
            (
                Self::DebtNotFound {
                    member_id: m1,
                    batch_id: b1,
                },
                Self::DebtNotFound {
                    member_id: m2,
                    batch_id: b2,
                },
            ) => m1 == m2 && b1 == b2,
            (Self::InvalidData(a), Self::InvalidData(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_conflicts_are_retryable() {
        assert!(EngineError::ConcurrencyConflict("pool".to_string()).is_retryable());
        assert!(!EngineError::AlreadyProcessed(Uuid::nil()).is_retryable());
        assert!(
            !EngineError::InsufficientPoolFunds {
                available: 0,
                requested: 1
            }
            .is_retryable()
        );
        assert!(!EngineError::Database(DbErr::Custom("gone".to_string())).is_retryable());
    }

    #[test]
    fn database_errors_are_infrastructure() {
        assert!(EngineError::Database(DbErr::Custom("gone".to_string())).is_infrastructure());
        assert!(!EngineError::PoolNotFound(Uuid::nil()).is_infrastructure());
    }

    #[test]
    fn over_repayment_reports_maximum() {
        let err = EngineError::OverRepayment {
            requested: 500,
            max: 300,
        };
        assert_eq!(err.error_code(), "OVER_REPAYMENT");
        assert_eq!(
            err.to_string(),
            "Repayment of 500 exceeds outstanding debt, maximum is 300"
        );
    }

    #[test]
    fn missing_member_names_the_movement() {
        let err = EngineError::MissingMember(MovementType::Loan);
        assert_eq!(err.to_string(), "LOAN requires a member");
    }
}
