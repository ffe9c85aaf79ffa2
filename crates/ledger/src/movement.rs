//! Movement types and the balance-delta table.
//!
//! Every ledger entry has a [`MovementType`] that decides how it changes the
//! pool balance and the (optional) member balance:
//!
//! | type        | pool    | member  |
//! |-------------|---------|---------|
//! | `Income`    | +amount | 0       |
//! | `Expense`   | -amount | 0       |
//! | `Loan`      | -amount | -amount |
//! | `Repayment` | +amount | +amount |
//! | `Deposit`   | +amount | +amount |
//! | `GroupFee`  | +amount | -amount |
//!
//! Amounts are positive integer **minor units**; the sign comes only from
//! this table.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{EngineError, ResultEngine};

/// Upper bound (inclusive) for a single movement, in minor units.
pub const MAX_AMOUNT_MINOR: i64 = 100_000_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementType {
    Income,
    Expense,
    Loan,
    Repayment,
    Deposit,
    GroupFee,
}

/// Signed change applied to the pool and to the member balance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceDelta {
    pub pool: i64,
    pub member: i64,
}

impl MovementType {
    pub const ALL: [MovementType; 6] = [
        Self::Income,
        Self::Expense,
        Self::Loan,
        Self::Repayment,
        Self::Deposit,
        Self::GroupFee,
    ];

    /// Storage representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
            Self::Loan => "loan",
            Self::Repayment => "repayment",
            Self::Deposit => "deposit",
            Self::GroupFee => "group_fee",
        }
    }

    /// `Income` and `Expense` only touch the pool.
    pub fn requires_member(self) -> bool {
        !matches!(self, Self::Income | Self::Expense)
    }

    /// Movements that may bring a member back to a non-negative balance and
    /// therefore trigger settlement of their group fees.
    pub fn settles_group_fees(self) -> bool {
        matches!(self, Self::Deposit | Self::GroupFee)
    }

    pub fn delta(self, amount_minor: i64) -> BalanceDelta {
        let (pool, member) = match self {
            Self::Income => (amount_minor, 0),
            Self::Expense => (-amount_minor, 0),
            Self::Loan => (-amount_minor, -amount_minor),
            Self::Repayment => (amount_minor, amount_minor),
            Self::Deposit => (amount_minor, amount_minor),
            Self::GroupFee => (amount_minor, -amount_minor),
        };
        BalanceDelta { pool, member }
    }

    /// Funds checks that depend on the balances observed before the write.
    ///
    /// `member_before` is `None` for pool-only movements.
    pub fn check_funds(
        self,
        amount_minor: i64,
        pool_before: i64,
        member_before: Option<i64>,
    ) -> ResultEngine<()> {
        match self {
            Self::Expense | Self::Loan if pool_before < amount_minor => {
                Err(EngineError::InsufficientPoolFunds {
                    available: pool_before,
                    requested: amount_minor,
                })
            }
            Self::Repayment => {
                let balance = member_before.unwrap_or_default();
                if balance >= 0 {
                    return Err(EngineError::NoOutstandingDebt { balance });
                }
                if balance + amount_minor > 0 {
                    return Err(EngineError::OverRepayment {
                        requested: amount_minor,
                        max: -balance,
                    });
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

/// Amounts must be in `1..=MAX_AMOUNT_MINOR`.
pub(crate) fn validate_amount(amount_minor: i64) -> ResultEngine<()> {
    if amount_minor <= 0 || amount_minor > MAX_AMOUNT_MINOR {
        return Err(EngineError::InvalidAmount(format!(
            "amount_minor must be in 1..={MAX_AMOUNT_MINOR}, got {amount_minor}"
        )));
    }
    Ok(())
}

impl fmt::Display for MovementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.as_str().to_ascii_uppercase())
    }
}

impl TryFrom<&str> for MovementType {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| EngineError::InvalidData(format!("invalid movement type: {value}")))
    }
}

impl FromStr for MovementType {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_table() {
        let expected = [
            (MovementType::Income, 100, 0),
            (MovementType::Expense, -100, 0),
            (MovementType::Loan, -100, -100),
            (MovementType::Repayment, 100, 100),
            (MovementType::Deposit, 100, 100),
            (MovementType::GroupFee, 100, -100),
        ];
        for (kind, pool, member) in expected {
            assert_eq!(kind.delta(100), BalanceDelta { pool, member }, "{kind}");
        }
    }

    #[test]
    fn only_pool_movements_skip_the_member() {
        assert!(!MovementType::Income.requires_member());
        assert!(!MovementType::Expense.requires_member());
        assert!(MovementType::Loan.requires_member());
        assert!(MovementType::Repayment.requires_member());
        assert!(MovementType::Deposit.requires_member());
        assert!(MovementType::GroupFee.requires_member());
    }

    #[test]
    fn amount_bounds() {
        assert!(validate_amount(0).is_err());
        assert!(validate_amount(-5).is_err());
        assert!(validate_amount(MAX_AMOUNT_MINOR + 1).is_err());
        assert!(validate_amount(1).is_ok());
        assert!(validate_amount(MAX_AMOUNT_MINOR).is_ok());
    }

    #[test]
    fn expense_and_loan_cannot_overdraw_the_pool() {
        assert_eq!(
            MovementType::Expense.check_funds(50, 0, None),
            Err(EngineError::InsufficientPoolFunds {
                available: 0,
                requested: 50
            })
        );
        assert_eq!(
            MovementType::Loan.check_funds(301, 300, Some(0)),
            Err(EngineError::InsufficientPoolFunds {
                available: 300,
                requested: 301
            })
        );
        assert!(MovementType::Loan.check_funds(300, 300, Some(0)).is_ok());
        assert!(MovementType::Income.check_funds(50, 0, None).is_ok());
    }

    #[test]
    fn repayment_needs_debt_and_cannot_overshoot() {
        assert_eq!(
            MovementType::Repayment.check_funds(10, 0, Some(0)),
            Err(EngineError::NoOutstandingDebt { balance: 0 })
        );
        assert_eq!(
            MovementType::Repayment.check_funds(10, 0, Some(25)),
            Err(EngineError::NoOutstandingDebt { balance: 25 })
        );
        assert_eq!(
            MovementType::Repayment.check_funds(301, 0, Some(-300)),
            Err(EngineError::OverRepayment {
                requested: 301,
                max: 300
            })
        );
        assert!(MovementType::Repayment.check_funds(300, 0, Some(-300)).is_ok());
    }

    #[test]
    fn parses_storage_and_display_forms() {
        for kind in MovementType::ALL {
            assert_eq!(MovementType::try_from(kind.as_str()).unwrap(), kind);
            assert_eq!(kind.to_string().parse::<MovementType>().unwrap(), kind);
        }
        assert_eq!(
            "group-fee".parse::<MovementType>().unwrap(),
            MovementType::GroupFee
        );
        assert!("transfer".parse::<MovementType>().is_err());
    }
}
