//! Command, plan and receipt types for engine operations.
//!
//! Commands group the parameters of a write (keeping call sites readable),
//! plans carry the balances observed by a preview into the commit, and
//! receipts report what a committed write produced.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, MovementType};

/// Caller identity recorded on entries and audit rows.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub name: String,
}

impl Actor {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Request a single movement against a pool.
#[derive(Clone, Debug)]
pub struct TransferCmd {
    pub pool_id: Uuid,
    pub movement_type: MovementType,
    pub amount_minor: i64,
    pub description: Option<String>,
    pub member_id: Option<String>,
    pub batch_id: Option<Uuid>,
    pub actor: Actor,
}

impl TransferCmd {
    #[must_use]
    pub fn new(pool_id: Uuid, movement_type: MovementType, amount_minor: i64, actor: Actor) -> Self {
        Self {
            pool_id,
            movement_type,
            amount_minor,
            description: None,
            member_id: None,
            batch_id: None,
            actor,
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn member(mut self, member_id: impl Into<String>) -> Self {
        self.member_id = Some(member_id.into());
        self
    }

    #[must_use]
    pub fn batch(mut self, batch_id: Uuid) -> Self {
        self.batch_id = Some(batch_id);
        self
    }
}

/// Where a committed plan is recorded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum PlanTarget {
    /// Insert a fresh approved entry.
    NewEntry {
        description: String,
        batch_id: Option<Uuid>,
    },
    /// Transition an existing pending entry to approved.
    PendingEntry(Uuid),
}

/// A validated movement together with the balances it was validated against.
///
/// Produced by [`Engine::preview_transfer`](crate::Engine::preview_transfer)
/// or [`Engine::preview_approval`](crate::Engine::preview_approval) and
/// consumed by [`Engine::commit_transfer`](crate::Engine::commit_transfer).
/// The commit only succeeds while the stored balances still equal the
/// observed ones.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferPlan {
    pub(crate) pool_id: Uuid,
    pub(crate) movement_type: MovementType,
    pub(crate) amount_minor: i64,
    pub(crate) member_id: Option<String>,
    pub(crate) target: PlanTarget,
    pub(crate) actor: Actor,
    pub(crate) pool_before: i64,
    pub(crate) member_before: Option<i64>,
}

impl TransferPlan {
    pub fn pool_id(&self) -> Uuid {
        self.pool_id
    }

    pub fn movement_type(&self) -> MovementType {
        self.movement_type
    }

    pub fn amount_minor(&self) -> i64 {
        self.amount_minor
    }

    pub fn member_id(&self) -> Option<&str> {
        self.member_id.as_deref()
    }

    pub fn pool_before(&self) -> i64 {
        self.pool_before
    }

    /// Projected pool balance, saturating at the `i64` bounds. The commit
    /// itself refuses to overflow.
    pub fn pool_after(&self) -> i64 {
        self.pool_before
            .saturating_add(self.movement_type.delta(self.amount_minor).pool)
    }

    pub fn member_before(&self) -> Option<i64> {
        self.member_before
    }

    pub fn member_after(&self) -> Option<i64> {
        let delta = self.movement_type.delta(self.amount_minor).member;
        self.member_before
            .map(|before| before.saturating_add(delta))
    }

    /// The pending entry this plan approves, if any.
    pub fn pending_entry_id(&self) -> Option<Uuid> {
        match self.target {
            PlanTarget::PendingEntry(id) => Some(id),
            PlanTarget::NewEntry { .. } => None,
        }
    }

    /// True when the member ends at or above zero after a credit movement,
    /// which clears their outstanding group fees.
    pub(crate) fn triggers_settlement(&self) -> bool {
        self.movement_type.settles_group_fees() && self.member_after().is_some_and(|b| b >= 0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferReceipt {
    pub entry_id: Uuid,
    pub new_pool_balance: i64,
    pub new_member_balance: Option<i64>,
    /// Group fees settled as a side effect of this movement.
    pub settled_fees: u64,
}

#[derive(Debug)]
pub struct GroupFeeReceipt {
    pub batch_id: Uuid,
    pub success_count: usize,
    pub failures: Vec<(String, EngineError)>,
}

impl GroupFeeReceipt {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// An unsettled group fee share about to be waived, with the balances the
/// waive was planned against.
///
/// Produced by [`Engine::preview_waive`](crate::Engine::preview_waive) and
/// consumed by [`Engine::commit_waive`](crate::Engine::commit_waive).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WaivePlan {
    pub(crate) pool_id: Uuid,
    pub(crate) member_id: String,
    pub(crate) batch_id: Uuid,
    pub(crate) entry_id: Uuid,
    pub(crate) amount_minor: i64,
    pub(crate) actor: Actor,
    pub(crate) pool_before: i64,
    pub(crate) member_before: i64,
}

impl WaivePlan {
    /// The group fee entry being waived.
    pub fn entry_id(&self) -> Uuid {
        self.entry_id
    }

    pub fn amount_minor(&self) -> i64 {
        self.amount_minor
    }

    pub fn pool_before(&self) -> i64 {
        self.pool_before
    }

    pub fn member_before(&self) -> i64 {
        self.member_before
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaiveReceipt {
    pub entry_id: Uuid,
    pub amount_waived: i64,
    pub new_pool_balance: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(movement_type: MovementType, amount: i64, member_before: Option<i64>) -> TransferPlan {
        TransferPlan {
            pool_id: Uuid::nil(),
            movement_type,
            amount_minor: amount,
            member_id: member_before.map(|_| "m1".to_string()),
            target: PlanTarget::NewEntry {
                description: String::new(),
                batch_id: None,
            },
            actor: Actor::new("boss", "Boss"),
            pool_before: 1_000,
            member_before,
        }
    }

    #[test]
    fn projected_balances() {
        let loan = plan(MovementType::Loan, 300, Some(0));
        assert_eq!(loan.pool_after(), 700);
        assert_eq!(loan.member_after(), Some(-300));

        let income = plan(MovementType::Income, 50, None);
        assert_eq!(income.pool_after(), 1_050);
        assert_eq!(income.member_after(), None);
    }

    #[test]
    fn projections_saturate_instead_of_wrapping() {
        let mut deposit = plan(MovementType::Deposit, 10, Some(i64::MAX - 5));
        deposit.pool_before = i64::MAX;
        assert_eq!(deposit.pool_after(), i64::MAX);
        assert_eq!(deposit.member_after(), Some(i64::MAX));

        let mut loan = plan(MovementType::Loan, 10, Some(i64::MIN + 5));
        loan.pool_before = i64::MIN + 1;
        assert_eq!(loan.pool_after(), i64::MIN);
        assert_eq!(loan.member_after(), Some(i64::MIN));
    }

    #[test]
    fn settlement_only_after_credit_reaching_zero() {
        assert!(plan(MovementType::Deposit, 60, Some(-50)).triggers_settlement());
        assert!(plan(MovementType::Deposit, 50, Some(-50)).triggers_settlement());
        assert!(!plan(MovementType::Deposit, 20, Some(-50)).triggers_settlement());
        assert!(plan(MovementType::GroupFee, 100, Some(150)).triggers_settlement());
        assert!(!plan(MovementType::GroupFee, 100, Some(0)).triggers_settlement());
        assert!(!plan(MovementType::Repayment, 50, Some(-50)).triggers_settlement());
    }

    #[test]
    fn command_builder_sets_optional_fields() {
        let batch = Uuid::new_v4();
        let cmd = TransferCmd::new(Uuid::nil(), MovementType::GroupFee, 10, Actor::new("a", "A"))
            .member("m1")
            .description("dues")
            .batch(batch);
        assert_eq!(cmd.member_id.as_deref(), Some("m1"));
        assert_eq!(cmd.description.as_deref(), Some("dues"));
        assert_eq!(cmd.batch_id, Some(batch));
    }
}
